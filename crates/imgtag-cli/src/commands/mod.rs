//! Command handlers grouped by concern.

pub(crate) mod auth;
pub(crate) mod keys;
pub(crate) mod tag;
pub(crate) mod usage;

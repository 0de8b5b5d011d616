//! Middleware modules

pub mod rate_limit;

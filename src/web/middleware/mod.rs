//! # Web API Middleware
//!
//! Request-scoped middleware applied to every route.

pub mod request_id;

pub use request_id::add_request_id;

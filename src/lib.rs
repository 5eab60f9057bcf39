#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskboard
//!
//! Task-management microservice built around a notification delivery path.
//!
//! ## Overview
//!
//! Taskboard persists projects and tasks in PostgreSQL and exposes them over
//! an Axum HTTP API. Every task mutation runs through a change-detection
//! orchestrator that builds notification events, publishes them to a RabbitMQ
//! topic exchange, and falls back to SMTP email when the broker is
//! unreachable. User identity (assignees, administrators, the acting caller)
//! lives in an external user service reached over HTTP.
//!
//! ## Architecture
//!
//! - [`models`] — sqlx-backed persistence for projects and tasks
//! - [`identity`] — typed client for the external user service
//! - [`notifications`] — event building, AMQP publish, SMTP fallback, and
//!   the dispatcher that ties a mutation to its events
//! - [`web`] — Axum routes, handlers, state, and middleware
//!
//! Notification delivery is best-effort by contract: a mutation commits and
//! answers its HTTP caller whether or not any event reaches a subscriber.

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod web;

pub use config::TaskboardConfig;
pub use error::{Result, TaskboardError};

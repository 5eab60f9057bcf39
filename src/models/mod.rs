//! # Data Layer
//!
//! SQLx-backed models for tasks and projects.

pub mod project;
pub mod task;

pub use project::{NewProject, Project};
pub use task::{validate_difficulty, NewTask, Task, TaskChanges, TaskStatus, TaskWithProject, ValidationFailure};

//! Application module
//!
//! Startup wiring and task lifecycle of the autoscaler process.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::ApplicationBuilder;
pub use core::Application;
pub use services::ApplicationServices;

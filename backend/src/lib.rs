//! EvePlanner Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod services;
/// Application state management
///
/// Handles the store handle, upload storage and delete policy.
pub mod state;
pub mod store;
pub mod workers;

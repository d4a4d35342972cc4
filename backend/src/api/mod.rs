//! API module
//!
//! Contains HTTP request handlers for users, events, files and statistics

pub mod events;
pub mod files;
pub mod stats;
pub mod users;
pub mod utils;

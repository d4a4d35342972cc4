// State management module
// Handles the shared handles every request handler works with

pub mod app_state;

pub use app_state::{generate_id, AppState, RecordId};

//! Background workers

pub mod upload_reconcile;

pub use upload_reconcile::{reconcile_uploads, upload_reconcile_worker, ReconcileReport};

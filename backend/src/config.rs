//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::store::DeletePolicy;
use std::env;
use std::path::PathBuf;

/// Default request body / upload limit (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Upload configuration
    pub upload: UploadConfig,
    /// Referential integrity configuration
    pub integrity: IntegrityConfig,
    /// Upload reconciliation configuration
    pub reconcile: ReconcileConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Directory with the static front-end, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory for the database and uploads
    pub data_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory holding uploaded file objects
    pub upload_dir: PathBuf,
}

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Largest accepted request body and file part, in bytes
    pub max_upload_bytes: usize,
}

/// Referential integrity configuration
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Treatment of events and files when their parent is deleted
    pub delete_policy: DeletePolicy,
}

/// Upload reconciliation configuration
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Seconds between sweeps after the startup sweep; 0 disables periodic sweeps
    pub interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("eveplanner.db"));
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("uploads"));

        let delete_policy = match env::var("DELETE_POLICY") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to cascade", e);
                DeletePolicy::Cascade
            }),
            Err(_) => DeletePolicy::default(),
        };

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
            },
            persistence: PersistenceConfig {
                data_dir,
                database_path,
                upload_dir,
            },
            upload: UploadConfig {
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
            integrity: IntegrityConfig { delete_policy },
            reconcile: ReconcileConfig {
                interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

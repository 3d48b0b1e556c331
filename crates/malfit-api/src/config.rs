//! API configuration.

use std::path::PathBuf;

/// Upload extensions accepted by `POST /upload`.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "m4v", "webm"];

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Largest accepted upload in megabytes
    pub max_upload_mb: u64,
    /// Shared working tree (`uploads/`, `out/`)
    pub root_workdir: PathBuf,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_upload_mb: 200,
            root_workdir: PathBuf::from("/tmp/malfit"),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_upload_mb: std::env::var("MAX_UPLOAD_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200),
            root_workdir: std::env::var("ROOT_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/malfit")),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root_workdir.join("uploads")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root_workdir.join("out")
    }
}

/// Lower-cased extension of `filename` if it is an accepted video type.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

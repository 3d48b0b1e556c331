//! Request handlers.

pub mod download;
pub mod health;
pub mod jobs;
pub mod upload;

pub use download::download_artifact;
pub use health::{health, root};
pub use jobs::get_job;
pub use upload::upload_video;

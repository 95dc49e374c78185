use std::path::PathBuf;

/// Reasons a source could not be loaded or prepared.
///
/// These never escape the controller's public API; they are reported through
/// [`PlayerListener::on_error`](crate::PlayerListener::on_error) and
/// [`PlaybackController::load_error`](crate::PlaybackController::load_error).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The reference is empty or otherwise unusable.
    #[error("invalid source reference: {0:?}")]
    InvalidSource(String),
    /// The reference uses a scheme the engine cannot open.
    #[error("unsupported source scheme {scheme:?} in {source_ref:?}")]
    UnsupportedScheme { scheme: String, source_ref: String },
    /// The resource could not be opened.
    #[error("open {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The resource opened but is not a decodable audio stream.
    #[error("unsupported media: {0}")]
    Unsupported(String),
    /// Asynchronous preparation failed (decode, device or stream setup).
    #[error("prepare failed: {0}")]
    Prepare(String),
}

impl LoadError {
    /// Wrap an `anyhow` chain as a preparation failure, keeping every cause.
    pub fn prepare(err: impl std::fmt::Display) -> Self {
        Self::Prepare(format!("{err:#}"))
    }
}

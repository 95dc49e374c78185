use crate::engine::MediaEngine;
use crate::error::LoadError;

/// Caller-facing session events. Every method defaults to doing nothing.
///
/// Invoked at most once per event occurrence, on whatever thread the engine
/// delivers it from.
pub trait PlayerListener: Send + Sync {
    /// The source is ready. The controller already accepts transport calls.
    fn on_prepared(&self, _engine: &dyn MediaEngine) {}

    /// Playback reached the end of the source.
    fn on_completion(&self) {}

    /// The source could not be loaded; the session will never become prepared.
    fn on_error(&self, _error: &LoadError) {}
}

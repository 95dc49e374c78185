//! Media engine capability consumed by the controller.

use std::sync::Arc;

use crate::error::LoadError;
use crate::source::SourceRef;

/// A playback engine: loads one source, prepares it asynchronously, then plays it.
///
/// Methods take `&self`; implementations synchronize internally because events
/// arrive from the engine's own threads while the owner issues transport calls.
pub trait MediaEngine: Send + Sync {
    /// Submit the source to load. Fails when the resource cannot be opened.
    fn set_source(&self, source: &SourceRef) -> Result<(), LoadError>;

    /// Start preparing the submitted source. Completion is reported through
    /// [`EngineEvents::on_prepared`] or [`EngineEvents::on_error`].
    fn prepare_async(&self);

    /// Register the handler receiving prepared/completion/error events.
    /// Replaces any earlier handler.
    fn set_event_handler(&self, handler: Arc<dyn EngineEvents>);

    fn seek_to(&self, position_ms: u64);
    fn start(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;

    /// Playback position in milliseconds.
    fn current_position(&self) -> u64;

    /// Free decoding/output resources. Transport calls afterwards are ignored.
    fn release(&self);
}

/// Events emitted by a [`MediaEngine`], possibly from a background thread.
pub trait EngineEvents: Send + Sync {
    fn on_prepared(&self);
    fn on_completion(&self);
    fn on_error(&self, error: LoadError);
}

//! Playback controller wrapping a media engine and an audio-focus client.
//!
//! The controller owns one [`MediaEngine`] and one [`FocusManager`] and exposes a
//! small transport surface (play/pause/reset/seek/release). Transport calls are
//! refused until the engine reports that the source is prepared.

pub mod controller;
pub mod engine;
pub mod error;
pub mod focus;
pub mod listener;
pub mod source;

pub use controller::PlaybackController;
pub use engine::{EngineEvents, MediaEngine};
pub use error::LoadError;
pub use focus::{FocusArbiter, FocusClient, FocusListener, FocusManager};
pub use listener::PlayerListener;
pub use source::SourceRef;

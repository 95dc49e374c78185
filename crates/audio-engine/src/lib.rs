//! CPAL/Symphonia implementation of [`focus_player::MediaEngine`].
//!
//! Preparation decodes the whole source on a worker thread, resamples it to the
//! output device rate when needed, and opens a CPAL stream that stays silent
//! until started.

pub mod config;
pub mod decode;
pub mod device;
pub mod engine;
pub mod output;
pub mod resample;

pub use config::EngineConfig;
pub use engine::CpalEngine;

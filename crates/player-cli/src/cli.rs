use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "player", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// TOML config file (device, chunk_frames, [sources] table)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resampler input chunk size in frames
    #[arg(long)]
    pub chunk_frames: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a source and control playback from stdin
    Play {
        /// Path, file:// URI, or a name from the config's [sources] table
        source: String,

        /// Seek here once the source is prepared
        #[arg(long)]
        start_ms: Option<u64>,

        /// Start playing as soon as the source is prepared
        #[arg(long)]
        autoplay: bool,
    },
}

/// Engine tuning shared by the decode/resample/output stages.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Output device name (case-insensitive substring). Host default when `None`.
    pub device: Option<String>,
    /// Resampler input chunk size in frames.
    pub chunk_frames: usize,
    /// Ceiling on the decoded track held in memory, in MiB of `f32` samples.
    pub max_decoded_mib: usize,
}

impl EngineConfig {
    /// Decode ceiling expressed in interleaved samples.
    pub fn max_decoded_samples(&self) -> usize {
        self.max_decoded_mib.saturating_mul(1024 * 1024) / std::mem::size_of::<f32>()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            chunk_frames: 1024,
            // About 93 minutes of 48 kHz stereo.
            max_decoded_mib: 2048,
        }
    }
}

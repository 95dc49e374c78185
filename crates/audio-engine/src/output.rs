//! Output stage (CPAL stream over an in-memory track).
//!
//! The real-time callback reads straight from the decoded [`PcmTrack`]:
//! - outputs silence while not playing, without moving the cursor
//! - applies basic channel mapping (mono<->stereo, best-effort otherwise)
//! - converts `f32` samples to the device sample format
//! - stops and notifies the worker when the cursor reaches the end

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::decode::PcmTrack;

/// Transport state shared between engine calls and the audio callback.
///
/// Positions are tracked in frames at the output rate.
#[derive(Debug, Default)]
pub struct Transport {
    playing: AtomicBool,
    cursor: AtomicU64,
    total: AtomicU64,
    rate: AtomicU32,
}

impl Transport {
    /// Bind the transport to a prepared track and rewind.
    pub fn load(&self, total_frames: u64, rate: u32) {
        self.playing.store(false, Ordering::Release);
        self.total.store(total_frames, Ordering::Release);
        self.cursor.store(0, Ordering::Release);
        self.rate.store(rate, Ordering::Release);
    }

    /// Start playing. A finished track restarts from the beginning.
    pub fn start(&self) {
        if self.cursor.load(Ordering::Acquire) >= self.total.load(Ordering::Acquire) {
            self.cursor.store(0, Ordering::Release);
        }
        self.playing.store(true, Ordering::Release);
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Move the cursor, clamped to the end of the track.
    pub fn seek_ms(&self, position_ms: u64) {
        let rate = self.rate.load(Ordering::Acquire);
        let total = self.total.load(Ordering::Acquire);
        self.cursor
            .store(ms_to_frames(position_ms, rate).min(total), Ordering::Release);
    }

    pub fn position_ms(&self) -> u64 {
        frames_to_ms(
            self.cursor.load(Ordering::Acquire),
            self.rate.load(Ordering::Acquire),
        )
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(
            self.total.load(Ordering::Acquire),
            self.rate.load(Ordering::Acquire),
        )
    }

    /// Advance after writing `frames` starting at `from`.
    ///
    /// Returns `true` when this advance finished the track. A seek that landed while the
    /// callback was running wins over the advance.
    fn advance(&self, from: u64, frames: u64) -> bool {
        let to = from + frames;
        if self
            .cursor
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        to >= self.total.load(Ordering::Acquire) && self.playing.swap(false, Ordering::AcqRel)
    }
}

fn ms_to_frames(ms: u64, rate: u32) -> u64 {
    ms.saturating_mul(rate as u64) / 1000
}

fn frames_to_ms(frames: u64, rate: u32) -> u64 {
    if rate == 0 {
        return 0;
    }
    frames.saturating_mul(1000) / rate as u64
}

/// Build a CPAL output stream playing `track` under control of `transport`.
///
/// `track` must already be at the stream's sample rate. `on_finished` runs on the
/// audio thread each time playback reaches the end, so it must not block.
pub fn build_output_stream<N>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    track: Arc<PcmTrack>,
    transport: Arc<Transport>,
    on_finished: N,
) -> Result<cpal::Stream>
where
    N: Fn() + Send + 'static,
{
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32, N>(device, config, track, transport, on_finished),
        cpal::SampleFormat::I16 => build_stream::<i16, N>(device, config, track, transport, on_finished),
        cpal::SampleFormat::I32 => build_stream::<i32, N>(device, config, track, transport, on_finished),
        cpal::SampleFormat::U16 => build_stream::<u16, N>(device, config, track, transport, on_finished),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T, N>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    track: Arc<PcmTrack>,
    transport: Arc<Transport>,
    on_finished: N,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
    N: Fn() + Send + 'static,
{
    let channels_out = config.channels as usize;
    if channels_out == 0 {
        return Err(anyhow!("output config has no channels"));
    }
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if !transport.is_playing() {
                data.fill(silence);
                return;
            }

            let from = transport.cursor.load(Ordering::Acquire);
            let written = fill_frames(&track, from as usize, data, channels_out, |s| {
                <T as cpal::Sample>::from_sample::<f32>(s)
            });
            for sample in &mut data[written * channels_out..] {
                *sample = silence;
            }
            if transport.advance(from, written as u64) {
                on_finished();
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Write frames from `track` starting at frame `from` into `out`. Returns frames written.
fn fill_frames<T>(
    track: &PcmTrack,
    from: usize,
    out: &mut [T],
    dst_channels: usize,
    convert: impl Fn(f32) -> T,
) -> usize {
    let src_channels = track.channels;
    let available = track.frames().saturating_sub(from);
    let frames = (out.len() / dst_channels).min(available);
    for frame in 0..frames {
        let start = (from + frame) * src_channels;
        let src = &track.samples[start..start + src_channels];
        for ch in 0..dst_channels {
            out[frame * dst_channels + ch] = convert(map_channel(src, dst_channels, ch));
        }
    }
    frames
}

/// Output sample for `dst_ch` from one source frame.
///
/// - mono -> stereo: duplicate channel 0
/// - stereo -> mono: average L/R
/// - other layouts: clamp to the last available source channel
fn map_channel(frame: &[f32], dst_channels: usize, dst_ch: usize) -> f32 {
    match (frame.len(), dst_channels) {
        (0, _) => 0.0,
        (2, 1) => 0.5 * (frame[0] + frame[1]),
        (n, _) => frame[dst_ch.min(n - 1)],
    }
}

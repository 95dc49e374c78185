//! Output device discovery and stream config selection.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device whose name contains `needle` (case-insensitive),
/// or the host default when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let Some(needle) = needle.filter(|n| !n.trim().is_empty()) else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device"));
    };

    host.output_devices()
        .context("No output devices")?
        .find(|d| {
            d.description()
                .map(|desc| matches_device_name(&desc.name(), needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("No output device matched: {needle}"))
}

/// Choose an output config for a track at `source_rate`.
///
/// An exact rate match avoids resampling; otherwise the highest rate not above the
/// source wins, then the lowest rate above it. Ties prefer float sample formats.
pub fn pick_output_config(
    device: &cpal::Device,
    source_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(Candidate, cpal::SupportedStreamConfig)> = None;

    for range in device.supported_output_configs()? {
        let rate = clamp_rate(range.min_sample_rate(), range.max_sample_rate(), source_rate);
        let candidate = Candidate {
            not_above: rate <= source_rate,
            rate,
            format_rank: sample_format_rank(range.sample_format()),
        };
        if best
            .as_ref()
            .map(|(b, _)| candidate.beats(b, source_rate))
            .unwrap_or(true)
        {
            best = Some((candidate, range.with_sample_rate(rate)));
        }
    }

    match best {
        Some((_, cfg)) => Ok(cfg),
        None => device
            .default_output_config()
            .context("No supported output configs"),
    }
}

/// Largest fixed buffer the device allows, capped to keep latency reasonable.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    const MAX_FRAMES: u32 = 8_192;
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed((*max).min(MAX_FRAMES).max(*min)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Print available output devices to stdout.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    not_above: bool,
    rate: u32,
    format_rank: u8,
}

impl Candidate {
    fn beats(&self, other: &Candidate, source_rate: u32) -> bool {
        let exact = self.rate == source_rate;
        let other_exact = other.rate == source_rate;
        if exact != other_exact {
            return exact;
        }
        if self.not_above != other.not_above {
            return self.not_above;
        }
        if self.rate != other.rate {
            // Below the source: closer (higher) wins. Above: closer (lower) wins.
            return if self.not_above {
                self.rate > other.rate
            } else {
                self.rate < other.rate
            };
        }
        self.format_rank < other.format_rank
    }
}

fn clamp_rate(min: u32, max: u32, target: u32) -> u32 {
    target.clamp(min, max.max(min))
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && name.to_lowercase().contains(&needle.to_lowercase())
}

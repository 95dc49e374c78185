//! Source probing and full-track decode.
//!
//! Uses Symphonia to:
//! - validate a source when it is submitted (open + probe, no decoding)
//! - decode the whole default track into interleaved `f32` during preparation

use std::fs::File;
use std::path::Path;

use anyhow::{Result, anyhow};
use focus_player::LoadError;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Metadata captured while probing the source.
#[derive(Clone, Debug, Default)]
pub struct SourceInfo {
    pub codec: Option<String>,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_ms: Option<u64>,
}

/// Decoded audio held in memory: interleaved `f32` at `rate`.
#[derive(Clone, Debug)]
pub struct PcmTrack {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub rate: u32,
}

impl PcmTrack {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

struct Probed {
    format: Box<dyn FormatReader>,
    track_id: u32,
    params: CodecParameters,
    info: SourceInfo,
}

/// Open and probe `path` without decoding.
pub fn probe_source(path: &Path) -> Result<SourceInfo, LoadError> {
    probe(path).map(|p| p.info)
}

/// Decode the default audio track of `path` into memory.
///
/// Fails once the decoded audio would exceed `max_samples` interleaved samples.
pub fn decode_track(path: &Path, max_samples: usize) -> Result<(PcmTrack, SourceInfo)> {
    let Probed {
        mut format,
        track_id,
        params,
        info,
    } = probe(path)?;

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;
    let mut samples: Vec<f32> = Vec::new();
    let file_len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let reserve = initial_reservation(&info, file_len, max_samples);
    if samples.try_reserve(reserve).is_err() {
        tracing::debug!(path = ?path, reserve, "sample pre-allocation skipped");
    }

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) if samples.is_empty() => return Err(anyhow!("read packet: {e}")),
            Err(e) => {
                tracing::warn!(path = ?path, "stopping decode early: {e}");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!("skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(anyhow!("decode: {e}")),
        };

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        if samples.len().saturating_add(buf.samples().len()) > max_samples {
            return Err(anyhow!(
                "track exceeds the in-memory limit of {max_samples} samples"
            ));
        }
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() {
        return Err(anyhow!("no audio decoded from {:?}", path));
    }

    let track = PcmTrack {
        samples,
        channels: info.channels,
        rate: info.sample_rate,
    };
    Ok((track, info))
}

fn probe(path: &Path) -> Result<Probed, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::Unsupported(format!("probe {:?}: {e}", path)))?;
    let format = probed.format;

    let track = format
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .or_else(|| {
            format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        })
        .ok_or_else(|| LoadError::Unsupported("no audio track".to_string()))?;

    let params = track.codec_params.clone();
    let track_id = track.id;
    let sample_rate = params
        .sample_rate
        .filter(|r| *r > 0)
        .ok_or_else(|| LoadError::Unsupported("unknown sample rate".to_string()))?;
    let channels = params
        .channels
        .map(|c| c.count())
        .filter(|c| *c > 0)
        .ok_or_else(|| LoadError::Unsupported("unknown channel layout".to_string()))?;

    let info = SourceInfo {
        codec: codec_name_from_params(&params),
        sample_rate,
        channels,
        duration_ms: duration_ms_from_codec_params(&params),
    };
    Ok(Probed {
        format,
        track_id,
        params,
        info,
    })
}

/// Pre-allocation hint from the header duration.
///
/// The header is untrusted: the hint never exceeds the decode ceiling, nor one
/// sample per byte of the file.
fn initial_reservation(info: &SourceInfo, file_len: u64, max_samples: usize) -> usize {
    let Some(ms) = info.duration_ms else {
        return 0;
    };
    let expected = (ms.saturating_mul(info.sample_rate as u64) / 1000)
        .saturating_mul(info.channels as u64)
        .min(file_len);
    usize::try_from(expected).unwrap_or(usize::MAX).min(max_samples)
}

/// Best-effort duration in milliseconds from codec metadata.
fn duration_ms_from_codec_params(params: &CodecParameters) -> Option<u64> {
    let frames = params.n_frames?;
    let rate = params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}

/// Codec label used in log lines.
fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}

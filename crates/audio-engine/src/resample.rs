//! Whole-track sample rate conversion.
//!
//! Uses Rubato's asynchronous sinc resampler to convert a decoded [`PcmTrack`] to the
//! output device rate in fixed input chunks. The final partial chunk is zero-padded and
//! flagged through `partial_len`; zero-length chunks then flush the filter tail, and the
//! resampler's output delay is trimmed so frame 0 lines up with the source start.

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::decode::PcmTrack;

/// Resample `track` to `dst_rate`. Returns the input unchanged when rates match.
pub fn resample_track(track: PcmTrack, dst_rate: u32, chunk_frames: usize) -> Result<PcmTrack> {
    if track.rate == dst_rate || track.frames() == 0 {
        return Ok(track);
    }
    if dst_rate == 0 {
        return Err(anyhow!("invalid output rate 0"));
    }

    let channels = track.channels;
    let f_ratio = dst_rate as f64 / track.rate as f64;

    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };

    let chunk_in_frames = chunk_frames.max(1);
    let mut resampler = Async::<f32>::new_sinc(
        f_ratio,
        1.1,
        &params,
        chunk_in_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init: {e}"))?;

    let out_cap_frames = output_capacity_frames(chunk_in_frames, f_ratio);
    let mut out_chunk = vec![0.0f32; out_cap_frames * channels];
    let mut padded = vec![0.0f32; chunk_in_frames * channels];
    let expected_frames = expected_output_frames(track.frames(), f_ratio);
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity((expected_frames + delay) * channels);

    let mut indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len: None,
    };

    for chunk in track.samples.chunks(chunk_in_frames * channels) {
        let frames = chunk.len() / channels;
        let input: &[f32] = if frames == chunk_in_frames {
            indexing.partial_len = None;
            chunk
        } else {
            padded.fill(0.0);
            padded[..chunk.len()].copy_from_slice(chunk);
            indexing.partial_len = Some(frames);
            &padded
        };

        let input_adapter = InterleavedSlice::new(input, channels, chunk_in_frames)
            .map_err(|e| anyhow!("resampler input: {e}"))?;
        let mut output_adapter = InterleavedSlice::new_mut(&mut out_chunk, channels, out_cap_frames)
            .map_err(|e| anyhow!("resampler output: {e}"))?;

        let (_nbr_in, nbr_out) = resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, Some(&indexing))
            .map_err(|e| anyhow!("resample: {e}"))?;
        out.extend_from_slice(&out_chunk[..nbr_out * channels]);
    }

    padded.fill(0.0);
    indexing.partial_len = Some(0);
    while out.len() / channels < expected_frames + delay {
        let input_adapter = InterleavedSlice::new(&padded[..], channels, chunk_in_frames)
            .map_err(|e| anyhow!("resampler input: {e}"))?;
        let mut output_adapter = InterleavedSlice::new_mut(&mut out_chunk, channels, out_cap_frames)
            .map_err(|e| anyhow!("resampler output: {e}"))?;
        let (_nbr_in, nbr_out) = resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, Some(&indexing))
            .map_err(|e| anyhow!("resample flush: {e}"))?;
        if nbr_out == 0 {
            break;
        }
        out.extend_from_slice(&out_chunk[..nbr_out * channels]);
    }

    let skip = delay.min(out.len() / channels) * channels;
    out.drain(..skip);
    out.truncate(expected_frames * channels);

    tracing::debug!(
        from_hz = track.rate,
        to_hz = dst_rate,
        frames_in = track.frames(),
        frames_out = out.len() / channels,
        "track resampled"
    );

    Ok(PcmTrack {
        samples: out,
        channels,
        rate: dst_rate,
    })
}

/// Output buffer size covering one chunk at the maximum relative ratio.
fn output_capacity_frames(chunk_in_frames: usize, f_ratio: f64) -> usize {
    (chunk_in_frames as f64 * f_ratio * 1.1).ceil() as usize + 256
}

fn expected_output_frames(frames_in: usize, f_ratio: f64) -> usize {
    (frames_in as f64 * f_ratio).ceil() as usize
}

//! Block rendering: bus recursion, resampling, channel conversion.

use tracing::warn;

use crate::effect::Listener;
use crate::error::{Error, Result};
use crate::graph::ObjectTable;
use crate::handle::ObjectId;

/// Reusable scratch blocks for the render recursion.
///
/// Each level of the bus tree needs temporary buffers; recycling them keeps
/// the render path free of steady-state allocation.
#[derive(Debug, Default)]
pub(crate) struct ScratchPool {
    free: Vec<Vec<f32>>,
}

impl ScratchPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the pool so the first blocks do not allocate.
    pub(crate) fn warm(&mut self, buffers: usize, capacity: usize) {
        while self.free.len() < buffers {
            self.free.push(Vec::with_capacity(capacity));
        }
    }

    pub(crate) fn acquire(&mut self) -> Vec<f32> {
        self.free.pop().unwrap_or_default()
    }

    pub(crate) fn release(&mut self, mut buffer: Vec<f32>) {
        buffer.clear();
        self.free.push(buffer);
    }
}

fn accumulate(out: &mut [f32], input: &[f32]) {
    for (sample, &other) in out.iter_mut().zip(input) {
        *sample += other;
    }
}

/// Renders a bus's block: the sum of its input buses and playing streams,
/// run through the bus's enabled processors in order.
///
/// A failing input is logged and skipped rather than silencing the whole
/// bus; rendering itself only fails if `id` is not a live bus.
pub(crate) fn render_bus(
    table: &mut ObjectTable,
    pool: &mut ScratchPool,
    id: ObjectId,
    frames: usize,
    channels: u32,
    sample_rate: u32,
    listener: &Listener,
    out: &mut Vec<f32>,
) -> Result<()> {
    out.clear();
    out.resize(frames * channels as usize, 0.0);

    let (input_buses, input_streams, processors) = {
        let bus = table.bus(id)?;
        (
            bus.input_buses.clone(),
            bus.input_streams.clone(),
            bus.processors.clone(),
        )
    };

    for bus_id in input_buses {
        let mut scratch = pool.acquire();
        match render_bus(
            table,
            pool,
            bus_id,
            frames,
            channels,
            sample_rate,
            listener,
            &mut scratch,
        ) {
            Ok(()) => accumulate(out, &scratch),
            Err(error) => warn!(bus = ?bus_id, %error, "skipping bus input"),
        }
        pool.release(scratch);
    }

    for stream_id in input_streams {
        let mut scratch = pool.acquire();
        match render_stream(
            table,
            pool,
            stream_id,
            frames,
            channels,
            sample_rate,
            &mut scratch,
        ) {
            Ok(true) => accumulate(out, &scratch),
            Ok(false) => {}
            Err(error) => warn!(stream = ?stream_id, %error, "skipping stream input"),
        }
        pool.release(scratch);
    }

    for processor_id in processors {
        if let Err(error) =
            table.run_processor(processor_id, frames, channels, sample_rate, listener, out)
        {
            warn!(processor = ?processor_id, %error, "skipping processor");
        }
    }

    Ok(())
}

/// Pulls one block from a stream at the mix format. Returns `Ok(false)`
/// without touching `out` when the stream is not playing.
fn render_stream(
    table: &mut ObjectTable,
    pool: &mut ScratchPool,
    id: ObjectId,
    frames: usize,
    channels: u32,
    sample_rate: u32,
    out: &mut Vec<f32>,
) -> Result<bool> {
    let (playing, source_channels, source_rate) = table.stream_format(id)?;
    if !playing {
        return Ok(false);
    }

    // Round up so the resampler never runs out of source material.
    let source_frames = if source_rate != sample_rate {
        ((frames as u64 * source_rate as u64 + sample_rate as u64 - 1) / sample_rate as u64)
            as usize
    } else {
        frames
    };

    let mut raw = pool.acquire();
    table.generate_stream(id, source_frames, &mut raw)?;

    let mut resampled = pool.acquire();
    let at_rate: &[f32] = if source_rate != sample_rate {
        resample(source_channels, source_frames, &raw, frames, &mut resampled);
        &resampled
    } else {
        &raw
    };

    let converted = convert(frames, source_channels, at_rate, channels, out);
    pool.release(resampled);
    pool.release(raw);
    converted?;
    Ok(true)
}

/// Renders an object's block: the sum of its children plus its own source.
pub(crate) fn render_object(
    table: &mut ObjectTable,
    pool: &mut ScratchPool,
    id: ObjectId,
    frames: usize,
    channels: u32,
    sample_rate: u32,
    out: &mut Vec<f32>,
) -> Result<()> {
    out.clear();
    out.resize(frames * channels as usize, 0.0);

    let children = table.object(id)?.children.clone();
    for child in children {
        let mut scratch = pool.acquire();
        match render_object(table, pool, child, frames, channels, sample_rate, &mut scratch) {
            Ok(()) => accumulate(out, &scratch),
            Err(error) => warn!(object = ?child, %error, "skipping child object"),
        }
        pool.release(scratch);
    }

    let mut scratch = pool.acquire();
    if table.generate_object_source(id, frames, channels, sample_rate, &mut scratch)? {
        accumulate(out, &scratch);
    }
    pool.release(scratch);

    Ok(())
}

/// Linear resampler over a planar block.
///
/// Interior frames are interpolated at a fixed increment; the final output
/// frame is pinned to the final source frame so block boundaries stay
/// continuous across calls.
pub(crate) fn resample(
    channels: u32,
    source_frames: usize,
    source: &[f32],
    frames: usize,
    out: &mut Vec<f32>,
) {
    let channels = channels as usize;
    out.clear();
    out.resize(frames * channels, 0.0);

    if frames == 0 || source_frames == 0 {
        return;
    }
    if source_frames == frames {
        out.copy_from_slice(&source[..frames * channels]);
        return;
    }
    if frames == 1 || source_frames == 1 {
        for channel in 0..channels {
            let last = source[channel * source_frames + source_frames - 1];
            out[channel * frames..][..frames].fill(last);
        }
        return;
    }

    let increment = (source_frames - 1) as f32 / (frames - 1) as f32;

    for channel in 0..channels {
        let input = &source[channel * source_frames..][..source_frames];
        let output = &mut out[channel * frames..][..frames];
        let mut position = 0.0f32;

        for sample in output.iter_mut().take(frames - 1) {
            let current = (position as usize).min(source_frames - 2);
            let fraction = position - current as f32;
            *sample = input[current] + (input[current + 1] - input[current]) * fraction;
            position += increment;
        }

        output[frames - 1] = input[source_frames - 1];
    }
}

/// Remaps a planar block between the supported channel layouts
/// (1 mono, 2 stereo, 4 quad, 6 surround 5.1).
pub(crate) fn convert(
    frames: usize,
    source_channels: u32,
    source: &[f32],
    channels: u32,
    out: &mut Vec<f32>,
) -> Result<()> {
    out.clear();
    out.resize(frames * channels as usize, 0.0);

    if source_channels == channels {
        out.copy_from_slice(&source[..frames * channels as usize]);
        return Ok(());
    }

    let src = |channel: usize| &source[channel * frames..][..frames];

    for frame in 0..frames {
        let at = |channel: usize| src(channel)[frame];

        match (source_channels, channels) {
            (1, 2) => {
                out[frame] = at(0);
                out[frames + frame] = at(0);
            }
            (1, 4) => {
                out[frame] = at(0);
                out[frames + frame] = at(0);
            }
            (1, 6) => {
                // Mono goes to the center channel.
                out[2 * frames + frame] = at(0);
            }
            (2, 1) => {
                out[frame] = (at(0) + at(1)) * 0.5;
            }
            (2, 4) => {
                out[frame] = at(0);
                out[frames + frame] = at(1);
            }
            (2, 6) => {
                out[frame] = at(0);
                out[frames + frame] = at(1);
            }
            (4, 1) => {
                out[frame] = (at(0) + at(1) + at(2) + at(3)) * 0.25;
            }
            (4, 2) => {
                out[frame] = (at(0) + at(2)) * 0.5;
                out[frames + frame] = (at(1) + at(3)) * 0.5;
            }
            (4, 6) => {
                out[frame] = at(0);
                out[frames + frame] = at(1);
                out[4 * frames + frame] = at(2);
                out[5 * frames + frame] = at(3);
            }
            (6, 1) => {
                out[frame] = (at(0) + at(1)) * 0.7071 + at(2) + (at(4) + at(5)) * 0.5;
            }
            (6, 2) => {
                out[frame] = at(0) + (at(2) + at(4)) * 0.7071;
                out[frames + frame] = at(1) + (at(2) + at(5)) * 0.7071;
            }
            (6, 4) => {
                out[frame] = at(0) + at(2) * 0.7071;
                out[frames + frame] = at(1) + at(2) * 0.7071;
                out[2 * frames + frame] = at(4);
                out[3 * frames + frame] = at(5);
            }
            (source_channels, target_channels) => {
                return Err(Error::UnsupportedChannelLayout {
                    source_channels,
                    target_channels,
                });
            }
        }
    }

    Ok(())
}

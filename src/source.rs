//! Sample producers: immutable data resources and their playback streams.
//!
//! A [`AudioData`] is an immutable decoded resource (channel count, sample
//! rate, content); it never mutates after construction, so any number of
//! streams may read it concurrently through shared ownership. A
//! [`StreamSource`] is one playback cursor over such a resource, owned
//! exclusively by the mixer thread.

use std::sync::Arc;

mod oscillator;
mod pcm;
mod silence;

pub use oscillator::{OscillatorData, Waveform, OSCILLATOR_SAMPLE_RATE};
pub use pcm::PcmData;
pub use silence::SilenceData;

/// Immutable decoded audio resource; factory for streams.
pub trait AudioData: Send + Sync {
    /// Channel count of the produced blocks.
    fn channels(&self) -> u32;

    /// Native sample rate of the produced blocks, in Hz.
    fn sample_rate(&self) -> u32;

    /// Create an independent playback cursor over this resource.
    fn create_stream(self: Arc<Self>) -> Box<dyn StreamSource>;
}

/// One playback cursor over an [`AudioData`].
///
/// Blocks are planar (channel-major): all of channel 0's frames, then all
/// of channel 1's, and so on.
pub trait StreamSource: Send {
    /// Rewind the cursor to the beginning.
    fn reset(&mut self);

    /// Fill `out` with exactly `frames` frames per channel, zero-padding
    /// past the end of the data.
    ///
    /// Returns `false` when the underlying data was exhausted during this
    /// block; the owning stream then stops and the source has already
    /// rewound itself. Unbounded sources always return `true`.
    fn generate(&mut self, frames: usize, out: &mut Vec<f32>) -> bool;
}

/// Sample provider embeddable in a graph [`Object`](crate::Command::InitObject)
/// node. Unlike a [`StreamSource`], it renders directly at the requested
/// output format.
pub trait Source: Send {
    fn play(&mut self);

    fn stop(&mut self, reset: bool);

    /// Fill `out` with `frames * channels` planar samples at `sample_rate`.
    fn generate(&mut self, frames: usize, channels: u32, sample_rate: u32, out: &mut Vec<f32>);
}

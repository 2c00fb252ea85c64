//! Real-time audio mixing core: a handle-addressed bus graph driven by a
//! command protocol.
//!
//! # Primary API
//!
//! - [`Mixer`] / [`MixerBuilder`]: render-side core, driven from one thread
//! - [`MixerHandle`]: thread-safe producer half (ids, commands, events)
//! - [`Audio`]: batching facade over the command protocol
//! - [`Effect`]: processor chain stages (gain, delay, reverb, pitch, panner)
//! - [`AudioData`] / [`StreamSource`]: pluggable sample sources
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use submix::{Audio, Mixer, OscillatorData, Waveform};
//!
//! # fn main() -> submix::Result<()> {
//! let (mut mixer, handle) = Mixer::builder().channels(2).build()?;
//! let mut audio = Audio::new(handle);
//!
//! let master = audio.init_bus();
//! let data = audio.init_data(Arc::new(OscillatorData::new(
//!     440.0,
//!     Waveform::Sine,
//!     0.5,
//!     0.0,
//! )));
//! let stream = audio.init_stream(data);
//! audio.set_master_bus(Some(master));
//! audio.set_stream_output(stream, Some(master));
//! audio.play_stream(stream);
//! audio.update()?;
//!
//! let mut samples = Vec::new();
//! mixer.get_samples(512, 2, 44100, &mut samples);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

mod handle;
pub use handle::ObjectId;

mod config;
pub use config::{MixerConfig, SUPPORTED_CHANNEL_COUNTS};

mod event;
pub use event::MixerEvent;

mod command;
pub use command::{Command, CommandBuffer, ProcessorUpdate};

mod effect;
pub use effect::{Delay, Effect, Gain, HighPass, Listener, LowPass, Panner, PitchScale, Reverb};

mod source;
pub use source::{
    AudioData, OscillatorData, PcmData, SilenceData, Source, StreamSource, Waveform,
    OSCILLATOR_SAMPLE_RATE,
};

mod graph;

mod mixer;
pub use mixer::{Mixer, MixerBuilder, MixerHandle};

mod audio;
pub use audio::Audio;

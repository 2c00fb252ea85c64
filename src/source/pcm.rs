//! Decoded PCM resources.

use std::sync::Arc;

use crate::error::{Error, Result};

use super::{AudioData, StreamSource};

/// Immutable block of decoded PCM samples in planar (channel-major) layout.
pub struct PcmData {
    channels: u32,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl PcmData {
    /// `samples` holds all frames of channel 0, then channel 1, and so on;
    /// its length must divide evenly by `channels`.
    pub fn new(channels: u32, sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(Error::InvalidConfig("PCM data needs at least one channel".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::InvalidConfig(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
            samples,
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

impl AudioData for PcmData {
    fn channels(&self) -> u32 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_stream(self: Arc<Self>) -> Box<dyn StreamSource> {
        Box::new(PcmStream {
            data: self,
            position: 0,
        })
    }
}

struct PcmStream {
    data: Arc<PcmData>,
    position: usize,
}

impl StreamSource for PcmStream {
    fn reset(&mut self) {
        self.position = 0;
    }

    fn generate(&mut self, frames: usize, out: &mut Vec<f32>) -> bool {
        let channels = self.data.channels as usize;
        let total = self.data.frames();
        out.clear();
        out.resize(frames * channels, 0.0);

        let available = (total - self.position).min(frames);
        for channel in 0..channels {
            let source = &self.data.samples[channel * total + self.position..][..available];
            out[channel * frames..][..available].copy_from_slice(source);
        }
        self.position += available;

        if self.position >= total {
            self.reset();
            return false;
        }
        true
    }
}

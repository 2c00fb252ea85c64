//! Silent resource, useful as a timed placeholder cue.

use std::sync::Arc;

use super::{AudioData, StreamSource};

const SILENCE_SAMPLE_RATE: u32 = 44100;

/// Mono silence of a fixed length in seconds; zero length is unbounded.
pub struct SilenceData {
    length: f32,
}

impl SilenceData {
    pub fn new(length: f32) -> Self {
        Self { length }
    }
}

impl AudioData for SilenceData {
    fn channels(&self) -> u32 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SILENCE_SAMPLE_RATE
    }

    fn create_stream(self: Arc<Self>) -> Box<dyn StreamSource> {
        Box::new(SilenceStream {
            data: self,
            position: 0,
        })
    }
}

struct SilenceStream {
    data: Arc<SilenceData>,
    position: u32,
}

impl StreamSource for SilenceStream {
    fn reset(&mut self) {
        self.position = 0;
    }

    fn generate(&mut self, frames: usize, out: &mut Vec<f32>) -> bool {
        out.clear();
        out.resize(frames, 0.0);

        if self.data.length <= 0.0 {
            return true;
        }

        let total = (self.data.length * SILENCE_SAMPLE_RATE as f32) as u32;
        self.position = (self.position + frames as u32).min(total);
        if self.position >= total {
            self.reset();
            return false;
        }
        true
    }
}

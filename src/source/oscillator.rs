//! Procedural waveform generator.

use std::f32::consts::TAU;
use std::sync::Arc;

use super::{AudioData, StreamSource};

/// Native rate oscillators and silence generate at; the mixer resamples
/// from here to the output rate.
pub const OSCILLATOR_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Mono oscillator resource.
///
/// `length` is in seconds; a zero length produces an unbounded stream that
/// loops forever and never reports exhaustion. This is the one
/// contract-level exception to one-shot playback.
pub struct OscillatorData {
    frequency: f32,
    waveform: Waveform,
    amplitude: f32,
    length: f32,
}

impl OscillatorData {
    pub fn new(frequency: f32, waveform: Waveform, amplitude: f32, length: f32) -> Self {
        Self {
            frequency,
            waveform,
            amplitude,
            length,
        }
    }
}

impl AudioData for OscillatorData {
    fn channels(&self) -> u32 {
        1
    }

    fn sample_rate(&self) -> u32 {
        OSCILLATOR_SAMPLE_RATE
    }

    fn create_stream(self: Arc<Self>) -> Box<dyn StreamSource> {
        Box::new(OscillatorStream {
            data: self,
            position: 0,
        })
    }
}

struct OscillatorStream {
    data: Arc<OscillatorData>,
    position: u32,
}

fn generate_wave(
    waveform: Waveform,
    frames: usize,
    offset: u32,
    frame_length: f32,
    amplitude: f32,
    out: &mut [f32],
) {
    for (i, sample) in out.iter_mut().take(frames).enumerate() {
        let t = (offset + i as u32) as f32 * frame_length;

        *sample = amplitude
            * match waveform {
                Waveform::Sine => (t * TAU).sin(),
                Waveform::Square => (t * 2.0 + 0.5).round() % 2.0 * 2.0 - 1.0,
                Waveform::Sawtooth => (t + 0.5) % 1.0 * 2.0 - 1.0,
                Waveform::Triangle => ((t + 0.75) % 1.0 * 2.0 - 1.0).abs() * 2.0 - 1.0,
            };
    }
}

impl StreamSource for OscillatorStream {
    fn reset(&mut self) {
        self.position = 0;
    }

    fn generate(&mut self, frames: usize, out: &mut Vec<f32>) -> bool {
        out.clear();
        out.resize(frames, 0.0);

        let frame_length = self.data.frequency / OSCILLATOR_SAMPLE_RATE as f32;

        if self.data.length <= 0.0 {
            generate_wave(
                self.data.waveform,
                frames,
                self.position,
                frame_length,
                self.data.amplitude,
                out,
            );
            self.position = self.position.wrapping_add(frames as u32);
            return true;
        }

        let total = (self.data.length * OSCILLATOR_SAMPLE_RATE as f32) as u32;
        let available = (total - self.position).min(frames as u32) as usize;
        generate_wave(
            self.data.waveform,
            available,
            self.position,
            frame_length,
            self.data.amplitude,
            out,
        );
        self.position += available as u32;

        if self.position >= total {
            self.reset();
            return false;
        }
        true
    }
}

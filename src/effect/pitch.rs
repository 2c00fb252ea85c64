//! Pitch scaling over a fixed-window overlap-add primitive.

use std::f32::consts::TAU;

pub(crate) const MIN_PITCH_SCALE: f32 = 0.5;
pub(crate) const MAX_PITCH_SCALE: f32 = 2.0;

const WINDOW_SIZE: usize = 1024;
const HOP_SIZE: usize = WINDOW_SIZE / 2;

/// Scales pitch without changing duration; one [`PitchShifter`] per channel.
///
/// The scale is clamped to [0.5, 2.0] (one octave either way).
#[derive(Debug, Clone)]
pub struct PitchScale {
    scale: f32,
    shifters: Vec<PitchShifter>,
}

impl Default for PitchScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PitchScale {
    pub fn new(scale: f32) -> Self {
        Self {
            scale: scale.clamp(MIN_PITCH_SCALE, MAX_PITCH_SCALE),
            shifters: Vec::new(),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(MIN_PITCH_SCALE, MAX_PITCH_SCALE);
    }

    pub(crate) fn process(&mut self, frames: usize, channels: u32, samples: &mut [f32]) {
        self.shifters
            .resize_with(channels as usize, PitchShifter::new);

        for (channel, shifter) in self.shifters.iter_mut().enumerate() {
            shifter.process(self.scale, &mut samples[channel * frames..][..frames]);
        }
    }
}

/// Fixed-window pitch-shift primitive.
///
/// Grains of `WINDOW_SIZE` samples are read from the input at the scaled
/// rate, Hann-windowed, and overlap-added at the unscaled hop, preserving
/// duration while shifting pitch. 50% overlap with a periodic Hann window
/// sums to unity, so a scale of 1.0 is the identity once the window has
/// filled (the primitive has a fixed start-up latency of under one window).
#[derive(Debug, Clone)]
pub(crate) struct PitchShifter {
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<f32>,
    out_write: usize,
}

impl PitchShifter {
    pub(crate) fn new() -> Self {
        let window = (0..WINDOW_SIZE)
            .map(|i| 0.5 * (1.0 - (TAU * i as f32 / WINDOW_SIZE as f32).cos()))
            .collect();
        Self {
            window,
            input: Vec::new(),
            output: Vec::new(),
            out_write: 0,
        }
    }

    pub(crate) fn process(&mut self, scale: f32, block: &mut [f32]) {
        self.input.extend_from_slice(block);

        // Lookahead one grain needs at the scaled read rate.
        let need = ((WINDOW_SIZE - 1) as f32 * scale).ceil() as usize + 2;

        while self.input.len() >= need {
            if self.output.len() < self.out_write + WINDOW_SIZE {
                self.output.resize(self.out_write + WINDOW_SIZE, 0.0);
            }

            for i in 0..WINDOW_SIZE {
                let pos = i as f32 * scale;
                let index = pos as usize;
                let frac = pos - index as f32;
                let a = self.input[index];
                let b = self.input[(index + 1).min(self.input.len() - 1)];
                self.output[self.out_write + i] += (a + (b - a) * frac) * self.window[i];
            }

            self.input.drain(..HOP_SIZE);
            self.out_write += HOP_SIZE;
        }

        // Samples before the next grain start are final; emit them, padding
        // with silence while the first window fills.
        let ready = self.out_write.min(block.len());
        block[..ready].copy_from_slice(&self.output[..ready]);
        block[ready..].fill(0.0);
        self.output.drain(..ready);
        self.out_write -= ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_blocks(shifter: &mut PitchShifter, scale: f32, input: &[f32], block: usize) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in input.chunks(block) {
            let mut buffer = chunk.to_vec();
            shifter.process(scale, &mut buffer);
            out.extend_from_slice(&buffer);
        }
        out
    }

    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
            .count()
    }

    #[test]
    fn test_unity_scale_passes_dc_through() {
        let mut shifter = PitchShifter::new();
        let input = vec![1.0f32; WINDOW_SIZE * 8];
        let out = run_blocks(&mut shifter, 1.0, &input, 256);

        // Past the start-up window, unity scale reproduces the signal.
        for &sample in &out[WINDOW_SIZE * 2..WINDOW_SIZE * 6] {
            assert!((sample - 1.0).abs() < 1e-3, "got {sample}");
        }
    }

    #[test]
    fn test_output_stays_bounded() {
        let mut shifter = PitchShifter::new();
        let input: Vec<f32> = (0..WINDOW_SIZE * 8)
            .map(|i| (TAU * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let out = run_blocks(&mut shifter, 1.5, &input, 512);
        assert!(out.iter().all(|s| s.abs() <= 1.01));
    }

    #[test]
    fn test_doubling_scale_doubles_frequency() {
        let mut shifter = PitchShifter::new();
        let input: Vec<f32> = (0..WINDOW_SIZE * 16)
            .map(|i| (TAU * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        let out = run_blocks(&mut shifter, 2.0, &input, 512);

        // Compare steady-state zero-crossing rates over the same span.
        let span = WINDOW_SIZE * 4..WINDOW_SIZE * 12;
        let source = zero_crossings(&input[span.clone()]) as f32;
        let shifted = zero_crossings(&out[span]) as f32;
        // Grain boundaries add phase jumps, so the rate is only roughly 2x.
        assert!(
            shifted > source * 1.5 && shifted < source * 2.5,
            "expected ~2x crossings, source {source}, shifted {shifted}"
        );
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut effect = PitchScale::new(5.0);
        assert_eq!(effect.scale(), MAX_PITCH_SCALE);
        effect.set_scale(0.1);
        assert_eq!(effect.scale(), MIN_PITCH_SCALE);
    }

}

//! Pure delay line.

/// Shifts samples through a per-channel buffer of `delay * sample_rate`
/// frames. Output for the first `delay` seconds is silence while the line
/// fills.
#[derive(Debug, Clone, Default)]
pub struct Delay {
    seconds: f32,
    lines: Vec<Vec<f32>>,
}

impl Delay {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds,
            lines: Vec::new(),
        }
    }

    pub fn delay_seconds(&self) -> f32 {
        self.seconds
    }

    pub fn set_delay(&mut self, seconds: f32) {
        self.seconds = seconds;
    }

    pub(crate) fn process(&mut self, frames: usize, channels: u32, sample_rate: u32, samples: &mut [f32]) {
        let delay_frames = (self.seconds * sample_rate as f32) as usize;
        let line_frames = frames + delay_frames;

        self.lines.resize(channels as usize, Vec::new());

        for (channel, line) in self.lines.iter_mut().enumerate() {
            line.resize(line_frames, 0.0);
            let block = &mut samples[channel * frames..][..frames];

            for (frame, sample) in block.iter().enumerate() {
                line[frame + delay_frames] += sample;
            }
            for (frame, sample) in block.iter_mut().enumerate() {
                *sample = line[frame];
            }
            line.drain(..frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_emerges_after_delay() {
        // 2 frames of delay at 4 Hz.
        let mut delay = Delay::new(0.5);
        let mut block = vec![1.0, 0.0, 0.0, 0.0];
        delay.process(4, 1, 4, &mut block);
        assert_eq!(block, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_delay_crosses_block_boundaries() {
        // 3 frames of delay, 2-frame blocks.
        let mut delay = Delay::new(0.75);
        let mut block = vec![1.0, 0.0];
        delay.process(2, 1, 4, &mut block);
        assert_eq!(block, vec![0.0, 0.0]);

        let mut block = vec![0.0, 0.0];
        delay.process(2, 1, 4, &mut block);
        assert_eq!(block, vec![0.0, 1.0]);
    }

    #[test]
    fn test_channels_delay_independently() {
        let mut delay = Delay::new(0.25);
        // Planar stereo: left impulse on frame 0, right impulse on frame 1.
        let mut block = vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        delay.process(4, 2, 4, &mut block);
        assert_eq!(block, vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_zero_delay_is_identity() {
        let mut delay = Delay::new(0.0);
        let mut block = vec![0.1, 0.2, 0.3];
        delay.process(3, 1, 44100, &mut block);
        assert_eq!(block, vec![0.1, 0.2, 0.3]);
    }
}

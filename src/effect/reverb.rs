//! Single-tap feedback reverb.

/// Feeds a decayed copy of the signal back onto itself `delay` seconds
/// later. Each pass through the loop multiplies by `decay`, so the tail
/// fades geometrically; `decay` must stay below 1.0 to converge.
#[derive(Debug, Clone)]
pub struct Reverb {
    delay: f32,
    decay: f32,
    lines: Vec<Vec<f32>>,
}

impl Reverb {
    pub fn new(delay: f32, decay: f32) -> Self {
        Self {
            delay,
            decay,
            lines: Vec::new(),
        }
    }

    pub fn set_delay(&mut self, delay: f32) {
        self.delay = delay;
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay = decay;
    }

    pub(crate) fn process(&mut self, frames: usize, channels: u32, sample_rate: u32, samples: &mut [f32]) {
        let delay_frames = (self.delay * sample_rate as f32) as usize;
        let line_frames = frames + delay_frames;

        self.lines.resize(channels as usize, Vec::new());

        for (channel, line) in self.lines.iter_mut().enumerate() {
            line.resize(line_frames, 0.0);
            let block = &mut samples[channel * frames..][..frames];

            for (frame, sample) in block.iter().enumerate() {
                line[frame] += sample;
            }
            for frame in 0..frames {
                line[frame + delay_frames] += line[frame] * self.decay;
            }
            for (frame, sample) in block.iter_mut().enumerate() {
                *sample = line[frame];
            }
            line.drain(..frames);
        }
    }
}

//! Effects applied along a bus's processor chain.

mod delay;
mod filter;
mod gain;
mod panner;
mod pitch;
mod reverb;

pub use delay::Delay;
pub use filter::{HighPass, LowPass};
pub use gain::Gain;
pub use panner::{Listener, Panner};
pub use pitch::PitchScale;
pub use reverb::Reverb;

use crate::command::ProcessorUpdate;
use crate::error::{Error, Result};

/// A processor's DSP stage. Every variant transforms a planar block in
/// place; state between blocks lives inside the variant.
#[derive(Debug, Clone)]
pub enum Effect {
    Gain(Gain),
    Delay(Delay),
    Reverb(Reverb),
    PitchScale(PitchScale),
    Panner(Panner),
    LowPass(LowPass),
    HighPass(HighPass),
}

impl Effect {
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Gain(_) => "gain",
            Effect::Delay(_) => "delay",
            Effect::Reverb(_) => "reverb",
            Effect::PitchScale(_) => "pitch-scale",
            Effect::Panner(_) => "panner",
            Effect::LowPass(_) => "low-pass",
            Effect::HighPass(_) => "high-pass",
        }
    }

    pub(crate) fn process(
        &mut self,
        frames: usize,
        channels: u32,
        sample_rate: u32,
        listener: &Listener,
        samples: &mut [f32],
    ) {
        match self {
            Effect::Gain(gain) => gain.process(samples),
            Effect::Delay(delay) => delay.process(frames, channels, sample_rate, samples),
            Effect::Reverb(reverb) => reverb.process(frames, channels, sample_rate, samples),
            Effect::PitchScale(pitch) => pitch.process(frames, channels, samples),
            Effect::Panner(panner) => panner.process(listener, samples),
            // Filter stubs pass audio through unchanged.
            Effect::LowPass(_) | Effect::HighPass(_) => {}
        }
    }

    /// Applies a parameter change. The enabled flag is owned by the
    /// processor slot, so `SetEnabled` never reaches here; a parameter
    /// aimed at a different effect kind is a `TypeMismatch`.
    pub(crate) fn apply(&mut self, update: ProcessorUpdate) -> Result<()> {
        match (self, update) {
            (_, ProcessorUpdate::SetEnabled(_)) => Ok(()),
            (Effect::Gain(gain), ProcessorUpdate::SetGain { db }) => {
                gain.set_gain(db);
                Ok(())
            }
            (Effect::Delay(delay), ProcessorUpdate::SetDelay { seconds }) => {
                delay.set_delay(seconds);
                Ok(())
            }
            (
                Effect::Reverb(reverb),
                ProcessorUpdate::SetReverb {
                    delay_seconds,
                    decay,
                },
            ) => {
                reverb.set_delay(delay_seconds);
                reverb.set_decay(decay);
                Ok(())
            }
            (Effect::PitchScale(pitch), ProcessorUpdate::SetPitchScale { scale }) => {
                pitch.set_scale(scale);
                Ok(())
            }
            (Effect::Panner(panner), ProcessorUpdate::SetPannerPosition { position }) => {
                panner.set_position(position);
                Ok(())
            }
            (Effect::Panner(panner), ProcessorUpdate::SetPannerRolloff { factor }) => {
                panner.set_rolloff_factor(factor);
                Ok(())
            }
            (Effect::Panner(panner), ProcessorUpdate::SetPannerMinDistance { distance }) => {
                panner.set_min_distance(distance);
                Ok(())
            }
            (Effect::Panner(panner), ProcessorUpdate::SetPannerMaxDistance { distance }) => {
                panner.set_max_distance(distance);
                Ok(())
            }
            (effect @ (Effect::LowPass(_) | Effect::HighPass(_)), _) => {
                Err(Error::NotImplemented(effect.kind()))
            }
            (effect, update) => Err(Error::TypeMismatch {
                expected: update.target_kind(),
                found: effect.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_routed_to_matching_effect() {
        let mut effect = Effect::Gain(Gain::new(0.0));
        effect
            .apply(ProcessorUpdate::SetGain { db: -6.0 })
            .expect("gain update should apply");
    }

    #[test]
    fn test_mismatched_update_is_rejected() {
        let mut effect = Effect::Gain(Gain::new(0.0));
        let err = effect
            .apply(ProcessorUpdate::SetDelay { seconds: 0.1 })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "delay",
                found: "gain",
            }
        ));
    }

    #[test]
    fn test_filter_stub_reports_not_implemented() {
        let mut effect = Effect::LowPass(LowPass);
        let err = effect
            .apply(ProcessorUpdate::SetGain { db: 0.0 })
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented("low-pass")));
    }

    #[test]
    fn test_filter_stub_passes_audio_through() {
        let mut effect = Effect::HighPass(HighPass);
        let mut samples = vec![0.25f32; 8];
        effect.process(4, 2, 44100, &Listener::default(), &mut samples);
        assert!(samples.iter().all(|&s| s == 0.25));
    }
}

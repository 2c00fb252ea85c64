//! Decibel gain.

/// Scales every sample by `10^(dB/20)`.
#[derive(Debug, Clone)]
pub struct Gain {
    db: f32,
    factor: f32,
}

impl Gain {
    pub fn new(db: f32) -> Self {
        Self {
            db,
            factor: db_to_factor(db),
        }
    }

    pub fn gain_db(&self) -> f32 {
        self.db
    }

    pub fn set_gain(&mut self, db: f32) {
        self.db = db;
        self.factor = db_to_factor(db);
    }

    pub(crate) fn process(&mut self, samples: &mut [f32]) {
        for sample in samples {
            *sample *= self.factor;
        }
    }
}

fn db_to_factor(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gain_scales_by_exact_factor() {
        let mut gain = Gain::new(6.0);
        let mut samples = vec![0.5, -0.25, 1.0];
        gain.process(&mut samples);

        let factor = 10.0f32.powf(6.0 / 20.0);
        assert_relative_eq!(samples[0], 0.5 * factor);
        assert_relative_eq!(samples[1], -0.25 * factor);
        assert_relative_eq!(samples[2], factor);
    }

    #[test]
    fn test_zero_db_is_identity() {
        let mut gain = Gain::new(0.0);
        let mut samples = vec![0.3, -0.7];
        gain.process(&mut samples);
        assert_relative_eq!(samples[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(samples[1], -0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_gain_attenuates() {
        let mut gain = Gain::new(-20.0);
        let mut samples = vec![1.0];
        gain.process(&mut samples);
        assert_relative_eq!(samples[0], 0.1, epsilon = 1e-6);
    }
}

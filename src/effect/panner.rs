//! Distance attenuation for positioned sources.

/// Listening point the mixer attenuates against.
///
/// The mixer renders against a default listener at the origin; the rotation
/// is carried for orientation-aware panning models.
#[derive(Debug, Clone, Copy)]
pub struct Listener {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Attenuates a signal by its distance from the listener.
///
/// Uses the inverse-distance-clamped model: full volume inside
/// `min_distance`, rolled off by `rolloff_factor` out to `max_distance`,
/// and held constant beyond it. The gain applies equally to every channel.
#[derive(Debug, Clone)]
pub struct Panner {
    position: [f32; 3],
    rolloff_factor: f32,
    min_distance: f32,
    max_distance: f32,
}

impl Default for Panner {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rolloff_factor: 1.0,
            min_distance: 1.0,
            max_distance: f32::MAX,
        }
    }
}

impl Panner {
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    pub fn set_position(&mut self, position: [f32; 3]) {
        self.position = position;
    }

    pub fn set_rolloff_factor(&mut self, factor: f32) {
        self.rolloff_factor = factor.max(0.0);
    }

    pub fn set_min_distance(&mut self, distance: f32) {
        self.min_distance = distance.max(0.0);
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance.max(0.0);
    }

    fn gain(&self, listener: &Listener) -> f32 {
        let dx = self.position[0] - listener.position[0];
        let dy = self.position[1] - listener.position[1];
        let dz = self.position[2] - listener.position[2];
        // The two distances are set independently, so the range may be
        // momentarily inverted; collapse it rather than panic mid-render.
        let max_distance = self.max_distance.max(self.min_distance);
        let distance = (dx * dx + dy * dy + dz * dz)
            .sqrt()
            .clamp(self.min_distance, max_distance);
        self.min_distance / (self.min_distance + self.rolloff_factor * (distance - self.min_distance))
    }

    pub(crate) fn process(&mut self, listener: &Listener, samples: &mut [f32]) {
        let gain = self.gain(listener);
        for sample in samples {
            *sample *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_source_at_listener_is_unattenuated() {
        let mut panner = Panner::default();
        let mut samples = vec![0.5f32; 8];
        panner.process(&Listener::default(), &mut samples);
        assert!(samples.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_inside_min_distance_is_full_volume() {
        let mut panner = Panner::new([0.5, 0.0, 0.0]);
        let mut samples = vec![1.0f32; 4];
        panner.process(&Listener::default(), &mut samples);
        assert!(samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_gain_halves_at_twice_min_distance() {
        // d = 2, min = 1, rolloff = 1: 1 / (1 + (2 - 1)) = 0.5.
        let mut panner = Panner::new([2.0, 0.0, 0.0]);
        let mut samples = vec![1.0f32; 4];
        panner.process(&Listener::default(), &mut samples);
        for &sample in &samples {
            assert_relative_eq!(sample, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_max_distance_caps_attenuation() {
        let mut panner = Panner::new([100.0, 0.0, 0.0]);
        panner.set_max_distance(3.0);
        let mut far = vec![1.0f32; 1];
        panner.process(&Listener::default(), &mut far);

        let mut panner_at_cap = Panner::new([3.0, 0.0, 0.0]);
        let mut at_cap = vec![1.0f32; 1];
        panner_at_cap.process(&Listener::default(), &mut at_cap);

        assert_relative_eq!(far[0], at_cap[0], epsilon = 1e-6);
    }

    #[test]
    fn test_max_distance_below_min_collapses_the_range() {
        // min stays at the default 1.0, max drops below it.
        let mut panner = Panner::new([100.0, 0.0, 0.0]);
        panner.set_max_distance(0.5);
        let mut samples = vec![1.0f32; 4];
        panner.process(&Listener::default(), &mut samples);
        // Distance clamps to min, so the source plays at full volume.
        assert!(samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_listener_offset_changes_distance() {
        let mut panner = Panner::new([4.0, 0.0, 0.0]);
        let listener = Listener {
            position: [3.0, 0.0, 0.0],
            ..Listener::default()
        };
        let mut samples = vec![1.0f32; 2];
        panner.process(&listener, &mut samples);
        // Effective distance 1 = min_distance, so no attenuation.
        assert!(samples.iter().all(|&s| s == 1.0));
    }
}

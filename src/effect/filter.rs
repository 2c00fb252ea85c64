//! Frequency filter placeholders.

/// Low-pass filter. Passes audio through unchanged for now; attempting to
/// configure it reports [`crate::Error::NotImplemented`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPass;

/// High-pass filter. Same placeholder status as [`LowPass`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HighPass;

//! Mixer configuration.

use crate::error::{Error, Result};

/// Channel layouts the conversion table understands.
pub const SUPPORTED_CHANNEL_COUNTS: [u32; 4] = [1, 2, 4, 6];

/// Output format negotiated with the platform backend.
///
/// Validated once at [`Mixer`](crate::Mixer) construction; an invalid
/// configuration fails fast instead of surfacing later on the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerConfig {
    /// Output channel count. Must be one of [`SUPPORTED_CHANNEL_COUNTS`].
    pub channels: u32,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Nominal frames per render block; used to pre-warm scratch buffers.
    pub buffer_frames: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            buffer_frames: 512,
        }
    }
}

impl MixerConfig {
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_CHANNEL_COUNTS.contains(&self.channels) {
            return Err(Error::InvalidConfig(format!(
                "unsupported channel count {}, expected one of {:?}",
                self.channels, SUPPORTED_CHANNEL_COUNTS
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be non-zero".into()));
        }
        if self.buffer_frames == 0 {
            return Err(Error::InvalidConfig("buffer size must be non-zero".into()));
        }
        Ok(())
    }
}

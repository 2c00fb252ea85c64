//! Lifecycle events emitted by the mixer thread.

use crate::handle::ObjectId;

/// A stream state transition observed on the mixer thread.
///
/// Events are produced while commands are applied and while blocks are
/// rendered, and travel back to the control side over a channel; drain them
/// with [`MixerHandle::poll_events`](crate::MixerHandle::poll_events) or
/// [`Audio::poll_events`](crate::Audio::poll_events).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerEvent {
    /// A stream began playing.
    StreamStarted { stream: ObjectId },
    /// A stream stopped, either by command or by running out of data.
    StreamStopped { stream: ObjectId },
    /// A stream exhausted its data and rewound itself.
    StreamReset { stream: ObjectId },
}

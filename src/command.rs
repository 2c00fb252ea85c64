//! Command protocol between frontend handles and the mixer thread.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::effect::Effect;
use crate::handle::ObjectId;
use crate::source::{AudioData, Source};

/// One mutation of the mixer's object graph.
///
/// Commands are built on the frontend, batched into a [`CommandBuffer`],
/// and applied in order on the mixer thread. Every variant is a plain
/// description of the change; no callable state crosses the channel.
pub enum Command {
    InitObject {
        id: ObjectId,
        source: Option<Box<dyn Source>>,
    },
    DeleteObject {
        id: ObjectId,
    },
    AddChild {
        parent: ObjectId,
        child: ObjectId,
    },
    RemoveChild {
        parent: ObjectId,
        child: ObjectId,
    },
    Play {
        id: ObjectId,
    },
    Stop {
        id: ObjectId,
        reset: bool,
    },
    InitBus {
        id: ObjectId,
    },
    SetBusOutput {
        id: ObjectId,
        output: Option<ObjectId>,
    },
    AddProcessor {
        bus: ObjectId,
        processor: ObjectId,
    },
    RemoveProcessor {
        bus: ObjectId,
        processor: ObjectId,
    },
    SetMasterBus {
        id: Option<ObjectId>,
    },
    InitStream {
        id: ObjectId,
        data: ObjectId,
    },
    PlayStream {
        id: ObjectId,
    },
    StopStream {
        id: ObjectId,
        reset: bool,
    },
    SetStreamOutput {
        id: ObjectId,
        output: Option<ObjectId>,
    },
    InitData {
        id: ObjectId,
        data: Arc<dyn AudioData>,
    },
    InitProcessor {
        id: ObjectId,
        effect: Effect,
    },
    UpdateProcessor {
        id: ObjectId,
        update: ProcessorUpdate,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitObject { .. } => "init_object",
            Command::DeleteObject { .. } => "delete_object",
            Command::AddChild { .. } => "add_child",
            Command::RemoveChild { .. } => "remove_child",
            Command::Play { .. } => "play",
            Command::Stop { .. } => "stop",
            Command::InitBus { .. } => "init_bus",
            Command::SetBusOutput { .. } => "set_bus_output",
            Command::AddProcessor { .. } => "add_processor",
            Command::RemoveProcessor { .. } => "remove_processor",
            Command::SetMasterBus { .. } => "set_master_bus",
            Command::InitStream { .. } => "init_stream",
            Command::PlayStream { .. } => "play_stream",
            Command::StopStream { .. } => "stop_stream",
            Command::SetStreamOutput { .. } => "set_stream_output",
            Command::InitData { .. } => "init_data",
            Command::InitProcessor { .. } => "init_processor",
            Command::UpdateProcessor { .. } => "update_processor",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enumerated parameter change for a live processor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessorUpdate {
    SetEnabled(bool),
    SetGain { db: f32 },
    SetDelay { seconds: f32 },
    SetReverb { delay_seconds: f32, decay: f32 },
    SetPitchScale { scale: f32 },
    SetPannerPosition { position: [f32; 3] },
    SetPannerRolloff { factor: f32 },
    SetPannerMinDistance { distance: f32 },
    SetPannerMaxDistance { distance: f32 },
}

impl ProcessorUpdate {
    /// Effect kind this update is meant for, used in mismatch errors.
    pub(crate) fn target_kind(&self) -> &'static str {
        match self {
            ProcessorUpdate::SetEnabled(_) => "any",
            ProcessorUpdate::SetGain { .. } => "gain",
            ProcessorUpdate::SetDelay { .. } => "delay",
            ProcessorUpdate::SetReverb { .. } => "reverb",
            ProcessorUpdate::SetPitchScale { .. } => "pitch-scale",
            ProcessorUpdate::SetPannerPosition { .. }
            | ProcessorUpdate::SetPannerRolloff { .. }
            | ProcessorUpdate::SetPannerMinDistance { .. }
            | ProcessorUpdate::SetPannerMaxDistance { .. } => "panner",
        }
    }
}

/// Ordered batch of commands submitted atomically to the mixer.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    name: Option<String>,
    commands: VecDeque<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A labeled buffer; the label shows up in apply-failure logs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            commands: VecDeque::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.commands.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::IdAllocator;

    #[test]
    fn test_buffer_preserves_order() {
        let ids = IdAllocator::new();
        let first = ids.allocate();
        let second = ids.allocate();

        let mut buffer = CommandBuffer::named("setup");
        buffer.push(Command::InitBus { id: first });
        buffer.push(Command::InitBus { id: second });
        assert_eq!(buffer.len(), 2);

        let drained: Vec<_> = buffer.drain().collect();
        assert!(matches!(drained[0], Command::InitBus { id } if id == first));
        assert!(matches!(drained[1], Command::InitBus { id } if id == second));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_command_names_are_stable() {
        let ids = IdAllocator::new();
        let id = ids.allocate();
        assert_eq!(Command::Play { id }.name(), "play");
        assert_eq!(Command::SetMasterBus { id: None }.name(), "set_master_bus");
    }
}

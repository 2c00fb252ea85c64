//! The mixer core and the frontend handle that drives it.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::command::{Command, CommandBuffer};
use crate::config::MixerConfig;
use crate::effect::Listener;
use crate::error::{Error, Result};
use crate::event::MixerEvent;
use crate::graph::render::{render_bus, ScratchPool};
use crate::graph::{Node, ObjectNode, ObjectTable, ProcessorNode, StreamNode};
use crate::handle::{IdAllocator, ObjectId};

const SCRATCH_BUFFERS: usize = 8;

/// The render-side half of the mixer.
///
/// Owns the object graph and is driven from a single thread, typically an
/// audio backend's render callback: [`get_samples`](Mixer::get_samples)
/// drains pending command buffers, renders one block from the master bus,
/// and clamps the result. The render path takes no locks; sample blocks
/// are recycled through a scratch pool, though small bookkeeping
/// allocations (cloned input id lists, log labels) remain.
pub struct Mixer {
    config: MixerConfig,
    commands: Receiver<CommandBuffer>,
    events: Sender<MixerEvent>,
    table: ObjectTable,
    pool: ScratchPool,
    root: ObjectId,
    listener: Listener,
}

impl Mixer {
    pub fn builder() -> MixerBuilder {
        MixerBuilder::default()
    }

    /// Creates a mixer pair from a validated config. The graph starts with
    /// a single root object and no master bus, so blocks render silent
    /// until the frontend wires one up.
    pub fn new(config: MixerConfig) -> Result<(Mixer, MixerHandle)> {
        config.validate()?;

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let ids = Arc::new(IdAllocator::new());
        let root = ids.allocate();

        let mut table = ObjectTable::new();
        table.insert(root, Node::Object(ObjectNode::default()))?;

        let mut pool = ScratchPool::new();
        pool.warm(
            SCRATCH_BUFFERS,
            config.buffer_frames as usize * config.channels as usize,
        );

        let mixer = Mixer {
            config,
            commands: command_rx,
            events: event_tx,
            table,
            pool,
            root,
            listener: Listener::default(),
        };
        let handle = MixerHandle {
            ids,
            commands: command_tx,
            events: event_rx,
            root,
        };
        Ok((mixer, handle))
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Root object the frontend may parent sourced objects under.
    pub fn root_object(&self) -> ObjectId {
        self.root
    }

    /// Applies every command buffer submitted since the last call.
    ///
    /// A command that fails is logged and skipped; the rest of its buffer
    /// still applies.
    pub fn process(&mut self) {
        while let Ok(mut buffer) = self.commands.try_recv() {
            let label = buffer.name().unwrap_or("unnamed").to_owned();
            debug!(buffer = %label, commands = buffer.len(), "applying command buffer");
            for command in buffer.drain() {
                let name = command.name();
                if let Err(error) = self.apply(command) {
                    warn!(buffer = %label, command = name, %error, "command failed");
                }
            }
        }
        self.flush_events();
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::InitObject { id, source } => self.table.insert(
                id,
                Node::Object(ObjectNode {
                    parent: None,
                    children: Vec::new(),
                    source,
                }),
            ),
            Command::DeleteObject { id } => self.table.remove(id),
            Command::AddChild { parent, child } => self.table.add_child(parent, child),
            Command::RemoveChild { parent, child } => self.table.remove_child(parent, child),
            Command::Play { id } => self.table.play_object(id),
            Command::Stop { id, reset } => self.table.stop_object(id, reset),
            Command::InitBus { id } => self.table.insert(id, Node::Bus(Default::default())),
            Command::SetBusOutput { id, output } => self.table.set_bus_output(id, output),
            Command::AddProcessor { bus, processor } => self.table.add_processor(bus, processor),
            Command::RemoveProcessor { bus, processor } => {
                self.table.remove_processor(bus, processor)
            }
            Command::SetMasterBus { id } => self.table.set_master(id),
            Command::InitStream { id, data } => {
                let data = self.table.data(data)?;
                let channels = data.channels();
                let sample_rate = data.sample_rate();
                let source = data.create_stream();
                self.table.insert(
                    id,
                    Node::Stream(StreamNode {
                        output: None,
                        source,
                        channels,
                        sample_rate,
                        playing: false,
                    }),
                )
            }
            Command::PlayStream { id } => self.table.play_stream(id),
            Command::StopStream { id, reset } => self.table.stop_stream(id, reset),
            Command::SetStreamOutput { id, output } => self.table.set_stream_output(id, output),
            Command::InitData { id, data } => self.table.insert(id, Node::Data(data)),
            Command::InitProcessor { id, effect } => self.table.insert(
                id,
                Node::Processor(ProcessorNode {
                    bus: None,
                    enabled: true,
                    effect,
                }),
            ),
            Command::UpdateProcessor { id, update } => self.table.update_processor(id, update),
        }
    }

    /// Renders one block at the requested format into `samples`.
    ///
    /// Pending commands are applied first, then the master bus tree is
    /// rendered and hard-clamped to [-1, 1]. Without a master bus the
    /// block is silence.
    pub fn get_samples(
        &mut self,
        frames: usize,
        channels: u32,
        sample_rate: u32,
        samples: &mut Vec<f32>,
    ) {
        self.process();

        samples.clear();
        samples.resize(frames * channels as usize, 0.0);

        if let Some(master) = self.table.master() {
            if let Err(error) = render_bus(
                &mut self.table,
                &mut self.pool,
                master,
                frames,
                channels,
                sample_rate,
                &self.listener,
                samples,
            ) {
                warn!(%error, "master bus failed to render");
                samples.clear();
                samples.resize(frames * channels as usize, 0.0);
            }
        }

        for sample in samples.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.flush_events();
    }

    fn flush_events(&mut self) {
        for event in self.table.take_events() {
            // The frontend may already be gone during shutdown.
            let _ = self.events.send(event);
        }
    }
}

/// The producer-side half of the mixer. Cheap to clone; safe to use from
/// any thread.
///
/// Handles allocate [`ObjectId`]s eagerly so a whole graph can be described
/// in one [`CommandBuffer`] before the mixer has seen any of it.
#[derive(Clone)]
pub struct MixerHandle {
    ids: Arc<IdAllocator>,
    commands: Sender<CommandBuffer>,
    events: Receiver<MixerEvent>,
    root: ObjectId,
}

impl MixerHandle {
    pub fn allocate_id(&self) -> ObjectId {
        self.ids.allocate()
    }

    /// Returns an id to the pool. Call only after the matching
    /// `DeleteObject` has been submitted.
    pub fn release_id(&self, id: ObjectId) {
        self.ids.release(id);
    }

    pub fn root_object(&self) -> ObjectId {
        self.root
    }

    /// Queues a command buffer for the next [`Mixer::process`].
    pub fn submit(&self, buffer: CommandBuffer) -> Result<()> {
        self.commands.send(buffer).map_err(|_| Error::Disconnected)
    }

    /// Drains every event the mixer has published so far.
    pub fn poll_events(&self) -> Vec<MixerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Builder for a [`Mixer`] / [`MixerHandle`] pair.
#[derive(Debug, Default)]
pub struct MixerBuilder {
    config: MixerConfig,
}

impl MixerBuilder {
    pub fn channels(mut self, channels: u32) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn buffer_frames(mut self, buffer_frames: u32) -> Self {
        self.config.buffer_frames = buffer_frames;
        self
    }

    pub fn build(self) -> Result<(Mixer, MixerHandle)> {
        Mixer::new(self.config)
    }
}

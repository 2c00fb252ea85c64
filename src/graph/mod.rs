//! Handle-addressed object graph owned by the mixer thread.

pub(crate) mod render;

use std::sync::Arc;

use crate::command::ProcessorUpdate;
use crate::effect::{Effect, Listener};
use crate::error::{Error, Result};
use crate::event::MixerEvent;
use crate::handle::ObjectId;
use crate::source::{AudioData, Source, StreamSource};

/// An object with an optional source, arranged in a parent/child tree.
#[derive(Default)]
pub(crate) struct ObjectNode {
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) source: Option<Box<dyn Source>>,
}

/// A mixing junction: sums its inputs, then runs its processor chain.
#[derive(Debug, Default)]
pub(crate) struct BusNode {
    pub(crate) output: Option<ObjectId>,
    pub(crate) input_buses: Vec<ObjectId>,
    pub(crate) input_streams: Vec<ObjectId>,
    pub(crate) processors: Vec<ObjectId>,
}

/// A playback cursor over a data object, feeding one bus.
pub(crate) struct StreamNode {
    pub(crate) output: Option<ObjectId>,
    pub(crate) source: Box<dyn StreamSource>,
    pub(crate) channels: u32,
    pub(crate) sample_rate: u32,
    pub(crate) playing: bool,
}

pub(crate) struct ProcessorNode {
    pub(crate) bus: Option<ObjectId>,
    pub(crate) enabled: bool,
    pub(crate) effect: Effect,
}

pub(crate) enum Node {
    Object(ObjectNode),
    Bus(BusNode),
    Stream(StreamNode),
    Data(Arc<dyn AudioData>),
    Processor(ProcessorNode),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Object(_) => "object",
            Node::Bus(_) => "bus",
            Node::Stream(_) => "stream",
            Node::Data(_) => "data",
            Node::Processor(_) => "processor",
        }
    }
}

struct Slot {
    generation: u32,
    node: Node,
}

/// All live mixer objects, indexed by handle slot.
///
/// Every access revalidates the handle's generation against the slot, so a
/// released handle resolves to [`Error::StaleHandle`] instead of whatever
/// now occupies the slot. Edges between nodes are stored as handles and
/// unlinked explicitly when a node is removed.
#[derive(Default)]
pub(crate) struct ObjectTable {
    slots: Vec<Option<Slot>>,
    master: Option<ObjectId>,
    events: Vec<MixerEvent>,
}

impl ObjectTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, id: ObjectId, node: Node) -> Result<()> {
        let slot = id.slot();
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].is_some() {
            return Err(Error::StaleHandle(id));
        }
        self.slots[slot] = Some(Slot {
            generation: id.generation(),
            node,
        });
        Ok(())
    }

    fn slot(&self, id: ObjectId) -> Result<&Slot> {
        self.slots
            .get(id.slot())
            .and_then(|slot| slot.as_ref())
            .filter(|slot| slot.generation == id.generation())
            .ok_or(Error::StaleHandle(id))
    }

    fn slot_mut(&mut self, id: ObjectId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.slot())
            .and_then(|slot| slot.as_mut())
            .filter(|slot| slot.generation == id.generation())
            .ok_or(Error::StaleHandle(id))
    }

    pub(crate) fn master(&self) -> Option<ObjectId> {
        self.master
    }

    pub(crate) fn take_events(&mut self) -> Vec<MixerEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn object(&self, id: ObjectId) -> Result<&ObjectNode> {
        match &self.slot(id)?.node {
            Node::Object(object) => Ok(object),
            node => Err(Error::TypeMismatch {
                expected: "object",
                found: node.kind(),
            }),
        }
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut ObjectNode> {
        match &mut self.slot_mut(id)?.node {
            Node::Object(object) => Ok(object),
            node => Err(Error::TypeMismatch {
                expected: "object",
                found: node.kind(),
            }),
        }
    }

    pub(crate) fn bus(&self, id: ObjectId) -> Result<&BusNode> {
        match &self.slot(id)?.node {
            Node::Bus(bus) => Ok(bus),
            node => Err(Error::TypeMismatch {
                expected: "bus",
                found: node.kind(),
            }),
        }
    }

    fn bus_mut(&mut self, id: ObjectId) -> Result<&mut BusNode> {
        match &mut self.slot_mut(id)?.node {
            Node::Bus(bus) => Ok(bus),
            node => Err(Error::TypeMismatch {
                expected: "bus",
                found: node.kind(),
            }),
        }
    }

    fn stream_mut(&mut self, id: ObjectId) -> Result<&mut StreamNode> {
        match &mut self.slot_mut(id)?.node {
            Node::Stream(stream) => Ok(stream),
            node => Err(Error::TypeMismatch {
                expected: "stream",
                found: node.kind(),
            }),
        }
    }

    fn processor_mut(&mut self, id: ObjectId) -> Result<&mut ProcessorNode> {
        match &mut self.slot_mut(id)?.node {
            Node::Processor(processor) => Ok(processor),
            node => Err(Error::TypeMismatch {
                expected: "processor",
                found: node.kind(),
            }),
        }
    }

    pub(crate) fn data(&self, id: ObjectId) -> Result<Arc<dyn AudioData>> {
        match &self.slot(id)?.node {
            Node::Data(data) => Ok(Arc::clone(data)),
            node => Err(Error::TypeMismatch {
                expected: "data",
                found: node.kind(),
            }),
        }
    }

    /// Removes a node and detaches every edge that referenced it.
    pub(crate) fn remove(&mut self, id: ObjectId) -> Result<()> {
        self.slot(id)?;
        let removed = self.slots[id.slot()]
            .take()
            .map(|slot| slot.node)
            .ok_or(Error::StaleHandle(id))?;

        match removed {
            Node::Bus(bus) => {
                if self.master == Some(id) {
                    self.master = None;
                }
                if let Some(output) = bus.output {
                    if let Ok(parent) = self.bus_mut(output) {
                        parent.input_buses.retain(|&input| input != id);
                    }
                }
                for input in bus.input_buses {
                    if let Ok(input_bus) = self.bus_mut(input) {
                        input_bus.output = None;
                    }
                }
                for input in bus.input_streams {
                    if let Ok(stream) = self.stream_mut(input) {
                        stream.output = None;
                    }
                }
                for processor in bus.processors {
                    if let Ok(processor) = self.processor_mut(processor) {
                        processor.bus = None;
                    }
                }
            }
            Node::Stream(stream) => {
                if let Some(output) = stream.output {
                    if let Ok(bus) = self.bus_mut(output) {
                        bus.input_streams.retain(|&input| input != id);
                    }
                }
            }
            Node::Processor(processor) => {
                if let Some(bus) = processor.bus {
                    if let Ok(bus) = self.bus_mut(bus) {
                        bus.processors.retain(|&entry| entry != id);
                    }
                }
            }
            Node::Object(object) => {
                if let Some(parent) = object.parent {
                    if let Ok(parent) = self.object_mut(parent) {
                        parent.children.retain(|&child| child != id);
                    }
                }
                for child in object.children {
                    if let Ok(child) = self.object_mut(child) {
                        child.parent = None;
                    }
                }
            }
            Node::Data(_) => {}
        }

        Ok(())
    }

    /// Walks the output chain from `from`, looking for `needle`.
    fn bus_reaches(&self, from: ObjectId, needle: ObjectId) -> bool {
        let mut current = Some(from);
        let mut remaining = self.slots.len() + 1;
        while let Some(id) = current {
            if id == needle {
                return true;
            }
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            current = self.bus(id).ok().and_then(|bus| bus.output);
        }
        false
    }

    pub(crate) fn set_bus_output(&mut self, id: ObjectId, output: Option<ObjectId>) -> Result<()> {
        self.bus(id)?;
        if let Some(target) = output {
            self.bus(target)?;
            if self.bus_reaches(target, id) {
                return Err(Error::CycleDetected(id));
            }
        }

        let old = self.bus(id)?.output;
        if let Some(old) = old {
            if let Ok(parent) = self.bus_mut(old) {
                parent.input_buses.retain(|&input| input != id);
            }
        }
        self.bus_mut(id)?.output = output;
        if let Some(target) = output {
            let parent = self.bus_mut(target)?;
            if !parent.input_buses.contains(&id) {
                parent.input_buses.push(id);
            }
        }
        Ok(())
    }

    pub(crate) fn set_stream_output(
        &mut self,
        id: ObjectId,
        output: Option<ObjectId>,
    ) -> Result<()> {
        self.stream_mut(id)?;
        if let Some(target) = output {
            self.bus(target)?;
        }

        let old = self.stream_mut(id)?.output;
        if let Some(old) = old {
            if let Ok(bus) = self.bus_mut(old) {
                bus.input_streams.retain(|&input| input != id);
            }
        }
        self.stream_mut(id)?.output = output;
        if let Some(target) = output {
            let bus = self.bus_mut(target)?;
            if !bus.input_streams.contains(&id) {
                bus.input_streams.push(id);
            }
        }
        Ok(())
    }

    pub(crate) fn set_master(&mut self, id: Option<ObjectId>) -> Result<()> {
        if let Some(id) = id {
            self.bus(id)?;
        }
        self.master = id;
        Ok(())
    }

    pub(crate) fn add_processor(&mut self, bus: ObjectId, processor: ObjectId) -> Result<()> {
        self.bus(bus)?;
        let old = self.processor_mut(processor)?.bus;
        if old == Some(bus) {
            return Ok(());
        }
        if let Some(old) = old {
            if let Ok(old_bus) = self.bus_mut(old) {
                old_bus.processors.retain(|&entry| entry != processor);
            }
        }
        self.processor_mut(processor)?.bus = Some(bus);
        self.bus_mut(bus)?.processors.push(processor);
        Ok(())
    }

    pub(crate) fn remove_processor(&mut self, bus: ObjectId, processor: ObjectId) -> Result<()> {
        self.bus_mut(bus)?.processors.retain(|&entry| entry != processor);
        let node = self.processor_mut(processor)?;
        if node.bus == Some(bus) {
            node.bus = None;
        }
        Ok(())
    }

    pub(crate) fn update_processor(&mut self, id: ObjectId, update: ProcessorUpdate) -> Result<()> {
        let processor = self.processor_mut(id)?;
        match update {
            ProcessorUpdate::SetEnabled(enabled) => {
                processor.enabled = enabled;
                Ok(())
            }
            update => processor.effect.apply(update),
        }
    }

    pub(crate) fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        self.object(child)?;
        self.object(parent)?;

        // Reparenting the child under its own descendant would close a loop.
        let mut current = Some(parent);
        let mut remaining = self.slots.len() + 1;
        while let Some(id) = current {
            if id == child {
                return Err(Error::CycleDetected(child));
            }
            if remaining == 0 {
                return Err(Error::CycleDetected(child));
            }
            remaining -= 1;
            current = self.object(id).ok().and_then(|object| object.parent);
        }

        let old = self.object_mut(child)?.parent;
        if let Some(old) = old {
            if let Ok(old_parent) = self.object_mut(old) {
                old_parent.children.retain(|&entry| entry != child);
            }
        }
        self.object_mut(child)?.parent = Some(parent);
        let parent_node = self.object_mut(parent)?;
        if !parent_node.children.contains(&child) {
            parent_node.children.push(child);
        }
        Ok(())
    }

    pub(crate) fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        self.object_mut(parent)?.children.retain(|&entry| entry != child);
        let child_node = self.object_mut(child)?;
        if child_node.parent == Some(parent) {
            child_node.parent = None;
        }
        Ok(())
    }

    pub(crate) fn play_object(&mut self, id: ObjectId) -> Result<()> {
        if let Some(source) = &mut self.object_mut(id)?.source {
            source.play();
        }
        Ok(())
    }

    pub(crate) fn stop_object(&mut self, id: ObjectId, reset: bool) -> Result<()> {
        if let Some(source) = &mut self.object_mut(id)?.source {
            source.stop(reset);
        }
        Ok(())
    }

    pub(crate) fn play_stream(&mut self, id: ObjectId) -> Result<()> {
        let stream = self.stream_mut(id)?;
        if !stream.playing {
            stream.playing = true;
            self.events.push(MixerEvent::StreamStarted { stream: id });
        }
        Ok(())
    }

    pub(crate) fn stop_stream(&mut self, id: ObjectId, reset: bool) -> Result<()> {
        let stream = self.stream_mut(id)?;
        if stream.playing {
            stream.playing = false;
            self.events.push(MixerEvent::StreamStopped { stream: id });
        }
        if reset {
            self.stream_mut(id)?.source.reset();
        }
        Ok(())
    }

    pub(crate) fn stream_format(&self, id: ObjectId) -> Result<(bool, u32, u32)> {
        match &self.slot(id)?.node {
            Node::Stream(stream) => Ok((stream.playing, stream.channels, stream.sample_rate)),
            node => Err(Error::TypeMismatch {
                expected: "stream",
                found: node.kind(),
            }),
        }
    }

    /// Pulls a block from a stream's source. An exhausted source has
    /// already rewound itself; the stream stops and a reset event is
    /// queued so the frontend can observe it.
    pub(crate) fn generate_stream(
        &mut self,
        id: ObjectId,
        frames: usize,
        out: &mut Vec<f32>,
    ) -> Result<()> {
        let stream = self.stream_mut(id)?;
        if !stream.source.generate(frames, out) {
            stream.playing = false;
            self.events.push(MixerEvent::StreamReset { stream: id });
            self.events.push(MixerEvent::StreamStopped { stream: id });
        }
        Ok(())
    }

    /// Renders an object's own source, if it has one, into `out`.
    pub(crate) fn generate_object_source(
        &mut self,
        id: ObjectId,
        frames: usize,
        channels: u32,
        sample_rate: u32,
        out: &mut Vec<f32>,
    ) -> Result<bool> {
        match &mut self.object_mut(id)?.source {
            Some(source) => {
                source.generate(frames, channels, sample_rate, out);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn run_processor(
        &mut self,
        id: ObjectId,
        frames: usize,
        channels: u32,
        sample_rate: u32,
        listener: &Listener,
        samples: &mut [f32],
    ) -> Result<()> {
        let processor = self.processor_mut(id)?;
        if processor.enabled {
            processor
                .effect
                .process(frames, channels, sample_rate, listener, samples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::IdAllocator;

    struct CountdownSource {
        remaining: usize,
    }

    impl StreamSource for CountdownSource {
        fn reset(&mut self) {}

        fn generate(&mut self, frames: usize, out: &mut Vec<f32>) -> bool {
            out.clear();
            out.resize(frames, 1.0);
            if self.remaining <= frames {
                self.remaining = 0;
                false
            } else {
                self.remaining -= frames;
                true
            }
        }
    }

    fn stream_node(frames: usize) -> Node {
        Node::Stream(StreamNode {
            output: None,
            source: Box::new(CountdownSource { remaining: frames }),
            channels: 1,
            sample_rate: 44100,
            playing: false,
        })
    }

    fn table_with(ids: &IdAllocator, nodes: Vec<Node>) -> (ObjectTable, Vec<ObjectId>) {
        let mut table = ObjectTable::new();
        let handles: Vec<_> = nodes
            .into_iter()
            .map(|node| {
                let id = ids.allocate();
                table.insert(id, node).unwrap();
                id
            })
            .collect();
        (table, handles)
    }

    #[test]
    fn test_stale_handle_rejected_after_remove() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(&ids, vec![Node::Bus(BusNode::default())]);
        let id = handles[0];

        table.remove(id).unwrap();
        ids.release(id);
        assert!(matches!(table.bus(id), Err(Error::StaleHandle(_))));

        // The recycled slot holds a new generation; the old handle stays dead.
        let recycled = ids.allocate();
        table.insert(recycled, Node::Bus(BusNode::default())).unwrap();
        assert_eq!(recycled.slot(), id.slot());
        assert!(table.bus(recycled).is_ok());
        assert!(matches!(table.bus(id), Err(Error::StaleHandle(_))));
    }

    #[test]
    fn test_type_mismatch_names_both_kinds() {
        let ids = IdAllocator::new();
        let (table, handles) = table_with(&ids, vec![stream_node(16)]);
        let err = table.bus(handles[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "bus",
                found: "stream",
            }
        ));
    }

    #[test]
    fn test_bus_output_cycle_rejected() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(
            &ids,
            vec![
                Node::Bus(BusNode::default()),
                Node::Bus(BusNode::default()),
                Node::Bus(BusNode::default()),
            ],
        );
        let (a, b, c) = (handles[0], handles[1], handles[2]);

        table.set_bus_output(a, Some(b)).unwrap();
        table.set_bus_output(b, Some(c)).unwrap();
        assert!(matches!(
            table.set_bus_output(c, Some(a)),
            Err(Error::CycleDetected(_))
        ));
        assert!(matches!(
            table.set_bus_output(a, Some(a)),
            Err(Error::CycleDetected(_))
        ));
    }

    #[test]
    fn test_rewiring_bus_output_moves_input_edge() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(
            &ids,
            vec![
                Node::Bus(BusNode::default()),
                Node::Bus(BusNode::default()),
                Node::Bus(BusNode::default()),
            ],
        );
        let (child, first, second) = (handles[0], handles[1], handles[2]);

        table.set_bus_output(child, Some(first)).unwrap();
        assert_eq!(table.bus(first).unwrap().input_buses, vec![child]);

        table.set_bus_output(child, Some(second)).unwrap();
        assert!(table.bus(first).unwrap().input_buses.is_empty());
        assert_eq!(table.bus(second).unwrap().input_buses, vec![child]);
    }

    #[test]
    fn test_remove_bus_detaches_all_edges() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(
            &ids,
            vec![
                Node::Bus(BusNode::default()),
                Node::Bus(BusNode::default()),
                stream_node(64),
                Node::Processor(ProcessorNode {
                    bus: None,
                    enabled: true,
                    effect: Effect::Gain(crate::effect::Gain::new(0.0)),
                }),
            ],
        );
        let (master, inner, stream, processor) =
            (handles[0], handles[1], handles[2], handles[3]);

        table.set_master(Some(master)).unwrap();
        table.set_bus_output(inner, Some(master)).unwrap();
        table.set_stream_output(stream, Some(inner)).unwrap();
        table.add_processor(inner, processor).unwrap();

        table.remove(inner).unwrap();

        assert!(table.bus(master).unwrap().input_buses.is_empty());
        // The stream and processor survive, detached.
        assert!(!table.stream_format(stream).unwrap().0);
        assert!(table
            .update_processor(processor, ProcessorUpdate::SetEnabled(true))
            .is_ok());

        table.remove(master).unwrap();
        assert_eq!(table.master(), None);
    }

    #[test]
    fn test_child_cycle_rejected() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(
            &ids,
            vec![
                Node::Object(ObjectNode::default()),
                Node::Object(ObjectNode::default()),
            ],
        );
        let (parent, child) = (handles[0], handles[1]);

        table.add_child(parent, child).unwrap();
        assert!(matches!(
            table.add_child(child, parent),
            Err(Error::CycleDetected(_))
        ));
        assert!(matches!(
            table.add_child(parent, parent),
            Err(Error::CycleDetected(_))
        ));
    }

    #[test]
    fn test_stream_lifecycle_emits_events() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(&ids, vec![stream_node(8)]);
        let stream = handles[0];

        table.play_stream(stream).unwrap();
        table.play_stream(stream).unwrap(); // no duplicate event
        table.stop_stream(stream, false).unwrap();

        let events = table.take_events();
        assert_eq!(
            events,
            vec![
                MixerEvent::StreamStarted { stream },
                MixerEvent::StreamStopped { stream },
            ]
        );
        assert!(table.take_events().is_empty());
    }

    #[test]
    fn test_exhausted_stream_stops_and_queues_reset() {
        let ids = IdAllocator::new();
        let (mut table, handles) = table_with(&ids, vec![stream_node(8)]);
        let stream = handles[0];

        table.play_stream(stream).unwrap();
        let mut block = Vec::new();
        table.generate_stream(stream, 16, &mut block).unwrap();

        assert!(!table.stream_format(stream).unwrap().0);
        let events = table.take_events();
        assert!(events.contains(&MixerEvent::StreamReset { stream }));
        assert!(events.contains(&MixerEvent::StreamStopped { stream }));
    }
}

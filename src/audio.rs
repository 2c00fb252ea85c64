//! High-level frontend over the command protocol.

use std::sync::Arc;

use crate::command::{Command, CommandBuffer, ProcessorUpdate};
use crate::effect::Effect;
use crate::error::Result;
use crate::event::MixerEvent;
use crate::handle::ObjectId;
use crate::mixer::MixerHandle;
use crate::source::{AudioData, Source};

/// Batches graph mutations and submits them in one command buffer.
///
/// Each `init_*` call returns the new object's handle immediately; the
/// object itself comes to life on the mixer thread once
/// [`update`](Audio::update) submits the batch. Until then the handle is
/// only good for wiring further commands in the same batch.
pub struct Audio {
    handle: MixerHandle,
    pending: CommandBuffer,
    released: Vec<ObjectId>,
}

impl Audio {
    pub fn new(handle: MixerHandle) -> Self {
        Self {
            handle,
            pending: CommandBuffer::new(),
            released: Vec::new(),
        }
    }

    pub fn root_object(&self) -> ObjectId {
        self.handle.root_object()
    }

    pub fn init_object(&mut self, source: Option<Box<dyn Source>>) -> ObjectId {
        let id = self.handle.allocate_id();
        self.pending.push(Command::InitObject { id, source });
        id
    }

    pub fn init_bus(&mut self) -> ObjectId {
        let id = self.handle.allocate_id();
        self.pending.push(Command::InitBus { id });
        id
    }

    pub fn init_data(&mut self, data: Arc<dyn AudioData>) -> ObjectId {
        let id = self.handle.allocate_id();
        self.pending.push(Command::InitData { id, data });
        id
    }

    pub fn init_stream(&mut self, data: ObjectId) -> ObjectId {
        let id = self.handle.allocate_id();
        self.pending.push(Command::InitStream { id, data });
        id
    }

    pub fn init_processor(&mut self, effect: Effect) -> ObjectId {
        let id = self.handle.allocate_id();
        self.pending.push(Command::InitProcessor { id, effect });
        id
    }

    pub fn update_processor(&mut self, id: ObjectId, update: ProcessorUpdate) {
        self.pending.push(Command::UpdateProcessor { id, update });
    }

    pub fn set_bus_output(&mut self, id: ObjectId, output: Option<ObjectId>) {
        self.pending.push(Command::SetBusOutput { id, output });
    }

    pub fn set_stream_output(&mut self, id: ObjectId, output: Option<ObjectId>) {
        self.pending.push(Command::SetStreamOutput { id, output });
    }

    pub fn set_master_bus(&mut self, id: Option<ObjectId>) {
        self.pending.push(Command::SetMasterBus { id });
    }

    pub fn add_processor(&mut self, bus: ObjectId, processor: ObjectId) {
        self.pending.push(Command::AddProcessor { bus, processor });
    }

    pub fn remove_processor(&mut self, bus: ObjectId, processor: ObjectId) {
        self.pending.push(Command::RemoveProcessor { bus, processor });
    }

    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) {
        self.pending.push(Command::AddChild { parent, child });
    }

    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) {
        self.pending.push(Command::RemoveChild { parent, child });
    }

    pub fn play(&mut self, id: ObjectId) {
        self.pending.push(Command::Play { id });
    }

    pub fn stop(&mut self, id: ObjectId, reset: bool) {
        self.pending.push(Command::Stop { id, reset });
    }

    pub fn play_stream(&mut self, id: ObjectId) {
        self.pending.push(Command::PlayStream { id });
    }

    pub fn stop_stream(&mut self, id: ObjectId, reset: bool) {
        self.pending.push(Command::StopStream { id, reset });
    }

    /// Queues the object's deletion and schedules its id for recycling.
    ///
    /// The id returns to the allocator only once [`update`](Audio::update)
    /// has submitted the deletion; until then another producer cannot be
    /// handed the index and race its `Init*` ahead of the delete.
    pub fn delete_object(&mut self, id: ObjectId) {
        self.pending.push(Command::DeleteObject { id });
        self.released.push(id);
    }

    /// Submits everything queued since the last call, then recycles the
    /// ids of objects deleted in this batch.
    pub fn update(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            let buffer = std::mem::take(&mut self.pending);
            self.handle.submit(buffer)?;
        }
        for id in self.released.drain(..) {
            self.handle.release_id(id);
        }
        Ok(())
    }

    pub fn poll_events(&self) -> Vec<MixerEvent> {
        self.handle.poll_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::Mixer;
    use crate::source::PcmData;

    #[test]
    fn test_update_with_nothing_pending_is_a_no_op() {
        let (mixer, handle) = Mixer::builder().build().unwrap();
        drop(mixer);
        // Nothing queued, so the dead channel is never touched.
        let mut audio = Audio::new(handle);
        audio.update().unwrap();
    }

    #[test]
    fn test_deleted_id_recycles_only_after_update() {
        let (mut mixer, handle) = Mixer::builder().build().unwrap();
        let mut audio = Audio::new(handle.clone());

        let bus = audio.init_bus();
        audio.update().unwrap();

        audio.delete_object(bus);
        // A second producer allocating before the delete is submitted must
        // get a fresh index, not the doomed one.
        let other = handle.allocate_id();
        assert_ne!(other.slot(), bus.slot());

        audio.update().unwrap();
        let recycled = handle.allocate_id();
        assert_eq!(recycled.slot(), bus.slot());
        assert_ne!(recycled, bus);

        let mut samples = Vec::new();
        mixer.get_samples(16, 1, 44100, &mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_batched_setup_renders_in_one_block() {
        let (mut mixer, handle) = Mixer::builder().build().unwrap();
        let mut audio = Audio::new(handle);

        let data = Arc::new(PcmData::new(1, 44100, vec![0.5; 1024]).unwrap());
        let master = audio.init_bus();
        let data_id = audio.init_data(data);
        let stream = audio.init_stream(data_id);
        audio.set_master_bus(Some(master));
        audio.set_stream_output(stream, Some(master));
        audio.play_stream(stream);
        audio.update().unwrap();

        let mut samples = Vec::new();
        mixer.get_samples(64, 1, 44100, &mut samples);
        assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-6));

        let events = audio.poll_events();
        assert_eq!(events, vec![MixerEvent::StreamStarted { stream }]);
    }
}

//! Object handles and the producer-side ID allocator.

use core::num::NonZeroU32;

use parking_lot::Mutex;

/// Opaque handle into the mixer's object table.
///
/// A handle is issued by [`allocate`](IdAllocator::allocate) before the slot
/// it names exists; the slot is created when the matching `Init*` command is
/// applied on the mixer thread. Handles carry a generation stamp: after
/// [`release`](IdAllocator::release), the index is recycled with a bumped
/// generation, so a held stale handle fails resolution instead of aliasing
/// the new occupant.
///
/// "No object" is spelled `Option<ObjectId>`; the `NonZeroU32` index keeps
/// that the size of a plain id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectId {
    index: NonZeroU32,
    generation: u32,
}

impl ObjectId {
    pub(crate) fn new(index: NonZeroU32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Zero-based position in the object table.
    pub(crate) fn slot(self) -> usize {
        self.index.get() as usize - 1
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

/// Issues and recycles [`ObjectId`]s.
///
/// Callable from any producer thread; the mixer thread never takes this
/// lock. Recycling policy: released indices are always reused before fresh
/// ones are minted, each with a bumped generation.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    state: Mutex<AllocatorState>,
}

#[derive(Debug, Default)]
struct AllocatorState {
    next_index: u32,
    free: Vec<(NonZeroU32, u32)>,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self) -> ObjectId {
        let mut state = self.state.lock();
        if let Some((index, generation)) = state.free.pop() {
            return ObjectId::new(index, generation);
        }
        state.next_index += 1;
        let index = NonZeroU32::new(state.next_index)
            .unwrap_or_else(|| unreachable!("index counter starts at 1"));
        ObjectId::new(index, 0)
    }

    /// Returns a handle's index to the free pool with a bumped generation.
    ///
    /// The caller must have stopped using the handle; any copy still held
    /// becomes stale once the slot is cleared on the mixer thread.
    pub(crate) fn release(&self, id: ObjectId) {
        let mut state = self.state.lock();
        state
            .free
            .push((id.index, id.generation.wrapping_add(1)));
    }
}

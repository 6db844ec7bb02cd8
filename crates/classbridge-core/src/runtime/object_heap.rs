//! Generational arena for script objects.

use std::fmt;

/// Handle to a heap slot.
///
/// The generational index detects handles to freed slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapHandle {
    /// Index into the heap's slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
}

/// Heap storage with generational indices.
///
/// Values are stored in a Vec with generation tracking. When a value is freed
/// its slot is reused with an incremented generation, so stale handles are
/// detected at runtime.
pub struct ObjectHeap<T> {
    slots: Vec<HeapSlot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

struct HeapSlot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> ObjectHeap<T> {
    /// Create a new empty heap.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Allocate a value on the heap.
    pub fn allocate(&mut self, value: T) -> HeapHandle {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            HeapHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(value),
            });
            HeapHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Get a value. Returns None if the handle is stale.
    pub fn get(&self, handle: HeapHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Get a mutable value. Returns None if the handle is stale.
    pub fn get_mut(&mut self, handle: HeapHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Check if a handle refers to a live value.
    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Free a value, returning it.
    pub fn free(&mut self, handle: HeapHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    /// Handles of all live values.
    pub fn handles(&self) -> Vec<HeapHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| HeapHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the heap holds no values.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T> Default for ObjectHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObjectHeap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .field("live", &self.live)
            .finish()
    }
}

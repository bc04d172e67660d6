use serde::Serialize;

/// Stable handle to a node of the trace tree.
///
/// Positions shift whenever a sibling is inserted or removed, so the tree
/// hands out locators instead. A locator keeps resolving to the same node
/// until that node is removed; after that the generation no longer matches
/// and lookups return `None`, even if the slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Locator {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked indices
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> Locator {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Locator {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Locator {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, locator: Locator) -> Option<&T> {
        self.slots
            .get(locator.index as usize)
            .filter(|slot| slot.generation == locator.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, locator: Locator) -> Option<&mut T> {
        self.slots
            .get_mut(locator.index as usize)
            .filter(|slot| slot.generation == locator.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, locator: Locator) -> bool {
        self.get(locator).is_some()
    }

    /// Remove a node; every copy of `locator` goes stale
    pub fn remove(&mut self, locator: Locator) -> Option<T> {
        let slot = self.slots.get_mut(locator.index as usize)?;
        if slot.generation != locator.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(locator.index);
        self.len -= 1;
        Some(value)
    }

    /// Drop every node. Outstanding locators stay stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.len = 0;
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");

        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_removed_locator_goes_stale() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.remove(a), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_reused_slot_does_not_resurrect_old_locator() {
        let mut arena = Arena::new();
        let old = arena.insert(1);
        arena.remove(old);

        let new = arena.insert(2);
        assert_ne!(old, new);
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.get(new), Some(&2));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.clear();

        assert!(!arena.contains(a));
        assert!(!arena.contains(b));
        assert!(arena.is_empty());

        let c = arena.insert(3);
        assert_eq!(arena.get(c), Some(&3));
        assert_eq!(arena.len(), 1);
    }
}

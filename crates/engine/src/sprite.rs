//! The active sprite table.
//!
//! A dense, fixed-capacity array ordered ascending by paint priority. The
//! first unused slot always holds a zeroed record, so `id == 0` doubles as
//! the end-of-active-entries sentinel (sprite id 0 is reserved and never a
//! live sprite). Removal compacts the tail down one slot to keep the table
//! dense; the heartbeat walks the live prefix in order to repaint sprites
//! back to front.

use serde::Serialize;

use crate::error::EngineError;

/// Capacity of the sprite table.
pub const MAX_SPRITES: usize = 200;

/// One on-screen animated object, identified by (id, zone).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sprite {
    pub id: u16,
    pub zone: u16,
    pub window: u8,
    pub x: i16,
    pub y: i16,
    pub image: u16,
    pub palette: u8,
    pub flags: u16,
    pub priority: u8,
}

pub struct SpriteTable {
    entries: Box<[Sprite; MAX_SPRITES]>,
    count: usize,
}

impl SpriteTable {
    pub fn new() -> Self {
        Self {
            entries: Box::new([Sprite::default(); MAX_SPRITES]),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The live prefix, in paint order.
    pub fn live(&self) -> &[Sprite] {
        &self.entries[..self.count]
    }

    /// The whole backing array, sentinel included. Mostly for invariant
    /// checks.
    pub fn raw(&self) -> &[Sprite] {
        &self.entries[..]
    }

    pub fn find(&self, id: u16, zone: u16) -> Option<usize> {
        self.live().iter().position(|s| s.id == id && s.zone == zone)
    }

    pub fn get(&self, id: u16, zone: u16) -> Option<&Sprite> {
        self.find(id, zone).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, id: u16, zone: u16) -> Option<&mut Sprite> {
        self.find(id, zone).map(|i| &mut self.entries[i])
    }

    /// Insert keeping ascending priority order; an equal priority lands
    /// after the existing entries, so repeated inserts stay stable.
    pub fn insert(&mut self, sprite: Sprite) -> Result<(), EngineError> {
        if self.count == MAX_SPRITES {
            return Err(EngineError::TableFull {
                table: "sprite",
                capacity: MAX_SPRITES,
            });
        }
        let at = self
            .live()
            .iter()
            .position(|s| s.priority > sprite.priority)
            .unwrap_or(self.count);
        self.entries.copy_within(at..self.count, at + 1);
        self.entries[at] = sprite;
        self.count += 1;
        Ok(())
    }

    /// Remove one sprite, shifting later entries down and restoring the
    /// sentinel slot.
    pub fn remove(&mut self, id: u16, zone: u16) -> Option<Sprite> {
        let at = self.find(id, zone)?;
        let removed = self.entries[at];
        self.entries.copy_within(at + 1..self.count, at);
        self.count -= 1;
        self.entries[self.count] = Sprite::default();
        Some(removed)
    }

    /// Reorder one sprite to a new priority, preserving the ordering
    /// invariant. Returns false when the sprite does not exist.
    pub fn set_priority(&mut self, id: u16, zone: u16, priority: u8) -> bool {
        let Some(mut sprite) = self.remove(id, zone) else {
            return false;
        };
        sprite.priority = priority;
        // Cannot fail: remove just freed a slot.
        self.insert(sprite).expect("slot freed by remove");
        true
    }

    pub fn clear(&mut self) {
        *self.entries = [Sprite::default(); MAX_SPRITES];
        self.count = 0;
    }
}

impl Default for SpriteTable {
    fn default() -> Self {
        Self::new()
    }
}

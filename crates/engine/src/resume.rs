//! Suspended-script continuation queues.
//!
//! A suspended script is nothing but a stored code offset plus the sprite
//! and zone that own it; there is no stack to restore. Three queues hold
//! these continuations, distinguished only by the event that fires them:
//! a sprite being stopped from outside, a sprite's script ending, or an
//! explicit sync signal. Each queue is a dense fixed-capacity array with
//! `ident == 0` as the end-of-list sentinel; firing removes the matched
//! entries and shifts everything behind them down one slot. Ident 0 is
//! reserved for the sentinel and rejected at registration.

use crate::error::EngineError;

/// Capacity of each continuation queue.
pub const MAX_CONTINUATIONS: usize = 60;

/// One suspended execution: resumption offset plus owning sprite context,
/// filed under the ident it waits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Continuation {
    pub ident: u16,
    pub code_offset: u32,
    pub sprite: u16,
    pub zone: u16,
}

pub struct ResumeQueue {
    name: &'static str,
    entries: Box<[Continuation; MAX_CONTINUATIONS]>,
    count: usize,
}

impl ResumeQueue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Box::new([Continuation::default(); MAX_CONTINUATIONS]),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn live(&self) -> &[Continuation] {
        &self.entries[..self.count]
    }

    /// The whole backing array, sentinel included.
    pub fn raw(&self) -> &[Continuation] {
        &self.entries[..]
    }

    /// Append at the first sentinel slot.
    pub fn register(
        &mut self,
        ident: u16,
        code_offset: u32,
        sprite: u16,
        zone: u16,
    ) -> Result<(), EngineError> {
        if ident == 0 {
            return Err(EngineError::IndexOutOfRange {
                what: "continuation ident",
                index: 0,
            });
        }
        if self.count == MAX_CONTINUATIONS {
            return Err(EngineError::TableFull {
                table: self.name,
                capacity: MAX_CONTINUATIONS,
            });
        }
        self.entries[self.count] = Continuation {
            ident,
            code_offset,
            sprite,
            zone,
        };
        self.count += 1;
        Ok(())
    }

    /// Remove and return every entry waiting on `ident`, preserving their
    /// relative order; the survivors compact down. Firing an ident nobody
    /// waits on returns an empty list.
    pub fn fire(&mut self, ident: u16) -> Vec<Continuation> {
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.count {
            if self.entries[i].ident == ident {
                fired.push(self.entries[i]);
                self.remove_at(i);
            } else {
                i += 1;
            }
        }
        fired
    }

    /// Drop every continuation owned by (sprite, zone); used when the
    /// sprite is destroyed so nothing resumes into a dead context.
    pub fn purge(&mut self, sprite: u16, zone: u16) {
        let mut i = 0;
        while i < self.count {
            if self.entries[i].sprite == sprite && self.entries[i].zone == zone {
                self.remove_at(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        *self.entries = [Continuation::default(); MAX_CONTINUATIONS];
        self.count = 0;
    }

    fn remove_at(&mut self, at: usize) {
        self.entries.copy_within(at + 1..self.count, at);
        self.count -= 1;
        self.entries[self.count] = Continuation::default();
    }
}

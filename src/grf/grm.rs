//! Shared id reservation between cooperating files.
//!
//! Every slot holds the grfid of its owner, 0 when free. Requests that
//! name a specific start treat slots already owned by the requester as
//! free, so a file that repeats a reservation gets the same range back.

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::tables::{VehicleType, NUM_CARGO, TOTAL_NUM_ENGINES};

/// Image ids must stay below this after general sprite reservation.
pub const MAX_GRM_SPRITE: u32 = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrmArray {
    Engines(VehicleType),
    /// Cargo ids followed by cargo bit numbers
    Cargo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrmResult {
    /// Start of the range, or the owner for a query
    Value(u32),
    /// Soft failure, the caller stores `u32::MAX`
    Unavailable,
    /// Hard failure, the caller disables the file
    Failed,
}

#[derive(Debug, Clone)]
pub struct Grm {
    engines: Vec<u32>,
    cargo: Vec<u32>,
    /// (grfid, line) of a reserve-stage request to (first image, count)
    sprites: AHashMap<(u32, u32), (u32, u16)>,
}

impl Default for Grm {
    fn default() -> Self {
        Self::new()
    }
}

impl Grm {
    pub fn new() -> Self {
        Self {
            engines: vec![0; TOTAL_NUM_ENGINES],
            cargo: vec![0; NUM_CARGO * 2],
            sprites: AHashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.engines.fill(0);
        self.cargo.fill(0);
        self.sprites.clear();
    }

    fn slots_mut(&mut self, array: GrmArray) -> &mut [u32] {
        match array {
            GrmArray::Engines(vt) => {
                let first = vt.first_engine();
                &mut self.engines[first..first + vt.count()]
            }
            GrmArray::Cargo => &mut self.cargo,
        }
    }

    /// Owner of a slot, 0 when free or out of range.
    pub fn owner(&mut self, array: GrmArray, index: usize) -> u32 {
        self.slots_mut(array).get(index).copied().unwrap_or(0)
    }

    /// Run reservation operation `op` for `count` ids.
    ///
    /// `specific` is the start index used by operations 2 and 3 and the slot
    /// queried by operation 6.
    pub fn perform(&mut self, array: GrmArray, op: u8, grfid: u32, specific: u32, count: u16) -> GrmResult {
        let slots = self.slots_mut(array);

        if op == 6 {
            return GrmResult::Value(slots.get(specific as usize).copied().unwrap_or(0));
        }

        let fixed = op == 2 || op == 3;
        let count = count as usize;
        let mut start = if fixed { specific as usize } else { 0 };
        let mut size = 0usize;

        if count > 0 {
            for (i, &owner) in slots.iter().enumerate().skip(start) {
                if owner == 0 || (fixed && owner == grfid) {
                    size += 1;
                } else {
                    if fixed {
                        break;
                    }
                    start = i + 1;
                    size = 0;
                }
                if size == count {
                    break;
                }
            }
        }

        if size == count {
            // a zero count claims nothing, even at a start past the end
            if (op == 0 || op == 3) && count > 0 {
                debug!(count, start, ?array, "GRM: reserving");
                for slot in &mut slots[start..start + count] {
                    *slot = grfid;
                }
            }
            return GrmResult::Value(start as u32);
        }

        if op != 4 && op != 5 {
            warn!(count, ?array, "GRM: unable to allocate, deactivating");
            return GrmResult::Failed;
        }
        debug!(count, ?array, "GRM: unable to allocate");
        GrmResult::Unavailable
    }

    /// Reserve-stage general sprite request at image counter `next_image`.
    pub fn reserve_sprites(&mut self, grfid: u32, line: u32, next_image: u32, count: u16) -> Option<u32> {
        if next_image + count as u32 >= MAX_GRM_SPRITE {
            return None;
        }
        self.sprites.insert((grfid, line), (next_image, count));
        Some(next_image)
    }

    /// Start recorded for the same request during the reserve stage.
    pub fn reserved_sprites(&self, grfid: u32, line: u32) -> Option<(u32, u16)> {
        self.sprites.get(&(grfid, line)).copied()
    }
}

//! Property sinks, one per content feature.
//!
//! Action 00 hands every property to the sink of its feature together with
//! the id range it applies to. A sink reads one value per id, of the width
//! the property implies, and stores it into the table it borrows.

pub mod bridge;
pub mod cargo;
pub mod globalvar;
pub mod house;
pub mod sound;
pub mod station;
pub mod vehicle;

use std::fmt;

use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{CargoLabel, CargoSpec, INVALID_CARGO};

pub const FEATURE_TRAINS: u8 = 0x00;
pub const FEATURE_ROAD_VEHICLES: u8 = 0x01;
pub const FEATURE_SHIPS: u8 = 0x02;
pub const FEATURE_AIRCRAFT: u8 = 0x03;
pub const FEATURE_STATIONS: u8 = 0x04;
pub const FEATURE_CANALS: u8 = 0x05;
pub const FEATURE_BRIDGES: u8 = 0x06;
pub const FEATURE_HOUSES: u8 = 0x07;
pub const FEATURE_GLOBALVAR: u8 = 0x08;
pub const FEATURE_CARGOES: u8 = 0x0B;
pub const FEATURE_SOUNDFX: u8 = 0x0C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeInfoResult {
    Success,
    /// Recognised and consumed, but not applied
    Unhandled,
    /// Value width unknown, the rest of the action can't be read
    Unknown,
    /// Id outside the feature's range
    InvalidId,
}

impl fmt::Display for ChangeInfoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Unhandled => "unhandled",
            Self::Unknown => "unknown",
            Self::InvalidId => "invalid id",
        };
        f.write_str(s)
    }
}

/// Applies one property to a range of ids of a feature.
pub trait PropertySink {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult>;
}

/// Apply `prop` to each id in turn, stopping at the first result that
/// leaves the payload position undefined.
pub(crate) fn for_each_id<F>(first: u16, count: u16, mut apply: F) -> Result<ChangeInfoResult>
where
    F: FnMut(usize) -> Result<ChangeInfoResult>,
{
    let mut result = ChangeInfoResult::Success;
    for id in first as usize..first as usize + count as usize {
        result = apply(id)?;
        if matches!(result, ChangeInfoResult::Unknown | ChangeInfoResult::InvalidId) {
            break;
        }
    }
    Ok(result)
}

/// Key under which action 03 binds a group to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CargoKey {
    Cargo(u8),
    Default,
    /// Purchase list, cargo id `0xFF`
    Purchase,
}

/// File-local cargo ids translated against the global cargo table.
#[derive(Debug, Clone, Copy)]
pub struct CargoLookup<'s> {
    pub list: &'s [CargoLabel],
    pub specs: &'s [CargoSpec],
}

impl<'s> CargoLookup<'s> {
    pub fn new(list: &'s [CargoLabel], specs: &'s [CargoSpec]) -> Self {
        Self { list, specs }
    }

    /// Global cargo slot for a raw file-local cargo id, if that cargo is enabled.
    pub fn translate(&self, raw: u8) -> Option<u8> {
        if raw == INVALID_CARGO {
            return None;
        }
        let found = if self.list.is_empty() {
            self.specs.iter().position(|cs| cs.is_valid() && cs.bitnum == raw)
        } else {
            let label = *self.list.get(raw as usize)?;
            self.specs.iter().position(|cs| cs.is_valid() && cs.label == label)
        };
        found.map(|slot| slot as u8)
    }

    /// Bit set of cargo slots for a mask of raw cargo ids.
    pub fn translate_mask(&self, raw_mask: u32) -> u64 {
        (0..32u8)
            .filter(|bit| raw_mask & (1 << bit) != 0)
            .filter_map(|bit| self.translate(bit))
            .fold(0u64, |mask, slot| mask | (1u64 << slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::GameData;

    #[test]
    fn test_cargo_lookup_bitnum_fallback() {
        let data = GameData::new();
        let lookup = CargoLookup::new(&[], &data.cargo);
        assert_eq!(lookup.translate(2), Some(2));
        assert_eq!(lookup.translate(40), None);
        assert_eq!(lookup.translate(INVALID_CARGO), None);
    }

    #[test]
    fn test_cargo_lookup_translation_table() {
        let data = GameData::new();
        let list = [CargoLabel::from_bytes(*b"GOOD"), CargoLabel::from_bytes(*b"XXXX")];
        let lookup = CargoLookup::new(&list, &data.cargo);
        assert_eq!(lookup.translate(0), Some(5));
        assert_eq!(lookup.translate(1), None);
        assert_eq!(lookup.translate(2), None);
        assert_eq!(lookup.translate_mask(0b11), 1 << 5);
    }

    #[test]
    fn test_for_each_id_stops_on_unknown() {
        let mut seen = Vec::new();
        let result = for_each_id(3, 4, |id| {
            seen.push(id);
            Ok(if id == 4 { ChangeInfoResult::Unknown } else { ChangeInfoResult::Success })
        })
        .unwrap();
        assert_eq!(result, ChangeInfoResult::Unknown);
        assert_eq!(seen, vec![3, 4]);
    }
}

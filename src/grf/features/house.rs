use tracing::{debug, warn};

use super::{for_each_id, CargoLookup, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::file::MAX_SPEC_SLOTS;
use crate::grf::sprite_group::GroupRef;
use crate::tables::{BuildingFlags, HouseSpec, NUM_ORIGINAL_HOUSES};

use ChangeInfoResult::{InvalidId, Success, Unknown};

const ORIGINAL_BASE_YEAR: u16 = 1920;
const MAX_YEAR: u16 = u16::MAX;

/// Year byte of property 0A; values past 150 mean "no limit".
fn house_year(raw: u8) -> u16 {
    if raw > 150 {
        MAX_YEAR
    } else {
        ORIGINAL_BASE_YEAR + raw as u16
    }
}

/// A custom house defined by one file.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseDef {
    pub spec: HouseSpec,
    /// Bound by action 03
    pub group: Option<GroupRef>,
}

pub struct HouseSink<'s> {
    pub houses: &'s mut [Option<HouseDef>],
    /// Original house table; substitute 0xFF disables entries here
    pub originals: &'s mut [HouseSpec],
    pub cargo: CargoLookup<'s>,
    pub grfid: u32,
}

impl<'s> HouseSink<'s> {
    fn substitute(&mut self, id: usize, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        let subs = buf.read_u8()?;
        if subs == 0xFF {
            // no new house: switch off the original with this id instead
            if let Some(orig) = self.originals.get_mut(id) {
                orig.enabled = false;
            }
            return Ok(Success);
        }
        if subs as usize >= NUM_ORIGINAL_HOUSES {
            debug!(subs, id, "new house used as substitute, ignoring");
            return Ok(Success);
        }
        if self.houses[id].is_none() {
            let mut spec = HouseSpec::original(subs as usize);
            spec.enabled = true;
            spec.substitute_id = subs;
            spec.override_id = None;
            spec.grf_prop = Some((self.grfid, id as u16));
            spec.building_flags.remove(BuildingFlags::IS_CHURCH | BuildingFlags::IS_STADIUM);
            if let Some(orig) = self.originals.get(subs as usize) {
                spec.min_year = orig.min_year;
                spec.max_year = orig.max_year;
                spec.probability = orig.probability;
            }
            self.houses[id] = Some(HouseDef { spec, group: None });
        }
        Ok(Success)
    }

    fn apply(&mut self, id: usize, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if prop == 0x08 {
            return self.substitute(id, buf);
        }

        let cargo = self.cargo;
        let mut scratch = None;
        let hs = match &mut self.houses[id] {
            Some(def) => &mut def.spec,
            None => {
                debug!(id, prop, "property on undefined house, ignoring");
                &mut scratch.insert(HouseDef { spec: HouseSpec::original(0), group: None }).spec
            }
        };

        match prop {
            0x09 => hs.building_flags = BuildingFlags::from_bits_truncate(buf.read_u8()?),
            0x0A => {
                let years = buf.read_u16_le()?;
                hs.min_year = house_year(years as u8);
                hs.max_year = house_year((years >> 8) as u8);
            }
            0x0B => hs.population = buf.read_u8()?,
            0x0C => hs.mail_generation = buf.read_u8()?,
            0x0D..=0x0F => hs.cargo_acceptance[(prop - 0x0D) as usize] = buf.read_u8()?,
            0x10 => hs.remove_rating_decrease = buf.read_u16_le()?,
            0x11 => hs.removal_cost = buf.read_u8()?,
            0x12 => hs.building_name = buf.read_u16_le()?,
            0x13 => hs.building_availability = buf.read_u16_le()?,
            0x14 => hs.callback_mask = (hs.callback_mask & 0xFF00) | buf.read_u8()? as u16,
            0x15 => {
                let over = buf.read_u8()?;
                if (over as usize) < NUM_ORIGINAL_HOUSES {
                    hs.override_id = Some(over);
                } else {
                    debug!(over, id, "override of a new house, ignoring");
                }
            }
            0x16 => hs.processing_time = buf.read_u8()?.min(63),
            0x17 => {
                for colour in hs.random_colour.iter_mut() {
                    *colour = buf.read_u8()?;
                }
            }
            0x18 => hs.probability = buf.read_u8()?,
            0x19 => hs.extra_flags = buf.read_u8()?,
            0x1A => hs.animation_frames = buf.read_u8()?,
            0x1B => hs.animation_speed = buf.read_u8()?.clamp(2, 16),
            0x1C => hs.class_id = buf.read_u8()?,
            0x1D => hs.callback_mask = (hs.callback_mask & 0x00FF) | (buf.read_u8()? as u16) << 8,
            0x1E => {
                let types = buf.read_u32_le()?;
                if types != u32::MAX {
                    for j in 0..3 {
                        match cargo.translate((types >> (8 * j)) as u8) {
                            Some(slot) => hs.accepts_cargo[j] = Some(slot),
                            None => hs.cargo_acceptance[j] = 0,
                        }
                    }
                }
            }
            0x1F => hs.minimum_life = buf.read_u8()?,
            0x20 => {
                let count = buf.read_u8()?;
                let mut watched = 0u64;
                for _ in 0..count {
                    if let Some(slot) = cargo.translate(buf.read_u8()?) {
                        watched |= 1u64 << slot;
                    }
                }
                hs.watched_cargoes = watched;
            }
            0x21 => hs.min_year = buf.read_u16_le()?,
            0x22 => hs.max_year = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for HouseSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if first as usize + count as usize > MAX_SPEC_SLOTS.min(self.houses.len()) {
            warn!(first, count, max = MAX_SPEC_SLOTS, "house id out of bounds, skipping");
            return Ok(InvalidId);
        }
        for_each_id(first, count, |id| self.apply(id, prop, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::GameData;

    fn run(data: &mut GameData, houses: &mut [Option<HouseDef>], first: u16, count: u16, prop: u8, payload: &[u8]) -> ChangeInfoResult {
        let GameData { houses: originals, cargo, .. } = data;
        let mut sink = HouseSink { houses, originals, cargo: CargoLookup::new(&[], cargo), grfid: 0x01020304 };
        let mut buf = ByteReader::new(payload);
        let result = sink.change_info(first, count, prop, &mut buf).unwrap();
        assert!(!buf.has_data());
        result
    }

    #[test]
    fn test_substitute_allocates() {
        let mut data = GameData::new();
        let mut houses = vec![None; MAX_SPEC_SLOTS];
        assert_eq!(run(&mut data, &mut houses, 5, 1, 0x08, &[3]), Success);
        let def = houses[5].as_ref().unwrap();
        assert_eq!(def.spec.substitute_id, 3);
        assert_eq!(def.spec.grf_prop, Some((0x01020304, 5)));
        assert!(houses[4].is_none());
    }

    #[test]
    fn test_substitute_ff_disables_original() {
        let mut data = GameData::new();
        let mut houses = vec![None; MAX_SPEC_SLOTS];
        run(&mut data, &mut houses, 7, 1, 0x08, &[0xFF]);
        assert!(!data.houses[7].enabled);
        assert!(houses[7].is_none());
    }

    #[test]
    fn test_years_and_cargo() {
        let mut data = GameData::new();
        let mut houses = vec![None; MAX_SPEC_SLOTS];
        run(&mut data, &mut houses, 0, 1, 0x08, &[0]);
        run(&mut data, &mut houses, 0, 1, 0x0A, &[30, 200]);
        // bytes: passengers, an unknown cargo, goods
        run(&mut data, &mut houses, 0, 1, 0x1E, &[0, 60, 5, 0]);
        let spec = &houses[0].as_ref().unwrap().spec;
        assert_eq!(spec.min_year, 1950);
        assert_eq!(spec.max_year, MAX_YEAR);
        assert_eq!(spec.accepts_cargo[0], Some(0));
        assert_eq!(spec.cargo_acceptance[1], 0);
        assert_eq!(spec.accepts_cargo[2], Some(5));
    }

    #[test]
    fn test_watched_cargo_list() {
        let mut data = GameData::new();
        let mut houses = vec![None; MAX_SPEC_SLOTS];
        run(&mut data, &mut houses, 0, 1, 0x08, &[0]);
        run(&mut data, &mut houses, 0, 1, 0x20, &[2, 1, 2]);
        assert_eq!(houses[0].as_ref().unwrap().spec.watched_cargoes, 0b110);
    }
}

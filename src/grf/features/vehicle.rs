use tracing::{debug, warn};

use super::{for_each_id, ChangeInfoResult, CargoLookup, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{
    AircraftVehicleInfo, Climates, Engine, EngineInfo, RailVehicleFlags, RailVehicleInfo,
    RoadVehicleInfo, ShipVehicleInfo, VehicleInfo, VehicleType,
};

use ChangeInfoResult::{Success, Unhandled, Unknown};

/// Running cost base sprites selecting the cost class.
fn running_cost_class(base: u32) -> Option<u8> {
    match base {
        0x4C30 => Some(0),
        0x4C36 => Some(1),
        0x4C3C => Some(2),
        _ => None,
    }
}

/// Custom sprite ids are `0xFD`; original ids index an 8-bit table.
fn sprite_id(raw: u8, custom_marker: u8) -> u8 {
    let id = if raw == custom_marker { 0xFD } else { raw };
    if id < 0xFD {
        id >> 1
    } else {
        id
    }
}

/// Properties of the four vehicle features.
pub struct VehicleSink<'s> {
    pub vtype: VehicleType,
    /// All engine slots; ids are relative to the feature's first engine
    pub engines: &'s mut [Engine],
    pub cargo: CargoLookup<'s>,
}

impl<'s> VehicleSink<'s> {
    fn common(info: &mut EngineInfo, prop: u8, buf: &mut ByteReader) -> Result<Option<ChangeInfoResult>> {
        match prop {
            0x00 => info.base_intro = buf.read_u16_le()?,
            0x02 => info.reliability_decay = buf.read_u8()?,
            0x03 => info.lifelength = buf.read_u8()?,
            0x04 => info.base_life = buf.read_u8()?,
            0x06 => info.climates = Climates::from_bits_truncate(buf.read_u8()?),
            0x07 => info.load_amount = buf.read_u8()?,
            _ => return Ok(None),
        }
        Ok(Some(Success))
    }

    fn cargo_type(&self, raw: u8) -> Option<u8> {
        let cargo = self.cargo.translate(raw);
        if cargo.is_none() && raw != 0xFF {
            debug!(raw, "cargo type not enabled, using first refittable");
        }
        cargo
    }

    fn rail(&self, info: &mut EngineInfo, rvi: &mut RailVehicleInfo, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x05 => rvi.railtype = buf.read_u8()?,
            0x08 => {
                buf.read_u8()?;
                return Ok(Unhandled);
            }
            0x09 => {
                let speed = buf.read_u16_le()?;
                rvi.max_speed = if speed == 0 { None } else { Some(speed) };
            }
            0x0B => {
                let mut power = buf.read_u16_le()?;
                if rvi.flags.contains(RailVehicleFlags::MULTIHEAD) {
                    power /= 2;
                }
                rvi.power = power;
                rvi.flags.set(RailVehicleFlags::WAGON, power == 0);
            }
            0x0D => rvi.running_cost = buf.read_u8()?,
            0x0E => {
                let base = buf.read_u32_le()?;
                match running_cost_class(base) {
                    Some(class) => rvi.running_cost_class = class,
                    None => debug!(base, "unknown running cost base"),
                }
            }
            0x12 => rvi.image_index = sprite_id(buf.read_u8()?, 0xFD),
            0x13 => {
                let dual = buf.read_u8()? != 0;
                let multihead = rvi.flags.contains(RailVehicleFlags::MULTIHEAD);
                if dual && !multihead {
                    rvi.power /= 2;
                } else if !dual && multihead {
                    rvi.power = rvi.power.saturating_mul(2);
                }
                rvi.flags.set(RailVehicleFlags::MULTIHEAD, dual);
            }
            0x14 => rvi.capacity = buf.read_u8()?,
            0x15 => {
                let raw = buf.read_u8()?;
                info.cargo_type = self.cargo_type(raw);
            }
            0x16 => rvi.weight = (rvi.weight & 0xFF00) | buf.read_u8()? as u16,
            0x17 => rvi.base_cost = buf.read_u8()?,
            0x18 => {
                buf.read_u8()?;
                return Ok(Unhandled);
            }
            0x19 => rvi.engine_class = buf.read_u8()?,
            0x1A => {
                buf.read_extended()?;
                return Ok(Unhandled);
            }
            0x1B => rvi.pow_wag_power = buf.read_u16_le()?,
            0x1C => info.refit_cost = buf.read_u8()?,
            0x1D => info.refit_mask = buf.read_u32_le()?,
            0x1E => info.callback_mask = buf.read_u8()?,
            0x1F => rvi.tractive_effort = buf.read_u8()?,
            0x20 => rvi.air_drag = buf.read_u8()?,
            0x21 => rvi.shorten_factor = buf.read_u8()?,
            0x22 => rvi.visual_effect = buf.read_u8()?,
            0x23 => rvi.pow_wag_weight = buf.read_u8()?,
            0x24 => rvi.weight = (rvi.weight & 0x00FF) | (buf.read_u8()? as u16) << 8,
            0x25 => rvi.user_def_data = buf.read_u8()?,
            0x26 => info.retire_early = buf.read_i8()?,
            0x27 => info.misc_flags = buf.read_u8()?,
            0x28 => info.refit_classes = buf.read_u16_le()?,
            0x29 => info.non_refit_classes = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }

    fn road(&self, info: &mut EngineInfo, rvi: &mut RoadVehicleInfo, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x08 => {
                let speed = buf.read_u8()?;
                if speed != 0 {
                    rvi.max_speed = speed as u16;
                }
            }
            0x09 => rvi.running_cost = buf.read_u8()?,
            0x0A => {
                let base = buf.read_u32_le()?;
                match running_cost_class(base) {
                    Some(class) => rvi.running_cost_class = class,
                    None => debug!(base, "unknown running cost base"),
                }
            }
            0x0E => rvi.image_index = sprite_id(buf.read_u8()?, 0xFF),
            0x0F => rvi.capacity = buf.read_u8()?,
            0x10 => {
                let raw = buf.read_u8()?;
                info.cargo_type = self.cargo_type(raw);
            }
            0x11 => rvi.base_cost = buf.read_u8()?,
            0x12 => rvi.sfx = buf.read_u8()?,
            0x13 => rvi.power = buf.read_u8()?,
            0x14 => rvi.weight = buf.read_u8()?,
            // 0.8 mph units, stored in the units of property 08
            0x15 => {
                let speed = buf.read_u8()?;
                if speed != 0 {
                    rvi.max_speed = speed as u16 * 4;
                }
            }
            0x16 => info.refit_mask = buf.read_u32_le()?,
            0x17 => info.callback_mask = buf.read_u8()?,
            0x18 => rvi.tractive_effort = buf.read_u8()?,
            0x19 => rvi.air_drag = buf.read_u8()?,
            0x1A => info.refit_cost = buf.read_u8()?,
            0x1B => info.retire_early = buf.read_i8()?,
            0x1C => info.misc_flags = buf.read_u8()?,
            0x1D => info.refit_classes = buf.read_u16_le()?,
            0x1E => info.non_refit_classes = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }

    fn ship(&self, info: &mut EngineInfo, svi: &mut ShipVehicleInfo, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x08 => svi.image_index = sprite_id(buf.read_u8()?, 0xFF),
            0x09 => svi.refittable = buf.read_u8()? != 0,
            0x0A => svi.base_cost = buf.read_u8()?,
            0x0B => {
                let speed = buf.read_u8()?;
                if speed != 0 {
                    svi.max_speed = speed as u16;
                }
            }
            0x0C => {
                let raw = buf.read_u8()?;
                info.cargo_type = self.cargo_type(raw);
            }
            0x0D => svi.capacity = buf.read_u16_le()?,
            0x0F => svi.running_cost = buf.read_u8()?,
            0x10 => svi.sfx = buf.read_u8()?,
            0x11 => info.refit_mask = buf.read_u32_le()?,
            0x12 => info.callback_mask = buf.read_u8()?,
            0x13 => info.refit_cost = buf.read_u8()?,
            0x14 => svi.ocean_speed_frac = buf.read_u8()?,
            0x15 => svi.canal_speed_frac = buf.read_u8()?,
            0x16 => info.retire_early = buf.read_i8()?,
            0x17 => info.misc_flags = buf.read_u8()?,
            0x18 => info.refit_classes = buf.read_u16_le()?,
            0x19 => info.non_refit_classes = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }

    fn aircraft(info: &mut EngineInfo, avi: &mut AircraftVehicleInfo, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x08 => avi.image_index = sprite_id(buf.read_u8()?, 0xFF),
            0x09 => avi.is_helicopter = buf.read_u8()? == 0,
            0x0A => avi.is_large = buf.read_u8()? != 0,
            0x0B => avi.base_cost = buf.read_u8()?,
            0x0C => {
                let speed = buf.read_u8()?;
                if speed != 0 {
                    avi.max_speed = speed as u16 * 128 / 10;
                }
            }
            0x0D => avi.acceleration = buf.read_u8()?,
            0x0E => avi.running_cost = buf.read_u8()?,
            0x0F => avi.passenger_capacity = buf.read_u16_le()?,
            0x11 => avi.mail_capacity = buf.read_u8()?,
            0x12 => avi.sfx = buf.read_u8()?,
            0x13 => info.refit_mask = buf.read_u32_le()?,
            0x14 => info.callback_mask = buf.read_u8()?,
            0x15 => info.refit_cost = buf.read_u8()?,
            0x16 => info.retire_early = buf.read_i8()?,
            0x17 => info.misc_flags = buf.read_u8()?,
            0x18 => info.refit_classes = buf.read_u16_le()?,
            0x19 => info.non_refit_classes = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for VehicleSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        let limit = self.vtype.count();
        if first as usize + count as usize > limit {
            warn!(first, count, max = limit, vehicle = ?self.vtype, "last engine id out of bounds, skipping");
            return Ok(ChangeInfoResult::InvalidId);
        }
        let offset = self.vtype.first_engine();

        // the sink is re-borrowed per id, so take the engine table out of self
        let engines = std::mem::take(&mut self.engines);
        let result = for_each_id(first, count, |id| {
            let engine = &mut engines[offset + id];
            if let Some(result) = Self::common(&mut engine.info, prop, buf)? {
                return Ok(result);
            }
            let Engine { info, vehicle } = engine;
            match vehicle {
                VehicleInfo::Rail(rvi) => self.rail(info, rvi, prop, buf),
                VehicleInfo::Road(rvi) => self.road(info, rvi, prop, buf),
                VehicleInfo::Ship(svi) => self.ship(info, svi, prop, buf),
                VehicleInfo::Aircraft(avi) => Self::aircraft(info, avi, prop, buf),
            }
        });
        self.engines = engines;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::tables::GameData;

    fn apply(data: &mut GameData, vtype: VehicleType, first: u16, count: u16, prop: u8, payload: &[u8]) -> ChangeInfoResult {
        let GameData { engines, cargo, .. } = data;
        let mut sink = VehicleSink { vtype, engines, cargo: CargoLookup::new(&[], cargo) };
        let mut buf = ByteReader::new(payload);
        sink.change_info(first, count, prop, &mut buf).unwrap()
    }

    #[test]
    fn test_property_touches_only_range() {
        let mut data = GameData::new();
        let before = data.clone();
        let result = apply(&mut data, VehicleType::Train, 2, 3, 0x03, &[40, 41, 42]);
        assert_eq!(result, Success);
        for (id, (now, was)) in data.engines.iter().zip(before.engines.iter()).enumerate() {
            match id {
                2..=4 => assert_eq!(now.info.lifelength, 40 + (id - 2) as u8),
                _ => assert_eq!(now, was),
            }
        }
    }

    #[test]
    fn test_range_is_per_vehicle_kind() {
        let mut data = GameData::new();
        let first_ship = VehicleType::Ship.first_engine();
        assert_eq!(apply(&mut data, VehicleType::Ship, 1, 1, 0x0D, &[0x2C, 0x01]), Success);
        assert_eq!(data.engines[first_ship + 1].vehicle, {
            let mut e = GameData::new().engines[first_ship + 1].clone();
            e.ship_mut().unwrap().capacity = 300;
            e.vehicle
        });
        assert_eq!(apply(&mut data, VehicleType::Ship, 10, 2, 0x0D, &[0; 4]), ChangeInfoResult::InvalidId);
    }

    #[test]
    fn test_dual_head_halves_power() {
        let mut data = GameData::new();
        let mut w = BinaryWriter::new();
        w.write_u16_le(1000);
        apply(&mut data, VehicleType::Train, 0, 1, 0x0B, w.as_slice());
        apply(&mut data, VehicleType::Train, 0, 1, 0x13, &[1]);
        assert_eq!(data.engines[0].rail().unwrap().power, 500);
        apply(&mut data, VehicleType::Train, 0, 1, 0x0B, w.as_slice());
        assert_eq!(data.engines[0].rail().unwrap().power, 500);
        apply(&mut data, VehicleType::Train, 0, 1, 0x13, &[0]);
        assert_eq!(data.engines[0].rail().unwrap().power, 1000);
    }

    #[test]
    fn test_zero_speed_means_default() {
        let mut data = GameData::new();
        apply(&mut data, VehicleType::Train, 0, 1, 0x09, &[0, 0]);
        assert_eq!(data.engines[0].rail().unwrap().max_speed, None);
        let road = VehicleType::Road.first_engine();
        let before = match &data.engines[road].vehicle {
            VehicleInfo::Road(rvi) => rvi.max_speed,
            _ => unreachable!(),
        };
        apply(&mut data, VehicleType::Road, 0, 1, 0x08, &[0]);
        match &data.engines[road].vehicle {
            VehicleInfo::Road(rvi) => assert_eq!(rvi.max_speed, before),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_invalid_cargo_falls_back() {
        let mut data = GameData::new();
        apply(&mut data, VehicleType::Train, 0, 2, 0x15, &[5, 50]);
        assert_eq!(data.engines[0].info.cargo_type, Some(5));
        assert_eq!(data.engines[1].info.cargo_type, None);
    }

    #[test]
    fn test_zero_power_makes_wagon() {
        let mut data = GameData::new();
        apply(&mut data, VehicleType::Train, 0, 1, 0x0B, &[0, 0]);
        assert!(data.engines[0].rail().unwrap().flags.contains(RailVehicleFlags::WAGON));
    }

    #[test]
    fn test_unknown_property() {
        let mut data = GameData::new();
        assert_eq!(apply(&mut data, VehicleType::Aircraft, 0, 1, 0x10, &[1]), Unknown);
        assert_eq!(apply(&mut data, VehicleType::Train, 0, 1, 0x18, &[1]), Unhandled);
    }
}

use tracing::{debug, warn};

use super::{for_each_id, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{CargoLabel, CargoSpec, INVALID_CARGO, NUM_CARGO};

use ChangeInfoResult::{InvalidId, Success, Unknown};

/// Feature 0B: the global cargo slots.
pub struct CargoSink<'s> {
    pub cargo: &'s mut [CargoSpec],
    pub grfid: u32,
}

impl<'s> CargoSink<'s> {
    fn apply(cs: &mut CargoSpec, grfid: u32, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x08 => {
                cs.bitnum = buf.read_u8()?;
                cs.owner = (cs.bitnum != INVALID_CARGO).then_some(grfid);
            }
            0x09 => cs.name = buf.read_u16_le()?,
            0x0A => cs.name_single = buf.read_u16_le()?,
            0x0B => cs.units_volume = buf.read_u16_le()?,
            0x0C => cs.quantifier = buf.read_u16_le()?,
            0x0D => cs.abbrev = buf.read_u16_le()?,
            0x0E => cs.sprite = buf.read_u16_le()?,
            0x0F => cs.weight = buf.read_u8()?,
            0x10 => cs.transit_periods[0] = buf.read_u8()?,
            0x11 => cs.transit_periods[1] = buf.read_u8()?,
            0x12 => cs.initial_payment = buf.read_u32_le()?,
            0x13 => cs.rating_colour = buf.read_u8()?,
            0x14 => cs.legend_colour = buf.read_u8()?,
            0x15 => cs.is_freight = buf.read_u8()? != 0,
            0x16 => cs.classes = buf.read_u16_le()?,
            0x17 => {
                cs.label = CargoLabel(buf.read_label()?);
                debug!(label = %cs.label, "cargo label set");
            }
            0x18 => cs.town_growth_effect = buf.read_u8()?,
            0x19 => cs.town_growth_multiplier = buf.read_u16_le()?,
            0x1A => cs.callback_mask = buf.read_u8()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for CargoSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if first as usize + count as usize > NUM_CARGO.min(self.cargo.len()) {
            warn!(first, count, max = NUM_CARGO, "cargo id out of bounds, skipping");
            return Ok(InvalidId);
        }
        let grfid = self.grfid;
        for_each_id(first, count, |id| Self::apply(&mut self.cargo[id], grfid, prop, buf))
    }
}

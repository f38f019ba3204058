use tracing::{debug, warn};

use super::{for_each_id, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{BridgeSpec, BRIDGE_SPRITE_TABLE_LEN, NUM_BRIDGE_SPRITE_TABLES};

use ChangeInfoResult::{InvalidId, Success, Unknown};

const ORIGINAL_BASE_YEAR: u32 = 1920;

pub struct BridgeSink<'s> {
    pub bridges: &'s mut [BridgeSpec],
    pub grfid: u32,
}

fn read_sprite_tables(bridge: &mut BridgeSpec, buf: &mut ByteReader) -> Result<()> {
    let first_table = buf.read_u8()?;
    let num_tables = buf.read_u8()?;
    if bridge.sprite_tables.len() < NUM_BRIDGE_SPRITE_TABLES {
        bridge.sprite_tables.resize(NUM_BRIDGE_SPRITE_TABLES, None);
    }
    for table_id in first_table as usize..first_table as usize + num_tables as usize {
        let mut table = Vec::with_capacity(BRIDGE_SPRITE_TABLE_LEN);
        for _ in 0..BRIDGE_SPRITE_TABLE_LEN {
            table.push(buf.read_u32_le()?);
        }
        match bridge.sprite_tables.get_mut(table_id) {
            Some(slot) => *slot = Some(table),
            None => debug!(table_id, "bridge sprite table out of range, skipping"),
        }
    }
    Ok(())
}

impl<'s> BridgeSink<'s> {
    fn apply(bridge: &mut BridgeSpec, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        match prop {
            0x08 => bridge.avail_year = ORIGINAL_BASE_YEAR + buf.read_u8()? as u32,
            0x09 => bridge.min_length = buf.read_u8()?,
            0x0A => bridge.max_length = buf.read_u8()? as u16,
            0x0B => bridge.price = buf.read_u8()? as u16,
            0x0C => {
                let speed = buf.read_u16_le()?;
                if speed != 0 {
                    bridge.speed = speed;
                }
            }
            0x0D => read_sprite_tables(bridge, buf)?,
            0x0E => bridge.flags = buf.read_u8()?,
            0x0F => bridge.avail_year = buf.read_u32_le()?,
            0x10 => bridge.material = buf.read_u16_le()?,
            0x11 => bridge.transport_name[0] = buf.read_u16_le()?,
            0x12 => bridge.transport_name[1] = buf.read_u16_le()?,
            0x13 => bridge.cost_multiplier = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for BridgeSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if first as usize + count as usize > self.bridges.len() {
            warn!(first, count, max = self.bridges.len(), "bridge id out of bounds, skipping");
            return Ok(InvalidId);
        }
        let grfid = self.grfid;
        for_each_id(first, count, |id| {
            let bridge = &mut self.bridges[id];
            bridge.owner = Some(grfid);
            Self::apply(bridge, prop, buf)
        })
    }
}

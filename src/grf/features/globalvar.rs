use tracing::{debug, warn};

use super::{for_each_id, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{CargoLabel, Economy, NUM_PRICES, SNOW_LINE_DAYS, SNOW_LINE_MONTHS};

use ChangeInfoResult::{InvalidId, Success, Unhandled, Unknown};

/// Four raw bytes of a currency prefix/suffix, up to the first NUL.
fn currency_affix(raw: u32) -> String {
    raw.to_le_bytes().iter().take_while(|&&b| b != 0).map(|&b| b as char).collect()
}

/// Feature 08: economy settings and the file's cargo translation table.
pub struct GlobalVarSink<'s> {
    pub economy: &'s mut Economy,
    pub cargo_list: &'s mut Vec<CargoLabel>,
}

impl<'s> GlobalVarSink<'s> {
    fn apply(&mut self, id: usize, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        let economy = &mut *self.economy;
        match prop {
            0x08 => {
                let factor = buf.read_u8()?;
                match economy.price_base_multiplier.get_mut(id) {
                    Some(slot) => *slot = factor,
                    None => debug!(id, max = NUM_PRICES, "price out of range, ignoring"),
                }
            }
            0x09 => {
                let label = CargoLabel(buf.read_label()?);
                if self.cargo_list.len() <= id {
                    self.cargo_list.resize(id + 1, CargoLabel::default());
                }
                self.cargo_list[id] = label;
            }
            0x0A..=0x0F => {
                let value = match prop {
                    0x0A | 0x0C | 0x0F => buf.read_u16_le()? as u32,
                    _ => buf.read_u32_le()?,
                };
                let Some(currency) = economy.currencies.get_mut(id) else {
                    debug!(id, "currency out of range, ignoring");
                    return Ok(Success);
                };
                match prop {
                    0x0A => currency.name = value as u16,
                    0x0B => currency.rate = (value / 1000) as u16,
                    0x0C => {
                        currency.separator = value as u8;
                        currency.symbol_pos = ((value >> 8) & 1) as u8;
                    }
                    0x0D => currency.prefix = currency_affix(value),
                    0x0E => currency.suffix = currency_affix(value),
                    _ => currency.to_euro = value as u16,
                }
            }
            0x10 => {
                let raw = buf.read_bytes(SNOW_LINE_MONTHS * SNOW_LINE_DAYS)?;
                if economy.snow_line.is_some() {
                    warn!("snow line table can only be set once");
                } else {
                    let mut table = Box::new([[0u8; SNOW_LINE_DAYS]; SNOW_LINE_MONTHS]);
                    for (month, row) in table.iter_mut().enumerate() {
                        row.copy_from_slice(&raw[month * SNOW_LINE_DAYS..(month + 1) * SNOW_LINE_DAYS]);
                    }
                    economy.snow_line = Some(table);
                }
            }
            0x11 => {
                buf.skip(8)?;
                return Ok(Unhandled);
            }
            0x12 => {
                buf.skip(4)?;
                return Ok(Unhandled);
            }
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for GlobalVarSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if prop == 0x09 {
            if first != 0 {
                warn!(first, "cargo translation table must start at zero");
                return Ok(InvalidId);
            }
            self.cargo_list.clear();
        }
        for_each_id(first, count, |id| self.apply(id, prop, buf))
    }
}

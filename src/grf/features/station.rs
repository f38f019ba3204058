use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{for_each_id, CargoKey, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::file::MAX_SPEC_SLOTS;
use crate::grf::sprite_group::{GroupRef, TileSeq};
use crate::tables::StationClasses;

use ChangeInfoResult::{InvalidId, Success, Unknown};

/// Ground image plus the building sprites drawn on one station tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StationLayout {
    pub ground: u32,
    pub seq: Vec<TileSeq>,
}

/// Platform layout bytes, indexed by `[length - 1][platforms - 1]`.
pub type CustomLayouts = Vec<Vec<Option<Vec<u8>>>>;

/// A custom station defined by one file.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSpec {
    pub class_label: u32,
    pub class_id: u8,
    pub name: u32,
    pub renderdata: Vec<StationLayout>,
    pub callback_mask: u8,
    pub disallowed_platforms: u8,
    pub disallowed_lengths: u8,
    pub layouts: CustomLayouts,
    pub cargo_threshold: u16,
    pub pylons: u8,
    pub cargo_triggers: u32,
    pub flags: u8,
    pub wires: u8,
    pub blocked: u8,
    pub animation_frames: u8,
    pub animation_status: u8,
    pub animation_speed: u8,
    pub animation_triggers: u16,
    /// Groups bound by action 03, per cargo
    pub groups: IndexMap<CargoKey, GroupRef>,
}

impl StationSpec {
    pub fn new(class_label: u32, class_id: u8) -> Self {
        Self {
            class_label,
            class_id,
            name: 0,
            renderdata: Vec::new(),
            callback_mask: 0,
            disallowed_platforms: 0,
            disallowed_lengths: 0,
            layouts: Vec::new(),
            cargo_threshold: 0,
            pylons: 0,
            cargo_triggers: 0,
            flags: 0,
            wires: 0,
            blocked: 0,
            animation_frames: 0,
            animation_status: 0,
            animation_speed: 2,
            animation_triggers: 0,
            groups: IndexMap::new(),
        }
    }
}

fn read_layouts(buf: &mut ByteReader) -> Result<Vec<StationLayout>> {
    let tiles = buf.read_extended()?;
    let mut layouts = Vec::with_capacity(tiles as usize);
    for _ in 0..tiles {
        let ground = buf.read_u32_le()?;
        let mut seq = Vec::new();
        loop {
            let delta_x = buf.read_u8()?;
            if delta_x == 0x80 {
                break;
            }
            let delta_y = buf.read_i8()?;
            let delta_z = buf.read_u8()?;
            let (size_x, size_y, size_z) = if delta_z == TileSeq::CHILD {
                (0, 0, 0)
            } else {
                (buf.read_u8()?, buf.read_u8()?, buf.read_u8()?)
            };
            let image = buf.read_u32_le()?;
            seq.push(TileSeq { image, delta_x: delta_x as i8, delta_y, delta_z, size_x, size_y, size_z });
        }
        layouts.push(StationLayout { ground, seq });
    }
    Ok(layouts)
}

fn read_custom_layouts(buf: &mut ByteReader) -> Result<CustomLayouts> {
    let mut layouts: CustomLayouts = Vec::new();
    loop {
        let length = buf.read_u8()?;
        let number = buf.read_u8()?;
        if length == 0 && number == 0 {
            break;
        }
        let bytes = buf.read_bytes(length as usize * number as usize)?.to_vec();
        if length == 0 || number == 0 {
            debug!(length, number, "empty custom station layout");
            continue;
        }
        let (l, n) = (length as usize - 1, number as usize - 1);
        if layouts.len() <= l {
            layouts.resize(l + 1, Vec::new());
        }
        if layouts[l].len() <= n {
            layouts[l].resize(n + 1, None);
        }
        layouts[l][n] = Some(bytes);
    }
    Ok(layouts)
}

/// Station properties of one file's spec table.
pub struct StationSink<'s> {
    pub stations: &'s mut [Option<StationSpec>],
    pub classes: &'s mut StationClasses,
}

impl<'s> StationSink<'s> {
    fn apply(&mut self, id: usize, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if prop == 0x08 {
            let label = buf.read_label()?;
            let class_id = match self.classes.allocate(label) {
                Some(class) => class,
                None => {
                    warn!(id, "no free station class, using default");
                    0
                }
            };
            let slot = &mut self.stations[id];
            match slot {
                Some(spec) => {
                    spec.class_label = label;
                    spec.class_id = class_id;
                }
                None => *slot = Some(StationSpec::new(label, class_id)),
            }
            return Ok(Success);
        }

        // copies read the source slot before the target is borrowed
        let copy_source = match prop {
            0x0A | 0x0F => {
                let src = buf.read_u8()? as usize;
                match self.stations.get(src).and_then(|s| s.as_ref()) {
                    Some(spec) if prop == 0x0A => Some((Some(spec.renderdata.clone()), None)),
                    Some(spec) => Some((None, Some(spec.layouts.clone()))),
                    None => {
                        warn!(src, target = id, "copy from undefined station");
                        return Ok(Success);
                    }
                }
            }
            _ => None,
        };

        let mut scratch = None;
        let spec = match &mut self.stations[id] {
            Some(spec) => spec,
            None => {
                debug!(id, prop, "property on undefined station, ignoring");
                scratch.insert(StationSpec::new(0, 0))
            }
        };

        match prop {
            0x09 => spec.renderdata = read_layouts(buf)?,
            0x0A | 0x0F => match copy_source {
                Some((Some(render), _)) => spec.renderdata = render,
                Some((_, Some(layouts))) => spec.layouts = layouts,
                _ => {}
            },
            0x0B => spec.callback_mask = buf.read_u8()?,
            0x0C => spec.disallowed_platforms = buf.read_u8()?,
            0x0D => spec.disallowed_lengths = buf.read_u8()?,
            0x0E => spec.layouts = read_custom_layouts(buf)?,
            0x10 => spec.cargo_threshold = buf.read_u16_le()?,
            0x11 => spec.pylons = buf.read_u8()?,
            0x12 => spec.cargo_triggers = buf.read_u32_le()?,
            0x13 => spec.flags = buf.read_u8()?,
            0x14 => spec.wires = buf.read_u8()?,
            0x15 => spec.blocked = buf.read_u8()?,
            0x16 => {
                let info = buf.read_u16_le()?;
                spec.animation_frames = info as u8;
                spec.animation_status = (info >> 8) as u8;
            }
            0x17 => spec.animation_speed = buf.read_u8()?,
            0x18 => spec.animation_triggers = buf.read_u16_le()?,
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for StationSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if first as usize + count as usize > MAX_SPEC_SLOTS.min(self.stations.len()) {
            warn!(first, count, max = MAX_SPEC_SLOTS, "station id out of bounds, skipping");
            return Ok(InvalidId);
        }
        for_each_id(first, count, |id| self.apply(id, prop, buf))
    }
}

//! Action 04 (new names) and action 13 (translations for another file).

use tracing::{debug, trace, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::config::{format_grfid, GrfMessage, GrfStatus};
use crate::grf::context::LoadContext;
use crate::grf::features::{FEATURE_AIRCRAFT, FEATURE_SOUNDFX};
use crate::host::{decode_text, LANGUAGE_ANY};
use crate::tables::VehicleType;

/// Feature byte selecting generic text in action 04.
const FEATURE_GENERIC_TEXT: u8 = 0x48;

/// File-local id space of vehicle names, kept clear of the generic ranges.
const ENGINE_NAME_BASE: u16 = 0xC000;

/// Ids a file may define as free-standing text.
pub fn is_generic_text_id(id: u32) -> bool {
    (0xD000..0xD400).contains(&id) || (0xD800..0x10000).contains(&id)
}

/// `<04> <feature> <lang> <num> <first-id> <names...>`
///
/// Bit 7 of `lang` marks generic text, which always has a word id; vehicle
/// ids are extended bytes, everything else a byte.
pub fn new_names(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let feature = buf.read_u8()?;
    if feature > FEATURE_SOUNDFX && feature != FEATURE_GENERIC_TEXT {
        warn!(feature, "unsupported feature for new names, skipping");
        return Ok(ControlSignal::Continue);
    }

    let raw_lang = buf.read_u8()?;
    let num = buf.read_u8()? as u32;
    let generic = raw_lang & 0x80 != 0;
    let mut id = if generic {
        buf.read_u16_le()? as u32
    } else if feature <= FEATURE_AIRCRAFT {
        buf.read_extended()? as u32
    } else {
        buf.read_u8()? as u32
    };
    let lang = raw_lang & 0x7F;
    let end = id + num;
    debug!(feature, lang, first = id, end, "new names");

    let grfid = ctx.grfid();
    while id < end && buf.has_data() {
        let name = decode_text(buf.read_string()?);
        trace!(id = format_args!("{:#06x}", id), name = %name, "name");
        set_name(ctx, grfid, feature, generic, id, lang, &name);
        id += 1;
    }
    Ok(ControlSignal::Continue)
}

fn set_name(ctx: &mut LoadContext, grfid: u32, feature: u8, generic: bool, id: u32, lang: u8, name: &str) {
    if let Some(vtype) = VehicleType::from_feature(feature) {
        if generic {
            ctx.strings.register_string(grfid, id as u16, lang, name);
            return;
        }
        if id as usize >= vtype.count() {
            warn!(feature, id, "naming undefined vehicle, ignoring");
            return;
        }
        let engine = vtype.first_engine() + id as usize;
        let string = ctx.strings.register_string(grfid, ENGINE_NAME_BASE + engine as u16, lang, name);
        ctx.tables.engines[engine].info.name = string;
        return;
    }

    if is_generic_text_id(id) {
        ctx.strings.register_string(grfid, id as u16, lang, name);
        return;
    }

    let local = (id & 0xFF) as usize;
    match id >> 8 {
        0xC4 => {
            let class = ctx.file().stations.get(local).and_then(|s| s.as_ref()).map(|s| s.class_id);
            match class {
                Some(class) => {
                    let string = ctx.strings.register_string(grfid, id as u16, lang, name);
                    ctx.tables.station_classes.set_name(class, string);
                }
                None => warn!(station = local, "naming class of undefined station, ignoring"),
            }
        }
        0xC5 => {
            if ctx.file().stations.get(local).map_or(true, |s| s.is_none()) {
                warn!(station = local, "naming undefined station, ignoring");
                return;
            }
            let string = ctx.strings.register_string(grfid, id as u16, lang, name);
            if let Some(Some(station)) = ctx.file_mut().stations.get_mut(local) {
                station.name = string;
            }
        }
        0xC9 => {
            if ctx.file().houses.get(local).map_or(true, |h| h.is_none()) {
                warn!(house = local, "naming undefined house, ignoring");
                return;
            }
            ctx.strings.register_string(grfid, id as u16, lang, name);
            // houses keep the file-local id, resolved through the string table
            if let Some(Some(house)) = ctx.file_mut().houses.get_mut(local) {
                house.spec.building_name = id as u16;
            }
        }
        _ => debug!(id = format_args!("{:#06x}", id), "unsupported name id"),
    }
}

/// `<13> <grfid:D> [<lang>] <num> <first-id:W> <strings...>`, the language
/// byte only from format version 8 on.
pub fn translate_names(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let grfid = buf.read_u32_le()?;
    let status = ctx.config_by_grfid(grfid, u32::MAX).map(|idx| ctx.configs[idx].status);
    match status {
        Some(GrfStatus::Activated) => {}
        Some(GrfStatus::Initialised) => {
            // the translated file has to be active first
            let signal = ctx.disable_current(Some(GrfMessage::MustBeLoadedAfter));
            if let Some(error) = ctx.config_mut().error.as_mut() {
                error.data = Some(format!("file {}", format_grfid(grfid)));
            }
            return Ok(signal);
        }
        _ => {
            debug!(grfid = %format_grfid(grfid), "translated file unknown, skipping");
            return Ok(ControlSignal::Continue);
        }
    }

    let lang = if ctx.file().grf_version >= 8 { buf.read_u8()? } else { LANGUAGE_ANY };
    let num = buf.read_u8()? as u32;
    let first = buf.read_u16_le()? as u32;
    let last = first + num;
    let in_range = (first >= 0xD000 && last <= 0xD400) || (first >= 0xD800 && last <= 0xE000);
    if !in_range {
        warn!(first = format_args!("{:#06x}", first), num, "translation ids out of range, skipping");
        return Ok(ControlSignal::Continue);
    }

    for i in 0..num {
        if !buf.has_data() {
            break;
        }
        let text = decode_text(buf.read_string()?);
        if text.is_empty() {
            trace!("ignoring empty translation");
            continue;
        }
        ctx.strings.register_string(grfid, (first + i) as u16, lang, &text);
    }
    Ok(ControlSignal::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::grf::action::dispatch;
    use crate::grf::features::house::HouseDef;
    use crate::grf::features::station::StationSpec;
    use crate::tables::HouseSpec;
    use crate::testutil::test_context;

    fn names(feature: u8, lang: u8, first: &[u8], texts: &[&str]) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.write_u8(0x04).write_u8(feature).write_u8(lang).write_u8(texts.len() as u8).write_bytes(first);
        for text in texts {
            w.write_string(text);
        }
        w.into_vec()
    }

    #[test]
    fn test_vehicle_names() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grfid = 0x11;
        dispatch(&mut ctx, &names(0x01, 0x7F, &[2], &["Bus A", "Bus B"]));
        let first = VehicleType::Road.first_engine();
        let name = ctx.tables.engines[first + 3].info.name;
        assert_eq!(ctx.strings.lookup(0x11, ENGINE_NAME_BASE + (first + 3) as u16), Some(name));
        assert_ne!(ctx.tables.engines[first + 2].info.name, name);
    }

    #[test]
    fn test_generic_text() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grfid = 0x11;
        dispatch(&mut ctx, &names(0x48, 0xFF, &[0x00, 0xD0], &["Hello", "World"]));
        assert!(ctx.strings.lookup(0x11, 0xD000).is_some());
        assert!(ctx.strings.lookup(0x11, 0xD001).is_some());
        assert!(ctx.strings.lookup(0x11, 0xD002).is_none());
    }

    #[test]
    fn test_station_and_house_names() {
        let mut ctx = test_context(&["a.grf"]);
        let class = ctx.tables.station_classes.allocate(u32::from_be_bytes(*b"TEST")).unwrap();
        ctx.file_mut().stations[3] = Some(StationSpec::new(u32::from_be_bytes(*b"TEST"), class));
        ctx.file_mut().houses[1] = Some(HouseDef { spec: HouseSpec::original(0), group: None });

        dispatch(&mut ctx, &names(0x04, 0x80, &[0x03, 0xC4], &["Test class"]));
        dispatch(&mut ctx, &names(0x04, 0x80, &[0x03, 0xC5], &["Test halt"]));
        dispatch(&mut ctx, &names(0x07, 0x80, &[0x01, 0xC9], &["Cottage"]));
        // undefined station: ignored
        dispatch(&mut ctx, &names(0x04, 0x80, &[0x04, 0xC5], &["Nothing"]));

        let station_name = ctx.file().stations[3].as_ref().unwrap().name;
        assert_ne!(station_name, 0);
        assert_ne!(ctx.tables.station_classes.get(class).unwrap().name, 0);
        assert_eq!(ctx.file().houses[1].as_ref().unwrap().spec.building_name, 0xC901);
        assert!(ctx.strings.lookup(0, 0xC504).is_none());
    }

    #[test]
    fn test_truncated_list_stops() {
        let mut ctx = test_context(&["a.grf"]);
        let mut record = names(0x48, 0xFF, &[0x00, 0xD8], &["One"]);
        record[3] = 5;
        assert_eq!(dispatch(&mut ctx, &record), ControlSignal::Continue);
        assert!(ctx.strings.lookup(0, 0xD800).is_some());
        assert!(ctx.strings.lookup(0, 0xD801).is_none());
    }

    fn translate(grfid: u32, lang: Option<u8>, first: u16, texts: &[&str]) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.write_u8(0x13).write_u32_le(grfid);
        if let Some(lang) = lang {
            w.write_u8(lang);
        }
        w.write_u8(texts.len() as u8).write_u16_le(first);
        for text in texts {
            w.write_string(text);
        }
        w.into_vec()
    }

    #[test]
    fn test_translation_for_active_file() {
        let mut ctx = test_context(&["a.grf", "b.grf"]);
        ctx.file_mut().grf_version = 8;
        ctx.configs[1].ident.grfid = 0xBB;
        ctx.configs[1].status = GrfStatus::Activated;
        dispatch(&mut ctx, &translate(0xBB, Some(0x02), 0xD000, &["Hallo", ""]));
        assert!(ctx.strings.lookup(0xBB, 0xD000).is_some());
        assert!(ctx.strings.lookup(0xBB, 0xD001).is_none());

        // out of range
        dispatch(&mut ctx, &translate(0xBB, Some(0x02), 0xD3FF, &["a", "b"]));
        assert!(ctx.strings.lookup(0xBB, 0xD3FF).is_none());
    }

    #[test]
    fn test_translation_requires_load_order() {
        let mut ctx = test_context(&["a.grf", "b.grf"]);
        ctx.configs[1].ident.grfid = 0xBB;
        ctx.configs[1].status = GrfStatus::Initialised;
        assert_eq!(dispatch(&mut ctx, &translate(0xBB, None, 0xD000, &["x"])), ControlSignal::AbortFile);
        assert_eq!(ctx.config().status, GrfStatus::Disabled);
        assert_eq!(ctx.config().error.as_ref().unwrap().message, GrfMessage::MustBeLoadedAfter);

        let mut ctx = test_context(&["a.grf"]);
        assert_eq!(dispatch(&mut ctx, &translate(0xCC, None, 0xD000, &["x"])), ControlSignal::Continue);
        assert!(ctx.config().is_usable());
    }
}

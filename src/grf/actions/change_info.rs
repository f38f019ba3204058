//! Action 00: set properties of a range of ids of one feature.
//!
//! `<00> <feature> <num-props> <num-info> <first-id:ext> (<prop> <values>...)...`

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::config::GrfConfigFlags;
use crate::grf::context::LoadContext;
use crate::grf::features::bridge::BridgeSink;
use crate::grf::features::cargo::CargoSink;
use crate::grf::features::globalvar::GlobalVarSink;
use crate::grf::features::house::HouseSink;
use crate::grf::features::sound::SoundSink;
use crate::grf::features::station::StationSink;
use crate::grf::features::vehicle::VehicleSink;
use crate::grf::features::{
    CargoLookup, ChangeInfoResult, PropertySink, FEATURE_BRIDGES, FEATURE_CARGOES, FEATURE_GLOBALVAR,
    FEATURE_HOUSES, FEATURE_SOUNDFX, FEATURE_STATIONS,
};
use crate::grf::stage::LoadingStage;
use crate::tables::{Economy, GameData, VehicleType};

struct Header {
    feature: u8,
    numprops: u8,
    numinfo: u8,
    first: u16,
}

fn read_header(buf: &mut ByteReader) -> Result<Header> {
    buf.ensure_length(5, "change info")?;
    Ok(Header {
        feature: buf.read_u8()?,
        numprops: buf.read_u8()?,
        numinfo: buf.read_u8()?,
        first: buf.read_extended()?,
    })
}

fn is_supported(feature: u8) -> bool {
    matches!(
        feature,
        0x00..=0x03 | FEATURE_STATIONS | FEATURE_BRIDGES | FEATURE_HOUSES | FEATURE_GLOBALVAR | FEATURE_CARGOES | FEATURE_SOUNDFX
    )
}

/// Hand one property to the sink of `feature`. In the reserve stage global
/// variables other than the cargo translation table land in a scratch copy.
fn apply_property(
    ctx: &mut LoadContext,
    feature: u8,
    first: u16,
    count: u16,
    prop: u8,
    buf: &mut ByteReader,
) -> Result<ChangeInfoResult> {
    let reserve = ctx.stage < LoadingStage::Activation;
    let cur = ctx.cur_file;
    let file = &mut ctx.registry[cur];
    let GameData { engines, cargo, bridges, houses, sounds, station_classes, economy, .. } = &mut ctx.tables;

    match feature {
        FEATURE_STATIONS => StationSink { stations: &mut file.stations, classes: station_classes }.change_info(first, count, prop, buf),
        FEATURE_BRIDGES => BridgeSink { bridges, grfid: file.grfid }.change_info(first, count, prop, buf),
        FEATURE_HOUSES => HouseSink {
            houses: &mut file.houses,
            originals: houses,
            cargo: CargoLookup::new(&file.cargo_list, cargo),
            grfid: file.grfid,
        }
        .change_info(first, count, prop, buf),
        FEATURE_GLOBALVAR if reserve => {
            let mut scratch = Economy::default();
            GlobalVarSink { economy: &mut scratch, cargo_list: &mut file.cargo_list }.change_info(first, count, prop, buf)
        }
        FEATURE_GLOBALVAR => GlobalVarSink { economy, cargo_list: &mut file.cargo_list }.change_info(first, count, prop, buf),
        FEATURE_CARGOES => CargoSink { cargo, grfid: file.grfid }.change_info(first, count, prop, buf),
        FEATURE_SOUNDFX => SoundSink { sounds, sound_offset: file.sound_offset, num_sounds: file.num_sounds }
            .change_info(first, count, prop, buf),
        _ => match VehicleType::from_feature(feature) {
            Some(vtype) => VehicleSink { vtype, engines, cargo: CargoLookup::new(&file.cargo_list, cargo) }
                .change_info(first, count, prop, buf),
            None => Ok(ChangeInfoResult::Unknown),
        },
    }
}

fn run_properties(ctx: &mut LoadContext, header: &Header, buf: &mut ByteReader) -> Result<ControlSignal> {
    let Header { feature, numprops, numinfo, first } = *header;
    for _ in 0..numprops {
        let prop = buf.read_u8()?;
        let result = apply_property(ctx, feature, first, numinfo as u16, prop, buf)?;
        match result {
            ChangeInfoResult::Success => {}
            ChangeInfoResult::Unhandled => debug!(feature, prop, "property ignored"),
            ChangeInfoResult::Unknown => {
                warn!(feature, prop, line = ctx.nfo_line, "unknown property, skipping rest of action");
                break;
            }
            ChangeInfoResult::InvalidId => {
                warn!(feature, prop, first, numinfo, line = ctx.nfo_line, "invalid id, skipping rest of action");
                break;
            }
        }
    }
    Ok(ControlSignal::Continue)
}

pub fn feature_change_info(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let header = read_header(buf)?;
    if !is_supported(header.feature) {
        warn!(feature = header.feature, "unsupported feature, skipping");
        return Ok(ControlSignal::Continue);
    }
    if header.numprops == 0 || header.numinfo == 0 {
        debug!(feature = header.feature, "empty change info");
        return Ok(ControlSignal::Continue);
    }
    debug!(feature = header.feature, numprops = header.numprops, first = header.first, numinfo = header.numinfo, "change info");
    run_properties(ctx, &header, buf)
}

/// Reserve stage: cargo types and the cargo translation table must be known
/// before any file activates.
pub fn reserve_change_info(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let header = read_header(buf)?;
    if header.feature != FEATURE_CARGOES && header.feature != FEATURE_GLOBALVAR {
        return Ok(ControlSignal::Continue);
    }
    run_properties(ctx, &header, buf)
}

/// Safety scan: only bridge sprite tables and overrides between static
/// files leave the game state untouched.
pub fn safe_change_info(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let header = read_header(buf)?;
    if header.numprops == 1 {
        let prop = buf.read_u8()?;
        if header.feature == FEATURE_BRIDGES && prop == 0x0D {
            return Ok(ControlSignal::Continue);
        }
        if header.feature == FEATURE_GLOBALVAR && prop == 0x11 {
            let mut safe = true;
            for _ in 0..header.numinfo {
                let source = buf.read_u32_le()?;
                let _target = buf.read_u32_le()?;
                if let Some(idx) = ctx.config_by_grfid(source, u32::MAX) {
                    if !ctx.configs[idx].flags.contains(GrfConfigFlags::SYSTEM) {
                        safe = false;
                        break;
                    }
                }
            }
            if safe {
                return Ok(ControlSignal::Continue);
            }
        }
    }
    Ok(ctx.mark_unsafe())
}

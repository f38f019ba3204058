//! Action 03: bind sprite groups to content.
//!
//! `<03> <feature> <n-id> <ids...> <num-cid> [<cargo> <cid:W>]... <def-cid:W>`
//!
//! Bit 7 of `n-id` marks a wagon override: the groups apply to the listed
//! wagons only when pulled by one of the engines of the previous plain
//! action 03 of this file.

use tracing::{debug, info, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::context::LoadContext;
use crate::grf::features::{CargoKey, CargoLookup, FEATURE_AIRCRAFT, FEATURE_CARGOES, FEATURE_HOUSES, FEATURE_STATIONS};
use crate::grf::sprite_group::GroupRef;
use crate::tables::{VehicleType, INVALID_CARGO, NUM_CARGO};

/// Raw cargo id selecting the purchase-list group.
const CARGO_PURCHASE: u8 = 0xFF;

struct Mapping {
    ids: Vec<u16>,
    /// Cargo-specific groups, raw file-local cargo ids
    cargo: Vec<(u8, u16)>,
    default: u16,
}

fn read_mapping(buf: &mut ByteReader, n_ids: u8, extended_ids: bool) -> Result<Mapping> {
    let mut ids = Vec::with_capacity(n_ids as usize);
    for _ in 0..n_ids {
        ids.push(if extended_ids { buf.read_extended()? } else { buf.read_u8()? as u16 });
    }
    let num_cargo = buf.read_u8()?;
    let mut cargo = Vec::with_capacity(num_cargo as usize);
    for _ in 0..num_cargo {
        let ctype = buf.read_u8()?;
        cargo.push((ctype, buf.read_u16_le()?));
    }
    let default = buf.read_u16_le()?;
    Ok(Mapping { ids, cargo, default })
}

/// Group `id` of the current file; `None` (with a warning) if the slot is empty.
fn defined_group(ctx: &LoadContext, id: u16) -> Option<GroupRef> {
    match ctx.file().sprite_groups.reference(id) {
        r @ GroupRef::Bound(_) => Some(r),
        _ => {
            warn!(group = id, "mapping undefined sprite group, skipping");
            None
        }
    }
}

/// Cargo key for a raw cargo id of a vehicle or station mapping.
fn cargo_key(ctx: &LoadContext, ctype: u8) -> Option<CargoKey> {
    if ctype == CARGO_PURCHASE {
        return Some(CargoKey::Purchase);
    }
    let lookup = CargoLookup::new(&ctx.file().cargo_list, &ctx.tables.cargo);
    match lookup.translate(ctype) {
        Some(slot) => Some(CargoKey::Cargo(slot)),
        None => {
            debug!(ctype, "cargo type not available, ignoring");
            None
        }
    }
}

/// Groups of a mapping keyed by cargo, default last.
fn keyed_groups(ctx: &LoadContext, mapping: &Mapping) -> Vec<(CargoKey, GroupRef)> {
    let mut groups = Vec::with_capacity(mapping.cargo.len() + 1);
    for &(ctype, group) in &mapping.cargo {
        let Some(key) = cargo_key(ctx, ctype) else {
            continue;
        };
        if let Some(group) = defined_group(ctx, group) {
            groups.push((key, group));
        }
    }
    if let Some(group) = defined_group(ctx, mapping.default) {
        groups.push((CargoKey::Default, group));
    }
    groups
}

fn map_vehicles(ctx: &mut LoadContext, vtype: VehicleType, mapping: &Mapping, wagon_override: bool) {
    let mut engines = Vec::with_capacity(mapping.ids.len());
    for &id in &mapping.ids {
        if id as usize >= vtype.count() {
            warn!(?vtype, id, "mapping to undefined vehicle, ignoring");
            continue;
        }
        engines.push(vtype.first_engine() + id as usize);
    }

    if wagon_override && ctx.file().last_engines.is_empty() {
        warn!("wagon override without a previous engine mapping, skipping");
        return;
    }

    let groups = keyed_groups(ctx, mapping);
    let grfid = ctx.grfid();
    if wagon_override {
        let trains = ctx.file().last_engines.clone();
        for &engine in &engines {
            for (key, group) in &groups {
                ctx.bindings.add_wagon_override(engine, *key, &trains, group.clone());
            }
        }
        debug!(wagons = engines.len(), trains = trains.len(), "wagon override");
        return;
    }

    for &engine in &engines {
        for (key, group) in &groups {
            ctx.bindings.set_custom_group(engine, *key, group.clone());
        }
        ctx.bindings.set_owner(engine, grfid);
    }
    ctx.file_mut().last_engines = engines;
}

fn map_stations(ctx: &mut LoadContext, mapping: &Mapping) {
    let groups = keyed_groups(ctx, mapping);
    let grfid = ctx.grfid();
    for &id in &mapping.ids {
        let local = id as u8;
        let Some(Some(station)) = ctx.file_mut().stations.get_mut(local as usize) else {
            warn!(station = local, "mapping to undefined station, ignoring");
            continue;
        };
        for (key, group) in &groups {
            station.groups.insert(*key, group.clone());
        }
        let class = station.class_id;
        ctx.tables.station_classes.register(class, grfid, local);
    }
}

fn map_houses(ctx: &mut LoadContext, mapping: &Mapping) {
    if !mapping.cargo.is_empty() {
        debug!(num = mapping.cargo.len(), "cargo-specific house groups are ignored");
    }
    let Some(group) = defined_group(ctx, mapping.default) else {
        return;
    };
    for &id in &mapping.ids {
        match ctx.file_mut().houses.get_mut(id as usize) {
            Some(Some(house)) => house.group = Some(group.clone()),
            _ => warn!(house = id, "mapping to undefined house, ignoring"),
        }
    }
}

fn map_cargoes(ctx: &mut LoadContext, mapping: &Mapping) {
    let Some(group) = defined_group(ctx, mapping.default) else {
        return;
    };
    for &id in &mapping.ids {
        if id as usize >= NUM_CARGO || id as u8 == INVALID_CARGO {
            warn!(cargo = id, "cargo id out of range, ignoring");
            continue;
        }
        ctx.bindings.set_cargo_group(id as usize, group.clone());
    }
}

pub fn map_sprite_group(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let feature = buf.read_u8()?;
    let raw_ids = buf.read_u8()?;
    let wagon_override = raw_ids & 0x80 != 0;
    let n_ids = raw_ids & 0x7F;

    if n_ids == 0 {
        // feature-wide callbacks, nothing to bind to
        info!(feature, "action 03 without ids is not supported, ignoring");
        return Ok(ControlSignal::Continue);
    }

    let mapping = read_mapping(buf, n_ids, feature <= FEATURE_AIRCRAFT)?;
    debug!(feature, ids = mapping.ids.len(), cargo = mapping.cargo.len(), wagon_override, "map sprite groups");

    if let Some(vtype) = VehicleType::from_feature(feature) {
        map_vehicles(ctx, vtype, &mapping, wagon_override);
        return Ok(ControlSignal::Continue);
    }
    match feature {
        FEATURE_STATIONS => map_stations(ctx, &mapping),
        FEATURE_HOUSES => map_houses(ctx, &mapping),
        FEATURE_CARGOES => map_cargoes(ctx, &mapping),
        _ => warn!(feature, "unsupported feature for mapping, skipping"),
    }
    Ok(ControlSignal::Continue)
}

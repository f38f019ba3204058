//! Derived data that needs every file to have finished activation.

use ahash::{AHashMap, AHashSet};
use tracing::{debug, info, warn};

use crate::grf::actions::names::is_generic_text_id;
use crate::grf::config::{format_grfid, GrfStatus};
use crate::grf::context::LoadContext;
use crate::host::StringTable;
use crate::tables::GameData;

/// File-local string ids resolved to the ids the string table handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRemap {
    ids: AHashMap<(u32, u16), u32>,
}

impl StringRemap {
    pub fn get(&self, grfid: u32, local_id: u16) -> Option<u32> {
        self.ids.get(&(grfid, local_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn collect(&mut self, strings: &dyn StringTable, grfid: u32, local_id: u16) {
        if let Some(global) = strings.lookup(grfid, local_id) {
            self.ids.insert((grfid, local_id), global);
        } else {
            debug!(grfid = %format_grfid(grfid), local_id, "string never registered");
        }
    }
}

/// Run every finishing step over the loaded tables.
pub fn finalise(ctx: &mut LoadContext) -> StringRemap {
    calculate_refit_masks(&mut ctx.tables);

    let active: AHashSet<String> = ctx
        .configs
        .iter()
        .filter(|c| c.status == GrfStatus::Activated)
        .map(|c| c.filename.clone())
        .collect();
    build_station_legend(ctx, &active);
    finalise_houses(ctx, &active);

    let remap = remap_strings(&ctx.tables, ctx.strings.as_ref());
    info!(
        files = active.len(),
        houses = ctx.tables.houses.len(),
        strings = remap.len(),
        "loading finished"
    );
    remap
}

/// Turn refit bit numbers into cargo slots and settle each engine's default cargo.
pub fn calculate_refit_masks(data: &mut GameData) {
    let enabled = data.cargo_mask();
    let by_bitnum: Vec<Option<u8>> = (0..32).map(|bit| data.cargo_by_bitnum(bit)).collect();
    let classes: Vec<(usize, u16)> = data
        .cargo
        .iter()
        .enumerate()
        .filter(|(_, cs)| cs.is_valid())
        .map(|(slot, cs)| (slot, cs.classes))
        .collect();

    for (id, engine) in data.engines.iter_mut().enumerate() {
        let info = &mut engine.info;
        let mut slots = 0u64;
        for (bit, slot) in by_bitnum.iter().enumerate() {
            if info.refit_mask & (1 << bit) != 0 {
                if let Some(slot) = slot {
                    slots |= 1u64 << slot;
                }
            }
        }
        if info.refit_classes != 0 {
            for &(slot, cargo_classes) in &classes {
                if cargo_classes & info.refit_classes != 0 && cargo_classes & info.non_refit_classes == 0 {
                    slots |= 1u64 << slot;
                }
            }
        }
        slots &= enabled;
        info.refit_cargo_slots = slots;

        if slots == 0 {
            if info.cargo_type.is_none() {
                debug!(engine = id, "no default cargo and nothing to refit to");
            }
            continue;
        }
        let refittable = |cargo: u8| slots & (1u64 << cargo) != 0;
        if !info.cargo_type.is_some_and(refittable) {
            info.cargo_type = Some(slots.trailing_zeros() as u8);
        }
    }
}

/// Rebuild the class station lists from the stations of active files.
fn build_station_legend(ctx: &mut LoadContext, active: &AHashSet<String>) {
    let classes = &mut ctx.tables.station_classes;
    classes.clear_stations();
    for file in ctx.registry.iter().filter(|f| active.contains(&f.filename)) {
        for (local, spec) in file.stations.iter().enumerate() {
            let Some(spec) = spec else { continue };
            if spec.groups.is_empty() {
                debug!(file = %file.filename, station = local, "station without graphics, not listed");
                continue;
            }
            classes.register(spec.class_id, file.grfid, local as u8);
        }
    }
}

/// Disable custom houses that can never be built and publish the rest.
fn finalise_houses(ctx: &mut LoadContext, active: &AHashSet<String>) {
    for file in ctx.registry.iter_mut().filter(|f| active.contains(&f.filename)) {
        let grfid = file.grfid;
        for (local, def) in file.houses.iter_mut().enumerate() {
            let Some(def) = def else { continue };
            let spec = &mut def.spec;
            if !spec.enabled {
                continue;
            }
            if spec.min_year > spec.max_year {
                warn!(file = %file.filename, house = local, min = spec.min_year, max = spec.max_year, "house year range inverted, disabling");
                spec.enabled = false;
                continue;
            }
            if spec.probability == 0 {
                warn!(file = %file.filename, house = local, "house has zero probability, disabling");
                spec.enabled = false;
                continue;
            }
            let mut published = spec.clone();
            published.grf_prop = Some((grfid, local as u16));
            ctx.tables.houses.push(published);
        }
    }
}

/// Map the file-local text ids still stored in cargo, bridge and house
/// records to global ids. Engine names are registered as global ids already.
pub fn remap_strings(data: &GameData, strings: &dyn StringTable) -> StringRemap {
    let mut remap = StringRemap::default();
    for cs in data.cargo.iter().filter(|cs| cs.is_valid()) {
        let Some(grfid) = cs.owner else { continue };
        for id in [cs.name, cs.name_single, cs.units_volume, cs.quantifier, cs.abbrev] {
            if is_generic_text_id(id as u32) {
                remap.collect(strings, grfid, id);
            }
        }
    }
    for bridge in &data.bridges {
        let Some(grfid) = bridge.owner else { continue };
        for id in bridge.transport_name {
            if is_generic_text_id(id as u32) {
                remap.collect(strings, grfid, id);
            }
        }
    }
    for house in data.houses.iter().filter(|h| h.enabled) {
        if let Some((grfid, _)) = house.grf_prop {
            if house.building_name != 0 {
                remap.collect(strings, grfid, house.building_name);
            }
        }
    }
    remap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grf::features::house::HouseDef;
    use crate::grf::features::station::StationSpec;
    use crate::grf::features::CargoKey;
    use crate::grf::sprite_group::GroupRef;
    use crate::tables::HouseSpec;
    use crate::testutil::test_context;

    #[test]
    fn test_refit_mask_translation() {
        let mut data = GameData::new();
        let info = &mut data.engines[0].info;
        info.refit_mask = (1 << 0) | (1 << 2) | (1 << 20);
        info.cargo_type = None;
        calculate_refit_masks(&mut data);

        let info = &data.engines[0].info;
        // bit 20 names no enabled cargo
        assert_eq!(info.refit_cargo_slots, 0b101);
        assert_eq!(info.cargo_type, Some(0));
    }

    #[test]
    fn test_default_cargo_must_be_refittable() {
        let mut data = GameData::new();
        data.engines[1].info.refit_mask = 1 << 5;
        data.engines[1].info.cargo_type = Some(3);
        data.engines[2].info.refit_mask = (1 << 3) | (1 << 5);
        data.engines[2].info.cargo_type = Some(3);
        calculate_refit_masks(&mut data);
        assert_eq!(data.engines[1].info.cargo_type, Some(5));
        assert_eq!(data.engines[2].info.cargo_type, Some(3));
    }

    #[test]
    fn test_refit_classes() {
        let mut data = GameData::new();
        data.cargo[4].classes = 0x0010;
        data.cargo[6].classes = 0x0030;
        let info = &mut data.engines[0].info;
        info.refit_mask = 0;
        info.refit_classes = 0x0010;
        info.non_refit_classes = 0x0020;
        calculate_refit_masks(&mut data);
        assert_eq!(data.engines[0].info.refit_cargo_slots, 1 << 4);
    }

    #[test]
    fn test_nothing_refittable_keeps_default() {
        let mut data = GameData::new();
        let before = data.engines[7].info.cargo_type;
        data.engines[7].info.refit_mask = 0;
        data.engines[7].info.refit_classes = 0;
        calculate_refit_masks(&mut data);
        assert_eq!(data.engines[7].info.refit_cargo_slots, 0);
        assert_eq!(data.engines[7].info.cargo_type, before);
    }

    fn station_with_group(class: u8) -> StationSpec {
        let mut spec = StationSpec::new(u32::from_be_bytes(*b"TEST"), class);
        spec.groups.insert(CargoKey::Default, GroupRef::Callback(1));
        spec
    }

    #[test]
    fn test_station_legend_skips_disabled_files() {
        let mut ctx = test_context(&["a.grf", "b.grf"]);
        let class = ctx.tables.station_classes.allocate(u32::from_be_bytes(*b"TEST")).unwrap();
        ctx.registry[0].grfid = 0xAA;
        ctx.registry[1].grfid = 0xBB;
        ctx.registry[0].stations[2] = Some(station_with_group(class));
        ctx.registry[0].stations[3] = Some(StationSpec::new(u32::from_be_bytes(*b"TEST"), class));
        ctx.registry[1].stations[0] = Some(station_with_group(class));
        ctx.tables.station_classes.register(class, 0xBB, 0);
        ctx.configs[0].status = GrfStatus::Activated;
        ctx.configs[1].status = GrfStatus::Disabled;

        finalise(&mut ctx);
        let listed = &ctx.tables.station_classes.get(class).unwrap().stations;
        assert_eq!(listed, &vec![(0xAA, 2)]);
    }

    #[test]
    fn test_house_validation() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.configs[0].status = GrfStatus::Activated;
        ctx.registry[0].grfid = 0xAA;
        let originals = ctx.tables.houses.len();

        let mut good = HouseSpec::original(0);
        good.enabled = true;
        good.min_year = 1950;
        good.max_year = 2000;
        good.probability = 16;
        let mut inverted = good.clone();
        inverted.min_year = 2010;
        let mut unlikely = good.clone();
        unlikely.probability = 0;
        for (slot, spec) in [(0, good), (1, inverted), (2, unlikely)] {
            ctx.registry[0].houses[slot] = Some(HouseDef { spec, group: None });
        }

        finalise(&mut ctx);
        let houses = &ctx.registry[0].houses;
        assert!(houses[0].as_ref().unwrap().spec.enabled);
        assert!(!houses[1].as_ref().unwrap().spec.enabled);
        assert!(!houses[2].as_ref().unwrap().spec.enabled);
        assert_eq!(ctx.tables.houses.len(), originals + 1);
        assert_eq!(ctx.tables.houses[originals].grf_prop, Some((0xAA, 0)));
    }

    #[test]
    fn test_string_remap() {
        let mut ctx = test_context(&["a.grf"]);
        let cargo_name = ctx.strings.register_string(0xAA, 0xD010, 0x7F, "Fish");
        let bridge_name = ctx.strings.register_string(0xBB, 0xDC00, 0x7F, "Rail bridge");
        ctx.tables.cargo[1].owner = Some(0xAA);
        ctx.tables.cargo[1].name = 0xD010;
        // unregistered and outside the generic range
        ctx.tables.cargo[1].abbrev = 0x0123;
        ctx.tables.bridges[0].owner = Some(0xBB);
        ctx.tables.bridges[0].transport_name[0] = 0xDC00;

        let remap = remap_strings(&ctx.tables, ctx.strings.as_ref());
        assert_eq!(remap.get(0xAA, 0xD010), Some(cargo_name));
        assert_eq!(remap.get(0xBB, 0xDC00), Some(bridge_name));
        assert_eq!(remap.get(0xAA, 0x0123), None);
        assert_eq!(remap.len(), 2);
    }
}

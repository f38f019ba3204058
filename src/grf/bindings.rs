//! Sprite groups bound to global content by action 03.
//!
//! Vehicles and cargo types live in tables shared by all files, so their
//! groups are kept here rather than on the defining file. Station and house
//! groups stay on the per-file spec that owns them.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::grf::features::CargoKey;
use crate::grf::sprite_group::GroupRef;
use crate::tables::NUM_CARGO;

#[derive(Debug, Clone, PartialEq)]
pub struct WagonOverride {
    /// Engines this override applies behind
    pub trains: Vec<usize>,
    pub cargo: CargoKey,
    pub group: GroupRef,
}

#[derive(Debug, Clone, Default)]
pub struct EngineBindings {
    groups: AHashMap<usize, IndexMap<CargoKey, GroupRef>>,
    /// grfid of the file that last bound a group to an engine
    owners: AHashMap<usize, u32>,
    overrides: AHashMap<usize, Vec<WagonOverride>>,
    cargo: Vec<Option<GroupRef>>,
}

impl EngineBindings {
    pub fn new() -> Self {
        Self { cargo: vec![None; NUM_CARGO], ..Default::default() }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_custom_group(&mut self, engine: usize, cargo: CargoKey, group: GroupRef) {
        self.groups.entry(engine).or_default().insert(cargo, group);
    }

    pub fn set_owner(&mut self, engine: usize, grfid: u32) {
        self.owners.insert(engine, grfid);
    }

    pub fn owner(&self, engine: usize) -> Option<u32> {
        self.owners.get(&engine).copied()
    }

    pub fn custom_group(&self, engine: usize, cargo: CargoKey) -> Option<&GroupRef> {
        self.groups.get(&engine)?.get(&cargo)
    }

    /// Cargo-specific group if bound, the default group otherwise.
    pub fn group_for(&self, engine: usize, cargo: CargoKey) -> Option<&GroupRef> {
        let groups = self.groups.get(&engine)?;
        groups.get(&cargo).or_else(|| groups.get(&CargoKey::Default))
    }

    pub fn add_wagon_override(&mut self, wagon: usize, cargo: CargoKey, trains: &[usize], group: GroupRef) {
        let list = self.overrides.entry(wagon).or_default();
        match list.iter_mut().find(|o| o.cargo == cargo && o.trains == trains) {
            Some(existing) => existing.group = group,
            None => list.push(WagonOverride { trains: trains.to_vec(), cargo, group }),
        }
    }

    /// Override group for `wagon` when pulled by `train`.
    pub fn wagon_override(&self, wagon: usize, cargo: CargoKey, train: usize) -> Option<&GroupRef> {
        self.overrides
            .get(&wagon)?
            .iter()
            .filter(|o| o.trains.contains(&train))
            .find(|o| o.cargo == cargo || o.cargo == CargoKey::Default)
            .map(|o| &o.group)
    }

    pub fn set_cargo_group(&mut self, slot: usize, group: GroupRef) {
        if let Some(entry) = self.cargo.get_mut(slot) {
            *entry = Some(group);
        }
    }

    pub fn cargo_group(&self, slot: usize) -> Option<&GroupRef> {
        self.cargo.get(slot)?.as_ref()
    }

    pub fn bound_engines(&self) -> usize {
        self.groups.len()
    }
}

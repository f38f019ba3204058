use crate::grf::features::house::HouseDef;
use crate::grf::features::station::StationSpec;
use crate::grf::sprite_group::SpriteGroupTable;
use crate::tables::{CargoLabel, GameData, INVALID_CARGO, NUM_CARGO};

/// Parameters a file can address directly.
pub const MAX_PARAMS: usize = 0x80;

/// Slots in the per-file station and house spec tables.
pub const MAX_SPEC_SLOTS: usize = 256;

/// Default train list sprite pitch and width.
pub const TRAININFO_DEFAULT_VEHICLE_PITCH: u8 = 0;
pub const TRAININFO_DEFAULT_VEHICLE_WIDTH: u8 = 29;
pub const VEHICLEINFO_FULL_VEHICLE_WIDTH: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoLabel {
    pub label: u8,
    /// Byte offset of the record following the label
    pub offset: usize,
    pub line: u32,
}

/// Image range declared by the last action 01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSet {
    pub feature: u8,
    pub start: u32,
    /// Number of the first set, non-zero only in the extended form
    pub first_set: u16,
    pub num_sets: u16,
    pub num_ents: u16,
}

impl SpriteSet {
    pub fn is_valid(&self, feature: u8, set: u16) -> bool {
        self.feature == feature && set >= self.first_set && set - self.first_set < self.num_sets
    }

    /// First image of `set`.
    pub fn sprite(&self, set: u16) -> u32 {
        self.start + set.saturating_sub(self.first_set) as u32 * self.num_ents as u32
    }
}

/// State of one extension file, kept for the whole load session.
#[derive(Debug, Clone)]
pub struct GrfFile {
    pub filename: String,
    pub grfid: u32,
    pub grf_version: u8,
    /// Defined parameters; the length is the "highest index ever set" watermark
    pub params: Vec<u32>,
    pub labels: Vec<GotoLabel>,
    pub stations: Vec<Option<StationSpec>>,
    pub houses: Vec<Option<HouseDef>>,
    /// Cargo translation table; empty means bit numbers are used directly
    pub cargo_list: Vec<CargoLabel>,
    /// Global cargo slot to file-local cargo index
    pub cargo_map: [u8; NUM_CARGO],
    pub sprite_groups: SpriteGroupTable,
    pub spriteset: Option<SpriteSet>,
    /// Index of this file's first sound in the global table, 0 if none
    pub sound_offset: usize,
    pub num_sounds: u16,
    pub traininfo_vehicle_pitch: u8,
    pub traininfo_vehicle_width: u8,
    /// Engine ids of the last non-override action 03, for wagon overrides
    pub last_engines: Vec<usize>,
    /// Image id counter when the file was first seen this session
    pub sprite_offset: u32,
    /// Record count declared by the container header
    pub declared_records: u32,
}

impl GrfFile {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            grfid: 0,
            grf_version: 0,
            params: Vec::new(),
            labels: Vec::new(),
            stations: vec![None; MAX_SPEC_SLOTS],
            houses: vec![None; MAX_SPEC_SLOTS],
            cargo_list: Vec::new(),
            cargo_map: [INVALID_CARGO; NUM_CARGO],
            sprite_groups: SpriteGroupTable::new(),
            spriteset: None,
            sound_offset: 0,
            num_sounds: 0,
            traininfo_vehicle_pitch: TRAININFO_DEFAULT_VEHICLE_PITCH,
            traininfo_vehicle_width: TRAININFO_DEFAULT_VEHICLE_WIDTH,
            last_engines: Vec::new(),
            sprite_offset: 0,
            declared_records: 0,
        }
    }

    /// Value of parameter `index`, 0 when undefined.
    pub fn get_param(&self, index: u8) -> u32 {
        self.params.get(index as usize).copied().unwrap_or(0)
    }

    pub fn is_param_defined(&self, index: u8) -> bool {
        (index as usize) < self.params.len()
    }

    /// Set parameter `index`, raising the watermark; lower undefined slots become 0.
    pub fn set_param(&mut self, index: u8, value: u32) {
        let idx = index as usize;
        if idx >= MAX_PARAMS {
            return;
        }
        if idx >= self.params.len() {
            self.params.resize(idx + 1, 0);
        }
        self.params[idx] = value;
    }

    /// Load the user-configured parameter list.
    pub fn reset_params(&mut self, params: &[u32]) {
        self.params = params.iter().take(MAX_PARAMS).copied().collect();
    }

    /// Start of a load session: drop everything rebuilt per session, keep specs.
    pub fn begin_session(&mut self) {
        self.params.clear();
        self.labels.clear();
        self.cargo_list.clear();
        self.cargo_map = [INVALID_CARGO; NUM_CARGO];
        self.sprite_groups.clear();
        self.spriteset = None;
        self.sound_offset = 0;
        self.num_sounds = 0;
        self.traininfo_vehicle_pitch = TRAININFO_DEFAULT_VEHICLE_PITCH;
        self.traininfo_vehicle_width = TRAININFO_DEFAULT_VEHICLE_WIDTH;
        self.last_engines.clear();
    }

    /// Drop data only needed while the file is being activated.
    pub fn clear_temporary(&mut self) {
        self.labels.clear();
        self.last_engines.clear();
    }

    /// Jump target for `label`: the first declaration after `current_line`,
    /// otherwise the first declaration in the file.
    pub fn find_label(&self, label: u8, current_line: u32) -> Option<&GotoLabel> {
        let mut candidates = self.labels.iter().filter(|l| l.label == label);
        let first = candidates.clone().next()?;
        Some(candidates.find(|l| l.line > current_line).unwrap_or(first))
    }

    /// Rebuild `cargo_map` from the final global cargo table.
    pub fn build_cargo_map(&mut self, data: &GameData) {
        self.cargo_map = [INVALID_CARGO; NUM_CARGO];
        for (slot, spec) in data.cargo.iter().enumerate().take(NUM_CARGO) {
            if !spec.is_valid() {
                continue;
            }
            if self.cargo_list.is_empty() {
                self.cargo_map[slot] = spec.bitnum;
            } else if let Some(local) = self.cargo_list.iter().position(|&l| l == spec.label) {
                self.cargo_map[slot] = local as u8;
            }
        }
    }
}

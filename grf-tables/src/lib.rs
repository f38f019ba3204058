//! Built-in content tables that extension files patch in place.
//!
//! Layout:
//! - `engines` - engine records for the four vehicle kinds, 256 global slots
//! - `cargo` - the 64 cargo type slots and label lookups
//! - `bridge` - the 13 bridge types
//! - `house` - original town buildings plus per-file custom house specs
//! - `station` - station class registry
//! - `sound` - sound effect table (73 originals, files append more)
//! - `economy` - price multipliers, currencies, rail cost factors, snow line
//! - `glyph` - font glyph overrides

mod bridge;
mod cargo;
mod economy;
mod engines;
mod glyph;
mod house;
mod sound;
mod station;

pub use bridge::{BridgeSpec, NUM_BRIDGES, NUM_BRIDGE_SPRITE_TABLES, BRIDGE_SPRITE_TABLE_LEN};
pub use cargo::{CargoLabel, CargoSpec, INVALID_CARGO, NUM_CARGO};
pub use economy::{
    CurrencySpec, Economy, SnowLine, NUM_CURRENCIES, NUM_PRICES, NUM_RAILTYPES,
    SNOW_LINE_DAYS, SNOW_LINE_MONTHS,
};
pub use engines::{
    AircraftVehicleInfo, Climates, Engine, EngineInfo, RailVehicleFlags, RailVehicleInfo,
    RoadVehicleInfo, ShipVehicleInfo, VehicleInfo, VehicleType, NUM_AIRCRAFT_ENGINES,
    NUM_ROAD_ENGINES, NUM_SHIP_ENGINES, NUM_TRAIN_ENGINES, TOTAL_NUM_ENGINES,
};
pub use glyph::{FontSize, GlyphMap};
pub use house::{BuildingFlags, HouseSpec, NUM_ORIGINAL_HOUSES};
pub use sound::{SoundEntry, ORIGINAL_SAMPLE_COUNT};
pub use station::{StationClass, StationClasses, MAX_STATION_CLASSES};

/// Every table the loader mutates, in one place.
#[derive(Debug, Clone)]
pub struct GameData {
    pub engines: Vec<Engine>,
    pub cargo: Vec<CargoSpec>,
    pub bridges: Vec<BridgeSpec>,
    pub houses: Vec<HouseSpec>,
    pub sounds: Vec<SoundEntry>,
    pub station_classes: StationClasses,
    pub economy: Economy,
    pub glyphs: GlyphMap,
}

impl GameData {
    /// Pristine tables, as the host ships them.
    pub fn new() -> Self {
        Self {
            engines: engines::original_engines(),
            cargo: cargo::original_cargo(),
            bridges: bridge::original_bridges(),
            houses: house::original_houses(),
            sounds: sound::original_sounds(),
            station_classes: StationClasses::new(),
            economy: Economy::default(),
            glyphs: GlyphMap::default(),
        }
    }

    /// Throw away everything extension files changed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn engine(&self, id: usize) -> Option<&Engine> {
        self.engines.get(id)
    }

    pub fn engine_mut(&mut self, id: usize) -> Option<&mut Engine> {
        self.engines.get_mut(id)
    }

    /// Bit set of every cargo slot currently holding a valid cargo type.
    pub fn cargo_mask(&self) -> u64 {
        self.cargo
            .iter()
            .enumerate()
            .filter(|(_, cs)| cs.is_valid())
            .fold(0u64, |mask, (i, _)| mask | (1u64 << i))
    }

    pub fn cargo_by_label(&self, label: CargoLabel) -> Option<u8> {
        self.cargo
            .iter()
            .position(|cs| cs.is_valid() && cs.label == label)
            .map(|i| i as u8)
    }

    /// Look up a cargo slot by its climate-independent bit number.
    pub fn cargo_by_bitnum(&self, bitnum: u8) -> Option<u8> {
        if bitnum == INVALID_CARGO {
            return None;
        }
        self.cargo
            .iter()
            .position(|cs| cs.is_valid() && cs.bitnum == bitnum)
            .map(|i| i as u8)
    }
}

impl Default for GameData {
    fn default() -> Self {
        Self::new()
    }
}

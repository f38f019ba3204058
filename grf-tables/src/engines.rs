use bitflags::bitflags;

pub const NUM_TRAIN_ENGINES: usize = 116;
pub const NUM_ROAD_ENGINES: usize = 88;
pub const NUM_SHIP_ENGINES: usize = 11;
pub const NUM_AIRCRAFT_ENGINES: usize = 41;
pub const TOTAL_NUM_ENGINES: usize =
    NUM_TRAIN_ENGINES + NUM_ROAD_ENGINES + NUM_SHIP_ENGINES + NUM_AIRCRAFT_ENGINES;

/// Vehicle kind; the discriminant is the feature code used by extension files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VehicleType {
    Train = 0x00,
    Road = 0x01,
    Ship = 0x02,
    Aircraft = 0x03,
}

impl VehicleType {
    pub const ALL: [VehicleType; 4] = [Self::Train, Self::Road, Self::Ship, Self::Aircraft];

    pub fn from_feature(feature: u8) -> Option<Self> {
        match feature {
            0x00 => Some(Self::Train),
            0x01 => Some(Self::Road),
            0x02 => Some(Self::Ship),
            0x03 => Some(Self::Aircraft),
            _ => None,
        }
    }

    /// Number of engine slots for this kind.
    pub fn count(self) -> usize {
        match self {
            Self::Train => NUM_TRAIN_ENGINES,
            Self::Road => NUM_ROAD_ENGINES,
            Self::Ship => NUM_SHIP_ENGINES,
            Self::Aircraft => NUM_AIRCRAFT_ENGINES,
        }
    }

    /// Global engine index of this kind's first slot.
    pub fn first_engine(self) -> usize {
        match self {
            Self::Train => 0,
            Self::Road => NUM_TRAIN_ENGINES,
            Self::Ship => NUM_TRAIN_ENGINES + NUM_ROAD_ENGINES,
            Self::Aircraft => NUM_TRAIN_ENGINES + NUM_ROAD_ENGINES + NUM_SHIP_ENGINES,
        }
    }
}

bitflags! {
    /// Climates an engine is available in
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Climates: u8 {
        const TEMPERATE = 0x01;
        const ARCTIC = 0x02;
        const TROPIC = 0x04;
        const TOYLAND = 0x08;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RailVehicleFlags: u8 {
        /// Engine is built as a pair, power is split between heads
        const MULTIHEAD = 0x01;
        /// No power of its own
        const WAGON = 0x02;
    }
}

/// Properties shared by every vehicle kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInfo {
    /// Introduction date, days since 1920-01-01
    pub base_intro: u16,
    pub reliability_decay: u8,
    /// Vehicle life in years
    pub lifelength: u8,
    /// Model life in years
    pub base_life: u8,
    pub climates: Climates,
    pub load_amount: u8,
    /// Cargo slot carried by default. `None` means "first refittable".
    pub cargo_type: Option<u8>,
    /// Refittable cargo bit numbers, as written by the extension file
    pub refit_mask: u32,
    /// Refittable cargo slots, derived from `refit_mask` once loading finishes
    pub refit_cargo_slots: u64,
    pub refit_classes: u16,
    pub non_refit_classes: u16,
    pub refit_cost: u8,
    pub callback_mask: u8,
    pub retire_early: i8,
    pub misc_flags: u8,
    /// Name string id; zero keeps the built-in name
    pub name: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RailVehicleInfo {
    pub image_index: u8,
    pub railtype: u8,
    pub flags: RailVehicleFlags,
    pub base_cost: u8,
    pub running_cost: u8,
    pub running_cost_class: u8,
    /// km-ish/h; `None` means no limit
    pub max_speed: Option<u16>,
    pub power: u16,
    pub weight: u16,
    pub capacity: u8,
    pub engine_class: u8,
    pub pow_wag_power: u16,
    pub pow_wag_weight: u8,
    pub shorten_factor: u8,
    pub visual_effect: u8,
    pub tractive_effort: u8,
    pub air_drag: u8,
    pub user_def_data: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoadVehicleInfo {
    pub image_index: u8,
    pub base_cost: u8,
    pub running_cost: u8,
    pub running_cost_class: u8,
    pub sfx: u8,
    /// Internal units (1 unit = 0.5 km-ish/h)
    pub max_speed: u16,
    pub capacity: u8,
    pub power: u8,
    pub weight: u8,
    pub tractive_effort: u8,
    pub air_drag: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShipVehicleInfo {
    pub image_index: u8,
    pub base_cost: u8,
    pub refittable: bool,
    pub max_speed: u16,
    pub capacity: u16,
    pub running_cost: u8,
    pub sfx: u8,
    pub ocean_speed_frac: u8,
    pub canal_speed_frac: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AircraftVehicleInfo {
    pub image_index: u8,
    pub base_cost: u8,
    pub running_cost: u8,
    pub is_helicopter: bool,
    pub is_large: bool,
    pub sfx: u8,
    pub acceleration: u8,
    pub max_speed: u16,
    pub mail_capacity: u8,
    pub passenger_capacity: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VehicleInfo {
    Rail(RailVehicleInfo),
    Road(RoadVehicleInfo),
    Ship(ShipVehicleInfo),
    Aircraft(AircraftVehicleInfo),
}

/// One engine slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub info: EngineInfo,
    pub vehicle: VehicleInfo,
}

impl Engine {
    pub fn vehicle_type(&self) -> VehicleType {
        match self.vehicle {
            VehicleInfo::Rail(_) => VehicleType::Train,
            VehicleInfo::Road(_) => VehicleType::Road,
            VehicleInfo::Ship(_) => VehicleType::Ship,
            VehicleInfo::Aircraft(_) => VehicleType::Aircraft,
        }
    }

    pub fn rail(&self) -> Option<&RailVehicleInfo> {
        match &self.vehicle {
            VehicleInfo::Rail(rvi) => Some(rvi),
            _ => None,
        }
    }

    pub fn rail_mut(&mut self) -> Option<&mut RailVehicleInfo> {
        match &mut self.vehicle {
            VehicleInfo::Rail(rvi) => Some(rvi),
            _ => None,
        }
    }

    pub fn road_mut(&mut self) -> Option<&mut RoadVehicleInfo> {
        match &mut self.vehicle {
            VehicleInfo::Road(rvi) => Some(rvi),
            _ => None,
        }
    }

    pub fn ship_mut(&mut self) -> Option<&mut ShipVehicleInfo> {
        match &mut self.vehicle {
            VehicleInfo::Ship(svi) => Some(svi),
            _ => None,
        }
    }

    pub fn aircraft_mut(&mut self) -> Option<&mut AircraftVehicleInfo> {
        match &mut self.vehicle {
            VehicleInfo::Aircraft(avi) => Some(avi),
            _ => None,
        }
    }
}

/// Rail slots from this index on are unpowered wagons.
const FIRST_ORIGINAL_WAGON: usize = 27;

fn base_info(index: usize, cargo: u8) -> EngineInfo {
    EngineInfo {
        base_intro: 1827 + (index as u16 % 40) * 365,
        reliability_decay: 20,
        lifelength: 15 + (index % 16) as u8,
        base_life: 30,
        climates: Climates::TEMPERATE | Climates::ARCTIC | Climates::TROPIC,
        load_amount: 5,
        cargo_type: Some(cargo),
        refit_mask: 0,
        refit_cargo_slots: 0,
        refit_classes: 0,
        non_refit_classes: 0,
        refit_cost: 0,
        callback_mask: 0,
        retire_early: 0,
        misc_flags: 0,
        name: 0,
    }
}

pub(crate) fn original_engines() -> Vec<Engine> {
    let mut engines = Vec::with_capacity(TOTAL_NUM_ENGINES);

    for i in 0..NUM_TRAIN_ENGINES {
        let wagon = i >= FIRST_ORIGINAL_WAGON;
        let rvi = RailVehicleInfo {
            image_index: i as u8,
            railtype: (i / 40) as u8,
            flags: if wagon { RailVehicleFlags::WAGON } else { RailVehicleFlags::empty() },
            base_cost: 100 + (i % 50) as u8,
            running_cost: if wagon { 0 } else { 80 },
            max_speed: if wagon { None } else { Some(64 + (i as u16) * 8) },
            power: if wagon { 0 } else { 300 + (i as u16) * 50 },
            weight: if wagon { 10 } else { 50 + i as u16 },
            capacity: if wagon { 30 } else { 0 },
            ..Default::default()
        };
        let cargo = if wagon { (i % 12) as u8 } else { 0 };
        engines.push(Engine { info: base_info(i, cargo), vehicle: VehicleInfo::Rail(rvi) });
    }

    for i in 0..NUM_ROAD_ENGINES {
        let rvi = RoadVehicleInfo {
            image_index: i as u8,
            base_cost: 120,
            running_cost: 90,
            sfx: 18,
            max_speed: 112 + (i as u16 % 8) * 16,
            capacity: 31,
            ..Default::default()
        };
        engines.push(Engine {
            info: base_info(NUM_TRAIN_ENGINES + i, (i % 12) as u8),
            vehicle: VehicleInfo::Road(rvi),
        });
    }

    for i in 0..NUM_SHIP_ENGINES {
        let svi = ShipVehicleInfo {
            image_index: i as u8,
            base_cost: 180,
            refittable: i >= 2,
            max_speed: 64 + (i as u16) * 8,
            capacity: 200,
            running_cost: 90,
            sfx: 6,
            ..Default::default()
        };
        let cargo = if i == 0 { 0 } else { 3 };
        engines.push(Engine {
            info: base_info(NUM_TRAIN_ENGINES + NUM_ROAD_ENGINES + i, cargo),
            vehicle: VehicleInfo::Ship(svi),
        });
    }

    for i in 0..NUM_AIRCRAFT_ENGINES {
        let avi = AircraftVehicleInfo {
            image_index: i as u8,
            base_cost: 140,
            running_cost: 100,
            is_helicopter: (31..=33).contains(&i),
            is_large: i % 3 == 0,
            sfx: 20,
            acceleration: 20,
            max_speed: 74 + (i as u16) * 4,
            mail_capacity: 20,
            passenger_capacity: 100 + i as u16 * 5,
        };
        engines.push(Engine {
            info: base_info(TOTAL_NUM_ENGINES - NUM_AIRCRAFT_ENGINES + i, 0),
            vehicle: VehicleInfo::Aircraft(avi),
        });
    }

    engines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_partition() {
        let engines = original_engines();
        assert_eq!(engines.len(), TOTAL_NUM_ENGINES);
        for vt in VehicleType::ALL {
            let first = vt.first_engine();
            assert_eq!(engines[first].vehicle_type(), vt);
            assert_eq!(engines[first + vt.count() - 1].vehicle_type(), vt);
        }
        assert_eq!(VehicleType::Aircraft.first_engine() + NUM_AIRCRAFT_ENGINES, 256);
    }

    #[test]
    fn test_original_wagons_unpowered() {
        let engines = original_engines();
        let wagon = engines[FIRST_ORIGINAL_WAGON].rail().unwrap();
        assert!(wagon.flags.contains(RailVehicleFlags::WAGON));
        assert_eq!(wagon.power, 0);
        assert!(!engines[0].rail().unwrap().flags.contains(RailVehicleFlags::WAGON));
    }
}

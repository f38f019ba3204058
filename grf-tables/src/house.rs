use bitflags::bitflags;

pub const NUM_ORIGINAL_HOUSES: usize = 110;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BuildingFlags: u8 {
        const SIZE_1X1 = 0x01;
        const NOT_SLOPED = 0x02;
        const SIZE_2X1 = 0x04;
        const SIZE_1X2 = 0x08;
        const SIZE_2X2 = 0x10;
        const IS_ANIMATED = 0x20;
        const IS_CHURCH = 0x40;
        const IS_STADIUM = 0x80;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseSpec {
    pub min_year: u16,
    pub max_year: u16,
    pub population: u8,
    pub removal_cost: u8,
    pub building_name: u16,
    pub remove_rating_decrease: u16,
    pub mail_generation: u8,
    pub cargo_acceptance: [u8; 3],
    /// Cargo slots accepted, paired with `cargo_acceptance`
    pub accepts_cargo: [Option<u8>; 3],
    pub building_flags: BuildingFlags,
    /// Town zones and climates
    pub building_availability: u16,
    pub enabled: bool,
    pub callback_mask: u16,
    pub random_colour: [u8; 4],
    pub probability: u8,
    pub extra_flags: u8,
    pub class_id: u8,
    pub animation_frames: u8,
    pub animation_speed: u8,
    pub processing_time: u8,
    pub minimum_life: u8,
    pub watched_cargoes: u64,
    /// Original house this one was derived from
    pub substitute_id: u8,
    /// Original house this one replaces when the town builds it
    pub override_id: Option<u8>,
    /// grfid and file-local id of custom houses
    pub grf_prop: Option<(u32, u16)>,
}

impl HouseSpec {
    pub fn original(index: usize) -> Self {
        let size = match index % 7 {
            5 => BuildingFlags::SIZE_2X1,
            6 => BuildingFlags::SIZE_2X2,
            _ => BuildingFlags::SIZE_1X1,
        };
        Self {
            min_year: 1930 + (index as u16 % 10) * 5,
            max_year: u16::MAX,
            population: 10 + (index % 200) as u8,
            removal_cost: 100,
            building_name: 0x200F + index as u16,
            remove_rating_decrease: 300,
            mail_generation: 4,
            cargo_acceptance: [8, 4, 0],
            accepts_cargo: [Some(0), Some(2), Some(5)],
            building_flags: size,
            building_availability: 0x1F,
            enabled: true,
            callback_mask: 0,
            random_colour: [4, 8, 12, 13],
            probability: 16,
            extra_flags: 0,
            class_id: 0,
            animation_frames: 0,
            animation_speed: 2,
            processing_time: 0,
            minimum_life: 0,
            watched_cargoes: 0,
            substitute_id: index as u8,
            override_id: None,
            grf_prop: None,
        }
    }
}

pub(crate) fn original_houses() -> Vec<HouseSpec> {
    (0..NUM_ORIGINAL_HOUSES).map(HouseSpec::original).collect()
}

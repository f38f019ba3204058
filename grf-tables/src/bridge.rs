pub const NUM_BRIDGES: usize = 13;
pub const NUM_BRIDGE_SPRITE_TABLES: usize = 7;
pub const BRIDGE_SPRITE_TABLE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSpec {
    pub avail_year: u32,
    pub min_length: u8,
    pub max_length: u16,
    pub price: u16,
    /// Speed limit in km-ish/h
    pub speed: u16,
    pub flags: u8,
    pub material: u16,
    pub transport_name: [u16; 2],
    pub cost_multiplier: u16,
    /// grfid of the file that last changed this bridge
    pub owner: Option<u32>,
    /// Replacement sprite tables, one per bridge part; `None` keeps the built-in one
    pub sprite_tables: Vec<Option<Vec<u32>>>,
}

/// (year, min length, max length, price, speed)
const ORIGINAL_BRIDGES: [(u32, u8, u16, u16, u16); NUM_BRIDGES] = [
    (0, 0, 16, 80, 32),
    (0, 0, 2, 112, 48),
    (1930, 0, 5, 144, 64),
    (0, 2, 10, 168, 80),
    (1930, 3, 16, 185, 96),
    (1930, 3, 16, 192, 112),
    (1930, 3, 7, 224, 160),
    (1930, 3, 8, 232, 208),
    (1930, 3, 9, 248, 240),
    (1930, 0, 2, 240, 256),
    (1995, 2, 16, 255, 320),
    (2005, 2, 32, 380, 512),
    (2010, 2, 32, 510, 608),
];

pub(crate) fn original_bridges() -> Vec<BridgeSpec> {
    ORIGINAL_BRIDGES
        .iter()
        .enumerate()
        .map(|(i, &(avail_year, min_length, max_length, price, speed))| BridgeSpec {
            avail_year,
            min_length,
            max_length,
            price,
            speed,
            flags: 0,
            material: 0x5000 + i as u16,
            transport_name: [0, 0],
            cost_multiplier: 0,
            owner: None,
            sprite_tables: vec![None; NUM_BRIDGE_SPRITE_TABLES],
        })
        .collect()
}

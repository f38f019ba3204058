use std::fmt;

pub const NUM_CARGO: usize = 64;

/// Bit number marking an empty cargo slot.
pub const INVALID_CARGO: u8 = 0xFF;

/// Four-character cargo label, stored big-endian so `PASS` reads as `0x50415353`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CargoLabel(pub u32);

impl CargoLabel {
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(b))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for CargoLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            if b.is_ascii_graphic() || b == b' ' || b == b'_' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CargoSpec {
    /// Climate-independent bit number; `INVALID_CARGO` for an unused slot
    pub bitnum: u8,
    pub label: CargoLabel,
    pub name: u16,
    pub name_single: u16,
    pub units_volume: u16,
    pub quantifier: u16,
    pub abbrev: u16,
    pub sprite: u16,
    pub weight: u8,
    pub transit_periods: [u8; 2],
    pub initial_payment: u32,
    pub legend_colour: u8,
    pub rating_colour: u8,
    pub is_freight: bool,
    pub classes: u16,
    pub town_growth_effect: u8,
    pub town_growth_multiplier: u16,
    pub callback_mask: u8,
    /// grfid of the file that last redefined this slot
    pub owner: Option<u32>,
}

impl CargoSpec {
    pub fn is_valid(&self) -> bool {
        self.bitnum != INVALID_CARGO
    }

    fn empty() -> Self {
        Self {
            bitnum: INVALID_CARGO,
            label: CargoLabel::default(),
            name: 0,
            name_single: 0,
            units_volume: 0,
            quantifier: 0,
            abbrev: 0,
            sprite: 0,
            weight: 0,
            transit_periods: [0, 0],
            initial_payment: 0,
            legend_colour: 0,
            rating_colour: 0,
            is_freight: false,
            classes: 0,
            town_growth_effect: 0,
            town_growth_multiplier: 0,
            callback_mask: 0,
            owner: None,
        }
    }
}

const ORIGINAL_LABELS: [&[u8; 4]; 12] = [
    b"PASS", b"COAL", b"MAIL", b"OIL_", b"LVST", b"GOOD", b"GRAI", b"WOOD", b"IORE", b"STEL",
    b"VALU", b"PAPR",
];

pub(crate) fn original_cargo() -> Vec<CargoSpec> {
    let mut cargo = vec![CargoSpec::empty(); NUM_CARGO];
    for (i, label) in ORIGINAL_LABELS.iter().enumerate() {
        let cs = &mut cargo[i];
        cs.bitnum = i as u8;
        cs.label = CargoLabel::from_bytes(**label);
        cs.weight = if i == 0 || i == 2 { 1 } else { 16 };
        cs.transit_periods = [0, 24];
        cs.initial_payment = 3000 + i as u32 * 400;
        cs.is_freight = !(i == 0 || i == 2 || i == 10);
        cs.town_growth_multiplier = 0x100;
    }
    cargo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display() {
        assert_eq!(CargoLabel::from_bytes(*b"OIL_").to_string(), "OIL_");
        assert_eq!(CargoLabel(0x41424301).to_string(), "ABC\\x01");
    }
}

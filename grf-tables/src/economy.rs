pub const NUM_PRICES: usize = 49;
pub const NUM_CURRENCIES: usize = 23;
pub const NUM_RAILTYPES: usize = 3;
pub const SNOW_LINE_MONTHS: usize = 12;
pub const SNOW_LINE_DAYS: usize = 32;

/// Per-day snow line heights, month by month.
pub type SnowLine = [[u8; SNOW_LINE_DAYS]; SNOW_LINE_MONTHS];

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencySpec {
    pub name: u16,
    /// Units of this currency per pound
    pub rate: u16,
    pub separator: u8,
    /// Year the currency switches to euro; zero never
    pub to_euro: u16,
    pub prefix: String,
    pub suffix: String,
    /// 0 prefix, 1 suffix
    pub symbol_pos: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Economy {
    /// Shift applied to each base price; 8 leaves the price unchanged
    pub price_base_multiplier: [u8; NUM_PRICES],
    pub currencies: Vec<CurrencySpec>,
    /// Per rail type track cost factor; 8 is neutral
    pub railtype_cost_multiplier: [u8; NUM_RAILTYPES],
    pub snow_line: Option<Box<SnowLine>>,
}

const ORIGINAL_CURRENCIES: [(&str, &str, u16); 6] = [
    ("\u{a3}", "", 1),
    ("$", "", 2),
    ("", " FF", 10),
    ("", " DM", 3),
    ("\u{a5}", "", 200),
    ("", " Pt", 200),
];

impl Default for Economy {
    fn default() -> Self {
        let currencies = (0..NUM_CURRENCIES)
            .map(|i| {
                let (prefix, suffix, rate) = ORIGINAL_CURRENCIES
                    .get(i)
                    .copied()
                    .unwrap_or(("", " \u{a4}", 1));
                CurrencySpec {
                    name: 0x1000 + i as u16,
                    rate,
                    separator: b',',
                    to_euro: 0,
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                    symbol_pos: if prefix.is_empty() { 1 } else { 0 },
                }
            })
            .collect();

        Self {
            price_base_multiplier: [8; NUM_PRICES],
            currencies,
            railtype_cost_multiplier: [8; NUM_RAILTYPES],
            snow_line: None,
        }
    }
}

pub const ORIGINAL_SAMPLE_COUNT: usize = 73;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoundEntry {
    pub volume: u8,
    pub priority: u8,
    /// Raw sample file bytes for sounds bundled in an extension file
    pub data: Vec<u8>,
    pub name: String,
    /// grfid of the file that supplied the sample
    pub owner: Option<u32>,
}

pub(crate) fn original_sounds() -> Vec<SoundEntry> {
    (0..ORIGINAL_SAMPLE_COUNT)
        .map(|_| SoundEntry { volume: 128, priority: 0, ..Default::default() })
        .collect()
}

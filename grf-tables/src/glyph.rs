use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontSize {
    Normal,
    Small,
    Large,
}

impl FontSize {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::Small),
            2 => Some(Self::Large),
            _ => None,
        }
    }
}

/// Character code to image id, per font size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphMap {
    glyphs: HashMap<(FontSize, u32), u32>,
}

impl GlyphMap {
    pub fn set_glyph(&mut self, size: FontSize, ch: u32, image: u32) {
        self.glyphs.insert((size, ch), image);
    }

    pub fn glyph(&self, size: FontSize, ch: u32) -> Option<u32> {
        self.glyphs.get(&(size, ch)).copied()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

use ahash::AHashMap;

/// Language id that matches any language.
pub const LANGUAGE_ANY: u8 = 0x7F;

/// Owner of localized text registered by extension files.
pub trait StringTable {
    /// Register `text` for the file-local string `local_id` and return its global id.
    fn register_string(&mut self, grfid: u32, local_id: u16, language: u8, text: &str) -> u32;

    /// Global id of a previously registered file-local string.
    fn lookup(&self, grfid: u32, local_id: u16) -> Option<u32>;
}

/// First global id handed out for extension strings.
const FIRST_GRF_STRING: u32 = 0xD000_0000;

#[derive(Debug, Default)]
pub struct GrfStringTable {
    ids: AHashMap<(u32, u16), u32>,
    texts: AHashMap<u32, Vec<(u8, String)>>,
}

impl GrfStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text for `id` in `language`, falling back to the first registered translation.
    pub fn text(&self, id: u32, language: u8) -> Option<&str> {
        let translations = self.texts.get(&id)?;
        translations
            .iter()
            .find(|(lang, _)| *lang == language)
            .or_else(|| translations.iter().find(|(lang, _)| *lang == LANGUAGE_ANY))
            .or_else(|| translations.first())
            .map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl StringTable for GrfStringTable {
    fn register_string(&mut self, grfid: u32, local_id: u16, language: u8, text: &str) -> u32 {
        let next = FIRST_GRF_STRING + self.ids.len() as u32;
        let id = *self.ids.entry((grfid, local_id)).or_insert(next);
        let translations = self.texts.entry(id).or_default();
        match translations.iter_mut().find(|(lang, _)| *lang == language) {
            Some(entry) => entry.1 = text.to_string(),
            None => translations.push((language, text.to_string())),
        }
        id
    }

    fn lookup(&self, grfid: u32, local_id: u16) -> Option<u32> {
        self.ids.get(&(grfid, local_id)).copied()
    }
}

/// Decode extension-file text: UTF-8 when prefixed with the thorn marker
/// (`C3 9E`), Latin-1 otherwise.
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xC3, 0x9E]) {
        Some(utf8) => String::from_utf8_lossy(utf8).into_owned(),
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut table = GrfStringTable::new();
        let id = table.register_string(0x01020304, 0xD000, LANGUAGE_ANY, "Steam");
        assert_eq!(table.lookup(0x01020304, 0xD000), Some(id));
        let same = table.register_string(0x01020304, 0xD000, 0x01, "Dampf");
        assert_eq!(same, id);
        assert_eq!(table.text(id, 0x01), Some("Dampf"));
        assert_eq!(table.text(id, 0x02), Some("Steam"));
        assert_eq!(table.lookup(0x01020304, 0xD001), None);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"Test Set"), "Test Set");
        assert_eq!(decode_text(&[0xE9]), "\u{e9}");
        assert_eq!(decode_text(&[0xC3, 0x9E, 0xC3, 0xA9]), "\u{e9}");
    }
}

use ahash::AHashMap;

use crate::codec::{Record, SpriteHeader};

/// Receives every image record the loader decides to keep.
pub trait SpriteCache {
    /// Store `record` of `source` under global image id `id`.
    fn load_next_image(&mut self, id: u32, source: &str, record: &Record<'_>);
}

/// What the recording cache remembers about one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub source: String,
    /// `None` when a pseudo record sat where an image was expected
    pub header: Option<SpriteHeader>,
    pub data_len: usize,
}

/// In-memory cache keeping image metadata by id.
#[derive(Debug, Default)]
pub struct RecordingSpriteCache {
    images: AHashMap<u32, LoadedImage>,
}

impl RecordingSpriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&LoadedImage> {
        self.images.get(&id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl SpriteCache for RecordingSpriteCache {
    fn load_next_image(&mut self, id: u32, source: &str, record: &Record<'_>) {
        let (header, data_len) = match record {
            Record::Real(sprite) => (Some(sprite.header), sprite.data.len()),
            Record::Pseudo(payload) => (None, payload.len()),
        };
        self.images.insert(id, LoadedImage { source: source.to_string(), header, data_len });
    }
}

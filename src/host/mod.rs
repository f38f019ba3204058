//! Host-side collaborators the loader calls into: the sprite cache that
//! materializes images and the string table that owns localized text.

pub mod sprites;
pub mod strings;

pub use sprites::{LoadedImage, RecordingSpriteCache, SpriteCache};
pub use strings::{decode_text, GrfStringTable, StringTable, LANGUAGE_ANY};

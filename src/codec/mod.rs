pub mod reader;
pub mod record;
pub mod writer;

pub use reader::ByteReader;
pub use record::{Record, RecordReader, RealSprite, SpriteHeader, PSEUDO_SPRITE};
pub use writer::BinaryWriter;

//! Extension-content (GRF) loader
//!
//! Reads content files for a transport simulation and applies the actions
//! they contain to the game's data tables, in staged passes over every
//! configured file.

pub mod codec;
pub mod error;
pub mod grf;
pub mod host;

#[cfg(test)]
mod testutil;

pub use grf_tables as tables;

pub use error::{Error, Result};
pub use grf::{GrfConfig, GrfStatus, LoadContext, Loader, LoaderConfig, LoadingStage};
pub use host::{GrfStringTable, RecordingSpriteCache, SpriteCache, StringTable};

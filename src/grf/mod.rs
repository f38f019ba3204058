//! Staged interpreter for extension content files.
//!
//! A [`Loader`] runs every configured file through the loading stages. Each
//! stage reads the file's records through [`pipeline::load_file`], which
//! hands pseudo records to the stage's action handlers; the handlers patch
//! the shared tables held by the [`LoadContext`].

pub mod action;
pub mod actions;
pub mod bindings;
pub mod config;
pub mod context;
pub mod features;
pub mod file;
pub mod finalise;
pub mod grm;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod sprite_group;
pub mod stage;
pub mod variables;

pub use action::{ActionCode, ControlSignal};
pub use config::{Environment, GrfConfig, GrfConfigEntry, GrfConfigFlags, GrfStatus, LoaderConfig};
pub use context::LoadContext;
pub use finalise::StringRemap;
pub use loader::{DiskSource, FileSource, Loader};
pub use stage::LoadingStage;

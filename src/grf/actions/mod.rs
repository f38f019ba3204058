//! Action handlers, grouped by what they act on.

pub mod change_info;
pub mod control;
pub mod graphics;
pub mod group;
pub mod info;
pub mod map;
pub mod names;
pub mod params;
pub mod sound;

//! The state every action handler works on.
//!
//! One `LoadContext` lives for a whole load session. It owns the shared
//! tables and allocators, and tracks which file and record is being
//! decoded so handlers can reach "their" file without globals.

use std::collections::VecDeque;

use bitflags::bitflags;
use tracing::{error, warn};

use crate::grf::action::ControlSignal;
use crate::grf::bindings::EngineBindings;
use crate::grf::config::{Environment, GrfConfig, GrfConfigFlags, GrfMessage, GrfStatus};
use crate::grf::file::GrfFile;
use crate::grf::grm::Grm;
use crate::grf::registry::Registry;
use crate::grf::stage::LoadingStage;
use crate::grf::variables;
use crate::host::{SpriteCache, StringTable};
use crate::tables::GameData;

bitflags! {
    /// Feature switches a file can set through parameter target 0x9E.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MiscGrfFeatures: u32 {
        const DESERT_TREES_FIELDS = 1 << 0;
        const DESERT_PAVED_ROADS = 1 << 1;
        const FIELD_BOUNDING_BOX = 1 << 2;
        /// Per file: train list sprites are 32 pixels wide
        const TRAIN_WIDTH_32_PIXELS = 1 << 3;
        const AMBIENT_SOUND_CALLBACK = 1 << 4;
        const CATENARY_ON_3RD_TRACK = 1 << 5;
        const SECOND_ROCKY_TILE_SET = 1 << 6;
    }
}

/// Byte patch recorded by action 06 for the next pseudo record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgPatch {
    pub offset: usize,
    pub bytes: Vec<u8>,
    /// Add to the existing bytes (with carry) instead of replacing them
    pub add: bool,
}

impl CfgPatch {
    pub fn apply(&self, record: &mut [u8]) {
        let mut carry = false;
        for (i, &value) in self.bytes.iter().enumerate() {
            let Some(target) = record.get_mut(self.offset + i) else {
                break;
            };
            if i % 4 == 0 {
                carry = false;
            }
            if self.add {
                let sum = *target as u16 + value as u16 + carry as u16;
                *target = sum as u8;
                carry = sum >= 0x100;
            } else {
                *target = value;
            }
        }
    }
}

/// Sound slots announced by action 11 that still await their blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSounds {
    /// Global index of the next slot to fill
    pub next: usize,
    pub remaining: u16,
}

pub struct LoadContext {
    pub stage: LoadingStage,
    pub env: Environment,
    pub configs: Vec<GrfConfig>,
    pub registry: Registry,
    pub tables: GameData,
    pub grm: Grm,
    pub bindings: EngineBindings,
    pub sprites: Box<dyn SpriteCache>,
    pub strings: Box<dyn StringTable>,
    pub ttdpatch_flags: [u32; 8],
    pub misc_features: MiscGrfFeatures,
    /// First image id handed to extension files
    pub sprite_base: u32,
    /// Next free image id
    pub spriteid: u32,

    pub cur_config: usize,
    pub cur_file: usize,
    pub nfo_line: u32,
    /// Byte offset just past the record being decoded
    pub record_end: usize,
    /// Image id ranges the following real sprites are loaded into
    pub pending_images: VecDeque<(u32, u32)>,
    pub pending_sounds: Option<PendingSounds>,
    pub pending_patch: Vec<CfgPatch>,
}

impl LoadContext {
    pub fn new(env: Environment, sprite_base: u32, sprites: Box<dyn SpriteCache>, strings: Box<dyn StringTable>) -> Self {
        Self {
            stage: LoadingStage::FileScan,
            env,
            configs: Vec::new(),
            registry: Registry::new(),
            tables: GameData::new(),
            grm: Grm::new(),
            bindings: EngineBindings::new(),
            sprites,
            strings,
            ttdpatch_flags: variables::ttdpatch_flags(),
            misc_features: MiscGrfFeatures::empty(),
            sprite_base,
            spriteid: sprite_base,
            cur_config: 0,
            cur_file: 0,
            nfo_line: 0,
            record_end: 0,
            pending_images: VecDeque::new(),
            pending_sounds: None,
            pending_patch: Vec::new(),
        }
    }

    /// Forget per-file decoding state before a file is read in a stage.
    pub fn begin_file(&mut self, config: usize, file: usize) {
        self.cur_config = config;
        self.cur_file = file;
        self.nfo_line = 0;
        self.record_end = 0;
        self.pending_images.clear();
        self.pending_sounds = None;
        self.pending_patch.clear();
    }

    pub fn file(&self) -> &GrfFile {
        &self.registry[self.cur_file]
    }

    pub fn file_mut(&mut self) -> &mut GrfFile {
        &mut self.registry[self.cur_file]
    }

    pub fn config(&self) -> &GrfConfig {
        &self.configs[self.cur_config]
    }

    pub fn config_mut(&mut self) -> &mut GrfConfig {
        &mut self.configs[self.cur_config]
    }

    pub fn grfid(&self) -> u32 {
        self.file().grfid
    }

    /// Index of the configured file whose identifier matches `grfid` under `mask`.
    pub fn config_by_grfid(&self, grfid: u32, mask: u32) -> Option<usize> {
        self.configs.iter().position(|c| c.ident.grfid & mask == grfid & mask)
    }

    /// Disable the current file for the rest of the session.
    pub fn disable_current(&mut self, message: Option<GrfMessage>) -> ControlSignal {
        let (file, line, stage) = (self.config().filename.clone(), self.nfo_line, self.stage);
        match message {
            Some(message) => error!(%file, line, %stage, %message, "disabling file"),
            None => error!(%file, line, %stage, "disabling file"),
        }
        self.config_mut().disable(message);
        ControlSignal::AbortFile
    }

    /// Flag the current file as unsafe for static use and stop scanning it.
    pub fn mark_unsafe(&mut self) -> ControlSignal {
        warn!(file = %self.config().filename, line = self.nfo_line, "file uses unsafe actions");
        self.config_mut().flags |= GrfConfigFlags::UNSAFE;
        ControlSignal::AbortFile
    }

    /// Status the current file must have reached if its action 8 was seen.
    pub fn expected_status(&self) -> GrfStatus {
        if self.stage < LoadingStage::Reserve {
            GrfStatus::Initialised
        } else {
            GrfStatus::Activated
        }
    }
}

//! Action codes and the per-stage handler tables.
//!
//! Every pseudo record starts with an action byte. Each loading stage has
//! its own fixed table mapping the action to a handler; an empty cell means
//! the action is ignored in that stage.

use std::fmt;

use tracing::{trace, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::actions::{change_info, control, graphics, group, info, map, names, params, sound};
use crate::grf::context::LoadContext;
use crate::grf::stage::LoadingStage;

/// What the pipeline does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    /// Consume the next `n` records without decoding them
    SkipCount(u32),
    /// Stop decoding this file for the rest of the stage
    AbortFile,
    /// Continue reading at a label: record offset and its line number
    Jump { offset: usize, line: u32 },
}

pub type Handler = fn(&mut LoadContext, &mut ByteReader) -> Result<ControlSignal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    ChangeInfo,
    SpriteSet,
    SpriteGroup,
    MapSpriteGroup,
    NewNames,
    NewGraphics,
    CfgApply,
    SkipIfParam,
    Info,
    SkipIf,
    SpriteReplace,
    LoadError,
    Comment,
    ParamSet,
    Inhibit,
    Label,
    SoundTable,
    FontGlyphs,
    Translate,
    ImportBlock,
    DataBlock,
}

const NUM_ACTIONS: usize = 21;

impl ActionCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        use ActionCode::*;
        Some(match v {
            0x00 => ChangeInfo,
            0x01 => SpriteSet,
            0x02 => SpriteGroup,
            0x03 => MapSpriteGroup,
            0x04 => NewNames,
            0x05 => NewGraphics,
            0x06 => CfgApply,
            0x07 => SkipIfParam,
            0x08 => Info,
            0x09 => SkipIf,
            0x0A => SpriteReplace,
            0x0B => LoadError,
            0x0C => Comment,
            0x0D => ParamSet,
            0x0E => Inhibit,
            0x10 => Label,
            0x11 => SoundTable,
            0x12 => FontGlyphs,
            0x13 => Translate,
            0xFE => ImportBlock,
            0xFF => DataBlock,
            _ => return None,
        })
    }

    pub fn to_u8(self) -> u8 {
        use ActionCode::*;
        match self {
            ChangeInfo => 0x00,
            SpriteSet => 0x01,
            SpriteGroup => 0x02,
            MapSpriteGroup => 0x03,
            NewNames => 0x04,
            NewGraphics => 0x05,
            CfgApply => 0x06,
            SkipIfParam => 0x07,
            Info => 0x08,
            SkipIf => 0x09,
            SpriteReplace => 0x0A,
            LoadError => 0x0B,
            Comment => 0x0C,
            ParamSet => 0x0D,
            Inhibit => 0x0E,
            Label => 0x10,
            SoundTable => 0x11,
            FontGlyphs => 0x12,
            Translate => 0x13,
            ImportBlock => 0xFE,
            DataBlock => 0xFF,
        }
    }

    fn index(self) -> usize {
        match self.to_u8() {
            0xFE => 19,
            0xFF => 20,
            v if v > 0x0F => v as usize - 1,
            v => v as usize,
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.to_u8())
    }
}

macro_rules! h {
    ($f:path) => {
        Some($f as Handler)
    };
}

type StageTable = [Option<Handler>; NUM_ACTIONS];

// Columns: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 10 11 12 13 FE FF

const FILE_SCAN: StageTable = [
    None, h!(graphics::skip_sprite_set), None, None, None, h!(graphics::skip_new_graphics),
    None, None, h!(info::scan_info), None, h!(graphics::skip_sprite_replace), None, None,
    None, None, None, h!(sound::skip_sound_table), h!(graphics::skip_font_glyphs), None,
    h!(sound::import_block), h!(sound::data_block),
];

const SAFETY_SCAN: StageTable = [
    h!(change_info::safe_change_info), h!(graphics::skip_sprite_set), None, None, None,
    h!(graphics::skip_new_graphics), None, None, None, None, h!(graphics::skip_sprite_replace),
    None, None, h!(params::safe_param_set), h!(info::grf_unsafe), None,
    h!(sound::skip_sound_table), h!(graphics::skip_font_glyphs), h!(info::grf_unsafe),
    h!(sound::import_block), h!(sound::data_block),
];

const LABEL_SCAN: StageTable = [
    None, h!(graphics::skip_sprite_set), None, None, None, h!(graphics::skip_new_graphics),
    None, None, None, None, h!(graphics::skip_sprite_replace), None, None, None, None,
    h!(control::define_label), h!(sound::skip_sound_table), h!(graphics::skip_font_glyphs), None,
    h!(sound::import_block), h!(sound::data_block),
];

const INIT: StageTable = [
    None, h!(graphics::skip_sprite_set), None, None, None, h!(graphics::skip_new_graphics),
    h!(params::cfg_apply), None, h!(info::grf_info), h!(control::skip_if),
    h!(graphics::skip_sprite_replace), h!(info::load_error), None, h!(params::param_set),
    h!(info::inhibit), None, h!(sound::skip_sound_table), h!(graphics::skip_font_glyphs), None,
    h!(sound::import_block), h!(sound::data_block),
];

const RESERVE: StageTable = [
    h!(change_info::reserve_change_info), h!(graphics::skip_sprite_set), None, None, None,
    h!(graphics::skip_new_graphics), h!(params::cfg_apply), h!(control::skip_if),
    h!(info::grf_info), h!(control::skip_if), h!(graphics::skip_sprite_replace),
    h!(info::load_error), None, h!(params::param_set), h!(info::inhibit), None,
    h!(sound::skip_sound_table), h!(graphics::skip_font_glyphs), None,
    h!(sound::import_block), h!(sound::data_block),
];

const ACTIVATION: StageTable = [
    h!(change_info::feature_change_info), h!(graphics::sprite_set), h!(group::new_sprite_group),
    h!(map::map_sprite_group), h!(names::new_names), h!(graphics::new_graphics),
    h!(params::cfg_apply), h!(control::skip_if), h!(info::grf_info), h!(control::skip_if),
    h!(graphics::sprite_replace), h!(info::load_error), None, h!(params::param_set),
    h!(info::inhibit), None, h!(sound::sound_table), h!(graphics::font_glyphs),
    h!(names::translate_names), h!(sound::import_block), h!(sound::data_block),
];

pub fn handler_for(action: ActionCode, stage: LoadingStage) -> Option<Handler> {
    let table = match stage {
        LoadingStage::FileScan => &FILE_SCAN,
        LoadingStage::SafetyScan => &SAFETY_SCAN,
        LoadingStage::LabelScan => &LABEL_SCAN,
        LoadingStage::Init => &INIT,
        LoadingStage::Reserve => &RESERVE,
        LoadingStage::Activation => &ACTIVATION,
    };
    table[action.index()]
}

/// Decode one pseudo record in the current stage.
///
/// Handler errors are malformed payloads: they are logged and the action is
/// ignored, the file carries on.
pub fn dispatch(ctx: &mut LoadContext, payload: &[u8]) -> ControlSignal {
    let mut buf = ByteReader::new(payload);
    let raw = match buf.read_u8() {
        Ok(raw) => raw,
        Err(_) => {
            warn!(line = ctx.nfo_line, "empty pseudo sprite, ignoring");
            return ControlSignal::Continue;
        }
    };
    let Some(action) = ActionCode::from_u8(raw) else {
        warn!(action = raw, line = ctx.nfo_line, "unknown action, ignoring");
        return ControlSignal::Continue;
    };
    let Some(handler) = handler_for(action, ctx.stage) else {
        trace!(%action, stage = %ctx.stage, line = ctx.nfo_line, "ignoring action in this stage");
        return ControlSignal::Continue;
    };

    match handler(ctx, &mut buf) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(%action, line = ctx.nfo_line, file = %ctx.config().filename, error = %e, "malformed action, ignoring");
            ControlSignal::Continue
        }
    }
}

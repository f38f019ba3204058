//! Drives one loading stage over one file's record stream.
//!
//! Pseudo records are decoded through the stage's handler table unless a
//! previous action asked to skip them. Image records are only accepted while
//! an action has images pending (sprite sets, replacement blocks, glyphs);
//! those are handed to the sprite cache and do not count against a skip.

use tracing::{debug, trace, warn};

use crate::codec::{Record, RecordReader};
use crate::error::{Error, Result};
use crate::grf::action::{dispatch, ControlSignal};
use crate::grf::actions::sound::take_sound_slot;
use crate::grf::config::GrfMessage;
use crate::grf::context::LoadContext;
use crate::grf::stage::LoadingStage;

/// Action bytes of the blocks that fill pending sound slots.
const IMPORT_BLOCK: u8 = 0xFE;
const DATA_BLOCK: u8 = 0xFF;

/// Run the current stage over `data`, the whole container of the current
/// file. Only an unreadable container header is returned as an error; a
/// stream that breaks off midway disables the file.
pub fn load_file(ctx: &mut LoadContext, data: &[u8]) -> Result<()> {
    let (mut reader, declared) = RecordReader::open(data)?;
    let source = ctx.file().filename.clone();
    debug!(file = %source, stage = %ctx.stage, records = declared, "reading file");

    if ctx.stage == LoadingStage::LabelScan {
        let spriteid = ctx.spriteid;
        let file = ctx.file_mut();
        file.sprite_offset = spriteid;
        file.declared_records = declared;
    }

    if let Err(e) = run_records(ctx, &mut reader, &source) {
        let message = match e {
            Error::UnexpectedSprite { .. } => Some(GrfMessage::UnexpectedSprite),
            _ => None,
        };
        warn!(file = %source, line = reader.line(), error = %e, "stopped reading file");
        ctx.disable_current(message);
    }

    if let Some(&(id, count)) = ctx.pending_images.front() {
        warn!(file = %source, next = id, missing = count, "file ended before all announced images");
    }
    ctx.pending_images.clear();
    ctx.pending_sounds = None;
    ctx.pending_patch.clear();
    Ok(())
}

fn run_records(ctx: &mut LoadContext, reader: &mut RecordReader<'_>, source: &str) -> Result<()> {
    let mut skip: u32 = 0;

    while let Some(record) = reader.next_record()? {
        ctx.nfo_line = reader.line();
        ctx.record_end = reader.position();

        if load_pending_image(ctx, source, &record) {
            continue;
        }

        if ctx.pending_sounds.is_some() && !is_sound_block(&record) {
            warn!(line = ctx.nfo_line, "expected a sound block, slot stays empty");
            take_sound_slot(ctx);
            continue;
        }

        match record {
            Record::Pseudo(payload) if skip == 0 => {
                let signal = if ctx.pending_patch.is_empty() {
                    dispatch(ctx, payload)
                } else {
                    let mut patched = payload.to_vec();
                    for patch in std::mem::take(&mut ctx.pending_patch) {
                        patch.apply(&mut patched);
                    }
                    dispatch(ctx, &patched)
                };
                match signal {
                    ControlSignal::Continue => {}
                    ControlSignal::SkipCount(n) => {
                        trace!(n, line = ctx.nfo_line, "skipping records");
                        skip = n;
                    }
                    ControlSignal::AbortFile => {
                        debug!(line = ctx.nfo_line, stage = %ctx.stage, "stopped decoding file");
                        return Ok(());
                    }
                    ControlSignal::Jump { offset, line } => {
                        trace!(line, "jumping to label");
                        reader.seek(offset, line);
                        skip = 0;
                    }
                }
                continue;
            }
            Record::Pseudo(_) => {}
            Record::Real(_) if skip == 0 => {
                return Err(Error::UnexpectedSprite { line: ctx.nfo_line });
            }
            Record::Real(_) => {}
        }

        if !ctx.pending_patch.is_empty() {
            debug!(line = ctx.nfo_line, "record not decoded, dropping parameter patch");
            ctx.pending_patch.clear();
        }
        skip -= 1;
    }
    Ok(())
}

/// Hand `record` to the sprite cache if an image is pending.
fn load_pending_image(ctx: &mut LoadContext, source: &str, record: &Record<'_>) -> bool {
    while ctx.pending_images.front().is_some_and(|&(_, count)| count == 0) {
        ctx.pending_images.pop_front();
    }
    let Some((id, count)) = ctx.pending_images.front_mut() else {
        return false;
    };
    let image = *id;
    *id += 1;
    *count -= 1;
    if let Record::Pseudo(_) = record {
        debug!(line = ctx.nfo_line, id = image, "pseudo record in place of an image");
    }
    ctx.sprites.load_next_image(image, source, record);
    true
}

fn is_sound_block(record: &Record<'_>) -> bool {
    matches!(record, Record::Pseudo([IMPORT_BLOCK | DATA_BLOCK, ..]))
}

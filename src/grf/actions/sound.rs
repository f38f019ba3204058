//! Action 11 (sound table) and the FE/FF blocks filling its slots.
//!
//! `<11> <num:W>` appends `num` sound entries to the global table. Each of
//! the following `num` records fills one slot: a data block carries the
//! sample itself, an import block copies a sound of another file.

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::context::{LoadContext, PendingSounds};
use crate::host::decode_text;
use crate::tables::SoundEntry;

pub const SOUND_EFFECT_MAX_VOLUME: u8 = 128;

pub fn skip_sound_table(_ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num = buf.read_u16_le()?;
    if num == 0 {
        return Ok(ControlSignal::Continue);
    }
    Ok(ControlSignal::SkipCount(num as u32))
}

pub fn sound_table(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num = buf.read_u16_le()?;
    if num == 0 {
        return Ok(ControlSignal::Continue);
    }

    let grfid = ctx.grfid();
    if ctx.file().sound_offset == 0 {
        let offset = ctx.tables.sounds.len();
        ctx.tables.sounds.extend((0..num).map(|_| SoundEntry {
            volume: SOUND_EFFECT_MAX_VOLUME,
            priority: 0,
            owner: Some(grfid),
            ..Default::default()
        }));
        let file = ctx.file_mut();
        file.sound_offset = offset;
        file.num_sounds = num;
        debug!(num, offset, "sound table");
    } else {
        // a second table refills the slots of the first one
        debug!(num, offset = ctx.file().sound_offset, "sound table reuses existing slots");
    }

    let next = ctx.file().sound_offset;
    ctx.pending_sounds = Some(PendingSounds { next, remaining: num });
    Ok(ControlSignal::Continue)
}

/// Consume the next pending slot. `Some(index)` when the slot lies inside
/// the file's own sound range, `None` when nothing is pending or the slot is
/// out of range (the slot still counts as consumed).
pub fn take_sound_slot(ctx: &mut LoadContext) -> Option<usize> {
    let pending = ctx.pending_sounds.as_mut()?;
    let index = pending.next;
    pending.next += 1;
    pending.remaining -= 1;
    if pending.remaining == 0 {
        ctx.pending_sounds = None;
    }

    let file = ctx.file();
    let in_range = index >= file.sound_offset
        && index - file.sound_offset < file.num_sounds as usize
        && index < ctx.tables.sounds.len();
    if !in_range {
        warn!(index, num_sounds = file.num_sounds, "sound index out of range, multiple sound tables?");
        return None;
    }
    Some(index)
}

/// `<FF> <name-len> <name> <data...>`
pub fn data_block(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    if ctx.pending_sounds.is_none() {
        warn!(line = ctx.nfo_line, "unexpected data block, skipping");
        return Ok(ControlSignal::Continue);
    }
    let Some(index) = take_sound_slot(ctx) else {
        return Ok(ControlSignal::Continue);
    };

    let name_len = buf.read_u8()? as usize;
    let name = decode_text(buf.read_bytes(name_len)?);
    let data = buf.read_bytes(buf.remaining())?;
    debug!(index, name = %name, len = data.len(), "sound data");

    let sound = &mut ctx.tables.sounds[index];
    sound.name = name;
    sound.data = data.to_vec();
    Ok(ControlSignal::Continue)
}

/// `<FE> 00 <grfid:D> <sound:W>`
pub fn import_block(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    if ctx.pending_sounds.is_none() {
        warn!(line = ctx.nfo_line, "unexpected import block, skipping");
        return Ok(ControlSignal::Continue);
    }
    let Some(index) = take_sound_slot(ctx) else {
        return Ok(ControlSignal::Continue);
    };

    if buf.read_u8()? != 0 {
        warn!("sound import type mismatch");
    }
    let grfid = buf.read_u32_le()?;
    let sound_id = buf.read_u16_le()?;

    let source = ctx.registry.get_by_grfid(grfid).map(|f| (f.sound_offset, f.num_sounds));
    let Some((offset, num_sounds)) = source.filter(|(offset, _)| *offset != 0) else {
        warn!(grfid = format_args!("{:08X}", grfid.swap_bytes()), "sound import source not available");
        return Ok(ControlSignal::Continue);
    };
    if sound_id >= num_sounds {
        warn!(sound_id, grfid = format_args!("{:08X}", grfid.swap_bytes()), "imported sound effect is invalid");
        return Ok(ControlSignal::Continue);
    }

    debug!(sound_id, from = offset + sound_id as usize, to = index, "importing sound");
    let mut sound = ctx.tables.sounds[offset + sound_id as usize].clone();
    // volume and priority are not carried over
    sound.volume = SOUND_EFFECT_MAX_VOLUME;
    sound.priority = 0;
    ctx.tables.sounds[index] = sound;
    Ok(ControlSignal::Continue)
}

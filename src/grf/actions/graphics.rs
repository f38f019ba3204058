//! Image-loading actions: 01 (sprite sets), 05 (replacement blocks for host
//! graphics), 0A (replace fixed ids) and 12 (font glyphs).
//!
//! None of these read image data themselves. They queue id ranges on the
//! context and the pipeline hands the records that follow to the sprite
//! cache. Outside activation the same records are only skipped.

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::context::LoadContext;
use crate::grf::features::FEATURE_SOUNDFX;
use crate::grf::file::SpriteSet;
use crate::tables::FontSize;

/// Host image layout for blocks replaceable through action 05.
pub const SPR_SHORE_BASE: u32 = 4062;
pub const SPR_SIGNALS_BASE: u32 = 4896;
pub const SPR_ELRAIL_BASE: u32 = 4944;
pub const SPR_SLOPES_BASE: u32 = 4985;
pub const SPR_CANALS_BASE: u32 = 5075;
pub const SPR_ONEWAY_BASE: u32 = 5140;
pub const SPR_TRAMWAY_BASE: u32 = 5146;
pub const SPR_TRACKS_FOR_SLOPES_BASE: u32 = 5265;
pub const SPR_AIRPORTX_BASE: u32 = 5277;
pub const SPR_ROADSTOP_BASE: u32 = 5292;
pub const SPR_AQUEDUCT_BASE: u32 = 5300;
pub const SPR_AUTORAIL_BASE: u32 = 5308;
pub const SPR_2CCMAP_BASE: u32 = 5323;
pub const SPR_OPENTTD_BASE: u32 = 5579;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    /// At least `min` images, never at an offset
    Fixed,
    /// Any count at any offset below `max`
    AllowOffset,
}

#[derive(Debug, Clone, Copy)]
struct GraphicsBlock {
    kind: BlockKind,
    base: u32,
    min: u16,
    max: u16,
    name: &'static str,
}

const fn block(kind: BlockKind, base: u32, min: u16, max: u16, name: &'static str) -> Option<GraphicsBlock> {
    Some(GraphicsBlock { kind, base, min, max, name })
}

use BlockKind::{AllowOffset, Fixed};

/// Action 05 types; `None` marks types the host has no images for.
const GRAPHICS_BLOCKS: [Option<GraphicsBlock>; 0x16] = [
    None,
    None,
    None,
    None,
    block(AllowOffset, SPR_SIGNALS_BASE, 1, 48, "signal graphics"),
    block(AllowOffset, SPR_ELRAIL_BASE, 1, 41, "catenary graphics"),
    block(AllowOffset, SPR_SLOPES_BASE, 1, 90, "foundation graphics"),
    None,
    block(AllowOffset, SPR_CANALS_BASE, 1, 65, "canal graphics"),
    block(AllowOffset, SPR_ONEWAY_BASE, 1, 6, "one way road graphics"),
    block(AllowOffset, SPR_2CCMAP_BASE, 1, 256, "2cc colour maps"),
    block(AllowOffset, SPR_TRAMWAY_BASE, 1, 119, "tramway graphics"),
    None,
    block(Fixed, SPR_SHORE_BASE, 16, 18, "shore graphics"),
    None,
    block(AllowOffset, SPR_TRACKS_FOR_SLOPES_BASE, 1, 12, "sloped rail track"),
    block(AllowOffset, SPR_AIRPORTX_BASE, 1, 15, "airport graphics"),
    block(AllowOffset, SPR_ROADSTOP_BASE, 1, 8, "road stop graphics"),
    block(AllowOffset, SPR_AQUEDUCT_BASE, 1, 8, "aqueduct graphics"),
    block(AllowOffset, SPR_AUTORAIL_BASE, 1, 15, "autorail graphics"),
    None,
    block(AllowOffset, SPR_OPENTTD_BASE, 1, 200, "host gui graphics"),
];

/// Queue `count` images at consecutive ids starting at `first`.
fn queue_images(ctx: &mut LoadContext, first: u32, count: u32) {
    if count > 0 {
        ctx.pending_images.push_back((first, count));
    }
}

fn skip(count: u32) -> ControlSignal {
    if count == 0 {
        ControlSignal::Continue
    } else {
        ControlSignal::SkipCount(count)
    }
}

/// `<01> <feature> <num-sets> <num-ent:ext>`, or the extended form with a
/// zero set count followed by `<first-set:ext> <num-sets:ext>`.
fn read_sprite_set_header(buf: &mut ByteReader) -> Result<(u8, u16, u16, u16)> {
    let feature = buf.read_u8()?;
    let mut num_sets = buf.read_u8()? as u16;
    let mut first_set = 0;
    if num_sets == 0 && buf.remaining() >= 3 {
        first_set = buf.read_extended()?;
        num_sets = buf.read_extended()?;
    }
    let num_ents = buf.read_extended()?;
    Ok((feature, first_set, num_sets, num_ents))
}

pub fn skip_sprite_set(_ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let (_, _, num_sets, num_ents) = read_sprite_set_header(buf)?;
    Ok(skip(num_sets as u32 * num_ents as u32))
}

pub fn sprite_set(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let (feature, first_set, num_sets, num_ents) = read_sprite_set_header(buf)?;
    let total = num_sets as u32 * num_ents as u32;
    if feature >= FEATURE_SOUNDFX {
        warn!(feature, total, "unsupported sprite set feature, skipping images");
        return Ok(skip(total));
    }

    let start = ctx.spriteid;
    debug!(feature, num_sets, num_ents, start, "sprite set");
    ctx.file_mut().spriteset = Some(SpriteSet { feature, start, first_set, num_sets, num_ents });
    queue_images(ctx, start, total);
    ctx.spriteid += total;
    Ok(ControlSignal::Continue)
}

/// `<05> <type> <num-sprites:ext> [<offset:ext>]`, offset present when bit 7
/// of the type is set.
pub fn skip_new_graphics(_ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    buf.read_u8()?;
    let num = buf.read_extended()?;
    Ok(skip(num as u32))
}

pub fn new_graphics(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let raw_type = buf.read_u8()?;
    let num = buf.read_extended()?;
    let mut offset = if raw_type & 0x80 != 0 { buf.read_extended()? } else { 0 };
    let block_type = raw_type & 0x7F;

    let Some(block) = GRAPHICS_BLOCKS.get(block_type as usize).copied().flatten() else {
        debug!(block_type, num, "unimplemented graphics block, skipping");
        return Ok(skip(num as u32));
    };

    if block.kind != BlockKind::AllowOffset && offset != 0 {
        warn!(block = block.name, block_type, "block does not take an offset, ignoring it");
        offset = 0;
    }
    if block.kind == BlockKind::Fixed && num < block.min {
        warn!(block = block.name, block_type, num, min = block.min, "too few images, skipping block");
        return Ok(skip(num as u32));
    }

    // clamp to the host block, skip the excess
    let load = if offset >= block.max {
        warn!(block = block.name, offset, "offset past end of block, skipping images");
        0
    } else {
        num.min(block.max - offset)
    };
    let excess = (num - load) as u32;
    if excess > 0 {
        warn!(block = block.name, excess, "block overflows, skipping extra images");
    }

    let first = block.base + offset as u32;
    debug!(block = block.name, block_type, offset, load, first, "replacing host graphics");
    queue_images(ctx, first, load as u32);
    Ok(skip(excess))
}

/// `<0A> <num-sets> (<num-sprites> <first-sprite:W>)...`
pub fn skip_sprite_replace(_ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num_sets = buf.read_u8()?;
    let mut total = 0u32;
    for _ in 0..num_sets {
        total += buf.read_u8()? as u32;
        buf.read_u16_le()?;
    }
    Ok(skip(total))
}

pub fn sprite_replace(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num_sets = buf.read_u8()?;
    for i in 0..num_sets {
        let num_sprites = buf.read_u8()?;
        let first_sprite = buf.read_u16_le()?;
        debug!(set = i, num_sprites, first_sprite, "replacing images");
        queue_images(ctx, first_sprite as u32, num_sprites as u32);
    }
    Ok(ControlSignal::Continue)
}

/// `<12> <num-def> (<font-size> <num-char> <base-char:W>)...`
pub fn skip_font_glyphs(_ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num_def = buf.read_u8()?;
    let mut total = 0u32;
    for _ in 0..num_def {
        buf.read_u8()?;
        total += buf.read_u8()? as u32;
        buf.read_u16_le()?;
    }
    Ok(skip(total))
}

pub fn font_glyphs(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num_def = buf.read_u8()?;
    for _ in 0..num_def {
        let raw_size = buf.read_u8()?;
        let num_char = buf.read_u8()? as u32;
        let base_char = buf.read_u16_le()? as u32;

        let size = FontSize::from_u8(raw_size);
        if size.is_none() {
            warn!(size = raw_size, "unsupported font size, loading images only");
        }
        debug!(num_char, base_char = format_args!("{:#06x}", base_char), size = raw_size, "font glyphs");

        let first = ctx.spriteid;
        if let Some(size) = size {
            for c in 0..num_char {
                ctx.tables.glyphs.set_glyph(size, base_char + c, first + c);
            }
        }
        queue_images(ctx, first, num_char);
        ctx.spriteid += num_char;
    }
    Ok(ControlSignal::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::grf::action::dispatch;
    use crate::grf::stage::LoadingStage;
    use crate::testutil::{test_context, TEST_SPRITE_BASE};

    #[test]
    fn test_sprite_set_queues_images() {
        let mut ctx = test_context(&["a.grf"]);
        assert_eq!(dispatch(&mut ctx, &[0x01, 0x00, 2, 4]), ControlSignal::Continue);
        let set = ctx.file().spriteset.unwrap();
        assert_eq!(set, SpriteSet { feature: 0, start: TEST_SPRITE_BASE, first_set: 0, num_sets: 2, num_ents: 4 });
        assert_eq!(set.sprite(1), TEST_SPRITE_BASE + 4);
        assert!(set.is_valid(0, 1));
        assert!(!set.is_valid(0, 2));
        assert!(!set.is_valid(1, 0));
        assert_eq!(ctx.pending_images.front(), Some(&(TEST_SPRITE_BASE, 8)));
        assert_eq!(ctx.spriteid, TEST_SPRITE_BASE + 8);
    }

    #[test]
    fn test_extended_sprite_set() {
        let mut ctx = test_context(&["a.grf"]);
        let mut w = BinaryWriter::new();
        w.write_u8(0x01).write_u8(0x04).write_u8(0).write_extended(10).write_extended(3).write_extended(2);
        dispatch(&mut ctx, w.as_slice());
        let set = ctx.file().spriteset.unwrap();
        assert!(set.is_valid(4, 12));
        assert!(!set.is_valid(4, 9));
        assert_eq!(set.sprite(11), TEST_SPRITE_BASE + 2);
    }

    #[test]
    fn test_skip_variants_outside_activation() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::Init;
        assert_eq!(dispatch(&mut ctx, &[0x01, 0x00, 3, 5]), ControlSignal::SkipCount(15));
        assert_eq!(dispatch(&mut ctx, &[0x05, 0x0D, 18]), ControlSignal::SkipCount(18));
        assert_eq!(dispatch(&mut ctx, &[0x0A, 2, 3, 0x10, 0x00, 4, 0x20, 0x00]), ControlSignal::SkipCount(7));
        assert_eq!(dispatch(&mut ctx, &[0x12, 1, 0, 5, 0x41, 0x00]), ControlSignal::SkipCount(5));
        assert_eq!(dispatch(&mut ctx, &[0x01, 0x00, 0, 5]), ControlSignal::Continue);
        assert!(ctx.pending_images.is_empty());
        assert_eq!(ctx.spriteid, TEST_SPRITE_BASE);
    }

    #[test]
    fn test_new_graphics_blocks() {
        let mut ctx = test_context(&["a.grf"]);
        // shore: fixed block, 16 minimum
        assert_eq!(dispatch(&mut ctx, &[0x05, 0x0D, 16]), ControlSignal::Continue);
        assert_eq!(ctx.pending_images.pop_front(), Some((SPR_SHORE_BASE, 16)));
        assert_eq!(dispatch(&mut ctx, &[0x05, 0x0D, 10]), ControlSignal::SkipCount(10));
        assert!(ctx.pending_images.is_empty());

        // one way roads at offset 4: two fit, three are skipped
        assert_eq!(dispatch(&mut ctx, &[0x05, 0x89, 5, 4]), ControlSignal::SkipCount(3));
        assert_eq!(ctx.pending_images.pop_front(), Some((SPR_ONEWAY_BASE + 4, 2)));

        // unknown type
        assert_eq!(dispatch(&mut ctx, &[0x05, 0x07, 75]), ControlSignal::SkipCount(75));
        assert!(ctx.pending_images.is_empty());
        assert_eq!(ctx.spriteid, TEST_SPRITE_BASE);
    }

    #[test]
    fn test_sprite_replace_ranges() {
        let mut ctx = test_context(&["a.grf"]);
        dispatch(&mut ctx, &[0x0A, 2, 3, 0x10, 0x00, 1, 0x20, 0x01]);
        assert_eq!(ctx.pending_images.iter().copied().collect::<Vec<_>>(), vec![(0x10, 3), (0x120, 1)]);
    }

    #[test]
    fn test_font_glyphs() {
        let mut ctx = test_context(&["a.grf"]);
        dispatch(&mut ctx, &[0x12, 2, 0, 2, 0x41, 0x00, 7, 1, 0x00, 0x01]);
        assert_eq!(ctx.tables.glyphs.glyph(FontSize::Normal, 0x42), Some(TEST_SPRITE_BASE + 1));
        assert_eq!(ctx.tables.glyphs.len(), 2);
        assert_eq!(ctx.pending_images.len(), 2);
        assert_eq!(ctx.spriteid, TEST_SPRITE_BASE + 3);
    }
}

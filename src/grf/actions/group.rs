//! Action 02: define one node of the file's sprite-group graph.
//!
//! `<02> <feature> <set-id> <type> <type-specific data...>`
//!
//! Types `0x80..=0x8A` are randomized or deterministic (variational)
//! choices between other groups. Anything below `0x80` is a leaf whose
//! layout depends on the feature: loaded/loading sprite-set lists for
//! vehicles, stations and cargo, a tile layout for houses.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::context::LoadContext;
use crate::grf::features::{FEATURE_AIRCRAFT, FEATURE_CANALS, FEATURE_CARGOES, FEATURE_HOUSES, FEATURE_SOUNDFX};
use crate::grf::sprite_group::{
    callback_result, Adjust, AdjustOp, AdjustType, DeterministicRange, GroupRef, RandomCmpMode, SpriteGroup,
    TileSeq, VarScope,
};

/// Subroutine call variable of deterministic adjusts.
const VAR_SUBROUTINE: u8 = 0x7E;

/// Reference to another group of this file, or a callback result.
fn group_ref(ctx: &LoadContext, setid: u8, id: u16) -> GroupRef {
    if id & 0x8000 != 0 {
        return GroupRef::Callback(callback_result(id, ctx.file().grf_version));
    }
    let r = ctx.file().sprite_groups.reference(id);
    if let GroupRef::Pending(_) = r {
        debug!(setid, id = format_args!("{:#06x}", id), "group not defined yet, resolving later");
    }
    r
}

/// Result leaf for sprite set `set` of the active spriteset, or a callback result.
fn result_ref(ctx: &LoadContext, feature: u8, setid: u8, set: u16) -> GroupRef {
    if set & 0x8000 != 0 {
        return GroupRef::Callback(callback_result(set, ctx.file().grf_version));
    }
    match ctx.file().spriteset {
        Some(spriteset) if spriteset.is_valid(feature, set) => GroupRef::Bound(Rc::new(SpriteGroup::Result {
            sprite: spriteset.sprite(set),
            count: spriteset.num_ents,
        })),
        _ => {
            warn!(setid, feature, set, "sprite set invalid, leaving empty");
            GroupRef::Null
        }
    }
}

/// Node stored in the table for a reference standing on its own.
fn into_group(r: GroupRef) -> Option<SpriteGroup> {
    match r {
        GroupRef::Null | GroupRef::Pending(_) => None,
        GroupRef::Callback(result) => Some(SpriteGroup::Callback { result }),
        GroupRef::Bound(group) => Some(Rc::try_unwrap(group).unwrap_or_else(|rc| (*rc).clone())),
    }
}

fn read_deterministic(ctx: &LoadContext, setid: u8, kind: u8, buf: &mut ByteReader) -> Result<Option<SpriteGroup>> {
    let scope = if kind & 0x02 != 0 { VarScope::Parent } else { VarScope::SelfScope };
    let size = match (kind >> 2) & 0x03 {
        0 => 1,
        1 => 2,
        _ => 4,
    };

    let mut adjusts = Vec::new();
    loop {
        // the first adjust has no operation byte
        let op = if adjusts.is_empty() {
            AdjustOp::Add
        } else {
            let raw = buf.read_u8()?;
            match AdjustOp::from_u8(raw) {
                Some(op) => op,
                None => {
                    warn!(setid, op = raw, "unknown adjust operation, skipping group");
                    return Ok(None);
                }
            }
        };
        let variable = buf.read_u8()?;
        let (parameter, subroutine) = if variable == VAR_SUBROUTINE {
            let id = buf.read_u8()? as u16;
            (0, Some(group_ref(ctx, setid, id)))
        } else if (0x60..0x80).contains(&variable) {
            (buf.read_u8()?, None)
        } else {
            (0, None)
        };

        let varadjust = buf.read_u8()?;
        let adjust_type = match varadjust >> 6 {
            0 => AdjustType::None,
            1 => AdjustType::Div,
            2 => AdjustType::Mod,
            other => {
                debug!(setid, adjust_type = other, "invalid adjust type, treating as none");
                AdjustType::None
            }
        };
        let and_mask = buf.read_varsize(size)?;
        let (add_val, divmod_val) = if adjust_type == AdjustType::None {
            (0, 0)
        } else {
            let add = buf.read_varsize(size)?;
            // never divide by zero later
            let divmod = buf.read_varsize(size)?.max(1);
            (add, divmod)
        };

        adjusts.push(Adjust {
            op,
            variable,
            parameter,
            subroutine,
            shift_num: varadjust & 0x1F,
            and_mask,
            adjust_type,
            add_val,
            divmod_val,
        });
        if varadjust & 0x20 == 0 {
            break;
        }
    }

    let num_ranges = buf.read_u8()?;
    let mut ranges = Vec::with_capacity(num_ranges as usize);
    for _ in 0..num_ranges {
        let group = group_ref(ctx, setid, buf.read_u16_le()?);
        let low = buf.read_varsize(size)?;
        let high = buf.read_varsize(size)?;
        if low > high {
            debug!(setid, low, high, "empty range");
        }
        ranges.push(DeterministicRange { group, low, high });
    }
    let default = group_ref(ctx, setid, buf.read_u16_le()?);

    trace!(setid, adjusts = adjusts.len(), ranges = ranges.len(), "deterministic group");
    Ok(Some(SpriteGroup::Deterministic { scope, size, adjusts, ranges, default }))
}

fn read_randomized(ctx: &LoadContext, feature: u8, setid: u8, kind: u8, buf: &mut ByteReader) -> Result<SpriteGroup> {
    let mut scope = if kind & 0x02 != 0 { VarScope::Parent } else { VarScope::SelfScope };
    if kind & 0x04 != 0 {
        let count = buf.read_u8()?;
        if feature <= FEATURE_AIRCRAFT {
            scope = VarScope::Relative(count);
        }
    }

    let triggers = buf.read_u8()?;
    let cmp_mode = if triggers & 0x80 != 0 { RandomCmpMode::All } else { RandomCmpMode::Any };
    let lowest_randbit = buf.read_u8()?;
    let num_groups = buf.read_u8()?;
    if !num_groups.is_power_of_two() {
        warn!(setid, num_groups, "random group count should be a power of 2");
    }

    let mut groups = Vec::with_capacity(num_groups as usize);
    for _ in 0..num_groups {
        groups.push(group_ref(ctx, setid, buf.read_u16_le()?));
    }
    Ok(SpriteGroup::Randomized { scope, triggers: triggers & 0x7F, cmp_mode, lowest_randbit, groups })
}

/// Loaded/loading sprite-set lists. `None` leaves the slot empty.
fn read_real(ctx: &LoadContext, feature: u8, setid: u8, num_loaded: u8, buf: &mut ByteReader) -> Result<Option<SpriteGroup>> {
    let num_loading = buf.read_u8()?;
    if !ctx.file().spriteset.is_some_and(|s| s.feature == feature) {
        warn!(setid, feature, "no sprite set to work on, skipping");
        return Ok(None);
    }
    if num_loaded as u16 + num_loading as u16 == 0 {
        warn!(setid, "no result, skipping empty group");
        return Ok(None);
    }
    if num_loaded as u16 + num_loading as u16 == 1 {
        let set = buf.read_u16_le()?;
        return Ok(into_group(result_ref(ctx, feature, setid, set)));
    }

    let mut loaded = Vec::with_capacity(num_loaded as usize);
    for _ in 0..num_loaded {
        loaded.push(buf.read_u16_le()?);
    }
    let mut loading = Vec::with_capacity(num_loading as usize);
    for _ in 0..num_loading {
        loading.push(buf.read_u16_le()?);
    }

    let all_same = |v: &[u16]| !v.is_empty() && v.iter().all(|&s| s == v[0]);
    let (loaded_same, loading_same) = (all_same(&loaded), all_same(&loading));
    if loaded_same && loading_same && loaded[0] == loading[0] {
        return Ok(into_group(result_ref(ctx, feature, setid, loaded[0])));
    }
    if loaded_same {
        loaded.truncate(1);
    }
    if loading_same {
        loading.truncate(1);
    }

    debug!(setid, loaded = loaded.len(), loading = loading.len(), "real group");
    Ok(Some(SpriteGroup::Real {
        loaded: loaded.iter().map(|&s| result_ref(ctx, feature, setid, s)).collect(),
        loading: loading.iter().map(|&s| result_ref(ctx, feature, setid, s)).collect(),
    }))
}

/// Image dword of a tile layout: custom images (bit 31) index the active
/// spriteset and are resolved to global ids.
fn layout_image(ctx: &LoadContext, feature: u8, raw: u32) -> u32 {
    if raw & 0x8000_0000 == 0 {
        return raw;
    }
    let index = (raw & 0x3FFF) as u16;
    match ctx.file().spriteset {
        Some(set) if set.is_valid(feature, index) && set.num_ents > 0 => set.sprite(index),
        _ => {
            warn!(index, "tile layout uses undefined sprite set");
            0
        }
    }
}

/// `<ground:D> (<image:D> <dx> <dy> [<dz>] [<sx> <sy> <sz>])...`
fn read_tile_layout(ctx: &LoadContext, feature: u8, setid: u8, kind: u8, buf: &mut ByteReader) -> Result<Option<SpriteGroup>> {
    if kind & 0x40 != 0 {
        warn!(setid, "extended tile layout flags are not supported, skipping group");
        return Ok(None);
    }
    let num_sprites = kind.max(1);
    let no_z_position = kind == 0;

    let ground = layout_image(ctx, feature, buf.read_u32_le()?);
    let mut building = Vec::with_capacity(num_sprites as usize);
    for _ in 0..num_sprites {
        let mut seq = TileSeq { image: layout_image(ctx, feature, buf.read_u32_le()?), ..Default::default() };
        seq.delta_x = buf.read_i8()?;
        seq.delta_y = buf.read_i8()?;
        if !no_z_position {
            seq.delta_z = buf.read_u8()?;
        }
        if seq.is_parent() {
            seq.size_x = buf.read_u8()?;
            seq.size_y = buf.read_u8()?;
            seq.size_z = buf.read_u8()?;
        }
        building.push(seq);
    }
    Ok(Some(SpriteGroup::TileLayout { ground, building }))
}

pub fn new_sprite_group(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let feature = buf.read_u8()?;
    if feature > FEATURE_SOUNDFX {
        warn!(feature, "unsupported feature for sprite group, skipping");
        return Ok(ControlSignal::Continue);
    }
    let setid = buf.read_u8()?;
    let kind = buf.read_u8()?;

    let group = match kind {
        0x81 | 0x82 | 0x85 | 0x86 | 0x89 | 0x8A => read_deterministic(ctx, setid, kind, buf)?,
        0x80 | 0x83 | 0x84 => Some(read_randomized(ctx, feature, setid, kind, buf)?),
        _ => match feature {
            0x00..=FEATURE_CANALS | FEATURE_CARGOES => read_real(ctx, feature, setid, kind, buf)?,
            FEATURE_HOUSES => read_tile_layout(ctx, feature, setid, kind, buf)?,
            _ => {
                warn!(feature, kind, "unsupported sprite group type, skipping");
                None
            }
        },
    };

    ctx.file_mut().sprite_groups.set(setid as u16, group);
    Ok(ControlSignal::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::grf::action::dispatch;
    use crate::testutil::{test_context, TEST_SPRITE_BASE};

    fn with_sprite_set(feature: u8, num_sets: u8, num_ents: u8) -> LoadContext {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grf_version = 8;
        dispatch(&mut ctx, &[0x01, feature, num_sets, num_ents]);
        ctx
    }

    fn group(ctx: &LoadContext, id: u16) -> SpriteGroup {
        (*ctx.file().sprite_groups.get(id).unwrap()).clone()
    }

    #[test]
    fn test_real_group() {
        let mut ctx = with_sprite_set(0x00, 3, 4);
        let mut w = BinaryWriter::new();
        w.write_u8(0x02).write_u8(0x00).write_u8(0x05).write_u8(2).write_u8(1);
        w.write_u16_le(0).write_u16_le(1).write_u16_le(2);
        dispatch(&mut ctx, w.as_slice());

        match group(&ctx, 5) {
            SpriteGroup::Real { loaded, loading } => {
                assert_eq!(loaded.len(), 2);
                let third = ctx.file().sprite_groups.resolve(&loading[0]).unwrap();
                assert_eq!(*third, SpriteGroup::Result { sprite: TEST_SPRITE_BASE + 8, count: 4 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_result_collapses() {
        let mut ctx = with_sprite_set(0x00, 2, 8);
        dispatch(&mut ctx, &[0x02, 0x00, 0x01, 1, 0, 0x01, 0x00]);
        assert_eq!(group(&ctx, 1), SpriteGroup::Result { sprite: TEST_SPRITE_BASE + 8, count: 8 });
        // same set everywhere
        dispatch(&mut ctx, &[0x02, 0x00, 0x02, 2, 1, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(group(&ctx, 2), SpriteGroup::Result { sprite: TEST_SPRITE_BASE, count: 8 });
        // callback result in a leaf
        dispatch(&mut ctx, &[0x02, 0x00, 0x03, 1, 0, 0x10, 0x80]);
        assert_eq!(group(&ctx, 3), SpriteGroup::Callback { result: 0x10 });
    }

    #[test]
    fn test_out_of_range_set_degrades_to_null() {
        let mut ctx = with_sprite_set(0x00, 2, 8);
        dispatch(&mut ctx, &[0x02, 0x00, 0x01, 1, 1, 0x00, 0x00, 0x09, 0x00]);
        match group(&ctx, 1) {
            SpriteGroup::Real { loaded, loading } => {
                assert!(matches!(loaded[0], GroupRef::Bound(_)));
                assert!(loading[0].is_null());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(ctx.config().is_usable());
    }

    #[test]
    fn test_real_group_needs_matching_sprite_set() {
        let mut ctx = with_sprite_set(0x01, 2, 8);
        dispatch(&mut ctx, &[0x02, 0x00, 0x01, 1, 0, 0x00, 0x00]);
        assert!(ctx.file().sprite_groups.get(1).is_none());
    }

    #[test]
    fn test_deterministic_chain() {
        let mut ctx = with_sprite_set(0x00, 1, 1);
        dispatch(&mut ctx, &[0x02, 0x00, 0x01, 1, 0, 0x00, 0x00]);

        let mut w = BinaryWriter::new();
        w.write_u8(0x02).write_u8(0x00).write_u8(0x07).write_u8(0x85);
        // first adjust: variable 0x60 with parameter, mod adjust, continue
        w.write_u8(0x60).write_u8(0x02).write_u8(0x20 | 0x80 | 3).write_u16_le(0x00FF).write_u16_le(1).write_u16_le(0);
        // second adjust: and with variable 0x0C
        w.write_u8(0x0B).write_u8(0x0C).write_u8(0x00).write_u16_le(0xFFFF);
        // ranges: [0,5] -> group 1, [6,9] -> callback 0x20; default forward reference
        w.write_u8(2);
        w.write_u16_le(0x0001).write_u16_le(0).write_u16_le(5);
        w.write_u16_le(0x8020).write_u16_le(6).write_u16_le(9);
        w.write_u16_le(0x0009);
        dispatch(&mut ctx, w.as_slice());

        match group(&ctx, 7) {
            SpriteGroup::Deterministic { scope, size, adjusts, ranges, default } => {
                assert_eq!(scope, VarScope::SelfScope);
                assert_eq!(size, 2);
                assert_eq!(adjusts.len(), 2);
                assert_eq!(adjusts[0].op, AdjustOp::Add);
                assert_eq!(adjusts[0].parameter, 0x02);
                assert_eq!(adjusts[0].shift_num, 3);
                assert_eq!(adjusts[0].adjust_type, AdjustType::Mod);
                // zero divisor is replaced
                assert_eq!(adjusts[0].divmod_val, 1);
                assert_eq!(adjusts[1].op, AdjustOp::And);
                assert_eq!(adjusts[1].and_mask, 0xFFFF);
                assert!(matches!(ranges[0].group, GroupRef::Bound(_)));
                assert_eq!(ranges[1].group, GroupRef::Callback(0x20));
                assert_eq!(default, GroupRef::Pending(9));
            }
            other => panic!("unexpected {:?}", other),
        }

        // the forward reference is seen once group 9 exists
        dispatch(&mut ctx, &[0x02, 0x00, 0x09, 1, 0, 0x00, 0x00]);
        let table = &ctx.file().sprite_groups;
        assert!(table.resolve(&GroupRef::Pending(9)).is_some());
    }

    #[test]
    fn test_subroutine_reference() {
        let mut ctx = with_sprite_set(0x00, 1, 1);
        dispatch(&mut ctx, &[0x02, 0x00, 0x01, 1, 0, 0x00, 0x00]);
        dispatch(&mut ctx, &[0x02, 0x00, 0x02, 0x82, 0x7E, 0x01, 0x00, 0xFF, 0, 0x01, 0x00]);
        match group(&ctx, 2) {
            SpriteGroup::Deterministic { scope, adjusts, ranges, .. } => {
                assert_eq!(scope, VarScope::Parent);
                assert!(matches!(adjusts[0].subroutine, Some(GroupRef::Bound(_))));
                assert!(ranges.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_randomized_group() {
        let mut ctx = with_sprite_set(0x00, 1, 1);
        dispatch(&mut ctx, &[0x02, 0x00, 0x04, 0x84, 2, 0x83, 4, 2, 0x00, 0x80, 0x01, 0x80]);
        match group(&ctx, 4) {
            SpriteGroup::Randomized { scope, triggers, cmp_mode, lowest_randbit, groups } => {
                assert_eq!(scope, VarScope::Relative(2));
                assert_eq!(triggers, 0x03);
                assert_eq!(cmp_mode, RandomCmpMode::All);
                assert_eq!(lowest_randbit, 4);
                assert_eq!(groups, vec![GroupRef::Callback(0), GroupRef::Callback(1)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_house_tile_layout() {
        let mut ctx = with_sprite_set(0x07, 2, 2);
        let mut w = BinaryWriter::new();
        w.write_u8(0x02).write_u8(0x07).write_u8(0x03).write_u8(2);
        w.write_u32_le(1420);
        // parent using set 1, then a child sprite
        w.write_u32_le(0x8000_0001).write_u8(0).write_u8(0).write_u8(0).write_u8(16).write_u8(16).write_u8(20);
        w.write_u32_le(2000).write_u8(4).write_u8(4).write_u8(0x80);
        dispatch(&mut ctx, w.as_slice());

        match group(&ctx, 3) {
            SpriteGroup::TileLayout { ground, building } => {
                assert_eq!(ground, 1420);
                assert_eq!(building.len(), 2);
                assert_eq!(building[0].image, TEST_SPRITE_BASE + 2);
                assert_eq!(building[0].size_z, 20);
                assert!(!building[1].is_parent());
                assert_eq!(building[1].size_x, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncated_group_is_ignored() {
        let mut ctx = with_sprite_set(0x00, 1, 1);
        assert_eq!(dispatch(&mut ctx, &[0x02, 0x00, 0x01, 0x81, 0x0C]), ControlSignal::Continue);
        assert!(ctx.file().sprite_groups.get(1).is_none());
        assert!(ctx.config().is_usable());
    }
}

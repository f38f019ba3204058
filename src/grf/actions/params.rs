//! Actions 06 (patch the next record with parameters) and 0D (parameter
//! arithmetic, including shared resource requests).

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::config::{GrfConfigFlags, GrfMessage, GrfStatus};
use crate::grf::context::{CfgPatch, LoadContext, MiscGrfFeatures};
use crate::grf::file::{TRAININFO_DEFAULT_VEHICLE_WIDTH, VEHICLEINFO_FULL_VEHICLE_WIDTH};
use crate::grf::grm::{GrmArray, GrmResult};
use crate::grf::stage::LoadingStage;
use crate::grf::variables::{param_value, patch_variable};
use crate::tables::VehicleType;

/// `<06> (<param-num> <param-size> <offset:ext>)... <FF>`
pub fn cfg_apply(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    loop {
        let param = buf.read_u8()?;
        if param == 0xFF {
            break;
        }
        let size_byte = buf.read_u8()?;
        let add = size_byte & 0x80 != 0;
        let size = (size_byte & 0x7F) as usize;
        let offset = buf.read_extended()? as usize;

        let last = param as usize + size.saturating_sub(1) / 4;
        if param < 0x80 && last >= ctx.file().params.len() {
            debug!(param = last, "parameter not set, ignoring rest of patch");
            break;
        }

        let bytes = (0..size)
            .map(|i| {
                let value = param_value(ctx, param.wrapping_add((i / 4) as u8), None);
                (value >> (8 * (i % 4))) as u8
            })
            .collect();
        debug!(size, param, offset, "patching next record");
        ctx.pending_patch.push(CfgPatch { offset, bytes, add });
    }
    Ok(ControlSignal::Continue)
}

/// Safety scan: writing file parameters and misc feature bits is safe.
pub fn safe_param_set(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let target = buf.read_u8()?;
    if target < 0x80 || target == 0x9E {
        return Ok(ControlSignal::Continue);
    }
    Ok(ctx.mark_unsafe())
}

/// Result of a resource request: the operand, or a signal ending the action.
enum Request {
    Value(u32),
    Stop(ControlSignal),
}

fn grm_value(ctx: &mut LoadContext, array: GrmArray, op: u8, target: u8, count: u16) -> Request {
    let grfid = ctx.grfid();
    let specific = ctx.file().get_param(target);
    match ctx.grm.perform(array, op, grfid, specific, count) {
        GrmResult::Value(v) => Request::Value(v),
        GrmResult::Unavailable => Request::Value(u32::MAX),
        GrmResult::Failed => Request::Stop(ctx.disable_current(Some(GrfMessage::GrmFailed))),
    }
}

/// Resource request encoded in `data`: `FF <feature> <count:W>`, op in source 1.
fn resource_request(ctx: &mut LoadContext, op: u8, target: u8, data: u32) -> Request {
    let feature = (data >> 8) as u8;
    let count = (data >> 16) as u16;

    match ctx.stage {
        LoadingStage::Reserve => {
            if feature == 0x08 && op == 0 {
                let (grfid, line) = (ctx.grfid(), ctx.nfo_line);
                match ctx.grm.reserve_sprites(grfid, line, ctx.spriteid, count) {
                    Some(start) => {
                        debug!(count, start, "GRM: allocated sprites");
                        ctx.spriteid += count as u32;
                    }
                    None => {
                        warn!(count, "GRM: unable to allocate sprites, try changing the file order");
                        return Request::Stop(ctx.disable_current(Some(GrfMessage::GrmFailed)));
                    }
                }
            }
            // reserve-stage results are not used
            Request::Value(0)
        }
        LoadingStage::Activation => match feature {
            0x00..=0x03 => match VehicleType::from_feature(feature) {
                Some(vtype) => grm_value(ctx, GrmArray::Engines(vtype), op, target, count),
                None => Request::Stop(ControlSignal::Continue),
            },
            0x08 => match op {
                0 => {
                    let start = ctx.grm.reserved_sprites(ctx.grfid(), ctx.nfo_line).map(|(start, _)| start).unwrap_or(0);
                    debug!(start, "GRM: using pre-allocated sprites");
                    Request::Value(start)
                }
                1 => Request::Value(ctx.spriteid),
                _ => {
                    debug!(op, "GRM: unsupported operation for general sprites");
                    Request::Stop(ControlSignal::Continue)
                }
            },
            0x0B => grm_value(ctx, GrmArray::Cargo, op, target, count),
            _ => {
                debug!(feature, "GRM: unsupported feature");
                Request::Stop(ControlSignal::Continue)
            }
        },
        _ => Request::Value(0),
    }
}

/// Parameter `param` of the configured file `grfid`; `0xFE` reads its version.
fn foreign_param(ctx: &LoadContext, grfid: u32, param: u8) -> u32 {
    let file = ctx.registry.index_of_grfid(grfid);
    let config = ctx.config_by_grfid(grfid, u32::MAX);
    match (file, config) {
        (Some(file), Some(config)) if ctx.configs[config].status != GrfStatus::Disabled => {
            if param == 0xFE {
                ctx.configs[config].version as u32
            } else {
                ctx.registry[file].get_param(param)
            }
        }
        _ => 0,
    }
}

fn shift(value: u32, by: u32, signed: bool) -> u32 {
    let by = by as i32;
    if by < 0 {
        let n = by.unsigned_abs();
        if signed {
            let v = value as i32;
            v.checked_shr(n).unwrap_or(if v < 0 { -1 } else { 0 }) as u32
        } else {
            value.checked_shr(n).unwrap_or(0)
        }
    } else if signed {
        ((value as i32) << (by & 0x1F)) as u32
    } else {
        value << (by & 0x1F)
    }
}

fn evaluate(oper: u8, src1: u32, src2: u32) -> Option<u32> {
    let (s1, s2) = (src1 as i32, src2 as i32);
    Some(match oper {
        0x00 => src1,
        0x01 => src1.wrapping_add(src2),
        0x02 => src1.wrapping_sub(src2),
        0x03 => src1.wrapping_mul(src2),
        0x04 => s1.wrapping_mul(s2) as u32,
        0x05 => shift(src1, src2, false),
        0x06 => shift(src1, src2, true),
        0x07 => src1 & src2,
        0x08 => src1 | src2,
        0x09 => src1.checked_div(src2).unwrap_or(src1),
        0x0A if s2 == 0 => src1,
        0x0A => s1.wrapping_div(s2) as u32,
        0x0B => src1.checked_rem(src2).unwrap_or(src1),
        0x0C if s2 == 0 => src1,
        0x0C => s1.wrapping_rem(s2) as u32,
        _ => return None,
    })
}

fn store(ctx: &mut LoadContext, target: u8, res: u32) {
    match target {
        0x8E => ctx.file_mut().traininfo_vehicle_pitch = res as u8,
        0x8F => {
            ctx.tables.economy.railtype_cost_multiplier = [res as u8, (res >> 8) as u8, (res >> 16) as u8];
        }
        0x93..=0x97 | 0x99 | 0x9F => debug!(target, "skipping unimplemented target"),
        0x9E => {
            let mut bits = MiscGrfFeatures::from_bits_truncate(res);
            ctx.file_mut().traininfo_vehicle_width = if bits.contains(MiscGrfFeatures::TRAIN_WIDTH_32_PIXELS) {
                VEHICLEINFO_FULL_VEHICLE_WIDTH
            } else {
                TRAININFO_DEFAULT_VEHICLE_WIDTH
            };
            // per-file bit, never global
            bits.remove(MiscGrfFeatures::TRAIN_WIDTH_32_PIXELS);

            if ctx.config().flags.contains(GrfConfigFlags::SYSTEM) {
                let safe = MiscGrfFeatures::SECOND_ROCKY_TILE_SET;
                ctx.misc_features.remove(safe);
                ctx.misc_features |= bits & safe;
            } else {
                ctx.misc_features = bits;
            }
        }
        t if t < 0x80 => ctx.file_mut().set_param(t, res),
        _ => debug!(target, "skipping unknown target"),
    }
}

/// `<0D> <target> <operation> <source1> <source2> [<data:D>]`
pub fn param_set(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    buf.ensure_length(5, "param set")?;
    let target = buf.read_u8()?;
    let mut oper = buf.read_u8()?;
    let mut src1 = buf.read_u8()? as u32;
    let mut src2 = buf.read_u8()? as u32;
    let data = if buf.remaining() >= 4 { buf.read_u32_le()? } else { 0 };

    // bit 7: only if the target is still undefined
    if oper & 0x80 != 0 {
        if target < 0x80 && ctx.file().is_param_defined(target) {
            debug!(target, "parameter already defined, skipping");
            return Ok(ControlSignal::Continue);
        }
        oper &= 0x7F;
    }

    if src2 == 0xFE {
        if data & 0xFF == 0xFF {
            if data == 0x0000_FFFF {
                src1 = patch_variable(ctx, src1 as u8);
            } else {
                match resource_request(ctx, src1 as u8, target, data) {
                    Request::Value(v) => src1 = v,
                    Request::Stop(signal) => return Ok(signal),
                }
            }
        } else {
            src1 = foreign_param(ctx, data, src1 as u8);
        }
    } else {
        src1 = if src1 == 0xFF { data } else { param_value(ctx, src1 as u8, None) };
        src2 = if src2 == 0xFF { data } else { param_value(ctx, src2 as u8, None) };
    }

    let Some(res) = evaluate(oper, src1, src2) else {
        warn!(oper, line = ctx.nfo_line, "unknown parameter operation, skipping");
        return Ok(ControlSignal::Continue);
    };
    debug!(target, oper, src1, src2, res, "param set");
    store(ctx, target, res);
    Ok(ControlSignal::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::grf::action::dispatch;
    use crate::grf::grm::MAX_GRM_SPRITE;
    use crate::testutil::{param_set as param_set_record, test_context};

    fn grm(target: u8, op: u8, feature: u8, count: u16) -> Vec<u8> {
        param_set_record(target, 0x00, op, 0xFE, 0xFF | (feature as u32) << 8 | (count as u32) << 16)
    }

    #[test]
    fn test_add_literal_and_parameter() {
        let mut ctx = test_context(&["a.grf"]);
        dispatch(&mut ctx, &param_set_record(0, 0x00, 0xFF, 0xFF, 3));
        dispatch(&mut ctx, &param_set_record(2, 0x01, 0xFF, 0x00, 5));
        assert_eq!(ctx.file().get_param(2), 8);
        assert_eq!(ctx.file().params.len(), 3);
    }

    #[test]
    fn test_operations() {
        assert_eq!(evaluate(0x02, 3, 5), Some(u32::MAX - 1));
        assert_eq!(evaluate(0x04, (-3i32) as u32, 4), Some((-12i32) as u32));
        assert_eq!(evaluate(0x05, 1, 4), Some(16));
        assert_eq!(evaluate(0x05, 0x80, (-4i32) as u32), Some(8));
        assert_eq!(evaluate(0x06, (-64i32) as u32, (-2i32) as u32), Some((-16i32) as u32));
        assert_eq!(evaluate(0x05, 1, (-40i32) as u32), Some(0));
        assert_eq!(evaluate(0x09, 7, 0), Some(7));
        assert_eq!(evaluate(0x0A, (-9i32) as u32, 2), Some((-4i32) as u32));
        assert_eq!(evaluate(0x0B, 9, 4), Some(1));
        assert_eq!(evaluate(0x0C, 9, 0), Some(9));
        assert_eq!(evaluate(0x0D, 1, 1), None);
    }

    #[test]
    fn test_only_if_undefined() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().reset_params(&[1, 2]);
        dispatch(&mut ctx, &param_set_record(1, 0x80, 0xFF, 0xFF, 9));
        assert_eq!(ctx.file().get_param(1), 2);
        dispatch(&mut ctx, &param_set_record(4, 0x80, 0xFF, 0xFF, 9));
        assert_eq!(ctx.file().get_param(4), 9);
    }

    #[test]
    fn test_patch_variable_and_foreign_param() {
        let mut ctx = test_context(&["a.grf", "b.grf"]);
        dispatch(&mut ctx, &param_set_record(0, 0x00, 0x0B, 0xFE, 0x0000_FFFF));
        assert_eq!(ctx.file().get_param(0), 30);

        ctx.registry[1].grfid = 0x0403_0201;
        ctx.registry[1].set_param(3, 77);
        ctx.configs[1].ident.grfid = 0x0403_0201;
        ctx.configs[1].version = 6;
        dispatch(&mut ctx, &param_set_record(1, 0x00, 0x03, 0xFE, 0x0403_0201));
        dispatch(&mut ctx, &param_set_record(2, 0x00, 0xFE, 0xFE, 0x0403_0201));
        assert_eq!(ctx.file().get_param(1), 77);
        assert_eq!(ctx.file().get_param(2), 6);

        ctx.configs[1].status = GrfStatus::Disabled;
        dispatch(&mut ctx, &param_set_record(1, 0x00, 0x03, 0xFE, 0x0403_0201));
        assert_eq!(ctx.file().get_param(1), 0);
    }

    #[test]
    fn test_special_targets() {
        let mut ctx = test_context(&["a.grf"]);
        dispatch(&mut ctx, &param_set_record(0x8F, 0x00, 0xFF, 0xFF, 0x00_0C_0A_04));
        assert_eq!(ctx.tables.economy.railtype_cost_multiplier, [4, 10, 12]);

        let bits = MiscGrfFeatures::TRAIN_WIDTH_32_PIXELS | MiscGrfFeatures::DESERT_PAVED_ROADS;
        dispatch(&mut ctx, &param_set_record(0x9E, 0x00, 0xFF, 0xFF, bits.bits()));
        assert_eq!(ctx.file().traininfo_vehicle_width, VEHICLEINFO_FULL_VEHICLE_WIDTH);
        assert_eq!(ctx.misc_features, MiscGrfFeatures::DESERT_PAVED_ROADS);

        dispatch(&mut ctx, &param_set_record(0x8E, 0x00, 0xFF, 0xFF, 3));
        assert_eq!(ctx.file().traininfo_vehicle_pitch, 3);
        // unknown target is ignored
        dispatch(&mut ctx, &param_set_record(0xA0, 0x00, 0xFF, 0xFF, 3));
        assert!(ctx.config().is_usable());
    }

    #[test]
    fn test_grm_vehicles_in_activation_only() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grfid = 0xAABB_CCDD;
        ctx.stage = LoadingStage::Init;
        dispatch(&mut ctx, &grm(5, 0, 0x00, 4));
        assert_eq!(ctx.file().get_param(5), 0);

        ctx.stage = LoadingStage::Activation;
        dispatch(&mut ctx, &grm(5, 0, 0x00, 4));
        assert_eq!(ctx.file().get_param(5), 0);
        assert_eq!(ctx.grm.owner(GrmArray::Engines(VehicleType::Train), 3), 0xAABB_CCDD);

        // soft failure stores u32::MAX, hard failure disables
        dispatch(&mut ctx, &grm(6, 4, 0x02, 200));
        assert_eq!(ctx.file().get_param(6), u32::MAX);
        assert_eq!(dispatch(&mut ctx, &grm(6, 0, 0x02, 200)), ControlSignal::AbortFile);
        assert_eq!(ctx.config().status, GrfStatus::Disabled);
    }

    #[test]
    fn test_grm_zero_count_at_parameter_start() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grfid = 0xAABB_CCDD;
        // the start comes from the target parameter and lies past the train table
        dispatch(&mut ctx, &param_set_record(5, 0x00, 0xFF, 0xFF, 1000));
        assert_eq!(dispatch(&mut ctx, &grm(5, 3, 0x00, 0)), ControlSignal::Continue);
        assert_eq!(ctx.file().get_param(5), 1000);
        assert!(ctx.config().is_usable());

        assert_eq!(dispatch(&mut ctx, &grm(5, 3, 0x00, 1)), ControlSignal::AbortFile);
        assert_eq!(ctx.config().error.as_ref().map(|e| e.message), Some(GrfMessage::GrmFailed));
    }

    #[test]
    fn test_grm_sprites_reserved_then_returned() {
        let mut ctx = test_context(&["a.grf"]);
        let start = ctx.spriteid;
        ctx.stage = LoadingStage::Reserve;
        ctx.nfo_line = 10;
        dispatch(&mut ctx, &grm(0, 0, 0x08, 50));
        assert_eq!(ctx.spriteid, start + 50);

        ctx.stage = LoadingStage::Activation;
        dispatch(&mut ctx, &grm(0, 0, 0x08, 50));
        assert_eq!(ctx.file().get_param(0), start);
        dispatch(&mut ctx, &grm(1, 1, 0x08, 0));
        assert_eq!(ctx.file().get_param(1), start + 50);
    }

    #[test]
    fn test_grm_sprites_ceiling() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::Reserve;
        ctx.spriteid = MAX_GRM_SPRITE - 10;
        assert_eq!(dispatch(&mut ctx, &grm(0, 0, 0x08, 20)), ControlSignal::AbortFile);
        assert_eq!(ctx.config().error.as_ref().map(|e| e.message), Some(GrfMessage::GrmFailed));
    }

    #[test]
    fn test_safe_param_set() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::SafetyScan;
        assert_eq!(dispatch(&mut ctx, &param_set_record(3, 0, 0xFF, 0xFF, 1)), ControlSignal::Continue);
        assert_eq!(dispatch(&mut ctx, &param_set_record(0x9E, 0, 0xFF, 0xFF, 1)), ControlSignal::Continue);
        assert_eq!(dispatch(&mut ctx, &param_set_record(0x8F, 0, 0xFF, 0xFF, 1)), ControlSignal::AbortFile);
        assert!(ctx.config().flags.contains(GrfConfigFlags::UNSAFE));
    }

    #[test]
    fn test_cfg_apply_records_patch() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().reset_params(&[0x0403_0201, 0x0000_0005]);
        let mut w = BinaryWriter::new();
        w.write_u8(0x06);
        w.write_u8(0).write_u8(6).write_extended(2);
        w.write_u8(1).write_u8(0x81).write_extended(9);
        w.write_u8(0xFF);
        dispatch(&mut ctx, w.as_slice());
        assert_eq!(
            ctx.pending_patch,
            vec![
                CfgPatch { offset: 2, bytes: vec![1, 2, 3, 4, 5, 0], add: false },
                CfgPatch { offset: 9, bytes: vec![5], add: true },
            ]
        );
    }

    #[test]
    fn test_cfg_apply_stops_at_undefined_param() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().reset_params(&[7]);
        // 5 bytes would need parameter 1 too
        dispatch(&mut ctx, &[0x06, 0x00, 0x05, 0x00, 0xFF]);
        assert!(ctx.pending_patch.is_empty());
    }
}

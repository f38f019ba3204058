//! Actions 07/09 (conditional skip) and 10 (goto label).

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::config::GrfStatus;
use crate::grf::context::LoadContext;
use crate::grf::file::GotoLabel;
use crate::grf::variables;
use crate::tables::CargoLabel;

/// Whether the grfid condition `condtype` holds for the file matching
/// `grfid` under `mask`. `None` when the test must be skipped.
fn grfid_condition(ctx: &LoadContext, condtype: u8, grfid: u32, mask: u32) -> Option<bool> {
    let config = ctx.config_by_grfid(grfid, mask);
    if condtype != 0x0A && config.is_none() {
        debug!(grfid = format_args!("{:08X}", grfid.swap_bytes()), "grfid not configured, ignoring test");
        return None;
    }
    let status = config.map(|idx| ctx.configs[idx].status);
    let result = match condtype {
        0x06 => status == Some(GrfStatus::Activated),
        0x07 => status != Some(GrfStatus::Activated),
        0x08 => status == Some(GrfStatus::Initialised),
        0x09 => matches!(status, Some(GrfStatus::Activated | GrfStatus::Initialised)),
        0x0A => matches!(status, None | Some(GrfStatus::Disabled | GrfStatus::NotFound)),
        _ => {
            warn!(condtype, "unsupported grfid test, ignoring");
            return None;
        }
    };
    Some(result)
}

/// `<07/09> <param> <size> <condtype> <value> <num-sprites|label>`
pub fn skip_if(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    buf.ensure_length(6, "skip if")?;
    let param = buf.read_u8()?;
    let mut paramsize = buf.read_u8()?;
    let condtype = buf.read_u8()?;

    // bit tests always use one byte
    if condtype < 2 {
        paramsize = 1;
    }

    let (mut cond_val, mask) = match paramsize {
        8 => (buf.read_u32_le()?, buf.read_u32_le()?),
        4 => (buf.read_u32_le()?, u32::MAX),
        2 => (buf.read_u16_le()? as u32, 0xFFFF),
        1 => (buf.read_u8()? as u32, 0xFF),
        _ => (0, 0),
    };

    if param < 0x80 && !ctx.file().is_param_defined(param) {
        debug!(param, "parameter not set, ignoring test");
        return Ok(ControlSignal::Continue);
    }

    let result = if condtype >= 0x0B {
        let present = ctx.tables.cargo_by_label(CargoLabel(cond_val.swap_bytes())).is_some();
        match condtype {
            0x0B => !present,
            0x0C => present,
            _ => {
                warn!(condtype, "unsupported test, ignoring");
                return Ok(ControlSignal::Continue);
            }
        }
    } else if param == 0x88 {
        match grfid_condition(ctx, condtype, cond_val, mask) {
            Some(result) => result,
            None => return Ok(ControlSignal::Continue),
        }
    } else {
        let param_val = variables::param_value(ctx, param, Some(&mut cond_val));
        debug!(condtype, param_val = format_args!("{:#x}", param_val), cond_val = format_args!("{:#x}", cond_val), "test");
        match condtype {
            0x00 => cond_val < 32 && param_val & (1 << cond_val) != 0,
            0x01 => !(cond_val < 32 && param_val & (1 << cond_val) != 0),
            0x02 => param_val & mask == cond_val,
            0x03 => param_val & mask != cond_val,
            0x04 => (param_val & mask) < cond_val,
            0x05 => (param_val & mask) > cond_val,
            _ => {
                warn!(condtype, "unsupported test, ignoring");
                return Ok(ControlSignal::Continue);
            }
        }
    };

    if !result {
        debug!(line = ctx.nfo_line, "not skipping, test was false");
        return Ok(ControlSignal::Continue);
    }

    let numsprites = buf.read_u8()?;
    if let Some(&GotoLabel { label, offset, line }) = ctx.file().find_label(numsprites, ctx.nfo_line) {
        debug!(label, line, "jumping to label, test was true");
        return Ok(ControlSignal::Jump { offset, line });
    }

    debug!(numsprites, "skipping sprites, test was true");
    if numsprites == 0 {
        // no action 8 yet: the file never declared itself, drop it
        if ctx.config().status != ctx.expected_status() {
            return Ok(ctx.disable_current(None));
        }
        return Ok(ControlSignal::AbortFile);
    }
    Ok(ControlSignal::SkipCount(numsprites as u32))
}

/// `<10> <label> [<comment>]`, label scan only.
pub fn define_label(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let label = buf.read_u8()?;
    let entry = GotoLabel { label, offset: ctx.record_end, line: ctx.nfo_line };
    debug!(label, line = entry.line, "goto label");
    ctx.file_mut().labels.push(entry);
    Ok(ControlSignal::Continue)
}

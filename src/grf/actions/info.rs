//! Actions 08 (file info), 0B (load error) and 0E (deactivate other files),
//! plus the safety-scan marker for actions that touch other files.

use tracing::{debug, info, warn};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::grf::action::ControlSignal;
use crate::grf::config::{format_grfid, ErrorSeverity, GrfConfigFlags, GrfError, GrfMessage, GrfStatus};
use crate::grf::context::LoadContext;
use crate::grf::stage::LoadingStage;
use crate::host::{decode_text, LANGUAGE_ANY};

/// Format versions this loader understands.
pub const MIN_GRF_VERSION: u8 = 2;
pub const MAX_GRF_VERSION: u8 = 8;

/// Whether text tagged `lang` applies to the configured language. Files
/// before version 7 use a bit mask of the five original languages.
pub fn language_matches(lang: u8, grf_version: u8, current: u8) -> bool {
    if grf_version < 7 {
        return match current {
            0x02 => lang & 0x04 != 0,
            0x03 => lang & 0x08 != 0,
            0x04 => lang & 0x10 != 0,
            _ => lang & 0x03 != 0,
        };
    }
    lang == current || lang == LANGUAGE_ANY
}

/// `<08> <version> <grfid:D> <name> [<description>]` during the file scan.
pub fn scan_info(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let version = buf.read_u8()?;
    let grfid = buf.read_u32_le()?;
    let name = decode_text(buf.read_string()?);
    let description = if buf.has_data() { Some(decode_text(buf.read_string()?)) } else { None };

    let config = ctx.config_mut();
    config.ident.grfid = grfid;
    config.version = version;
    if !(MIN_GRF_VERSION..=MAX_GRF_VERSION).contains(&version) {
        warn!(file = %config.filename, grfid = %format_grfid(grfid), version, "unsupported format version");
        config.flags |= GrfConfigFlags::INVALID;
    }
    // reserved for system files
    if grfid & 0xFF == 0xFF {
        config.flags |= GrfConfigFlags::SYSTEM;
    }
    debug!(grfid = %format_grfid(grfid), version, name = %name, "scanned file info");
    config.name = Some(name);
    config.info = description;

    // nothing else in the file matters for the scan
    Ok(ControlSignal::AbortFile)
}

/// `<08> <version> <grfid:D> <name> [<description>]`
pub fn grf_info(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let version = buf.read_u8()?;
    let grfid = buf.read_u32_le()?;
    let name = decode_text(buf.read_string()?);

    if ctx.stage < LoadingStage::Reserve && ctx.config().status != GrfStatus::Unknown {
        return Ok(ctx.disable_current(Some(GrfMessage::MultipleInfo)));
    }

    let file = ctx.file_mut();
    if file.grfid != grfid {
        debug!(scanned = %format_grfid(file.grfid), declared = %format_grfid(grfid), "grfid differs from file scan");
        file.grfid = grfid;
    }
    file.grf_version = version;

    let status = if ctx.stage < LoadingStage::Reserve { GrfStatus::Initialised } else { GrfStatus::Activated };
    ctx.config_mut().status = status;
    info!(grfid = %format_grfid(grfid), version, name = %name, stage = %ctx.stage, "loaded file info");
    Ok(ControlSignal::Continue)
}

/// `<0B> <severity> <lang> <message-id> [<message> 00] [<data> 00] [<param>...]`
pub fn load_error(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let mut severity = buf.read_u8()?;
    let lang = buf.read_u8()?;
    let message_id = buf.read_u8()?;

    if !language_matches(lang, ctx.file().grf_version, ctx.env.language) {
        return Ok(ControlSignal::Continue);
    }
    // non-fatal errors wait for activation unless bit 7 asks otherwise
    if severity & 0x80 == 0 && ctx.stage == LoadingStage::Init {
        debug!(stage = %ctx.stage, "skipping non-fatal load error");
        return Ok(ControlSignal::Continue);
    }
    severity &= 0x7F;

    let mut signal = ControlSignal::Continue;
    if severity > 3 {
        debug!(severity, "invalid severity, using non-fatal error");
        severity = 2;
    } else if severity == 3 {
        signal = ctx.disable_current(None);
        // a fatal error replaces earlier notices
        ctx.config_mut().error = None;
    }

    let Some(message) = GrfMessage::from_builtin(message_id) else {
        debug!(message_id, "invalid message id");
        return Ok(signal);
    };
    if buf.remaining() <= 1 {
        debug!("no message data supplied");
        return Ok(signal);
    }
    if ctx.config().error.is_some() {
        return Ok(signal);
    }

    let mut error = GrfError::new(ErrorSeverity::from_u8(severity), message);
    if message == GrfMessage::Custom {
        error.custom_message = if buf.has_data() { Some(decode_text(buf.read_string()?)) } else { None };
    }
    error.data = if buf.has_data() { Some(decode_text(buf.read_string()?)) } else { None };
    for slot in error.param_value.iter_mut() {
        if !buf.has_data() {
            break;
        }
        *slot = ctx.file().get_param(buf.read_u8()?);
    }

    warn!(file = %ctx.config().filename, severity = ?error.severity, %message, data = ?error.data, "file reported an error");
    ctx.config_mut().error = Some(error);
    Ok(signal)
}

/// `<0E> <num> <grfid:D>...`
pub fn inhibit(ctx: &mut LoadContext, buf: &mut ByteReader) -> Result<ControlSignal> {
    let num = buf.read_u8()?;
    let name = ctx.config().name.clone().unwrap_or_else(|| ctx.config().filename.clone());
    for _ in 0..num {
        let grfid = buf.read_u32_le()?;
        let Some(idx) = ctx.config_by_grfid(grfid, u32::MAX) else {
            continue;
        };
        if idx == ctx.cur_config {
            continue;
        }
        let target = &mut ctx.configs[idx];
        info!(file = %target.filename, by = %name, "deactivating file");
        target.disable(None);
        let mut error = GrfError::new(ErrorSeverity::Fatal, GrfMessage::ForciblyDisabled);
        error.data = Some(name.clone());
        target.error = Some(error);
    }
    Ok(ControlSignal::Continue)
}

/// Actions that change other files are never safe for static use.
pub fn grf_unsafe(ctx: &mut LoadContext, _buf: &mut ByteReader) -> Result<ControlSignal> {
    Ok(ctx.mark_unsafe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;
    use crate::grf::action::dispatch;
    use crate::testutil::{info, test_context};

    fn load_error_record(severity: u8, lang: u8, message_id: u8, texts: &[&str], params: &[u8]) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.write_u8(0x0B).write_u8(severity).write_u8(lang).write_u8(message_id);
        for text in texts {
            w.write_string(text);
        }
        w.write_bytes(params);
        w.into_vec()
    }

    #[test]
    fn test_scan_info() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::FileScan;
        let signal = dispatch(&mut ctx, &info(8, 0x04030201, "Test Set", "Some trains"));
        assert_eq!(signal, ControlSignal::AbortFile);
        let config = ctx.config();
        assert_eq!(config.ident.grfid, 0x04030201);
        assert_eq!(config.version, 8);
        assert_eq!(config.name.as_deref(), Some("Test Set"));
        assert_eq!(config.info.as_deref(), Some("Some trains"));
        assert!(config.flags.is_empty());
    }

    #[test]
    fn test_scan_info_flags() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::FileScan;
        let mut w = BinaryWriter::new();
        w.write_u8(0x08).write_u8(1).write_u32_le(0x000000FF).write_string("Sys");
        dispatch(&mut ctx, w.as_slice());
        assert!(ctx.config().flags.contains(GrfConfigFlags::SYSTEM | GrfConfigFlags::INVALID));
        assert_eq!(ctx.config().info, None);
    }

    #[test]
    fn test_info_sets_status_per_stage() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::Init;
        dispatch(&mut ctx, &info(7, 0xAA, "A", ""));
        assert_eq!(ctx.config().status, GrfStatus::Initialised);
        assert_eq!(ctx.file().grfid, 0xAA);
        assert_eq!(ctx.file().grf_version, 7);

        // a second one before reserve is fatal
        assert_eq!(dispatch(&mut ctx, &info(7, 0xAA, "A", "")), ControlSignal::AbortFile);
        assert_eq!(ctx.config().status, GrfStatus::Disabled);
        assert_eq!(ctx.config().error.as_ref().map(|e| e.message), Some(GrfMessage::MultipleInfo));

        let mut ctx = test_context(&["a.grf"]);
        ctx.configs[0].status = GrfStatus::Initialised;
        dispatch(&mut ctx, &info(8, 0xAA, "A", ""));
        assert_eq!(ctx.config().status, GrfStatus::Activated);
    }

    #[test]
    fn test_load_error_custom_and_params() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grf_version = 8;
        ctx.file_mut().set_param(1, 99);
        let record = load_error_record(0x01, 0x7F, 0xFF, &["Too old", "v1.2"], &[1, 5]);
        assert_eq!(dispatch(&mut ctx, &record), ControlSignal::Continue);
        let error = ctx.config().error.clone().unwrap();
        assert_eq!(error.severity, ErrorSeverity::Warning);
        assert_eq!(error.message, GrfMessage::Custom);
        assert_eq!(error.custom_message.as_deref(), Some("Too old"));
        assert_eq!(error.data.as_deref(), Some("v1.2"));
        assert_eq!(error.param_value, [99, 0]);
        assert!(ctx.config().is_usable());

        // only the first error is kept
        dispatch(&mut ctx, &load_error_record(0x02, 0x7F, 0x03, &["x"], &[]));
        assert_eq!(ctx.config().error.as_ref().unwrap().message, GrfMessage::Custom);
    }

    #[test]
    fn test_fatal_load_error_disables() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grf_version = 8;
        ctx.configs[0].error = Some(GrfError::new(ErrorSeverity::Notice, GrfMessage::DesignedFor));
        let record = load_error_record(0x03, 0x7F, 0x05, &["base set"], &[]);
        assert_eq!(dispatch(&mut ctx, &record), ControlSignal::AbortFile);
        let error = ctx.config().error.clone().unwrap();
        assert_eq!(ctx.config().status, GrfStatus::Disabled);
        assert_eq!(error.severity, ErrorSeverity::Fatal);
        assert_eq!(error.message, GrfMessage::MustBeLoadedAfter);
    }

    #[test]
    fn test_load_error_filters() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().grf_version = 8;
        // other language
        dispatch(&mut ctx, &load_error_record(0x02, 0x03, 0x00, &["x"], &[]));
        // non-fatal in init without bit 7
        ctx.stage = LoadingStage::Init;
        dispatch(&mut ctx, &load_error_record(0x02, 0x7F, 0x00, &["x"], &[]));
        // unknown message id
        dispatch(&mut ctx, &load_error_record(0x82, 0x7F, 0x09, &["x"], &[]));
        assert!(ctx.config().error.is_none());

        dispatch(&mut ctx, &load_error_record(0x82, 0x7F, 0x00, &["x"], &[]));
        assert_eq!(ctx.config().error.as_ref().unwrap().severity, ErrorSeverity::Error);
    }

    #[test]
    fn test_language_matches() {
        assert!(language_matches(0x7F, 8, 0x01));
        assert!(language_matches(0x01, 8, 0x01));
        assert!(!language_matches(0x02, 8, 0x01));
        // old bit mask: english or american
        assert!(language_matches(0x02, 6, 0x01));
        assert!(language_matches(0x04, 6, 0x02));
        assert!(!language_matches(0x04, 6, 0x01));
    }

    #[test]
    fn test_inhibit_other_files() {
        let mut ctx = test_context(&["a.grf", "b.grf", "c.grf"]);
        ctx.configs[0].ident.grfid = 0x0A;
        ctx.configs[1].ident.grfid = 0x0B;
        ctx.configs[0].name = Some("Set A".into());
        let mut w = BinaryWriter::new();
        w.write_u8(0x0E).write_u8(3).write_u32_le(0x0A).write_u32_le(0x0B).write_u32_le(0x0C);
        assert_eq!(dispatch(&mut ctx, w.as_slice()), ControlSignal::Continue);
        assert!(ctx.configs[0].is_usable());
        assert_eq!(ctx.configs[1].status, GrfStatus::Disabled);
        let error = ctx.configs[1].error.clone().unwrap();
        assert_eq!(error.message, GrfMessage::ForciblyDisabled);
        assert_eq!(error.data.as_deref(), Some("Set A"));
        assert!(ctx.configs[2].is_usable());
    }

    #[test]
    fn test_unsafe_in_safety_scan() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::SafetyScan;
        assert_eq!(dispatch(&mut ctx, &[0x0E, 0]), ControlSignal::AbortFile);
        assert!(ctx.config().flags.contains(GrfConfigFlags::UNSAFE));
    }
}

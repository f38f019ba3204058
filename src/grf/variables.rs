//! Read-only variables visible to extension files.
//!
//! Parameters at or above `0x80` are not file parameters but views of host
//! state: global variables (`0x80 + n`), the loading stage (`0x84`), the
//! feature flag words (`0x85`) and the grfid test marker (`0x88`). Patch
//! variables are a separate namespace read through action 0D.

use tracing::{debug, warn};

use crate::grf::actions::graphics::{SPR_2CCMAP_BASE, SPR_SHORE_BASE, SPR_SLOPES_BASE};
use crate::grf::context::{LoadContext, MiscGrfFeatures};
use crate::grf::file::VEHICLEINFO_FULL_VEHICLE_WIDTH;
use crate::grf::stage::LoadingStage;

/// Day number of 1920-01-01.
pub const DAYS_TILL_ORIGINAL_BASE_YEAR: u32 = 701_265;
pub const ORIGINAL_BASE_YEAR: u32 = 1920;
pub const ORIGINAL_MAX_YEAR: u32 = 2175;

/// Version reported as variable 0x0B.
const TTDPATCH_VERSION: u32 = (2 << 24) | (6 << 20) | (1 << 16) | 1382;

const DAYS_IN_MONTH: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Calendar date of a day number: (year, month 0-11, day 1-31, day of year).
pub fn date_to_ymd(date: u32) -> (u32, u8, u8, u32) {
    let mut year = 400 * (date / 146_097);
    let mut rem = date % 146_097;
    loop {
        let len = if is_leap_year(year) { 366 } else { 365 };
        if rem < len {
            break;
        }
        rem -= len;
        year += 1;
    }
    let yday = rem;
    let leap = is_leap_year(year);
    let mut month = 0;
    for (m, &days) in DAYS_IN_MONTH.iter().enumerate() {
        let days = if m == 1 && !leap { 28 } else { days };
        if rem < days {
            month = m;
            break;
        }
        rem -= days;
    }
    (year, month as u8, rem as u8 + 1, yday)
}

/// Feature flag words reported through variable 0x85.
pub fn ttdpatch_flags() -> [u32; 8] {
    let mut flags = [0u32; 8];
    // newgrf vehicle sets
    flags[0] = 1 << 0x1B;
    for bit in [0x08, 0x0B, 0x14, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B] {
        flags[1] |= 1 << bit;
    }
    for bit in [0x0D, 0x16, 0x17] {
        flags[2] |= 1 << bit;
    }
    flags
}

/// Global variable `var` (parameter `0x80 + var`), if the host provides it.
pub fn global_variable(ctx: &LoadContext, var: u8) -> Option<u32> {
    let env = &ctx.env;
    let (year, month, day, yday) = date_to_ymd(env.date);
    let value = match var {
        0x00 => env.date.saturating_sub(DAYS_TILL_ORIGINAL_BASE_YEAR),
        0x01 => year.clamp(ORIGINAL_BASE_YEAR, ORIGINAL_MAX_YEAR) - ORIGINAL_BASE_YEAR,
        0x02 => month as u32 | (day as u32 - 1) << 8 | (is_leap_year(year) as u32) << 15 | yday << 16,
        0x03 => env.climate as u32,
        0x06 => (env.drive_on_right as u32) << 4,
        0x09 => env.date_fract as u32 * 885,
        0x0A => 0,
        0x0B => TTDPATCH_VERSION,
        0x0D => env.palette as u32,
        0x0E => ctx.file().traininfo_vehicle_pitch as u32,
        0x0F => {
            let m = ctx.tables.economy.railtype_cost_multiplier;
            m[0] as u32 | (m[1] as u32) << 8 | (m[2] as u32) << 16
        }
        0x11 => 0,
        0x12 => env.game_mode as u32,
        0x1A => u32::MAX,
        0x1B => 0x3F,
        0x1D => 1,
        0x1E => {
            let mut bits = ctx.misc_features;
            if ctx.file().traininfo_vehicle_width == VEHICLEINFO_FULL_VEHICLE_WIDTH {
                bits |= MiscGrfFeatures::TRAIN_WIDTH_32_PIXELS;
            }
            bits.bits()
        }
        0x20 => {
            if env.climate == 1 {
                env.snow_line_height as u32
            } else {
                0xFF
            }
        }
        0x21 => env.host_version,
        0x22 => env.difficulty as u32,
        0x23 => env.date,
        0x24 => year,
        _ => return None,
    };
    Some(value)
}

/// Value of parameter-or-variable `param`. For the feature flag words,
/// `cond_val` carries the bit index and is reduced to the bit within the
/// selected word.
pub fn param_value(ctx: &LoadContext, param: u8, cond_val: Option<&mut u32>) -> u32 {
    match param {
        0x84 => {
            let mut bits = 0;
            if ctx.stage > LoadingStage::Init {
                bits |= 1;
            }
            if ctx.stage == LoadingStage::Reserve {
                bits |= 1 << 8;
            }
            if ctx.stage == LoadingStage::Activation {
                bits |= 1 << 9;
            }
            bits
        }
        0x85 => match cond_val {
            Some(cond) => {
                let index = (*cond / 0x20) as usize;
                *cond %= 0x20;
                ctx.ttdpatch_flags.get(index).copied().unwrap_or(0)
            }
            None => 0,
        },
        // grfid checks go through the config list instead
        0x88 => 0,
        p if p < 0x80 => ctx.file().get_param(p),
        p => match global_variable(ctx, p - 0x80) {
            Some(value) => value,
            None => {
                warn!(variable = p, "unsupported in-game variable");
                u32::MAX
            }
        },
    }
}

/// Patch variable `var`, read by action 0D with data `0x0000FFFF`.
pub fn patch_variable(ctx: &LoadContext, var: u8) -> u32 {
    let env = &ctx.env;
    match var {
        0x0B => env.starting_year.max(ORIGINAL_BASE_YEAR) - ORIGINAL_BASE_YEAR,
        0x0E => env.freight_trains as u32,
        0x0F => 0,
        0x10 => match env.plane_speed {
            3 | 2 => 2,
            1 => 4,
            _ => 1,
        },
        0x11 => SPR_2CCMAP_BASE,
        0x13 => {
            let log_x = env.map_log_x.saturating_sub(6) as u32;
            let log_y = env.map_log_y.saturating_sub(6) as u32;
            let max_edge = log_x.max(log_y);
            let mut map_bits = 0u32;
            if log_x == log_y {
                map_bits |= 1;
            } else if max_edge == log_y {
                map_bits |= 2;
            }
            map_bits << 24 | log_x.min(log_y) << 20 | max_edge << 16 | log_x << 12 | log_y << 8 | (log_x + log_y)
        }
        0x14 => env.map_height_limit as u32,
        0x15 => SPR_SLOPES_BASE,
        0x16 => SPR_SHORE_BASE,
        0x17 => env.generation_seed,
        _ => {
            debug!(variable = var, "unknown patch variable");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_context;

    #[test]
    fn test_date_to_ymd() {
        assert_eq!(date_to_ymd(DAYS_TILL_ORIGINAL_BASE_YEAR), (1920, 0, 1, 0));
        // 1920 is a leap year: day 59 is Feb 29
        assert_eq!(date_to_ymd(DAYS_TILL_ORIGINAL_BASE_YEAR + 59), (1920, 1, 29, 59));
        assert_eq!(date_to_ymd(DAYS_TILL_ORIGINAL_BASE_YEAR + 366), (1921, 0, 1, 0));
        assert_eq!(date_to_ymd(0), (0, 0, 1, 0));
    }

    #[test]
    fn test_global_variables() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.env.date = DAYS_TILL_ORIGINAL_BASE_YEAR + 366 + 40;
        ctx.env.climate = 2;
        assert_eq!(param_value(&ctx, 0x80, None), 366 + 40);
        assert_eq!(param_value(&ctx, 0x81, None), 1);
        // Feb 10th
        assert_eq!(param_value(&ctx, 0x82, None) & 0xFFFF, 1 | 9 << 8);
        assert_eq!(param_value(&ctx, 0x83, None), 2);
        assert_eq!(param_value(&ctx, 0xA4, None), 1921);
        assert_eq!(param_value(&ctx, 0x8F, None), 0x080808);
        assert_eq!(param_value(&ctx, 0x9A, None), u32::MAX);
        assert_eq!(param_value(&ctx, 0xFF, None), u32::MAX);
    }

    #[test]
    fn test_stage_bits() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.stage = LoadingStage::Init;
        assert_eq!(param_value(&ctx, 0x84, None), 0);
        ctx.stage = LoadingStage::Reserve;
        assert_eq!(param_value(&ctx, 0x84, None), 0x101);
        ctx.stage = LoadingStage::Activation;
        assert_eq!(param_value(&ctx, 0x84, None), 0x201);
    }

    #[test]
    fn test_ttdpatch_flag_words() {
        let ctx = test_context(&["a.grf"]);
        let mut bit = 0x20 + 0x0B;
        let word = param_value(&ctx, 0x85, Some(&mut bit));
        assert_eq!(bit, 0x0B);
        assert_ne!(word & (1 << bit), 0);
        assert_eq!(param_value(&ctx, 0x85, None), 0);
        let mut out_of_range = 0x20 * 9;
        assert_eq!(param_value(&ctx, 0x85, Some(&mut out_of_range)), 0);
    }

    #[test]
    fn test_params_and_patch_variables() {
        let mut ctx = test_context(&["a.grf"]);
        ctx.file_mut().set_param(3, 42);
        assert_eq!(param_value(&ctx, 3, None), 42);
        assert_eq!(param_value(&ctx, 4, None), 0);
        assert_eq!(patch_variable(&ctx, 0x0B), 30);
        ctx.env.map_log_x = 8;
        ctx.env.map_log_y = 9;
        assert_eq!(patch_variable(&ctx, 0x13), 2 << 24 | 2 << 20 | 3 << 16 | 2 << 12 | 3 << 8 | 5);
        assert_eq!(patch_variable(&ctx, 0x10), 1);
        assert_eq!(patch_variable(&ctx, 0x99), 0);
    }

    #[test]
    fn test_train_width_bit() {
        let mut ctx = test_context(&["a.grf"]);
        assert_eq!(param_value(&ctx, 0x9E, None), 0);
        ctx.file_mut().traininfo_vehicle_width = VEHICLEINFO_FULL_VEHICLE_WIDTH;
        assert_eq!(param_value(&ctx, 0x9E, None), MiscGrfFeatures::TRAIN_WIDTH_32_PIXELS.bits());
    }
}

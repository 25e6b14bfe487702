//! Voltage to converter-code mapping.
//!
//! The transfer function is a single affine map followed by a 16-bit
//! mask: `code = round((volts − offset) · scale − bias) & 0xFFFF`. The
//! constants are device calibration data (see [`wavedac_globals`]) and
//! must match the deployed hardware exactly. Masking is the device
//! contract: a scaled value outside the alias-free window wraps silently
//! onto some other voltage's code, so the wrap is reported to the caller
//! instead of raising an error.

use wavedac_globals::{
    CODE_WINDOW_MAX, CODE_WINDOW_MIN, SPAN10_CODE_BIAS, SPAN10_CODE_SCALE, SPAN10_OFFSET_VOLTS,
};

/// Offset/gain calibration of the converter's transfer function.
///
/// Defaults to the characterized constants of the ±10 V span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Zero-code offset voltage.
    pub offset_volts: f64,
    /// Codes per volt.
    pub scale: f64,
    /// Fixed bias subtracted from the scaled result before masking.
    pub bias: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset_volts: SPAN10_OFFSET_VOLTS,
            scale: SPAN10_CODE_SCALE,
            bias: SPAN10_CODE_BIAS,
        }
    }
}

/// Maps one voltage sample to its 16-bit converter code.
///
/// The second return is true when the scaled value fell outside the
/// alias-free window and wrapped, i.e. the requested voltage was out of
/// calibration for the span.
pub fn quantize(volts: f64, cal: &Calibration) -> (u16, bool) {
    let scaled = ((volts - cal.offset_volts) * cal.scale - cal.bias).round() as i64;
    let wrapped = !(CODE_WINDOW_MIN..=CODE_WINDOW_MAX).contains(&scaled);
    if wrapped {
        log::warn!("scaled value {scaled} for {volts} V is outside the code window, wrapping");
    }
    ((scaled & 0xFFFF) as u16, wrapped)
}

/// Code as four uppercase hex digits, as shown in the sample table.
pub fn code_hex(code: u16) -> String {
    format!("{code:04X}")
}

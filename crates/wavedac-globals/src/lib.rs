//! Constants and shared vocabulary for the wavedac driver crates.
//!
//! Everything here is device contract: the span command words and the
//! transfer-function calibration values are burned into deployed hardware
//! and firmware. Do not "fix" them.

/// Span select command word for the ±10 V output range.
pub const SPAN_CMD_BIPOLAR10: u32 = 0x8F0003;

/// Span select command word for the ±5 V output range.
pub const SPAN_CMD_BIPOLAR5: u32 = 0x8F0002;

/// Span select command word for the ±2.5 V output range.
pub const SPAN_CMD_BIPOLAR2V5: u32 = 0x8F0004;

/// Largest segment amplitude magnitude accepted by the synthesizer, in
/// volts. Matches the widest selectable span.
pub const AMPLITUDE_MAX_VOLTS: f64 = 10.0;

/// Number of samples in one synthesized period unless the caller asks for
/// a different resolution.
pub const DEFAULT_SAMPLE_COUNT: usize = 500;

/// A waveform period is pieced together from at most this many segments.
pub const MAX_SEGMENTS: usize = 4;

/// Zero-code offset of the characterized ±10 V transfer function, in
/// volts. Calibration data, not derivable from the span width.
pub const SPAN10_OFFSET_VOLTS: f64 = 8.751;

/// Code scale of the characterized ±10 V transfer function, in codes per
/// volt: (2^16 − 10) codes spread over the 20 V span.
pub const SPAN10_CODE_SCALE: f64 = (((1u32 << 16) - 10) as f64) / 20.0;

/// Fixed bias subtracted from every scaled sample before masking.
pub const SPAN10_CODE_BIAS: f64 = 4095.0;

/// Alias-free window of pre-mask code values. The ±10 V span lands on
/// [-65529, -3]; any scaled value outside [`CODE_WINDOW_MIN`,
/// `CODE_WINDOW_MAX`] masks onto a code that also belongs to some in-span
/// voltage, i.e. the request was out of calibration.
pub const CODE_WINDOW_MIN: i64 = -(1 << 16);
/// See [`CODE_WINDOW_MIN`].
pub const CODE_WINDOW_MAX: i64 = -1;

/// Analog output span selection.
///
/// The converter powers up in the ±10 V range; the matching command word
/// is written twice at the start of every playback session.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Span {
    /// ±10 V output range.
    #[default]
    Bipolar10 = 0,
    /// ±5 V output range.
    Bipolar5 = 1,
    /// ±2.5 V output range.
    Bipolar2V5 = 2,
}

impl Span {
    /// The 24-bit command word selecting this span.
    pub fn command(&self) -> u32 {
        match self {
            Span::Bipolar10 => SPAN_CMD_BIPOLAR10,
            Span::Bipolar5 => SPAN_CMD_BIPOLAR5,
            Span::Bipolar2V5 => SPAN_CMD_BIPOLAR2V5,
        }
    }

    /// Half-width of the span, in volts.
    pub fn volts(&self) -> f64 {
        match self {
            Span::Bipolar10 => 10.0,
            Span::Bipolar5 => 5.0,
            Span::Bipolar2V5 => 2.5,
        }
    }
}

impl TryFrom<u8> for Span {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Span::Bipolar10),
            1 => Ok(Span::Bipolar5),
            2 => Ok(Span::Bipolar2V5),
            _ => {
                log::error!("unsupported span selector {value}!");
                Err(Error::Invalid)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O error from the bus backend.
    #[error("io")]
    Io(#[from] std::io::Error),
    /// Segment amplitude magnitude exceeds the configured maximum.
    /// `segment` is the 1-based position of the offender in the request.
    #[error("amplitude {amplitude} V out of range on segment {segment}")]
    AmplitudeOutOfRange {
        /// 1-based segment position.
        segment: usize,
        /// The rejected amplitude, in volts.
        amplitude: f64,
    },
    /// Segment boundaries are out of order or outside [0, 1].
    #[error("invalid segment timing")]
    InvalidTiming,
    /// A segment parameter is NaN or infinite.
    #[error("non-finite parameter on segment {segment}")]
    NotFinite {
        /// 1-based segment position.
        segment: usize,
    },
    /// Playback is already running.
    #[error("busy")]
    Busy,
    /// Playback requested before any waveform was computed.
    #[error("no waveform")]
    NoWaveform,
    /// Invalid value provided.
    #[error("invalid")]
    Invalid,
}

/// Result type for operations that may return an `Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_commands() {
        assert_eq!(Span::Bipolar10.command(), 0x8F0003);
        assert_eq!(Span::Bipolar5.command(), 0x8F0002);
        assert_eq!(Span::Bipolar2V5.command(), 0x8F0004);
    }

    #[test]
    fn span_from_u8() {
        assert_eq!(Span::try_from(0).unwrap(), Span::Bipolar10);
        assert_eq!(Span::try_from(2).unwrap(), Span::Bipolar2V5);
        assert!(Span::try_from(3).is_err());
    }

    #[test]
    fn code_scale_matches_reference() {
        // (2^16 - 10) / 20, kept exact for hardware compatibility
        assert_eq!(SPAN10_CODE_SCALE, 65526.0 / 20.0);
    }
}

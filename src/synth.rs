//! Piecewise waveform synthesis.
//!
//! One normalized period is pieced together from up to four segments.
//! Each segment draws exactly one half-cycle of its shape over a local
//! phase axis spanning [0, π), scaled by its amplitude. Positions are
//! fractions of the period; regions not covered by any segment stay at
//! zero volts, so a skipped segment reads as a flat blank in the output.

use crate::{Error, Result};
use std::f64::consts::{FRAC_2_PI, PI};
use wavedac_globals::{AMPLITUDE_MAX_VOLTS, DEFAULT_SAMPLE_COUNT, MAX_SEGMENTS};

/// Segment shape selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    Sine,
    Triangle,
    Square,
    Sawtooth,
    /// Falling ramp: amplitude at the segment start, zero at its end.
    InverseSawtooth,
    #[default]
    Zero,
}

impl Shape {
    /// Unit-amplitude sample at `phase` ∈ [0, π).
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            Shape::Sine => phase.sin(),
            Shape::Triangle => FRAC_2_PI * phase.sin().asin(),
            Shape::Square => phase.sin().signum(),
            Shape::Sawtooth => FRAC_2_PI * (phase / 2.0).tan().atan(),
            Shape::InverseSawtooth => 1.0 - FRAC_2_PI * (phase / 2.0).tan().atan(),
            Shape::Zero => 0.0,
        }
    }
}

/// One piecewise segment of the normalized period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub shape: Shape,
    /// Peak amplitude in volts, magnitude at most [`AMPLITUDE_MAX_VOLTS`].
    pub amplitude: f64,
    /// Start position as a fraction of the period, in [0, 1].
    pub start: f64,
    /// End position as a fraction of the period, in [0, 1].
    pub end: f64,
}

impl Segment {
    pub fn new(shape: Shape, amplitude: f64, start: f64, end: f64) -> Self {
        Self {
            shape,
            amplitude,
            start,
            end,
        }
    }

    /// Zero-amplitude, zero-width placeholder for an unspecified slot.
    pub fn silent() -> Self {
        Self {
            shape: Shape::Zero,
            amplitude: 0.0,
            start: 0.0,
            end: 0.0,
        }
    }

    fn is_finite(&self) -> bool {
        self.amplitude.is_finite() && self.start.is_finite() && self.end.is_finite()
    }
}

/// Validated synthesis request: up to [`MAX_SEGMENTS`] segments plus the
/// sample count of one period.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRequest {
    segments: [Segment; MAX_SEGMENTS],
    samples: usize,
}

impl WaveformRequest {
    /// Builds a request from 1 to [`MAX_SEGMENTS`] segments. Unspecified
    /// trailing slots become zero-width placeholders sitting on the last
    /// explicit boundary; they produce no samples and are not an error.
    ///
    /// Fails when an amplitude magnitude exceeds the span, when a
    /// parameter is not finite, or when the segment boundaries break the
    /// ordering chain 0 ≤ s1 ≤ e1 ≤ s2 ≤ ... ≤ e4 ≤ 1 (with the first
    /// segment required non-empty).
    pub fn new(segments: Vec<Segment>, samples: usize) -> Result<Self> {
        if segments.is_empty() || segments.len() > MAX_SEGMENTS {
            log::error!(
                "expected between 1 and {MAX_SEGMENTS} segments, got {}",
                segments.len()
            );
            return Err(Error::Invalid);
        }
        if samples == 0 {
            log::error!("sample count must be greater than 0");
            return Err(Error::Invalid);
        }

        let mut slots = [Segment::silent(); MAX_SEGMENTS];
        slots[..segments.len()].copy_from_slice(&segments);
        let tail = segments[segments.len() - 1].end;
        for slot in slots.iter_mut().skip(segments.len()) {
            slot.start = tail;
            slot.end = tail;
        }

        let request = Self {
            segments: slots,
            samples,
        };
        request.validate()?;
        Ok(request)
    }

    /// Single-segment request at the default resolution.
    pub fn single(shape: Shape, amplitude: f64, end: f64) -> Result<Self> {
        Self::new(
            vec![Segment::new(shape, amplitude, 0.0, end)],
            DEFAULT_SAMPLE_COUNT,
        )
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn validate(&self) -> Result<()> {
        for (i, seg) in self.segments.iter().enumerate() {
            if !seg.is_finite() {
                log::error!("segment {} has a non-finite parameter", i + 1);
                return Err(Error::NotFinite { segment: i + 1 });
            }
            if seg.amplitude.abs() > AMPLITUDE_MAX_VOLTS {
                log::error!(
                    "segment {} amplitude {} V exceeds the ±{AMPLITUDE_MAX_VOLTS} V span",
                    i + 1,
                    seg.amplitude
                );
                return Err(Error::AmplitudeOutOfRange {
                    segment: i + 1,
                    amplitude: seg.amplitude,
                });
            }
        }

        let mut previous = 0.0;
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.start < previous || seg.end < seg.start || seg.end > 1.0 {
                log::error!(
                    "segment {} boundaries [{}, {}] break the ordering chain",
                    i + 1,
                    seg.start,
                    seg.end
                );
                return Err(Error::InvalidTiming);
            }
            previous = seg.end;
        }
        if self.segments[0].end <= 0.0 {
            log::error!("first segment is empty");
            return Err(Error::InvalidTiming);
        }
        Ok(())
    }
}

/// One full period of synthesized output.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTable {
    /// Voltage samples covering one normalized period.
    pub samples: Vec<f64>,
    /// Fractional time positions i/N, parallel to `samples`.
    pub axis: Vec<f64>,
}

/// Renders one full period from a validated request.
///
/// Breakpoint fractions map to sample indices via floor(fraction · N);
/// a segment occupies the half-open index range [start, end).
pub fn synthesize(request: &WaveformRequest) -> WaveTable {
    let n = request.samples;
    let mut samples = vec![0.0; n];

    for seg in request.segments() {
        let start = (seg.start * n as f64).floor() as usize;
        let end = (seg.end * n as f64).floor() as usize;
        let len = end.saturating_sub(start);
        if len == 0 {
            continue;
        }
        for (off, slot) in samples[start..end].iter_mut().enumerate() {
            let phase = PI * off as f64 / len as f64;
            *slot = seg.amplitude * seg.shape.sample(phase);
        }
    }

    let axis = (0..n).map(|i| i as f64 / n as f64).collect();
    WaveTable { samples, axis }
}

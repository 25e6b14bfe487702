//! Device handle tying the pipeline together.

use crate::playback::{FailurePolicy, Playback, PlaybackState};
use crate::quantizer::{Calibration, code_hex, quantize};
use crate::spi::SpiBus;
use crate::synth::{WaveTable, WaveformRequest, synthesize};
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use wavedac_frames::Frame;
use wavedac_globals::Span;

/// One row of the outward-facing sample table: the synthesized voltage,
/// its converter code, and the exact frame that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub volts: f64,
    pub code: u16,
    pub frame: Frame,
}

impl TableRow {
    /// Code as four uppercase hex digits.
    pub fn code_hex(&self) -> String {
        code_hex(self.code)
    }

    /// Full frame as six uppercase hex digits.
    pub fn frame_hex(&self) -> String {
        self.frame.to_hex()
    }
}

/// Product of one compute request: the synthesized period plus the
/// per-sample table handed to the display collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub wave: WaveTable,
    pub rows: Vec<TableRow>,
}

/// Handle to one converter on a point-to-point serial link.
///
/// Owns the bus (shared with the streaming thread), the selected span,
/// the calibration, and the most recently computed sample table.
pub struct WaveDac<B> {
    span: Span,
    calibration: Calibration,
    table: Option<SampleTable>,
    frames: Option<Arc<[Frame]>>,
    playback: Playback<B>,
    wrap_events: u64,
}

impl<B: SpiBus + Send + 'static> WaveDac<B> {
    pub fn new(bus: B) -> Self {
        Self::with_policy(bus, FailurePolicy::default())
    }

    pub fn with_policy(bus: B, policy: FailurePolicy) -> Self {
        Self {
            span: Span::default(),
            calibration: Calibration::default(),
            table: None,
            frames: None,
            playback: Playback::new(Arc::new(Mutex::new(bus)), policy),
            wrap_events: 0,
        }
    }

    /// Selects the output span armed by subsequent [`start`](Self::start)
    /// calls. A running session keeps its span until restarted.
    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Overrides the transfer-function calibration. Takes effect at the
    /// next [`compute`](Self::compute).
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Synthesizes, quantizes and encodes one full period, replacing the
    /// sample table and the frame snapshot.
    ///
    /// A loop that is already running keeps streaming its own snapshot
    /// until stopped; the new table is picked up by the next `start`.
    pub fn compute(&mut self, request: &WaveformRequest) -> &SampleTable {
        let wave = synthesize(request);
        let mut rows = Vec::with_capacity(wave.samples.len());
        let mut frames = Vec::with_capacity(wave.samples.len());
        let mut wraps = 0u64;
        for &volts in &wave.samples {
            let (code, wrapped) = quantize(volts, &self.calibration);
            if wrapped {
                wraps += 1;
            }
            let frame = Frame::sample_write(code);
            rows.push(TableRow { volts, code, frame });
            frames.push(frame);
        }
        if wraps > 0 {
            log::warn!(
                "{wraps} of {} samples wrapped past the code window",
                wave.samples.len()
            );
        }
        self.wrap_events += wraps;
        self.frames = Some(frames.into());
        self.table.insert(SampleTable { wave, rows })
    }

    /// The most recently computed table, if any.
    pub fn table(&self) -> Option<&SampleTable> {
        self.table.as_ref()
    }

    /// Arms the converter (span select, sent twice) and starts streaming
    /// the current frame snapshot on a dedicated thread.
    pub fn start(&mut self) -> Result<()> {
        let frames = self.frames.clone().ok_or(Error::NoWaveform)?;
        self.playback.start(self.span, frames)
    }

    /// Stops streaming after the in-flight frame. No-op when idle.
    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Cumulative count of samples whose code wrapped past the alias-free
    /// window — nonzero means some request was out of calibration.
    pub fn wrap_events(&self) -> u64 {
        self.wrap_events
    }
}

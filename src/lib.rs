//! A streaming waveform driver for an SPI-attached precision DAC.
//!
//! Use [libwavedac-rs] to reproduce a user-defined, piecewise periodic
//! waveform on the converter's analog output. The pipeline has three
//! stages:
//!
//! 1. [`synth`] builds one full-cycle voltage table from up to four
//!    piecewise segments (shape, amplitude, position within the period).
//! 2. [`quantizer`] maps each voltage sample to the device's 16-bit code
//!    using the characterized offset/gain constants.
//! 3. [`playback`] streams the encoded frames over the bus in a
//!    continuous loop until stopped; the output frequency falls out of
//!    the per-frame bus latency.
//!
//! [libwavedac-rs]: https://github.com/wavedac/libwavedac-rs
//!
//! ## Usage overview
//!
//! Open a bus backend, hand it to a [`WaveDac`], compute a waveform and
//! start streaming. `start` arms the converter's output span (the select
//! command is written twice, a quirk the device requires) and spawns the
//! transmit thread; `stop` parks it within one frame.
//!
//! ```no_run
//! use libwavedac_rs::spi::{DEFAULT_CLOCK_HZ, SpidevBus};
//! use libwavedac_rs::{Segment, Shape, WaveDac, WaveformRequest};
//!
//! fn main() -> libwavedac_rs::Result<()> {
//!     let bus = SpidevBus::open("/dev/spidev0.0", DEFAULT_CLOCK_HZ)?;
//!     let mut dac = WaveDac::new(bus);
//!
//!     // half-sine over the first half of the period, silence after
//!     let request = WaveformRequest::new(
//!         vec![Segment::new(Shape::Sine, 5.0, 0.0, 0.5)],
//!         500,
//!     )?;
//!     let table = dac.compute(&request);
//!     println!("first frame on the wire: {}", table.rows[0].frame_hex());
//!
//!     dac.start()?;
//!     // ... output streams until stopped
//!     dac.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! The core performs no raw I/O. The `spidev` feature (default) provides
//! [`spi::SpidevBus`] for Linux; anything else implements
//! [`spi::SpiBus`]. Validation failures, quantizer wrap events and
//! transport errors are logged through [log]; binaries decide the sink
//! (the demos use `env_logger`).
//!
//! [log]: https://docs.rs/log

pub mod device;
pub mod playback;
pub mod quantizer;
pub mod spi;
pub mod synth;

pub use device::*;
pub use playback::{FailurePolicy, PlaybackState};
pub use synth::{Segment, Shape, WaveTable, WaveformRequest};

pub use wavedac_frames::Frame;
pub use wavedac_globals::*;

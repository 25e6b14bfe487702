//! Bus transport seam.
//!
//! The core never performs raw I/O itself: everything leaving the crate
//! goes through [`SpiBus`], and always one whole frame per chip-select
//! bracket. The optional [`SpidevBus`] backend drives a Linux
//! `/dev/spidevB.C` device; other backends (bit-banged GPIO, test
//! doubles) implement the trait.

use crate::Result;
use wavedac_frames::Frame;

/// Bus clock used when the caller has no reason to pick another one.
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Synchronous byte-level transport to the converter.
///
/// Calls either complete or fail synchronously; no timeouts are layered
/// on top here.
pub trait SpiBus {
    /// Assert chip select.
    fn select(&mut self) -> Result<()>;
    /// Clock out `bytes` while selected.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
    /// Release chip select.
    fn deselect(&mut self) -> Result<()>;
}

/// Sends one frame inside a single select/deselect bracket.
///
/// Once the bus has been selected, deselect runs unconditionally — also
/// when the write itself fails. A write error wins over a deselect error
/// in the returned result.
pub fn transmit_frame<B: SpiBus + ?Sized>(bus: &mut B, frame: &Frame) -> Result<()> {
    bus.select()?;
    let wrote = bus.write(frame.as_bytes());
    let released = bus.deselect();
    wrote.and(released)
}

#[cfg(feature = "spidev")]
mod dev {
    use super::SpiBus;
    use crate::Result;
    use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

    /// Linux userspace SPI backend.
    ///
    /// The kernel asserts the hardware chip select for the duration of
    /// one transfer, so `select`/`deselect` have nothing left to do here.
    pub struct SpidevBus {
        spi: Spidev,
    }

    impl SpidevBus {
        /// Opens a `/dev/spidevB.C` style path: mode 0, 8 bits per word,
        /// `clock_hz` bus clock.
        pub fn open(path: &str, clock_hz: u32) -> Result<Self> {
            let mut spi = Spidev::open(path)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(clock_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)?;
            log::debug!("opened {path} at {clock_hz} Hz");
            Ok(Self { spi })
        }
    }

    impl SpiBus for SpidevBus {
        fn select(&mut self) -> Result<()> {
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            // full-duplex transfer; the returned MISO bytes are discarded
            let mut rx = vec![0u8; bytes.len()];
            let mut transfer = SpidevTransfer::read_write(bytes, &mut rx);
            self.spi.transfer(&mut transfer)?;
            Ok(())
        }

        fn deselect(&mut self) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(feature = "spidev")]
pub use dev::SpidevBus;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io;

    #[derive(Default)]
    struct BracketBus {
        selects: usize,
        deselects: usize,
        written: Vec<u8>,
        fail_write: bool,
    }

    impl SpiBus for BracketBus {
        fn select(&mut self) -> Result<()> {
            self.selects += 1;
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if self.fail_write {
                return Err(Error::Io(io::Error::other("wire fell off")));
            }
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn deselect(&mut self) -> Result<()> {
            self.deselects += 1;
            Ok(())
        }
    }

    #[test]
    fn one_bracket_per_frame() {
        let mut bus = BracketBus::default();
        let frame = Frame::sample_write(0x1234);
        transmit_frame(&mut bus, &frame).unwrap();
        assert_eq!(bus.selects, 1);
        assert_eq!(bus.deselects, 1);
        assert_eq!(bus.written, vec![0x9F, 0x12, 0x34]);
    }

    #[test]
    fn deselect_runs_when_write_fails() {
        let mut bus = BracketBus {
            fail_write: true,
            ..Default::default()
        };
        let frame = Frame::sample_write(0x1234);
        let result = transmit_frame(&mut bus, &frame);
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(bus.selects, 1);
        assert_eq!(bus.deselects, 1);
    }
}

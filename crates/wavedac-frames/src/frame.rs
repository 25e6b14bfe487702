/*
 * Host <-> converter frame format. Two commands exist:
 *
 *                          Span select
 *                      ------------------
 *
 * +================+=========================================================+
 * |  Byte offset   |                       Description                       |
 * +================+=========================================================+
 * |        0       | Command byte 0x8F                                       |
 * +----------------+---------------------------------------------------------+
 * |      1:2       | Span selector (0x0003 = ±10 V, 0x0002 = ±5 V,           |
 * |                | 0x0004 = ±2.5 V), big-endian                            |
 * +----------------+---------------------------------------------------------+
 *
 *                          Sample write
 *                      ------------------
 *
 * +================+=========================================================+
 * |  Byte offset   |                       Description                       |
 * +================+=========================================================+
 * |        0       | Address byte 0x9F                                       |
 * +----------------+---------------------------------------------------------+
 * |      1:2       | 16-bit output code, big-endian                          |
 * +----------------+---------------------------------------------------------+
 *
 * The device gives no response; the bus is write-only from the host's
 * point of view.
 */

use std::fmt::{Debug, Display, Formatter};
use wavedac_globals::Span;

/// Number of bytes in one wire frame.
pub const FRAME_LEN: usize = 3;

/// Address byte of a channel code write.
pub const ADDR_SAMPLE_WRITE: u8 = 0x9F;

/// One 24-bit command frame, serialized most-significant byte first.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; FRAME_LEN],
}

impl Frame {
    pub const IDX_ADDR: usize = 0;
    pub const IDX_DATA: usize = 1;

    /// Packs the low 24 bits of `word`, most-significant byte first.
    pub fn from_u24(word: u32) -> Self {
        if word >> 24 != 0 {
            log::warn!("frame word {word:#x} exceeds 24 bits, truncating");
        }
        Self {
            buf: [(word >> 16) as u8, (word >> 8) as u8, word as u8],
        }
    }

    /// Span select command for the given output range.
    pub fn span_select(span: Span) -> Self {
        Self::from_u24(span.command())
    }

    /// Code write for one output sample.
    pub fn sample_write(code: u16) -> Self {
        let data = code.to_be_bytes();
        Self {
            buf: [ADDR_SAMPLE_WRITE, data[0], data[1]],
        }
    }

    pub fn addr(&self) -> u8 {
        self.buf[Self::IDX_ADDR]
    }

    pub fn code(&self) -> u16 {
        u16::from_be_bytes([self.buf[Self::IDX_DATA], self.buf[Self::IDX_DATA + 1]])
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.buf
    }

    /// Six uppercase hex digits, as shown in the sample table.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.buf[0], self.buf[1], self.buf[2])
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(value: [u8; FRAME_LEN]) -> Self {
        Self { buf: value }
    }
}

impl From<Frame> for [u8; FRAME_LEN] {
    fn from(value: Frame) -> Self {
        value.buf
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("code", &format_args!("{:#x}", self.code()))
            .finish()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for elem in self.buf.iter() {
            f.write_fmt(format_args!("{elem:02x} "))?;
        }
        f.write_str("]")?;
        Ok(())
    }
}

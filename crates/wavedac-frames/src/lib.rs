//! Wire frames for the converter's serial protocol.
//!
//! Every command the device understands travels as one fixed-length
//! 3-byte payload, clocked out most-significant byte first inside a single
//! chip-select bracket. Partial frames are never transmitted.

pub mod frame;

pub use frame::{ADDR_SAMPLE_WRITE, FRAME_LEN, Frame};

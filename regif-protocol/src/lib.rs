//! # Register Interface Protocol
//!
//! This crate implements the framing of a small binary protocol used to access the
//! registers of an FPGA over a serial link (typically USB-CDC). The host is the
//! master and sends command frames; the device only speaks when it is asked to reply
//! to a read.
//!
//! ## Overview
//!
//! Every command addresses a 32 bit register and moves between 1 and 64 words
//! (a *burst*). A burst either targets the same register for every word or
//! increments the address for each one.
//!
//! This library allows you to:
//!
//! - Encode read and write command frames
//! - Decode the reply of a read command
//! - Split arbitrarily long transfers into bursts that respect the 64 word limit
//! - Decode command frames on the device side (for emulators and test doubles)
//!
//! ## Basic Usage
//!
//! ### Writing a Single Register
//!
//! ```
//! use regif_protocol::Command;
//!
//! let cmd = Command::write(1, false, [10]).expect("one word is a valid burst");
//! assert_eq!(cmd.to_bytes(), [0x80, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00]);
//! ```
//!
//! ### Reading a Burst
//!
//! ```
//! use regif_protocol::{Command, decode_reply};
//!
//! let cmd = Command::read(0x100, true, 2).expect("two words is a valid burst");
//! assert_eq!(cmd.to_bytes(), [0x41, 0x00, 0x01, 0x00, 0x00]);
//!
//! // The device answers with 4 bytes per word
//! let reply = [0x2A, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
//! let words = decode_reply(&reply, cmd.len()).expect("reply has the right size");
//! assert_eq!(words, [42, 0xFFFF_FFFF]);
//! ```
//!
//! ### Splitting Long Transfers
//!
//! ```
//! use regif_protocol::burst::Bursts;
//!
//! let sizes: Vec<(u32, usize)> = Bursts::new(0, true, 70)
//!     .map(|burst| (burst.address, burst.len()))
//!     .collect();
//! assert_eq!(sizes, [(0, 64), (64, 6)]);
//! ```
//!
//! ## Message Format
//!
//! | Byte(s)            | Meaning                                              |
//! |--------------------|------------------------------------------------------|
//! | 0                  | bit 7 direction (1 = write), bit 6 increment, bits 5..0 length - 1 |
//! | 1..=4              | address, little-endian                               |
//! | 5..5 + 4L          | L words, little-endian (write commands only)         |
//!
//! Replies to read commands have no header and consist of exactly `4 * L` bytes.
//!
//! ## Error Handling
//!
//! This library uses the [`error::FrameError`] type for invalid bursts and malformed replies.
//!
//! ## Concurrency
//!
//! Frames, replies and burst plans are plain values with no I/O state of their own.
//! A link carries one command and its reply at a time; keeping callers from
//! interleaving on it is the job of the client (`RegisterClient` in `regif-client`).

pub mod frame;
pub use frame::*;
pub mod burst;
pub mod codec;
pub mod error;
pub mod word;
pub use codec::decode_reply;
pub use word::Word;

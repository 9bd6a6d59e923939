//! # Register Interface Client
//!
//! A Rust client library for reading and writing the registers of an FPGA that
//! implements the register interface protocol over a serial link (e.g. the USB-CDC
//! port of an Alchitry board).
//!
//! ## Overview
//!
//! This crate is the host (master) side of the protocol. It handles:
//!
//! - Connecting to a port and applying the line settings (8N1)
//! - Encoding read and write commands and decoding replies
//! - Splitting long transfers into bursts of at most 64 words
//! - Serializing concurrent callers so that exactly one command is in flight
//!
//! For the frame format, see the [`regif_protocol`](https://docs.rs/regif-protocol/) crate.
//!
//! ## Basic Usage
//!
//! ### Connecting to a Board
//!
//! ```ignore
//! use regif_client::{Config, RegisterClient};
//!
//! let client = RegisterClient::new(Config::default());
//! client.connect("/dev/ttyUSB1", 1_000_000)?;
//! ```
//!
//! ### Single Registers
//!
//! ```ignore
//! client.write_one(0x10, 0xCAFE_u32)?;
//! let value: u32 = client.read_one(0x10)?;
//! ```
//!
//! ### Bursts
//!
//! ```ignore
//! // Write 100 words to 0x1000..0x1064, then read them back
//! let words: Vec<u32> = (0..100).collect();
//! client.write_burst(0x1000, true, &words)?;
//! let read: Vec<u32> = client.read_vec(0x1000, true, words.len())?;
//!
//! // Drain a FIFO that is mapped to a single address
//! let samples: Vec<i32> = client.read_vec(0x2000, false, 256)?;
//! ```
//!
//! ## Timeouts
//!
//! A single register read waits up to 1 s for its reply, every burst of a multi-word
//! read up to 3 s, independent of the number of words. Both can be changed with
//! [`config::Builder`]. A timeout is reported as [`Error::Timeout`] and is never retried.
//!
//! ## Error Handling
//!
//! All failures are returned as [`Error`]; use [`Error::kind`] to branch on the kind.
//! Transfers that span several bursts stop at the first failing burst. Bursts before
//! it have already been executed by the device.
//!
//! ## Thread Model
//!
//! The client does not spawn threads. [`RegisterClient`] can be shared between
//! threads; the lock over the transport covers a command frame together with its
//! reply. With the `tokio` feature, [`AsyncRegisterClient`] offers the same operations
//! with a cancel-safe wait for the transport.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Frames and replies are logged at
//! trace level, bursts and connection changes at debug level.

#[cfg(feature = "tokio")]
pub mod asynchronous;
pub mod client;
pub mod config;
pub mod error;
mod session;
pub mod transport;

#[cfg(feature = "tokio")]
pub use asynchronous::AsyncRegisterClient;
pub use client::RegisterClient;
pub use config::{Config, SerialSettings};
pub use error::{ConnectionError, Error, ErrorKind};
pub use regif_protocol::Word;

use std::fmt::Display;

use crate::error::FrameError;

/// Maximum number of words a single command frame can carry.
pub const MAX_BURST_LEN: usize = 64;

/// Size of the header byte plus the address of every command frame.
pub const COMMAND_HEADER_LEN: usize = 5;

/// Size of a single word on the wire.
pub const WORD_LEN: usize = 4;

/// Whether a command reads from or writes to the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// The first byte of every command frame.
///
/// ```text
///  7     6      5 .. 0
/// dir   inc   len - 1
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Header {
    direction: Direction,
    increment: bool,
    len: u8,
}

impl Header {
    const WRITE_BIT: u8 = 1 << 7;
    const INCREMENT_BIT: u8 = 1 << 6;
    const LEN_MASK: u8 = 0x3F;

    /// Creates a header for a burst of `len` words.
    /// Fails if `len` is not between 1 and [`MAX_BURST_LEN`].
    pub fn new(direction: Direction, increment: bool, len: usize) -> Result<Header, FrameError> {
        if !(1..=MAX_BURST_LEN).contains(&len) {
            return Err(FrameError::InvalidBurstLength(len));
        }
        Ok(Header {
            direction,
            increment,
            len: len as u8,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// If true, every word in the burst targets the next address.
    /// Otherwise all words target the same address.
    pub fn increment(&self) -> bool {
        self.increment
    }

    /// Number of words in the burst
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = (self.len - 1) & Self::LEN_MASK;
        if self.direction == Direction::Write {
            byte |= Self::WRITE_BIT;
        }
        if self.increment {
            byte |= Self::INCREMENT_BIT;
        }
        byte
    }

    /// Every byte is a valid header, so this never fails.
    pub fn from_byte(byte: u8) -> Header {
        let direction = if byte & Self::WRITE_BIT != 0 {
            Direction::Write
        } else {
            Direction::Read
        };
        Header {
            direction,
            increment: byte & Self::INCREMENT_BIT != 0,
            len: (byte & Self::LEN_MASK) + 1,
        }
    }
}

#[test]
fn header_layout() {
    let header = Header::new(Direction::Write, true, 64).unwrap();
    assert_eq!(header.to_byte(), 0xFF);
    let header = Header::new(Direction::Read, false, 1).unwrap();
    assert_eq!(header.to_byte(), 0x00);
    let header = Header::new(Direction::Read, true, 6).unwrap();
    assert_eq!(header.to_byte(), 0x45);
    assert_eq!(Header::from_byte(0x45), header);
}

#[test]
fn header_rejects_invalid_lengths() {
    assert!(matches!(
        Header::new(Direction::Read, false, 0),
        Err(FrameError::InvalidBurstLength(0))
    ));
    assert!(matches!(
        Header::new(Direction::Write, false, 65),
        Err(FrameError::InvalidBurstLength(65))
    ));
}

/// A command is sent from the host to the device.
/// Every write command carries its words. A read command only carries the
/// number of words the device is expected to reply with.
///
/// Commands are immutable once created and always satisfy the burst length limits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub(crate) header: Header,
    pub(crate) address: u32,
    pub(crate) words: Box<[u32]>,
}

impl Command {
    /// Creates a command to read `len` words starting at `address`.
    pub fn read(address: u32, increment: bool, len: usize) -> Result<Command, FrameError> {
        Ok(Command {
            header: Header::new(Direction::Read, increment, len)?,
            address,
            words: Box::default(),
        })
    }

    /// Creates a command that writes `words` starting at `address`.
    pub fn write(
        address: u32,
        increment: bool,
        words: impl Into<Box<[u32]>>,
    ) -> Result<Command, FrameError> {
        let words = words.into();
        Ok(Command {
            header: Header::new(Direction::Write, increment, words.len())?,
            address,
            words,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn direction(&self) -> Direction {
        self.header.direction()
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn increment(&self) -> bool {
        self.header.increment()
    }

    /// Number of words moved by this command
    pub fn len(&self) -> usize {
        self.header.len()
    }

    /// The payload of a write command. Empty for reads.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Iterates over the address targeted by every word of the burst.
    pub fn addresses(&self) -> impl Iterator<Item = u32> + use<> {
        let (start, step) = (self.address, u32::from(self.increment()));
        (0..self.len() as u32).map(move |i| start.wrapping_add(i.wrapping_mul(step)))
    }

    /// Size of the encoded command frame in bytes
    pub fn encoded_len(&self) -> usize {
        COMMAND_HEADER_LEN + self.words.len() * WORD_LEN
    }

    /// Number of bytes the device sends back for this command
    pub fn reply_len(&self) -> usize {
        match self.direction() {
            Direction::Read => self.len() * WORD_LEN,
            Direction::Write => 0,
        }
    }
}

/// The words a device sends back in response to a read command.
/// A reply carries no header; its length is implied by the command.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Reply {
    words: Box<[u32]>,
}

impl Reply {
    pub fn new(words: impl Into<Box<[u32]>>) -> Reply {
        Reply {
            words: words.into(),
        }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn into_words(self) -> Box<[u32]> {
        self.words
    }

    pub fn encoded_len(&self) -> usize {
        self.words.len() * WORD_LEN
    }
}

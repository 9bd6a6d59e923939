/// Read and write implementations for the protocol frames
use std::io::{self, Read, Write};

use crate::{
    error::FrameError,
    frame::{COMMAND_HEADER_LEN, Command, Direction, Header, Reply, WORD_LEN},
};

fn put_words(buf: &mut Vec<u8>, words: &[u32]) {
    for word in words {
        buf.extend_from_slice(&word.to_le_bytes());
    }
}

fn words_from_le(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(WORD_LEN)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Decodes the reply to a read command of `len` words.
///
/// The reply must consist of exactly `4 * len` bytes. Nothing is decoded otherwise.
pub fn decode_reply(bytes: &[u8], len: usize) -> Result<Vec<u32>, FrameError> {
    let expected = len * WORD_LEN;
    if bytes.len() != expected {
        return Err(FrameError::ReplyLength {
            expected,
            got: bytes.len(),
        });
    }
    Ok(words_from_le(bytes).collect())
}

impl Command {
    /// Encodes the complete frame into a single buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.header().to_byte());
        buf.extend_from_slice(&self.address().to_le_bytes());
        put_words(&mut buf, self.words());
        buf
    }

    /// Writes the frame with a single call to `write_all`.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Decodes a frame from the front of `bytes`.
    /// Returns `None` if `bytes` does not yet contain a complete frame.
    pub fn from_slice(bytes: &[u8]) -> Option<(Command, usize)> {
        if bytes.len() < COMMAND_HEADER_LEN {
            return None;
        }
        let header = Header::from_byte(bytes[0]);
        let address = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let frame_len = Self::frame_len(header);
        if bytes.len() < frame_len {
            return None;
        }
        let words = words_from_le(&bytes[COMMAND_HEADER_LEN..frame_len]).collect::<Box<[u32]>>();
        Some((
            Command {
                header,
                address,
                words,
            },
            frame_len,
        ))
    }

    /// Reads exactly one command frame from `reader`.
    pub fn from_reader(reader: &mut impl Read) -> Result<Command, FrameError> {
        let mut buf = [0u8; COMMAND_HEADER_LEN];
        reader.read_exact(&mut buf)?;
        let header = Header::from_byte(buf[0]);
        let address = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        let mut payload = vec![0u8; Self::frame_len(header) - COMMAND_HEADER_LEN];
        reader.read_exact(&mut payload)?;
        Ok(Command {
            header,
            address,
            words: words_from_le(&payload).collect(),
        })
    }

    /// Total size of a frame that starts with `header`
    pub fn frame_len(header: Header) -> usize {
        match header.direction() {
            Direction::Read => COMMAND_HEADER_LEN,
            Direction::Write => COMMAND_HEADER_LEN + header.len() * WORD_LEN,
        }
    }
}

impl Reply {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        put_words(&mut buf, self.words());
        buf
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

#[cfg(feature = "tokio")]
pub use framed::CommandCodec;

#[cfg(feature = "tokio")]
mod framed {
    use std::io;

    use bytes::{Buf, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use crate::{
        error::FrameError,
        frame::{COMMAND_HEADER_LEN, Command, Header, Reply},
    };

    /// Device side codec: decodes command frames and encodes replies.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CommandCodec;

    impl Decoder for CommandCodec {
        type Item = Command;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>, FrameError> {
            if src.len() < COMMAND_HEADER_LEN {
                src.reserve(COMMAND_HEADER_LEN - src.len());
                return Ok(None);
            }
            let frame_len = Command::frame_len(Header::from_byte(src[0]));
            match Command::from_slice(&src[..]) {
                Some((command, consumed)) => {
                    src.advance(consumed);
                    Ok(Some(command))
                }
                None => {
                    src.reserve(frame_len - src.len());
                    Ok(None)
                }
            }
        }

        /// A partial frame at end of stream is reported as `UnexpectedEof`, the same
        /// as a blocking `Command::from_reader` would.
        fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Command>, FrameError> {
            match self.decode(src)? {
                Some(command) => Ok(Some(command)),
                None if src.is_empty() => Ok(None),
                None => {
                    let remaining = src.len();
                    src.clear();
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("stream ended inside a frame ({} bytes left)", remaining),
                    )
                    .into())
                }
            }
        }
    }

    impl Encoder<Reply> for CommandCodec {
        type Error = FrameError;

        fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), FrameError> {
            dst.extend_from_slice(&reply.to_bytes());
            Ok(())
        }
    }

}

#[cfg(test)]
mod test {
    use crate::error::FrameError;
    use crate::frame::{Command, Direction, MAX_BURST_LEN, Reply};
    use std::io::Cursor;

    #[test]
    fn write_single_word() {
        let out = Command::write(1, false, [10]).unwrap().to_bytes();
        assert_eq!(out, [0x80, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn write_burst_sets_length_and_increment() {
        let words: Vec<u32> = (0..6).collect();
        let out = Command::write(64, true, words).unwrap().to_bytes();
        assert_eq!(out.len(), 5 + 6 * 4);
        assert_eq!(out[0], 0x80 | 0x40 | 5);
        assert_eq!(&out[1..5], &64u32.to_le_bytes());
        assert_eq!(&out[5 + 5 * 4..], &5u32.to_le_bytes());
    }

    #[test]
    fn read_command_has_no_payload() {
        let out = Command::read(0xDEAD_BEEF, false, MAX_BURST_LEN)
            .unwrap()
            .to_bytes();
        assert_eq!(out, [0x3F, 0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn header_length_bits_for_every_burst_len() {
        for len in 1..=MAX_BURST_LEN {
            let read = Command::read(0, false, len).unwrap().to_bytes();
            assert_eq!(read[0] & 0x3F, (len - 1) as u8);
            assert_eq!(read[0] & 0x80, 0);
            let write = Command::write(0, false, vec![0; len]).unwrap().to_bytes();
            assert_eq!(write[0] & 0x3F, (len - 1) as u8);
            assert_eq!(write[0] & 0x80, 0x80);
            assert_eq!(write.len(), 5 + 4 * len);
        }
    }

    #[test]
    fn empty_and_oversized_bursts_are_rejected() {
        assert!(matches!(
            Command::write(0, true, Vec::<u32>::new()),
            Err(FrameError::InvalidBurstLength(0))
        ));
        assert!(matches!(
            Command::read(0, true, MAX_BURST_LEN + 1),
            Err(FrameError::InvalidBurstLength(65))
        ));
    }

    #[test]
    fn read_write_command() {
        let frame = Command::write(0x1234_5678, true, [1, 0xFFFF_FFFF, 3])
            .unwrap()
            .to_bytes();
        let mut cursor = Cursor::new(frame);
        let command = Command::from_reader(&mut cursor).unwrap();
        assert_eq!(command.direction(), Direction::Write);
        assert_eq!(command.address(), 0x1234_5678);
        assert!(command.increment());
        assert_eq!(command.words(), [1, 0xFFFF_FFFF, 3]);
    }

    #[test]
    fn read_read_command() {
        let mut cursor = Cursor::new(vec![0x41, 0x05, 0x00, 0x00, 0x00]);
        let command = Command::from_reader(&mut cursor).unwrap();
        assert_eq!(command.direction(), Direction::Read);
        assert_eq!(command.address(), 5);
        assert_eq!(command.len(), 2);
        assert_eq!(command.reply_len(), 8);
    }

    #[test]
    fn truncated_command_is_an_io_error() {
        let mut cursor = Cursor::new(vec![0x80, 0x01, 0x00, 0x00, 0x00, 0x0A]);
        assert!(matches!(
            Command::from_reader(&mut cursor),
            Err(FrameError::Io(_))
        ));
    }

    #[test]
    fn decode_reply_words() {
        let words = super::decode_reply(&[0x2A, 0, 0, 0], 1).unwrap();
        assert_eq!(words, [42]);
    }

    #[test]
    fn decode_reply_rejects_short_reply() {
        match super::decode_reply(&[1, 2, 3], 4) {
            Err(FrameError::ReplyLength { expected, got }) => {
                assert_eq!(expected, 16);
                assert_eq!(got, 3);
            }
            other => panic!("expected ReplyLength, got {:?}", other),
        }
    }

    #[test]
    fn write_payload_decodes_as_reply() {
        let words = [7, 0x8000_0000, 0xA5A5_A5A5];
        let frame = Command::write(9, true, words).unwrap().to_bytes();
        assert_eq!(super::decode_reply(&frame[5..], 3).unwrap(), words);
    }

    #[test]
    fn reply_encoding() {
        let reply = Reply::new([42]);
        let mut out = Vec::new();
        reply.write_to(&mut out).unwrap();
        assert_eq!(out, [0x2A, 0, 0, 0]);
    }

    #[test]
    fn addresses_follow_increment_flag() {
        let inc = Command::read(10, true, 3).unwrap();
        assert_eq!(inc.addresses().collect::<Vec<_>>(), [10, 11, 12]);
        let fixed = Command::read(10, false, 3).unwrap();
        assert_eq!(fixed.addresses().collect::<Vec<_>>(), [10, 10, 10]);
        let wrapping = Command::read(u32::MAX, true, 2).unwrap();
        assert_eq!(wrapping.addresses().collect::<Vec<_>>(), [u32::MAX, 0]);
    }
}

//! Splitting of long transfers into bursts.
//!
//! A transfer of `N` words is sent as `ceil(N / 64)` independent commands.
//! The increment flag applies across bursts the same way it applies within one:
//! with increment, every burst starts where the previous one ended; without it,
//! every burst targets the starting address.
use std::ops::Range;

use crate::frame::MAX_BURST_LEN;

/// One chunk of a longer transfer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Burst {
    /// The address the command for this burst is sent to
    pub address: u32,
    /// The words of the whole transfer that belong to this burst
    pub range: Range<usize>,
}

impl Burst {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Iterator over the bursts of a transfer, in order.
#[derive(Clone, Debug)]
pub struct Bursts {
    address: u32,
    increment: bool,
    offset: usize,
    total: usize,
}

impl Bursts {
    pub fn new(address: u32, increment: bool, total: usize) -> Bursts {
        Bursts {
            address,
            increment,
            offset: 0,
            total,
        }
    }
}

impl Iterator for Bursts {
    type Item = Burst;

    fn next(&mut self) -> Option<Burst> {
        if self.offset >= self.total {
            return None;
        }
        let len = (self.total - self.offset).min(MAX_BURST_LEN);
        let burst = Burst {
            address: self.address,
            range: self.offset..self.offset + len,
        };
        self.offset += len;
        if self.increment {
            // the address space is 32 bit, running off the end wraps around
            self.address = self.address.wrapping_add(len as u32);
        }
        Some(burst)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.offset.min(self.total)).div_ceil(MAX_BURST_LEN);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Bursts {}

impl std::iter::FusedIterator for Bursts {}

//! # Console Input Without Readahead
//!
//! The session and the simulated tap driver take turns reading the same
//! stdin: the session consumes the amount and confirmation lines, then the
//! driver consumes the tap line once the wait is armed. That handoff has
//! two failure modes. Holding `StdinLock` for the whole session blocks the
//! driver's stdin thread forever. And an ordinary `BufReader` on the
//! session side reads ahead — with piped input it slurps the tap line into
//! a private buffer the driver can never see.
//!
//! [`NoReadahead`] avoids both: a `BufRead` whose buffer is a single byte,
//! pulled from the underlying reader one read at a time. A `read_line`
//! consumes exactly up to the newline; the lock is taken per byte, never
//! held across an await; everything after the newline stays in the
//! underlying stream for the next consumer.

use std::io::{self, BufRead, Read};

/// A `BufRead` adapter that never reads past what it hands out.
///
/// Throughput is one underlying `read` per byte, which is irrelevant for
/// an operator typing at a prompt and still just memory copies when the
/// underlying reader is the process-wide buffered stdin.
pub struct NoReadahead<R> {
    inner: R,
    byte: u8,
    pending: bool,
}

impl<R: Read> NoReadahead<R> {
    /// Wraps a reader. For the binary this is `std::io::stdin()`, which
    /// locks per call rather than per session.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            byte: 0,
            pending: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for NoReadahead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending && !buf.is_empty() {
            buf[0] = self.byte;
            self.pending = false;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}

impl<R: Read> BufRead for NoReadahead<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if !self.pending {
            let mut byte = [0u8; 1];
            if self.inner.read(&mut byte)? == 1 {
                self.byte = byte[0];
                self.pending = true;
            }
        }
        if self.pending {
            Ok(std::slice::from_ref(&self.byte))
        } else {
            // EOF: an empty buffer ends read_line cleanly.
            Ok(&[])
        }
    }

    fn consume(&mut self, amt: usize) {
        if amt > 0 {
            self.pending = false;
        }
    }
}

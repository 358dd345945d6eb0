//! Full-range writes over an output channel
//!
//! `Write::write_all` gives up on the first zero-length write. Pipes and
//! some character devices can report zero progress transiently, so this
//! writer absorbs a single zero-progress result and only fails when two
//! happen back to back. Interrupted writes are always retried.

use std::io::{self, Write};

/// Wraps an output channel and transfers whole byte ranges to it.
#[derive(Debug)]
pub struct RetryingWriter<W> {
    inner: W,
}

impl<W: Write> RetryingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write all of `buf`, or fail.
    ///
    /// Never returns `Ok` having transferred fewer than `buf.len()` bytes.
    /// Two consecutive zero-progress writes fail with
    /// [`io::ErrorKind::WriteZero`] and no further attempt is made.
    pub fn write_fully(&mut self, mut buf: &[u8]) -> io::Result<()> {
        let mut stalled = false;
        while !buf.is_empty() {
            match self.inner.write(buf) {
                Ok(0) if stalled => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "write keeps returning zero",
                    ));
                }
                Ok(0) => stalled = true,
                Ok(n) => {
                    debug_assert!(n <= buf.len());
                    stalled = false;
                    buf = &buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

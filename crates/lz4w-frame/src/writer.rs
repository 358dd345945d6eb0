//! Streaming LZ4 frame writer with a retroactive content size
//!
//! A streaming compressor cannot know the total input length when it emits
//! the frame header. When the output is repositionable, the session writes a
//! provisional header padded to its final length, remembers where the frame
//! started, and on close seeks back and rewrites the header with the real
//! content size and a fresh header checksum.
//!
//! Lifecycle:
//! ```text
//! open ──► write* ──► close            (frame complete, channel returned)
//!            │
//!            └─ error ──► close        (poisoned: no further I/O)
//! ```

use std::io::{self, Seek, SeekFrom, Write};

use lz4w_core::{FrameError, FrameOptions, FrameResult};
use tracing::{debug, trace, warn};

use crate::engine::{CompressEngine, Lz4Engine};
use crate::header::{patch_header, CONTENT_SIZE_LEN, HEADER_CAPACITY, SIZED_HEADER_LEN};
use crate::retry::RetryingWriter;

/// The engine is fed whole 256KB chunks; only the final chunk may be short.
pub const CHUNK_SIZE: usize = 256 << 10;

/// Where the frame starts, and how to get back there.
struct Rewind<W> {
    start: u64,
    seek: fn(&mut W, u64) -> io::Result<u64>,
}

fn seek_to<W: Seek>(w: &mut W, pos: u64) -> io::Result<u64> {
    w.seek(SeekFrom::Start(pos))
}

/// Session state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting writes
    Writing,
    /// A previous operation failed; only `close` is meaningful
    Failed,
}

/// One LZ4 frame being written to `W`.
///
/// The session owns both the channel and the engine context. `close` takes
/// the session by value, so both are released exactly once whichever way it
/// ends, and a closed session cannot be used again.
pub struct FrameWriter<W: Write, E: CompressEngine = Lz4Engine> {
    out: RetryingWriter<W>,
    engine: E,
    header: [u8; HEADER_CAPACITY],
    header_len: usize,
    zbuf: Vec<u8>,
    /// Input not yet handed to the engine, always shorter than `CHUNK_SIZE`
    stage: Vec<u8>,
    content_size: u64,
    frame_len: u64,
    rewind: Option<Rewind<W>>,
    poisoned: bool,
}

impl<W: Write> FrameWriter<W, Lz4Engine> {
    /// Open a streaming frame without a content size field.
    pub fn open(channel: W, options: &FrameOptions) -> FrameResult<Self> {
        let engine = Lz4Engine::new(options)?;
        Self::start(channel, engine, None)
    }
}

impl<W: Write + Seek> FrameWriter<W, Lz4Engine> {
    /// Open a frame whose header will carry the content size.
    ///
    /// The channel's current position is taken as the frame start.
    pub fn open_sized(mut channel: W, options: &FrameOptions) -> FrameResult<Self> {
        let start = channel
            .stream_position()
            .map_err(|e| FrameError::io("lseek", e))?;
        let engine = Lz4Engine::new(options)?;
        Self::start(channel, engine, Some(Rewind { start, seek: seek_to::<W> }))
    }
}

impl<W: Write + Seek, E: CompressEngine> FrameWriter<W, E> {
    pub fn with_engine_sized(mut channel: W, engine: E) -> FrameResult<Self> {
        let start = channel
            .stream_position()
            .map_err(|e| FrameError::io("lseek", e))?;
        Self::start(channel, engine, Some(Rewind { start, seek: seek_to::<W> }))
    }
}

impl<W: Write, E: CompressEngine> FrameWriter<W, E> {
    pub fn with_engine(channel: W, engine: E) -> FrameResult<Self> {
        Self::start(channel, engine, None)
    }

    fn start(channel: W, mut engine: E, rewind: Option<Rewind<W>>) -> FrameResult<Self> {
        let zbuf = vec![0u8; engine.bound(CHUNK_SIZE)];

        let mut header = [0u8; HEADER_CAPACITY];
        let mut header_len = engine.begin(&mut header)?;
        if rewind.is_some() {
            // Reserve the content size bytes now so the patch keeps the length.
            if header_len + CONTENT_SIZE_LEN != SIZED_HEADER_LEN {
                return Err(FrameError::engine(
                    "LZ4F_compressBegin",
                    format!("unexpected frame header length {header_len}"),
                ));
            }
            header_len = SIZED_HEADER_LEN;
        }

        let mut out = RetryingWriter::new(channel);
        out.write_fully(&header[..header_len])
            .map_err(|e| FrameError::io("write", e))?;

        debug!(
            content_size = rewind.is_some(),
            frame_start = rewind.as_ref().map(|r| r.start),
            header_len,
            zbuf_len = zbuf.len(),
            "lz4 frame opened"
        );

        Ok(Self {
            out,
            engine,
            header,
            header_len,
            zbuf,
            stage: Vec::with_capacity(CHUNK_SIZE),
            content_size: 0,
            frame_len: header_len as u64,
            rewind,
            poisoned: false,
        })
    }

    /// Accept `buf` into the frame.
    ///
    /// Input is staged until a whole `CHUNK_SIZE` piece is available, so the
    /// engine sees the same sequence of chunks however the content is split
    /// across calls, and the frame bytes depend on the content alone.
    ///
    /// The content size counts `buf` before any of it is processed. On
    /// failure the session is poisoned: bytes already written stay in the
    /// output and every later `write` is rejected.
    pub fn write(&mut self, mut buf: &[u8]) -> FrameResult<()> {
        if self.poisoned {
            return Err(FrameError::Poisoned { op: "write" });
        }

        self.content_size += buf.len() as u64;

        if !self.stage.is_empty() {
            let take = (CHUNK_SIZE - self.stage.len()).min(buf.len());
            self.stage.extend_from_slice(&buf[..take]);
            buf = &buf[take..];
            if self.stage.len() < CHUNK_SIZE {
                return Ok(());
            }
            self.compress_stage()?;
        }

        let mut chunks = buf.chunks_exact(CHUNK_SIZE);
        for chunk in &mut chunks {
            self.compress(chunk)?;
        }
        self.stage.extend_from_slice(chunks.remainder());
        Ok(())
    }

    fn compress_stage(&mut self) -> FrameResult<()> {
        let stage = std::mem::take(&mut self.stage);
        let res = self.compress(&stage);
        self.stage = stage;
        self.stage.clear();
        res
    }

    /// Run one chunk through the engine and push whatever it produces.
    fn compress(&mut self, chunk: &[u8]) -> FrameResult<()> {
        let n = match self.engine.update(chunk, &mut self.zbuf) {
            Ok(n) => n,
            Err(e) => return Err(self.poison(e)),
        };
        if n > 0 {
            if let Err(e) = self.out.write_fully(&self.zbuf[..n]) {
                return Err(self.poison(FrameError::io("write", e)));
            }
            self.frame_len += n as u64;
        }
        trace!(chunk = chunk.len(), compressed = n, "lz4 chunk compressed");
        Ok(())
    }

    /// Finish the frame, patch the header if a content size was requested,
    /// and hand the channel back.
    ///
    /// On a sized frame the cursor is left at the end of the frame.
    pub fn close(mut self) -> FrameResult<W> {
        if self.poisoned {
            return Err(FrameError::Poisoned { op: "close" });
        }

        if !self.stage.is_empty() {
            self.compress_stage()?;
        }
        let n = self.engine.end(&mut self.zbuf)?;
        self.out
            .write_fully(&self.zbuf[..n])
            .map_err(|e| FrameError::io("write", e))?;
        self.frame_len += n as u64;

        let Some(rewind) = self.rewind.take() else {
            debug!(
                content_size = self.content_size,
                frame_len = self.frame_len,
                "lz4 frame closed"
            );
            return Ok(self.out.into_inner());
        };

        (rewind.seek)(self.out.get_mut(), rewind.start).map_err(|e| FrameError::io("lseek", e))?;
        patch_header(&mut self.header, self.content_size)
            .map_err(|reason| FrameError::HeaderFormat { op: "close", reason })?;
        self.out
            .write_fully(&self.header[..self.header_len])
            .map_err(|e| FrameError::io("write", e))?;
        (rewind.seek)(self.out.get_mut(), rewind.start + self.frame_len)
            .map_err(|e| FrameError::io("lseek", e))?;

        debug!(
            content_size = self.content_size,
            frame_len = self.frame_len,
            "lz4 frame closed, header patched"
        );
        Ok(self.out.into_inner())
    }

    /// Uncompressed bytes accepted so far.
    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    /// Frame bytes emitted so far (header included).
    pub fn frame_len(&self) -> u64 {
        self.frame_len
    }

    /// Whether close will record the content size in the header.
    pub fn writes_content_size(&self) -> bool {
        self.rewind.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.poisoned {
            SessionState::Failed
        } else {
            SessionState::Writing
        }
    }

    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    fn poison(&mut self, err: FrameError) -> FrameError {
        warn!(error = %err, content_size = self.content_size, "lz4 frame session failed");
        self.poisoned = true;
        err
    }
}

impl<W: Write, E: CompressEngine> Write for FrameWriter<W, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FrameWriter::write(self, buf)?;
        Ok(buf.len())
    }

    /// Flushes the channel only; staged input waits for a full chunk or `close`.
    fn flush(&mut self) -> io::Result<()> {
        if self.poisoned {
            return Err(FrameError::Poisoned { op: "flush" }.into());
        }
        self.out.get_mut().flush()
    }
}

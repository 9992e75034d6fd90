//! Bounded Output Capture
//!
//! Collects a child's output stream up to a byte cap. Once the cap is
//! exceeded the buffer is marked truncated for good: further bytes are read
//! (so the child never blocks on a full pipe) and thrown away.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Text appended to a captured stream that hit its cap
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Byte buffer with a hard cap and a one-way truncated flag
#[derive(Debug)]
pub struct CappedBuffer {
    data: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            data: Vec::new(),
            cap,
            truncated: false,
        }
    }

    /// Append a chunk, keeping only what fits under the cap
    pub fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }

        let remaining = self.cap - self.data.len();
        if chunk.len() <= remaining {
            self.data.extend_from_slice(chunk);
        } else {
            self.data.extend_from_slice(&chunk[..remaining]);
            self.truncated = true;
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Convert to text, appending [`TRUNCATION_MARKER`] if bytes were dropped
    pub fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.data).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Captured text of one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    pub text: String,
    pub truncated: bool,
}

impl From<CappedBuffer> for CapturedStream {
    fn from(buffer: CappedBuffer) -> Self {
        let truncated = buffer.is_truncated();
        Self {
            text: buffer.into_text(),
            truncated,
        }
    }
}

/// Read `reader` to EOF, keeping at most `cap` bytes
pub async fn capture<R>(reader: Option<R>, cap: usize) -> std::io::Result<CapturedStream>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = CappedBuffer::new(cap);

    if let Some(mut reader) = reader {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.push(&chunk[..n]);
        }
    }

    Ok(buffer.into())
}

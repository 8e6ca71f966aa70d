//! Draining a child's output stream as text.

use tokio::io::{AsyncRead, AsyncReadExt};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Streaming UTF-8 decoder.
///
/// Bytes of a multi-byte character split across reads are kept until the
/// rest arrives. Invalid sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    replaced: usize,
}

impl Utf8Decoder {
    /// Create a decoder with no buffered bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, holding back an incomplete trailing character.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut input = self.pending.as_slice();

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    // Checked by `from_utf8` above.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.replaced += 1;
                            input = &rest[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = input.to_vec();
        out
    }

    /// Flush any incomplete trailing bytes at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        self.replaced += 1;
        Some(char::REPLACEMENT_CHARACTER.to_string())
    }

    /// Number of invalid sequences replaced so far.
    #[must_use]
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

/// Summary of a completed drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Number of chunks passed to the callback.
    pub chunks: usize,
    /// Total bytes read.
    pub bytes: usize,
    /// Number of invalid UTF-8 sequences that were replaced.
    pub replaced: usize,
}

/// Read `reader` to end of stream, passing each decoded chunk to `on_chunk`
/// in arrival order, once per read.
///
/// Returns only after end of stream. Cancellation is driven by closing the
/// stream, i.e. killing the process that writes to it.
///
/// # Errors
///
/// Returns the underlying I/O error if a read fails.
pub async fn drain<R, F>(mut reader: R, mut on_chunk: F) -> std::io::Result<DrainSummary>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut decoder = Utf8Decoder::new();
    let mut summary = DrainSummary::default();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        summary.bytes += n;
        summary.chunks += 1;
        on_chunk(&decoder.decode(&buf[..n]));
    }

    // A character cut off by end of stream is only counted as replaced.
    if decoder.finish().is_some() {
        tracing::debug!(bytes = summary.bytes, "Stream ended inside a multi-byte character");
    }
    summary.replaced = decoder.replaced();

    Ok(summary)
}

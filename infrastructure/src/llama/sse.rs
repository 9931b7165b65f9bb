//! Server-sent event framing.
//!
//! The HTTP body arrives in arbitrary byte chunks; [`LineBuffer`] reassembles
//! complete lines and [`parse_sse_line`] classifies each one.

/// Classification of one SSE line
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// `data: <payload>`
    Data(&'a str),
    /// `data: [DONE]`, end of stream
    Done,
    /// Blank separators, comments and fields we do not use
    Skip,
}

/// Classify a single SSE line (without its line terminator).
pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data == "[DONE]" {
        SseLine::Done
    } else if data.is_empty() {
        SseLine::Skip
    } else {
        SseLine::Data(data)
    }
}

/// Accumulates body bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed.
    ///
    /// Bytes are buffered until a newline arrives, so multi-byte characters
    /// split across chunks are decoded intact.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        lines
    }

    /// Whatever is left after the body ended without a final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

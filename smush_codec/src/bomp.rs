//! Raw-line decompression used by compression mode 5.
//!
//! The decoder treats this as an external collaborator behind [`LineDecoder`]
//! so callers can substitute their own implementation. [`BompLineDecoder`]
//! implements the SCUMM "bomp" run-length line format.

use thiserror::Error;

/// Failure reported by a [`LineDecoder`].
#[derive(Debug, Error)]
pub enum LineDecodeError {
    #[error("bomp stream exhausted after {produced} bytes")]
    Exhausted { produced: usize },
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

/// `(payload, expected_len)` to exactly `expected_len` bytes, or a failure.
pub trait LineDecoder: Send {
    fn decode_line(&mut self, src: &[u8], expected_len: usize) -> Result<Vec<u8>, LineDecodeError>;
}

/// Run-length line decoder for the bomp format.
///
/// Each run starts with a code byte; `(code >> 1) + 1` is the run length. An
/// odd code repeats the following byte, an even code copies that many literal
/// bytes. The final run is clipped to the requested length.
#[derive(Debug, Default, Clone, Copy)]
pub struct BompLineDecoder;

impl LineDecoder for BompLineDecoder {
    fn decode_line(&mut self, src: &[u8], expected_len: usize) -> Result<Vec<u8>, LineDecodeError> {
        let mut runs = BompRuns::new(src);
        let mut out = Vec::with_capacity(expected_len);
        while out.len() < expected_len {
            let remaining = expected_len - out.len();
            let run = runs
                .next_run(remaining)
                .ok_or(LineDecodeError::Exhausted {
                    produced: out.len(),
                })?;
            match run {
                Run::Fill(value, len) => out.resize(out.len() + len, value),
                Run::Literal(bytes) => out.extend_from_slice(bytes),
            }
        }
        Ok(out)
    }
}

enum Run<'a> {
    Fill(u8, usize),
    Literal(&'a [u8]),
}

struct BompRuns<'a> {
    src: &'a [u8],
    index: usize,
}

impl<'a> BompRuns<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, index: 0 }
    }

    fn next_run(&mut self, limit: usize) -> Option<Run<'a>> {
        let code = *self.src.get(self.index)?;
        self.index += 1;
        let len = ((code >> 1) as usize + 1).min(limit);
        if code & 1 != 0 {
            let color = *self.src.get(self.index)?;
            self.index += 1;
            Some(Run::Fill(color, len))
        } else {
            let bytes = self.src.get(self.index..self.index + len)?;
            self.index += len;
            Some(Run::Literal(bytes))
        }
    }
}

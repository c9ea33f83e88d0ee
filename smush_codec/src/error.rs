use thiserror::Error;

use crate::bomp::LineDecodeError;
use crate::decoder::HEADER_LEN;

/// Broad failure classes. Every error aborts the frame being decoded; none are
/// retried by the decoder itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The frame header or an opcode operand violates the format.
    Validation,
    /// The frame ended before a header field or operand could be read.
    TruncatedInput,
    /// A collaborator (line decoder, prediction plane) could not satisfy a request.
    Dependency,
}

/// Errors raised while decoding a codec 47 frame.
#[derive(Debug, Error)]
pub enum Codec47Error {
    #[error("frame header smaller than {HEADER_LEN} bytes (got {0})")]
    TruncatedHeader(usize),
    #[error("payload truncated: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedPayload {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("reserved header byte at offset {offset} is {value:#04x}, expected zero")]
    ReservedBytes { offset: usize, value: u8 },
    #[error("decoded size {declared} does not match frame size {expected}")]
    DecodedSizeMismatch { declared: u32, expected: usize },
    #[error("unknown compression mode {0}")]
    UnknownCompression(u8),
    #[error("unknown rotation mode {0}")]
    UnknownRotation(u8),
    #[error("invalid frame geometry {width}x{height}")]
    InvalidGeometry { width: u16, height: u16 },
    #[error("motion-compensated frames need 8-pixel aligned geometry, got {width}x{height}")]
    UnalignedGeometry { width: u16, height: u16 },
    #[error("glyph opcode used on a 2x2 block at offset {offset}")]
    GlyphOnPixelBlock { offset: usize },
    #[error("motion vector {code:#04x} reads outside the prediction plane at offset {offset}")]
    MotionOutOfBounds { code: u8, offset: usize },
    #[error("line decoder failed: {0}")]
    LineDecoder(#[from] LineDecodeError),
    #[error("line decoder returned {actual} bytes, expected {expected}")]
    LineDecoderLength { expected: usize, actual: usize },
}

impl Codec47Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TruncatedHeader(_) | Self::TruncatedPayload { .. } => ErrorKind::TruncatedInput,
            Self::ReservedBytes { .. }
            | Self::DecodedSizeMismatch { .. }
            | Self::UnknownCompression(_)
            | Self::UnknownRotation(_)
            | Self::InvalidGeometry { .. }
            | Self::UnalignedGeometry { .. }
            | Self::GlyphOnPixelBlock { .. } => ErrorKind::Validation,
            Self::MotionOutOfBounds { .. }
            | Self::LineDecoder(_)
            | Self::LineDecoderLength { .. } => ErrorKind::Dependency,
        }
    }
}

pub type Result<T, E = Codec47Error> = std::result::Result<T, E>;

//! Decoder for SMUSH codec 47, the motion-compensated 8-bit palette-index
//! video codec used by SANM/ANIM cutscenes.
//!
//! Frames are decoded strictly in sequence order through a single
//! [`Codec47Decoder`], which owns the three prediction planes the codec
//! rotates between frames.

pub mod block;
pub mod bomp;
pub mod buffers;
pub mod config;
pub mod decoder;
pub mod error;
pub mod tables;

pub use bomp::{BompLineDecoder, LineDecodeError, LineDecoder};
pub use buffers::{FrameBuffers, Rotation};
pub use config::DecoderConfig;
pub use decoder::{Codec47Decoder, Compression, FrameHeader, HEADER_LEN};
pub use error::{Codec47Error, ErrorKind};
pub use tables::{Glyph, GlyphTable, MotionVector, motion_vector, motion_vectors};

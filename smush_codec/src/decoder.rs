// SPDX-License-Identifier: GPL-2.0-or-later
//
// Codec 47 frame decoder. Each frame carries a 26-byte header that selects one
// of six whole-frame strategies and tells the decoder how to rotate its three
// prediction planes afterwards.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use serde::Serialize;

use crate::block::{BlockContext, decode_block, take};
use crate::bomp::{BompLineDecoder, LineDecoder};
use crate::buffers::{FrameBuffers, Rotation};
use crate::config::DecoderConfig;
use crate::error::{Codec47Error, Result};

/// Size of the fixed frame header that precedes every payload.
pub const HEADER_LEN: usize = 26;

const BLOCK_SIZE: usize = 8;
const RESERVED_RANGES: [std::ops::Range<usize>; 2] = [5..8, 18..26];

/// Whole-frame compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    /// Payload is the frame verbatim.
    Raw,
    /// Payload is half resolution; every 4 bytes cover a 2x2 cell.
    HalfResolution,
    /// Recursive block motion compensation against the prediction planes.
    MotionCompensated,
    /// Repeat `prev2`.
    RepeatPrev2,
    /// Repeat `prev1`.
    RepeatPrev1,
    /// Payload goes through the raw-line decoder.
    LineCompressed,
}

impl TryFrom<u8> for Compression {
    type Error = Codec47Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Raw,
            1 => Self::HalfResolution,
            2 => Self::MotionCompensated,
            3 => Self::RepeatPrev2,
            4 => Self::RepeatPrev1,
            5 => Self::LineCompressed,
            other => return Err(Codec47Error::UnknownCompression(other)),
        })
    }
}

/// Parsed codec 47 frame header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub sequence: u16,
    pub compression: u8,
    pub rotation: u8,
    pub skip: u8,
    /// Fill values for opcodes 0xF8..=0xFB live in the first four bytes.
    pub params: [u8; 8],
    pub bg1: u8,
    pub bg2: u8,
    pub decoded_size: u32,
}

impl FrameHeader {
    pub fn parse(src: &[u8], validate_reserved: bool) -> Result<Self> {
        if src.len() < HEADER_LEN {
            return Err(Codec47Error::TruncatedHeader(src.len()));
        }

        if validate_reserved {
            for mut range in RESERVED_RANGES {
                if let Some(offset) = range.find(|&offset| src[offset] != 0) {
                    return Err(Codec47Error::ReservedBytes {
                        offset,
                        value: src[offset],
                    });
                }
            }
        }

        let mut params = [0u8; 8];
        params.copy_from_slice(&src[8..16]);

        Ok(Self {
            sequence: LittleEndian::read_u16(&src[0..2]),
            compression: src[2],
            rotation: src[3],
            skip: src[4],
            params,
            bg1: src[12],
            bg2: src[13],
            decoded_size: LittleEndian::read_u32(&src[14..18]),
        })
    }

    /// Slice out the compressed payload, honouring the skip flag.
    pub fn payload<'a>(&self, src: &'a [u8], skip_block_len: usize) -> Result<&'a [u8]> {
        let start = if self.skip & 1 != 0 {
            HEADER_LEN + skip_block_len
        } else {
            HEADER_LEN
        };
        src.get(start..).ok_or(Codec47Error::TruncatedPayload {
            offset: HEADER_LEN,
            needed: start - HEADER_LEN,
            available: src.len().saturating_sub(HEADER_LEN),
        })
    }
}

/// Stateful codec 47 decoder.
///
/// Frames of one stream must be fed in sequence order: modes 2, 3 and 4 read
/// planes written by the preceding calls.
pub struct Codec47Decoder {
    config: DecoderConfig,
    line_decoder: Box<dyn LineDecoder>,
    buffers: Option<FrameBuffers>,
    prev_seq: Option<i32>,
}

impl Default for Codec47Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec47Decoder {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            line_decoder: Box::new(BompLineDecoder),
            buffers: None,
            prev_seq: None,
        }
    }

    /// Replace the collaborator used for mode 5 frames.
    pub fn with_line_decoder(mut self, line_decoder: impl LineDecoder + 'static) -> Self {
        self.line_decoder = Box::new(line_decoder);
        self
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    /// Prediction planes, once the first frame has been seen.
    pub fn buffers(&self) -> Option<&FrameBuffers> {
        self.buffers.as_ref()
    }

    /// Sequence number of the last frame handed to [`decode`](Self::decode).
    pub fn last_sequence(&self) -> Option<i32> {
        self.prev_seq
    }

    /// Drop all planes; the next frame re-initialises the decoder.
    pub fn reset(&mut self) {
        self.buffers = None;
        self.prev_seq = None;
    }

    /// Decode one frame and return the `width * height` plane it produced.
    pub fn decode(&mut self, src: &[u8], width: u16, height: u16) -> Result<&[u8]> {
        if width == 0 || height == 0 {
            return Err(Codec47Error::InvalidGeometry { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        let frame_size = w * h;

        let header = FrameHeader::parse(src, self.config.validate_reserved)?;
        if header.decoded_size as usize != frame_size {
            return Err(Codec47Error::DecodedSizeMismatch {
                declared: header.decoded_size,
                expected: frame_size,
            });
        }
        let compression = Compression::try_from(header.compression)?;
        let rotation = Rotation::try_from(header.rotation)?;
        let payload = header.payload(src, self.config.skip_block_len)?;
        trace!("codec47 frame {:?} payload={} bytes", header, payload.len());

        if self
            .buffers
            .as_ref()
            .is_some_and(|buffers| (buffers.width(), buffers.height()) != (w, h))
        {
            self.buffers = None;
        }
        if self.buffers.is_none() {
            debug!("codec47 initialising {width}x{height} planes");
            self.prev_seq = None;
        }
        let buffers = self.buffers.get_or_insert_with(|| FrameBuffers::new(w, h));

        let seq = i32::from(header.sequence);
        if seq == 0 {
            buffers.reset_background(header.bg1, header.bg2);
            self.prev_seq = Some(-1);
        }
        let contiguous = self.prev_seq.is_some_and(|prev| seq == prev + 1);
        if !contiguous {
            debug!(
                "codec47 frame {seq} does not follow {:?}; skipping prediction and rotation",
                self.prev_seq
            );
        }

        match compression {
            Compression::Raw => {
                let pixels = take(payload, 0, frame_size)?;
                buffers.current_mut().copy_from_slice(pixels);
            }
            Compression::HalfResolution => upsample(buffers, payload)?,
            Compression::MotionCompensated => {
                if contiguous {
                    decode_blocks(buffers, payload, &header.params, width, height)?;
                }
            }
            Compression::RepeatPrev2 => buffers.copy_from_prev2(),
            Compression::RepeatPrev1 => buffers.copy_from_prev1(),
            Compression::LineCompressed => {
                let pixels = self.line_decoder.decode_line(payload, frame_size)?;
                if pixels.len() != frame_size {
                    return Err(Codec47Error::LineDecoderLength {
                        expected: frame_size,
                        actual: pixels.len(),
                    });
                }
                buffers.current_mut().copy_from_slice(&pixels);
            }
        }

        let rotated = contiguous && rotation != Rotation::Keep;
        if rotated {
            buffers.rotate(rotation);
        }
        self.prev_seq = Some(seq);

        // After a rotation the decoded plane lives in prev2.
        Ok(if rotated {
            buffers.prev2()
        } else {
            buffers.current()
        })
    }
}

fn upsample(buffers: &mut FrameBuffers, payload: &[u8]) -> Result<()> {
    let (width, height) = (buffers.width(), buffers.height());
    let current = buffers.current_mut();
    let mut pos = 0usize;
    for y in (0..height).step_by(2) {
        for x in (0..width).step_by(2) {
            let cell = take(payload, pos, 4)?;
            pos += 4;
            for (dy, pair) in cell.chunks_exact(2).enumerate() {
                let row = y + dy;
                if row >= height {
                    continue;
                }
                for (dx, &value) in pair.iter().enumerate() {
                    if x + dx < width {
                        current[row * width + x + dx] = value;
                    }
                }
            }
        }
    }
    Ok(())
}

fn decode_blocks(
    buffers: &mut FrameBuffers,
    payload: &[u8],
    params: &[u8; 8],
    width: u16,
    height: u16,
) -> Result<()> {
    let (w, h) = (width as usize, height as usize);
    if w % BLOCK_SIZE != 0 || h % BLOCK_SIZE != 0 {
        return Err(Codec47Error::UnalignedGeometry { width, height });
    }

    let mut ctx = BlockContext {
        planes: buffers.split(),
        width: w,
        payload,
        params,
    };
    let mut pos = 0usize;
    for y in (0..h).step_by(BLOCK_SIZE) {
        for x in (0..w).step_by(BLOCK_SIZE) {
            pos = decode_block(&mut ctx, pos, y * w + x, BLOCK_SIZE)?;
        }
    }
    trace!("codec47 block stream used {pos} of {} bytes", payload.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn header(sequence: u16, compression: u8, rotation: u8, decoded_size: u32) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[0..2].copy_from_slice(&sequence.to_le_bytes());
        data[2] = compression;
        data[3] = rotation;
        data[14..18].copy_from_slice(&decoded_size.to_le_bytes());
        data
    }

    #[test]
    fn parses_header_fields() {
        let mut data = header(0x0102, 2, 1, 64);
        data[8..12].copy_from_slice(&[1, 2, 3, 4]);
        data[12] = 0x21;
        data[13] = 0x22;
        let parsed = FrameHeader::parse(&data, true).unwrap();
        assert_eq!(parsed.sequence, 0x0102);
        assert_eq!(parsed.compression, 2);
        assert_eq!(parsed.rotation, 1);
        assert_eq!(&parsed.params[..4], &[1, 2, 3, 4]);
        assert_eq!((parsed.bg1, parsed.bg2), (0x21, 0x22));
        assert_eq!(parsed.decoded_size, 64);
    }

    #[test]
    fn reserved_bytes_are_checked_unless_disabled() {
        let mut data = header(0, 0, 0, 64);
        data[20] = 1;
        let err = FrameHeader::parse(&data, true).unwrap_err();
        assert!(matches!(
            err,
            Codec47Error::ReservedBytes {
                offset: 20,
                value: 1
            }
        ));
        assert!(FrameHeader::parse(&data, false).is_ok());
    }

    #[test]
    fn short_header_is_truncation() {
        let err = FrameHeader::parse(&[0u8; 10], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    }

    #[test]
    fn skip_flag_moves_payload_start() {
        let mut data = header(0, 0, 0, 4);
        data[4] = 1;
        data.extend_from_slice(&[0xEE; 3]);
        data.extend_from_slice(&[1, 2]);
        let parsed = FrameHeader::parse(&data, true).unwrap();
        assert_eq!(parsed.payload(&data, 3).unwrap(), &[1, 2]);
        assert_eq!(
            parsed.payload(&data, 16).unwrap_err().kind(),
            ErrorKind::TruncatedInput
        );
    }

    #[test]
    fn raw_frame_of_fives() {
        let mut data = header(0, 0, 0, 64);
        data.extend_from_slice(&[0x05; 64]);
        let mut decoder = Codec47Decoder::new();
        let frame = decoder.decode(&data, 8, 8).unwrap();
        assert_eq!(frame, &[0x05; 64][..]);
    }

    #[test]
    fn half_resolution_scatters_cells() {
        let mut data = header(0, 1, 0, 16);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
        let mut decoder = Codec47Decoder::new();
        let frame = decoder.decode(&data, 4, 4).unwrap();
        assert_eq!(
            frame,
            &[1, 2, 5, 6, 3, 4, 7, 8, 9, 10, 13, 14, 11, 12, 15, 16][..]
        );
    }

    #[test]
    fn unknown_compression_is_rejected() {
        let mut data = header(0, 9, 0, 4);
        data.extend_from_slice(&[0; 4]);
        let err = Codec47Decoder::new().decode(&data, 2, 2).unwrap_err();
        assert!(matches!(err, Codec47Error::UnknownCompression(9)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn motion_frames_need_aligned_geometry() {
        let mut data = header(0, 2, 0, 12 * 8);
        data.push(0x00);
        let err = Codec47Decoder::new().decode(&data, 12, 8).unwrap_err();
        assert!(matches!(err, Codec47Error::UnalignedGeometry { .. }));
    }
}

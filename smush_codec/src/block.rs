// SPDX-License-Identifier: GPL-2.0-or-later
//
// Recursive block decoder for codec 47 motion-compensated frames.
//
// A block is a square region addressed by the plane offset of its top-left
// cell. The same offset is valid in all three planes, so the current block and
// its prediction sources stay aligned through every split.

use crate::buffers::Planes;
use crate::error::{Codec47Error, Result};
use crate::tables::{GlyphTable, motion_vector};

const OP_CARRY_FORWARD: u8 = 0xFC;
const OP_GLYPH: u8 = 0xFD;
const OP_FILL: u8 = 0xFE;
const OP_SPLIT: u8 = 0xFF;

/// Everything a block needs besides its own position.
pub struct BlockContext<'a> {
    pub planes: Planes<'a>,
    pub width: usize,
    pub payload: &'a [u8],
    pub params: &'a [u8; 8],
}

/// Decode one `size`x`size` block whose opcode sits at `pos`.
///
/// Returns the payload position just past the block, including every nested
/// sub-block read by a split.
pub fn decode_block(
    ctx: &mut BlockContext<'_>,
    pos: usize,
    offset: usize,
    size: usize,
) -> Result<usize> {
    let code = read_byte(ctx.payload, pos)?;
    let mut pos = pos + 1;

    match code {
        0x00..=0xF7 => motion_copy(ctx, code, offset, size)?,
        OP_SPLIT if size == 2 => {
            let pixels = take(ctx.payload, pos, 4)?;
            pos += 4;
            let width = ctx.width;
            ctx.planes.current[offset..offset + 2].copy_from_slice(&pixels[..2]);
            ctx.planes.current[offset + width..offset + width + 2].copy_from_slice(&pixels[2..]);
        }
        OP_SPLIT => {
            let half = size / 2;
            let lower = offset + half * ctx.width;
            pos = decode_block(ctx, pos, offset, half)?;
            pos = decode_block(ctx, pos, offset + half, half)?;
            pos = decode_block(ctx, pos, lower, half)?;
            pos = decode_block(ctx, pos, lower + half, half)?;
        }
        OP_FILL => {
            let value = read_byte(ctx.payload, pos)?;
            pos += 1;
            fill_block(ctx, offset, size, value);
        }
        OP_GLYPH => {
            let table = GlyphTable::for_block(size)
                .ok_or(Codec47Error::GlyphOnPixelBlock { offset })?;
            let operands = take(ctx.payload, pos, 3)?;
            pos += 3;
            let glyph = table.get(operands[0]);
            let (first, second) = (operands[1], operands[2]);
            for y in 0..size {
                let row = offset + y * ctx.width;
                for (x, pixel) in ctx.planes.current[row..row + size].iter_mut().enumerate() {
                    *pixel = if glyph.is_set(x, y) { first } else { second };
                }
            }
        }
        OP_CARRY_FORWARD => {
            for y in 0..size {
                let row = offset + y * ctx.width;
                ctx.planes.current[row..row + size]
                    .copy_from_slice(&ctx.planes.prev1[row..row + size]);
            }
        }
        _ => {
            let value = ctx.params[(code & 7) as usize];
            fill_block(ctx, offset, size, value);
        }
    }

    Ok(pos)
}

fn motion_copy(ctx: &mut BlockContext<'_>, code: u8, offset: usize, size: usize) -> Result<()> {
    let vector = motion_vector(code);
    let width = ctx.width as isize;
    let prev2 = ctx.planes.prev2;
    for y in 0..size {
        let dest = offset + y * ctx.width;
        let src = dest as isize + isize::from(vector.dx) + isize::from(vector.dy) * width;
        // Rows may wrap horizontally; only the plane itself bounds the read.
        if src < 0 || src as usize + size > prev2.len() {
            return Err(Codec47Error::MotionOutOfBounds { code, offset });
        }
        let src = src as usize;
        ctx.planes.current[dest..dest + size].copy_from_slice(&prev2[src..src + size]);
    }
    Ok(())
}

fn fill_block(ctx: &mut BlockContext<'_>, offset: usize, size: usize, value: u8) {
    for y in 0..size {
        let row = offset + y * ctx.width;
        ctx.planes.current[row..row + size].fill(value);
    }
}

fn read_byte(payload: &[u8], pos: usize) -> Result<u8> {
    Ok(take(payload, pos, 1)?[0])
}

pub(crate) fn take(payload: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    payload
        .get(pos..pos + len)
        .ok_or(Codec47Error::TruncatedPayload {
            offset: pos,
            needed: len,
            available: payload.len().saturating_sub(pos),
        })
}

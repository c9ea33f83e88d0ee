//! The three pixel planes a codec 47 stream predicts from.
//!
//! `current` receives the frame being decoded, `prev1` and `prev2` hold older
//! frames. Rotation reassigns the roles by swapping the owned planes, so no
//! pixel data moves between frames.

use crate::error::Codec47Error;

/// End-of-frame role reassignment requested by the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Leave every plane where it is.
    Keep,
    /// The decoded frame becomes `prev2`.
    Single,
    /// Exchange `prev1` and `prev2` first, then behave like [`Rotation::Single`].
    Double,
}

impl TryFrom<u8> for Rotation {
    type Error = Codec47Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Keep),
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            other => Err(Codec47Error::UnknownRotation(other)),
        }
    }
}

/// Simultaneous view of all three planes for block decoding.
pub struct Planes<'a> {
    pub current: &'a mut [u8],
    pub prev1: &'a [u8],
    pub prev2: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct FrameBuffers {
    width: usize,
    height: usize,
    current: Vec<u8>,
    prev1: Vec<u8>,
    prev2: Vec<u8>,
}

impl FrameBuffers {
    pub fn new(width: usize, height: usize) -> Self {
        let frame_size = width * height;
        Self {
            width,
            height,
            current: vec![0u8; frame_size],
            prev1: vec![0u8; frame_size],
            prev2: vec![0u8; frame_size],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.current.len()
    }

    pub fn current(&self) -> &[u8] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [u8] {
        &mut self.current
    }

    pub fn prev1(&self) -> &[u8] {
        &self.prev1
    }

    pub fn prev2(&self) -> &[u8] {
        &self.prev2
    }

    pub fn split(&mut self) -> Planes<'_> {
        Planes {
            current: &mut self.current,
            prev1: &self.prev1,
            prev2: &self.prev2,
        }
    }

    /// Seed both prediction planes at the start of a sequence.
    pub fn reset_background(&mut self, bg1: u8, bg2: u8) {
        self.prev1.fill(bg1);
        self.prev2.fill(bg2);
    }

    pub fn copy_from_prev1(&mut self) {
        self.current.copy_from_slice(&self.prev1);
    }

    pub fn copy_from_prev2(&mut self) {
        self.current.copy_from_slice(&self.prev2);
    }

    pub fn rotate(&mut self, rotation: Rotation) {
        match rotation {
            Rotation::Keep => {}
            Rotation::Single => {
                std::mem::swap(&mut self.current, &mut self.prev2);
            }
            Rotation::Double => {
                std::mem::swap(&mut self.prev1, &mut self.prev2);
                std::mem::swap(&mut self.current, &mut self.prev2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rotation_moves_current_into_prev2_without_copying() {
        let mut buffers = FrameBuffers::new(4, 2);
        buffers.current_mut()[3] = 0xAB;
        let plane = buffers.current().as_ptr();

        buffers.rotate(Rotation::Single);

        assert_eq!(buffers.prev2().as_ptr(), plane);
        assert_eq!(buffers.prev2()[3], 0xAB);
    }

    #[test]
    fn double_rotation_exchanges_prev_planes_first() {
        let mut buffers = FrameBuffers::new(2, 2);
        buffers.reset_background(1, 2);
        buffers.current_mut().fill(3);
        let (cur, p1, p2) = (
            buffers.current().as_ptr(),
            buffers.prev1().as_ptr(),
            buffers.prev2().as_ptr(),
        );

        buffers.rotate(Rotation::Double);

        assert_eq!(buffers.prev1().as_ptr(), p2);
        assert_eq!(buffers.prev2().as_ptr(), cur);
        assert_eq!(buffers.current().as_ptr(), p1);
        assert_eq!(buffers.prev1(), &[2; 4]);
        assert_eq!(buffers.prev2(), &[3; 4]);
        assert_eq!(buffers.current(), &[1; 4]);
    }

    #[test]
    fn keep_rotation_is_a_no_op() {
        let mut buffers = FrameBuffers::new(2, 1);
        buffers.reset_background(7, 8);
        let before = buffers.current().as_ptr();
        buffers.rotate(Rotation::Keep);
        assert_eq!(buffers.current().as_ptr(), before);
        assert_eq!(buffers.prev1(), &[7, 7]);
    }

    #[test]
    fn rejects_unknown_rotation() {
        assert!(Rotation::try_from(3).is_err());
        assert_eq!(Rotation::try_from(2).unwrap(), Rotation::Double);
    }
}

use byteorder::{ByteOrder, LittleEndian};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_BIT_DEPTH;
use crate::error::{PsfError, Result};

/// Which acquisition stream a buffer comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferSource {
    Raw,
    #[default]
    Processed,
}

impl std::fmt::Display for BufferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Processed => write!(f, "Processed"),
        }
    }
}

/// Storage width of one sample, selected at runtime from the bit depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    U32,
}

impl SampleFormat {
    /// Bucket a bit depth: <=8 -> 1 byte, 9..=16 -> 2 bytes, 17..=32 -> 4 bytes.
    pub fn from_bit_depth(bit_depth: u32) -> Result<Self> {
        match bit_depth {
            1..=8 => Ok(Self::U8),
            9..=16 => Ok(Self::U16),
            17..=MAX_BIT_DEPTH => Ok(Self::U32),
            other => Err(PsfError::UnsupportedBitDepth(other)),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Shape and sample depth of a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub bit_depth: u32,
    pub width: usize,
    pub height: usize,
}

impl FrameGeometry {
    pub fn new(bit_depth: u32, width: usize, height: usize) -> Self {
        Self {
            bit_depth,
            width,
            height,
        }
    }

    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::from_bit_depth(self.bit_depth)
    }

    /// Byte footprint of one frame in staging storage.
    pub fn bytes_per_frame(&self) -> Result<usize> {
        let bytes_per_sample = self.sample_format()?.bytes_per_sample();
        self.width
            .checked_mul(self.height)
            .and_then(|pixels| pixels.checked_mul(bytes_per_sample))
            .ok_or_else(|| self.invalid(1))
    }

    fn invalid(&self, frames_per_buffer: usize) -> PsfError {
        PsfError::InvalidGeometry {
            bit_depth: self.bit_depth,
            width: self.width,
            height: self.height,
            frames_per_buffer,
        }
    }
}

/// One buffer delivered by the acquisition feed.
///
/// `data` holds `frames_per_buffer` consecutive frames and is only valid for
/// the duration of the call that delivers it.
#[derive(Clone, Copy, Debug)]
pub struct AcquiredFrame<'a> {
    pub data: &'a [u8],
    pub bit_depth: u32,
    pub samples_per_line: usize,
    pub lines_per_frame: usize,
    pub frames_per_buffer: usize,
    pub buffers_per_volume: usize,
    pub current_buffer: usize,
    pub source: BufferSource,
}

impl AcquiredFrame<'_> {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.bit_depth, self.samples_per_line, self.lines_per_frame)
    }

    /// Reject zero or out-of-range dimensions.
    pub fn validate(&self) -> Result<()> {
        let geometry = self.geometry();
        if self.bit_depth == 0
            || self.bit_depth > MAX_BIT_DEPTH
            || self.samples_per_line == 0
            || self.lines_per_frame == 0
            || self.frames_per_buffer == 0
        {
            return Err(geometry.invalid(self.frames_per_buffer));
        }
        Ok(())
    }
}

/// Typed, row-major view of a frame's samples, shape = (height, width).
#[derive(Clone, Debug)]
pub enum FrameSamples<'a> {
    U8(ArrayView2<'a, u8>),
    U16(Array2<u16>),
    U32(Array2<u32>),
}

impl<'a> FrameSamples<'a> {
    /// Interpret little-endian staged bytes according to `geometry`.
    pub fn decode(bytes: &'a [u8], geometry: &FrameGeometry) -> Result<Self> {
        let format = geometry.sample_format()?;
        let expected = geometry.bytes_per_frame()?;
        if bytes.len() < expected {
            return Err(PsfError::BufferTooSmall {
                expected,
                actual: bytes.len(),
            });
        }
        let bytes = &bytes[..expected];
        let shape = (geometry.height, geometry.width);
        let pixels = geometry.width * geometry.height;

        let samples = match format {
            SampleFormat::U8 => {
                let view =
                    ArrayView2::from_shape(shape, bytes).map_err(|_| geometry.invalid(1))?;
                Self::U8(view)
            }
            SampleFormat::U16 => {
                let mut values = vec![0u16; pixels];
                LittleEndian::read_u16_into(bytes, &mut values);
                Self::U16(Array2::from_shape_vec(shape, values).map_err(|_| geometry.invalid(1))?)
            }
            SampleFormat::U32 => {
                let mut values = vec![0u32; pixels];
                LittleEndian::read_u32_into(bytes, &mut values);
                Self::U32(Array2::from_shape_vec(shape, values).map_err(|_| geometry.invalid(1))?)
            }
        };
        Ok(samples)
    }

    pub fn width(&self) -> usize {
        match self {
            Self::U8(v) => v.ncols(),
            Self::U16(a) => a.ncols(),
            Self::U32(a) => a.ncols(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::U8(v) => v.nrows(),
            Self::U16(a) => a.nrows(),
            Self::U32(a) => a.nrows(),
        }
    }
}

/// Pack sample values into the little-endian staging layout for `format`.
///
/// Values wider than the format are truncated.
pub fn encode_samples(values: &[u32], format: SampleFormat) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * format.bytes_per_sample()];
    match format {
        SampleFormat::U8 => {
            for (dst, &v) in out.iter_mut().zip(values) {
                *dst = v as u8;
            }
        }
        SampleFormat::U16 => {
            let narrowed: Vec<u16> = values.iter().map(|&v| v as u16).collect();
            LittleEndian::write_u16_into(&narrowed, &mut out);
        }
        SampleFormat::U32 => LittleEndian::write_u32_into(values, &mut out),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_buckets() {
        assert_eq!(SampleFormat::from_bit_depth(1).unwrap(), SampleFormat::U8);
        assert_eq!(SampleFormat::from_bit_depth(8).unwrap(), SampleFormat::U8);
        assert_eq!(SampleFormat::from_bit_depth(9).unwrap(), SampleFormat::U16);
        assert_eq!(SampleFormat::from_bit_depth(12).unwrap(), SampleFormat::U16);
        assert_eq!(SampleFormat::from_bit_depth(24).unwrap(), SampleFormat::U32);
        assert!(SampleFormat::from_bit_depth(0).is_err());
        assert!(SampleFormat::from_bit_depth(33).is_err());
    }

    #[test]
    fn test_decode_u16_little_endian() {
        let geometry = FrameGeometry::new(12, 3, 2);
        let bytes = encode_samples(&[1, 2, 3, 4000, 5, 6], SampleFormat::U16);
        let samples = FrameSamples::decode(&bytes, &geometry).unwrap();
        assert_eq!(samples.width(), 3);
        assert_eq!(samples.height(), 2);
        match samples {
            FrameSamples::U16(a) => {
                assert_eq!(a[[0, 2]], 3);
                assert_eq!(a[[1, 0]], 4000);
            }
            other => panic!("expected U16 samples, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_short_buffer() {
        let geometry = FrameGeometry::new(8, 4, 4);
        let err = FrameSamples::decode(&[0u8; 10], &geometry).unwrap_err();
        assert!(matches!(
            err,
            PsfError::BufferTooSmall {
                expected: 16,
                actual: 10
            }
        ));
    }
}

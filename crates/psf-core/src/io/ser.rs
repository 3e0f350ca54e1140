use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use crate::error::{PsfError, Result};
use crate::frame::FrameGeometry;

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Mono 8- or 16-bit header for `frame_count` frames of `width` x `height`.
    pub fn mono(width: u32, height: u32, pixel_depth: u32, frame_count: u32) -> Self {
        Self {
            color_id: 0,
            little_endian: true,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame, `None` on overflow.
    pub fn frame_byte_size(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_pixel_plane() * self.planes_per_pixel())
    }

    /// Single-plane geometry as seen by the analysis core.
    pub fn geometry(&self) -> Result<FrameGeometry> {
        if self.planes_per_pixel() != 1 {
            return Err(PsfError::InvalidSer(format!(
                "Color SER (color id {}) cannot be analyzed, expected a single plane",
                self.color_id
            )));
        }
        Ok(FrameGeometry::new(
            self.pixel_depth,
            self.width as usize,
            self.height as usize,
        ))
    }
}

/// Summary of a recording for display.
#[derive(Clone, Debug)]
pub struct SerInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub color_id: i32,
    pub little_endian: bool,
    pub has_timestamps: bool,
    pub observer: Option<String>,
    pub telescope: Option<String>,
    pub instrument: Option<String>,
}

/// Memory-mapped SER file reader.
///
/// Frames are exposed as raw little-endian sample bytes so they can be fed to
/// the analyzer as if they came from an acquisition buffer.
pub struct SerReader {
    mmap: Mmap,
    frame_size: usize,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(PsfError::InvalidSer("File too small for SER header".into()));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(PsfError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        let frame_size = header
            .frame_byte_size()
            .ok_or_else(|| PsfError::InvalidSer("Frame size overflow".into()))?;

        let expected_data_size = (header.frame_count as usize)
            .checked_mul(frame_size)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| PsfError::InvalidSer("Data size overflow".into()))?;
        if mmap.len() < expected_data_size {
            return Err(PsfError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self {
            mmap,
            frame_size,
            header,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    pub fn frame_byte_size(&self) -> usize {
        self.frame_size
    }

    /// Number of whole buffers of `frames_per_buffer` frames; a partial tail
    /// is not replayed.
    pub fn buffer_count(&self, frames_per_buffer: usize) -> usize {
        if frames_per_buffer == 0 {
            0
        } else {
            self.frame_count() / frames_per_buffer
        }
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        self.frames_raw(index, 1)
    }

    fn frames_raw(&self, first: usize, count: usize) -> Result<&[u8]> {
        let total = self.frame_count();
        let last = first.saturating_add(count);
        if count == 0 || last > total {
            return Err(PsfError::FrameIndexOutOfRange {
                index: last.saturating_sub(1),
                total,
            });
        }
        let offset = SER_HEADER_SIZE + first * self.frame_size;
        let end = offset + count * self.frame_size;
        Ok(&self.mmap[offset..end])
    }

    /// Bytes of buffer `index` (frames `index * fpb .. (index + 1) * fpb`)
    /// with 16-bit samples in little-endian order.
    ///
    /// Borrowed from the map unless the recording stores big-endian samples.
    pub fn buffer_le(&self, index: usize, frames_per_buffer: usize) -> Result<Cow<'_, [u8]>> {
        let first = index.checked_mul(frames_per_buffer).ok_or(PsfError::FrameIndexOutOfRange {
            index,
            total: self.frame_count(),
        })?;
        let raw = self.frames_raw(first, frames_per_buffer)?;

        if self.header.bytes_per_pixel_plane() == 2 && !self.header.little_endian {
            let mut samples = vec![0u16; raw.len() / 2];
            BigEndian::read_u16_into(raw, &mut samples);
            let mut swapped = vec![0u8; raw.len()];
            LittleEndian::write_u16_into(&samples, &mut swapped);
            Ok(Cow::Owned(swapped))
        } else {
            Ok(Cow::Borrowed(raw))
        }
    }

    fn trailer_offset(&self) -> usize {
        SER_HEADER_SIZE + self.frame_size * self.frame_count()
    }

    /// Read per-frame timestamp from the optional trailer.
    pub fn timestamp(&self, index: usize) -> Option<u64> {
        let ts_offset = self.trailer_offset() + index * 8;
        if index < self.frame_count() && ts_offset + 8 <= self.mmap.len() {
            let bytes = &self.mmap[ts_offset..ts_offset + 8];
            Some(u64::from_le_bytes(bytes.try_into().ok()?))
        } else {
            None
        }
    }

    pub fn info(&self, path: &Path) -> SerInfo {
        SerInfo {
            filename: path.to_path_buf(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            bit_depth: self.header.pixel_depth,
            color_id: self.header.color_id,
            little_endian: self.header.little_endian,
            has_timestamps: self.frame_count() > 0 && self.timestamp(0).is_some(),
            observer: non_empty(&self.header.observer),
            telescope: non_empty(&self.header.telescope),
            instrument: non_empty(&self.header.instrument),
        }
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]);

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()?;
    let height = cursor.read_i32::<LittleEndian>()?;
    let pixel_depth = cursor.read_i32::<LittleEndian>()?;
    let frame_count = cursor.read_i32::<LittleEndian>()?;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width <= 0 || height <= 0 {
        return Err(PsfError::InvalidSer(format!(
            "Invalid dimensions {width}x{height}"
        )));
    }
    if !(1..=16).contains(&pixel_depth) {
        return Err(PsfError::InvalidSer(format!(
            "Invalid pixel depth {pixel_depth}"
        )));
    }
    if frame_count < 0 {
        return Err(PsfError::InvalidSer(format!(
            "Invalid frame count {frame_count}"
        )));
    }

    // A flag of 0 is written as little-endian by most capture software.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width: width as u32,
        height: height as u32,
        pixel_depth: pixel_depth as u32,
        frame_count: frame_count as u32,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

//! ENVI band-interleaved-by-line (`.bil` + `.hdr`) rasters.
//!
//! This is the format LSDTopoTools writes DEMs, hillshades and
//! categorical rasters in. Only single band files are supported.
//!
//! # References
//!
//! 1. [ENVI header files](https://www.nv5geospatialsoftware.com/docs/ENVIHeaderFiles.html)

mod error;
mod header;
mod hillshade;

pub use crate::{
    error::BilError,
    header::{ByteOrder, DataType, Header, MapInfo},
    hillshade::hillshade,
};
use byteorder::{BigEndian as BE, ByteOrder as _, LittleEndian as LE};
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::OnceLock,
};

pub struct Raster {
    header: Header,

    /// Lowest and highest valid sample, computed on first use.
    range: OnceLock<Option<(f32, f32)>>,

    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get_unchecked(&self, header: &Header, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let size = header.data_type.size();
                let start = header.header_offset + index * size;
                decode(
                    &raw.as_ref()[start..start + size],
                    header.data_type,
                    header.byte_order,
                )
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn decode(bytes: &[u8], data_type: DataType, byte_order: ByteOrder) -> f32 {
    match (data_type, byte_order) {
        (DataType::U8, _) => f32::from(bytes[0]),
        (DataType::I16, ByteOrder::Little) => f32::from(LE::read_i16(bytes)),
        (DataType::I16, ByteOrder::Big) => f32::from(BE::read_i16(bytes)),
        (DataType::U16, ByteOrder::Little) => f32::from(LE::read_u16(bytes)),
        (DataType::U16, ByteOrder::Big) => f32::from(BE::read_u16(bytes)),
        (DataType::I32, ByteOrder::Little) => LE::read_i32(bytes) as f32,
        (DataType::I32, ByteOrder::Big) => BE::read_i32(bytes) as f32,
        (DataType::F32, ByteOrder::Little) => LE::read_f32(bytes),
        (DataType::F32, ByteOrder::Big) => BE::read_f32(bytes),
        (DataType::F64, ByteOrder::Little) => LE::read_f64(bytes) as f32,
        (DataType::F64, ByteOrder::Big) => BE::read_f64(bytes) as f32,
    }
}

impl Raster {
    /// Returns a Raster read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BilError> {
        let header = Header::from_path(header_path(path.as_ref())?)?;
        let raw = fs::read(path.as_ref())?;
        check_len(&header, raw.len() as u64)?;
        let size = header.data_type.size();
        let samples: Box<[f32]> = raw[header.header_offset..]
            .chunks_exact(size)
            .take(header.samples * header.lines)
            .map(|bytes| decode(bytes, header.data_type, header.byte_order))
            .collect();
        debug!(
            "loaded {:?}; {}x{} {:?}",
            path.as_ref(),
            header.lines,
            header.samples,
            header.data_type
        );
        Ok(Self {
            header,
            range: OnceLock::new(),
            samples: SampleStore::InMem(samples),
        })
    }

    /// Returns a Raster using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, BilError> {
        let header = Header::from_path(header_path(path.as_ref())?)?;
        let file = File::open(path.as_ref())?;
        check_len(&header, file.metadata()?.len())?;
        let mmap = unsafe { Mmap::map(&file)? };
        debug!("mapped {:?}", path.as_ref());
        Ok(Self {
            header,
            range: OnceLock::new(),
            samples: SampleStore::MemMap(mmap),
        })
    }

    /// Returns an in-memory raster with `header`'s geometry.
    ///
    /// `samples` are row-major, north to south.
    pub fn from_samples(mut header: Header, samples: Vec<f32>) -> Result<Self, BilError> {
        let expected = header.samples * header.lines;
        if samples.len() != expected {
            return Err(BilError::Len {
                expected: expected as u64,
                actual: samples.len() as u64,
            });
        }
        header.data_type = DataType::F32;
        header.header_offset = 0;
        Ok(Self {
            header,
            range: OnceLock::new(),
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of (rows, columns).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.header.lines, self.header.samples)
    }

    /// Returns the number of samples in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.header.lines * self.header.samples
    }

    /// Returns the sample at (`row`, `col`), or `None` when outside
    /// the raster or equal to the no-data value.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let (rows, cols) = self.dimensions();
        if row < rows && col < cols {
            let value = self.samples.get_unchecked(&self.header, row * cols + col);
            self.valid(value)
        } else {
            None
        }
    }

    /// Returns the sample containing the map coordinate `coord`.
    pub fn get_coord(&self, coord: Coord<f64>) -> Option<f32> {
        let (row, col) = self.coord_to_rowcol(coord)?;
        self.get(row, col)
    }

    /// Converts a map coordinate to (row, col). Requires `map info`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn coord_to_rowcol(&self, coord: Coord<f64>) -> Option<(usize, usize)> {
        let MapInfo {
            upper_left,
            pixel_size: (dx, dy),
        } = self.header.map_info?;
        let col = ((coord.x - upper_left.x) / dx).floor();
        let row = ((upper_left.y - coord.y) / dy).floor();
        let (rows, cols) = self.dimensions();
        if row < 0.0 || col < 0.0 || row as usize >= rows || col as usize >= cols {
            None
        } else {
            Some((row as usize, col as usize))
        }
    }

    /// Map coordinate of the center of (`row`, `col`).
    #[allow(clippy::cast_precision_loss)]
    pub fn rowcol_to_coord(&self, row: usize, col: usize) -> Option<Coord<f64>> {
        let MapInfo {
            upper_left,
            pixel_size: (dx, dy),
        } = self.header.map_info?;
        Some(Coord {
            x: upper_left.x + (col as f64 + 0.5) * dx,
            y: upper_left.y - (row as f64 + 0.5) * dy,
        })
    }

    /// Returns the lowest valid sample in this raster.
    pub fn min(&self) -> Option<f32> {
        self.range().map(|(min, _)| min)
    }

    /// Returns the highest valid sample in this raster.
    pub fn max(&self) -> Option<f32> {
        self.range().map(|(_, max)| max)
    }

    /// Returns an iterator over `(row, col, value)` for valid samples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let cols = self.header.samples;
        (0..self.len()).filter_map(move |index| {
            let value = self.samples.get_unchecked(&self.header, index);
            self.valid(value).map(|v| (index / cols, index % cols, v))
        })
    }
}

/// Private API
impl Raster {
    #[allow(clippy::cast_possible_truncation)]
    fn valid(&self, value: f32) -> Option<f32> {
        match self.header.no_data {
            Some(no_data) if value == no_data as f32 => None,
            _ if value.is_nan() => None,
            _ => Some(value),
        }
    }

    fn range(&self) -> Option<(f32, f32)> {
        *self.range.get_or_init(|| {
            self.iter().fold(None, |range, (_, _, v)| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
        })
    }
}

/// Locates the header next to `data_path`, either `name.hdr` or
/// `name.bil.hdr`.
fn header_path(data_path: &Path) -> Result<PathBuf, BilError> {
    let replaced = data_path.with_extension("hdr");
    if replaced.exists() {
        return Ok(replaced);
    }
    let mut appended = data_path.as_os_str().to_owned();
    appended.push(".hdr");
    let appended = PathBuf::from(appended);
    if appended.exists() {
        Ok(appended)
    } else {
        Err(BilError::MissingHeader(data_path.to_owned()))
    }
}

fn check_len(header: &Header, actual: u64) -> Result<(), BilError> {
    let expected = header.data_len();
    if actual < expected {
        Err(BilError::Len { expected, actual })
    } else {
        Ok(())
    }
}

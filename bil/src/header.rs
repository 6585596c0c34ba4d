use crate::BilError;
use geo::geometry::Coord;
use std::{collections::HashMap, fs, mem::size_of, path::Path};

/// Sample encoding, numbered the way ENVI numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
}

impl DataType {
    pub fn from_code(code: u8) -> Result<Self, BilError> {
        match code {
            1 => Ok(Self::U8),
            2 => Ok(Self::I16),
            3 => Ok(Self::I32),
            4 => Ok(Self::F32),
            5 => Ok(Self::F64),
            12 => Ok(Self::U16),
            other => Err(BilError::DataType(other)),
        }
    }

    /// Bytes per sample.
    pub fn size(self) -> usize {
        match self {
            Self::U8 => size_of::<u8>(),
            Self::I16 => size_of::<i16>(),
            Self::U16 => size_of::<u16>(),
            Self::I32 => size_of::<i32>(),
            Self::F32 => size_of::<f32>(),
            Self::F64 => size_of::<f64>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Georeferencing from the `map info` key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapInfo {
    /// Outer corner of the upper-left pixel.
    pub upper_left: Coord<f64>,

    /// Pixel size in map units, (x, y).
    pub pixel_size: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Number of columns.
    pub samples: usize,

    /// Number of rows.
    pub lines: usize,

    pub data_type: DataType,

    pub byte_order: ByteOrder,

    /// Bytes to skip at the start of the data file.
    pub header_offset: usize,

    pub map_info: Option<MapInfo>,

    /// Samples equal to this value are treated as missing.
    pub no_data: Option<f64>,
}

impl Header {
    /// Reads and parses the header at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BilError> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Expected size of the accompanying data file.
    pub fn data_len(&self) -> u64 {
        (self.header_offset + self.samples * self.lines * self.data_type.size()) as u64
    }
}

impl std::str::FromStr for Header {
    type Err = BilError;

    fn from_str(text: &str) -> Result<Self, BilError> {
        let fields = fields(text);

        let samples = parse_key(&fields, "samples")?;
        let lines = parse_key(&fields, "lines")?;
        let bands: usize = parse_key_or(&fields, "bands", 1)?;
        if bands != 1 {
            return Err(BilError::Bands(bands));
        }
        let data_type = DataType::from_code(parse_key(&fields, "data type")?)?;
        let byte_order = match parse_key_or::<u8>(&fields, "byte order", 0)? {
            0 => ByteOrder::Little,
            1 => ByteOrder::Big,
            other => {
                return Err(BilError::HeaderValue {
                    key: "byte order",
                    value: other.to_string(),
                })
            }
        };
        let header_offset = parse_key_or(&fields, "header offset", 0)?;
        let map_info = fields
            .get("map info")
            .map(|value| parse_map_info(value))
            .transpose()?;
        let no_data = fields
            .get("data ignore value")
            .map(|value| {
                value.trim().parse::<f64>().map_err(|_| BilError::HeaderValue {
                    key: "data ignore value",
                    value: value.clone(),
                })
            })
            .transpose()?;

        Ok(Self {
            samples,
            lines,
            data_type,
            byte_order,
            header_offset,
            map_info,
            no_data,
        })
    }
}

/// Splits header text into `key = value` pairs. Values wrapped in
/// braces may span several lines.
fn fields(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut pending: Option<(String, String)> = None;

    for line in text.lines() {
        if let Some((key, mut value)) = pending.take() {
            value.push(' ');
            value.push_str(line.trim());
            if line.contains('}') {
                fields.insert(key, strip_braces(&value));
            } else {
                pending = Some((key, value));
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();
        if value.starts_with('{') && !value.contains('}') {
            pending = Some((key, value));
        } else {
            fields.insert(key, strip_braces(&value));
        }
    }

    fields
}

fn strip_braces(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_string()
}

fn parse_key<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    key: &'static str,
) -> Result<T, BilError> {
    let value = fields.get(key).ok_or(BilError::HeaderKey(key))?;
    value.parse().map_err(|_| BilError::HeaderValue {
        key,
        value: value.clone(),
    })
}

fn parse_key_or<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, BilError> {
    if fields.contains_key(key) {
        parse_key(fields, key)
    } else {
        Ok(default)
    }
}

/// `{projection, ref x, ref y, easting, northing, dx, dy, ...}`
///
/// Reference pixel coordinates are 1-based and refer to the pixel's
/// upper-left corner.
fn parse_map_info(value: &str) -> Result<MapInfo, BilError> {
    let mk_err = || BilError::HeaderValue {
        key: "map info",
        value: value.to_string(),
    };
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() < 7 {
        return Err(mk_err());
    }
    let num = |idx: usize| parts[idx].parse::<f64>().map_err(|_| mk_err());
    let (ref_x, ref_y) = (num(1)?, num(2)?);
    let (easting, northing) = (num(3)?, num(4)?);
    let (dx, dy) = (num(5)?, num(6)?);
    if dx <= 0.0 || dy <= 0.0 {
        return Err(mk_err());
    }
    Ok(MapInfo {
        upper_left: Coord {
            x: easting - (ref_x - 1.0) * dx,
            y: northing + (ref_y - 1.0) * dy,
        },
        pixel_size: (dx, dy),
    })
}

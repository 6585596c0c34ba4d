use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BilError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no ENVI header found for {0}")]
    MissingHeader(PathBuf),

    #[error("ENVI header is missing required key '{0}'")]
    HeaderKey(&'static str),

    #[error("invalid value for ENVI header key '{key}': {value}")]
    HeaderValue { key: &'static str, value: String },

    #[error("unsupported ENVI data type {0}")]
    DataType(u8),

    #[error("only single band rasters are supported, found {0} bands")]
    Bands(usize),

    #[error("invalid raster file len, expected {expected} bytes, found {actual}")]
    Len { expected: u64, actual: u64 },
}

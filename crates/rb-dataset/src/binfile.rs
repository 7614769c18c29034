//! BIN sequential value files: the engine's time series input format.
//!
//! Layout (little-endian): a 12-byte header of three `i32` (`3319, 0, 0`),
//! then one 12-byte record per point, an `f64` engine time followed by an
//! `f32` value.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rb_core::{ENGINE_MISSING_VALUE, is_engine_missing};
use rb_model::Point;

use crate::format::{from_engine_hours, to_engine_hours};
use crate::{DatasetError, DatasetResult, io_error};

pub const BIN_MAGIC: i32 = 3319;
const HEADER_LEN: u64 = 12;
const RECORD_LEN: u64 = 12;

/// Write `points` as a BIN file, replacing any existing file.
///
/// `NaN` values are stored as the engine's missing value marker. The file is
/// flushed to disk before returning.
pub fn write_bin(path: &Path, points: &[Point]) -> DatasetResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);

    let mut write = || -> std::io::Result<()> {
        out.write_i32::<LittleEndian>(BIN_MAGIC)?;
        out.write_i32::<LittleEndian>(0)?;
        out.write_i32::<LittleEndian>(0)?;
        for point in points {
            let value = if point.value.is_nan() {
                ENGINE_MISSING_VALUE
            } else {
                point.value
            };
            out.write_f64::<LittleEndian>(to_engine_hours(point.timestamp))?;
            out.write_f32::<LittleEndian>(value as f32)?;
        }
        out.flush()?;
        out.get_ref().sync_all()
    };
    write().map_err(io_error(path))
}

/// Read all points of a BIN file. Missing value markers become `NaN`.
pub fn read_bin(path: &Path) -> DatasetResult<Vec<Point>> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let len = bytes.len() as u64;
    if len < HEADER_LEN || (len - HEADER_LEN) % RECORD_LEN != 0 {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            len,
        });
    }

    let count = ((len - HEADER_LEN) / RECORD_LEN) as usize;
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(HEADER_LEN);

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let hours = cursor
            .read_f64::<LittleEndian>()
            .map_err(io_error(path))?;
        let raw = cursor
            .read_f32::<LittleEndian>()
            .map_err(io_error(path))? as f64;
        let timestamp = from_engine_hours(hours).ok_or_else(|| DatasetError::InvalidTimestamp {
            path: path.to_path_buf(),
            hours,
        })?;
        let value = if is_engine_missing(raw) { f64::NAN } else { raw };
        points.push(Point { timestamp, value });
    }
    Ok(points)
}

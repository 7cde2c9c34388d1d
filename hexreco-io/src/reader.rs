//! Hit file readers.
//!
//! Binary files are a flat array of 24-byte little-endian records:
//!
//! | offset | type | field     |
//! |--------|------|-----------|
//! | 0      | u32  | event     |
//! | 4      | i16  | layer     |
//! | 6      | i16  | sensor u  |
//! | 8      | i16  | sensor v  |
//! | 10     | i16  | cell u    |
//! | 12     | i16  | cell v    |
//! | 14     | u8   | cell type |
//! | 15     | u8   | reserved  |
//! | 16     | f64  | energy    |

use crate::{Error, Result};
use hexreco_core::{CellAddress, CellType, Event, RawHit, RecHit};
use log::debug;
use memmap2::Mmap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Size of one binary hit record in bytes.
pub const RECORD_SIZE: usize = 24;

/// Header line of CSV hit files.
pub const CSV_HEADER: &str = "event,layer,sensor_u,sensor_v,cell_u,cell_v,cell_type,energy";

/// A hit tagged with its event number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Event number.
    pub event: u32,
    /// The hit.
    pub hit: RawHit,
}

impl RecHit for HitRecord {
    fn address(&self) -> CellAddress {
        self.hit.address
    }

    fn cell_type(&self) -> CellType {
        self.hit.cell_type
    }

    fn energy(&self) -> f64 {
        self.hit.energy
    }
}

/// A memory-mapped file reader.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and is not expected to change
        // while mapped.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::MmapError(format!("{}: {e}", path.display())))?;
        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decodes one binary hit record.
#[must_use]
pub fn decode_record(bytes: &[u8; RECORD_SIZE]) -> HitRecord {
    let i16_at = |offset: usize| i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
    let mut energy = [0u8; 8];
    energy.copy_from_slice(&bytes[16..24]);

    HitRecord {
        event: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        hit: RawHit::new(
            CellAddress::new(i16_at(4), i16_at(6), i16_at(8), i16_at(10), i16_at(12)),
            CellType(bytes[14]),
            f64::from_le_bytes(energy),
        ),
    }
}

/// A binary hit file with memory-mapped I/O.
pub struct HitFileReader {
    reader: MappedFileReader,
}

impl HitFileReader {
    /// Opens a binary hit file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Returns the number of complete records in the file.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.reader.len() / RECORD_SIZE
    }

    /// Decodes every record, in file order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the file ends in a partial record.
    pub fn read_records(&self) -> Result<Vec<HitRecord>> {
        if !self.reader.len().is_multiple_of(RECORD_SIZE) {
            return Err(Error::InvalidFormat(format!(
                "file size {} is not a multiple of {RECORD_SIZE} (file: {})",
                self.reader.len(),
                self.reader.path().display()
            )));
        }

        let records: Vec<HitRecord> = self
            .reader
            .as_bytes()
            .par_chunks_exact(RECORD_SIZE)
            .map(|chunk| {
                let mut bytes = [0u8; RECORD_SIZE];
                bytes.copy_from_slice(chunk);
                decode_record(&bytes)
            })
            .collect();

        debug!(
            "read {} records from {}",
            records.len(),
            self.reader.path().display()
        );
        Ok(records)
    }

    /// Decodes the file and groups the hits by event.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the file ends in a partial record.
    pub fn read_events(&self) -> Result<Vec<Event>> {
        Ok(group_events(self.read_records()?))
    }
}

/// One row of a CSV hit file; field order follows [`CSV_HEADER`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct CsvHitRow {
    event: u32,
    layer: i16,
    sensor_u: i16,
    sensor_v: i16,
    cell_u: i16,
    cell_v: i16,
    cell_type: u8,
    energy: f64,
}

impl From<&HitRecord> for CsvHitRow {
    fn from(record: &HitRecord) -> Self {
        let address = record.hit.address;
        Self {
            event: record.event,
            layer: address.layer,
            sensor_u: address.sensor_u,
            sensor_v: address.sensor_v,
            cell_u: address.cell_u,
            cell_v: address.cell_v,
            cell_type: record.hit.cell_type.0,
            energy: record.hit.energy,
        }
    }
}

impl From<CsvHitRow> for HitRecord {
    fn from(row: CsvHitRow) -> Self {
        Self {
            event: row.event,
            hit: RawHit::new(
                CellAddress::new(row.layer, row.sensor_u, row.sensor_v, row.cell_u, row.cell_v),
                CellType(row.cell_type),
                row.energy,
            ),
        }
    }
}

/// Reads a CSV hit file with a [`CSV_HEADER`] header line.
///
/// Fields may be quoted and surrounding whitespace is ignored.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for a missing header or a malformed row.
pub fn read_csv_records<P: AsRef<Path>>(path: P) -> Result<Vec<HitRecord>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);

    let header = reader.headers().map_err(|e| csv_error(path, &e))?;
    if !header.iter().eq(CSV_HEADER.split(',')) {
        return Err(Error::InvalidFormat(format!(
            "{}: expected header '{CSV_HEADER}', found '{}'",
            path.display(),
            header.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let records = reader
        .deserialize::<CsvHitRow>()
        .map(|row| row.map(HitRecord::from).map_err(|e| csv_error(path, &e)))
        .collect::<Result<Vec<_>>>()?;
    debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn csv_error(path: &Path, err: &csv::Error) -> Error {
    match err.position() {
        Some(position) => {
            Error::InvalidFormat(format!("{}:{}: {err}", path.display(), position.line()))
        }
        None => Error::InvalidFormat(format!("{}: {err}", path.display())),
    }
}

/// Reads a hit file, choosing the format from the extension (`.csv` or binary).
///
/// # Errors
/// Returns the error of the underlying reader.
pub fn read_hit_records<P: AsRef<Path>>(path: P) -> Result<Vec<HitRecord>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_csv_records(path)
    } else {
        HitFileReader::open(path)?.read_records()
    }
}

/// Groups records into events, keeping the order in which events first appear.
#[must_use]
pub fn group_events(records: Vec<HitRecord>) -> Vec<Event> {
    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut sizes: Vec<(u32, usize)> = Vec::new();
    for record in &records {
        let slot = *index.entry(record.event).or_insert_with(|| {
            sizes.push((record.event, 0));
            sizes.len() - 1
        });
        sizes[slot].1 += 1;
    }

    let mut events: Vec<Event> = sizes
        .into_iter()
        .map(|(id, size)| Event::with_capacity(id, size))
        .collect();
    for record in records {
        events[index[&record.event]].push(record.hit);
    }
    events
}

//! hexreco-io: File I/O for hexreco.
//!
//! This crate provides memory-mapped reading of binary hit files, CSV hit
//! files, writers for reconstruction results and JSON configuration loading.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{config_from_json, load_config};
pub use error::{Error, Result};
pub use reader::{
    decode_record, group_events, read_csv_records, read_hit_records, HitFileReader, HitRecord,
    MappedFileReader, CSV_HEADER, RECORD_SIZE,
};
pub use writer::{encode_record, DataFileWriter};

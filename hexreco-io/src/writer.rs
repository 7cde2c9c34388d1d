//! File writers for hits and reconstruction results.

use crate::reader::{CsvHitRow, HitRecord, CSV_HEADER, RECORD_SIZE};
use crate::Result;
use hexreco_algorithms::{EventReconstruction, ReconstructionStatistics};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encodes one hit as a binary record.
#[must_use]
pub fn encode_record(record: &HitRecord) -> [u8; RECORD_SIZE] {
    let address = record.hit.address;
    let mut bytes = [0u8; RECORD_SIZE];
    bytes[0..4].copy_from_slice(&record.event.to_le_bytes());
    for (slot, value) in [
        address.layer,
        address.sensor_u,
        address.sensor_v,
        address.cell_u,
        address.cell_v,
    ]
    .into_iter()
    .enumerate()
    {
        let offset = 4 + 2 * slot;
        bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
    bytes[14] = record.hit.cell_type.0;
    bytes[16..24].copy_from_slice(&record.hit.energy.to_le_bytes());
    bytes
}

/// Writer for hit files and reconstruction output.
pub struct DataFileWriter {
    writer: BufWriter<File>,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes one row per reconstructed layer.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_positions_csv(&mut self, results: &[EventReconstruction]) -> Result<()> {
        writeln!(self.writer, "event,layer,z,x,y,x_err,y_err,n_hits")?;

        for result in results {
            for layer in &result.layers {
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{},{}",
                    result.event,
                    layer.layer,
                    layer.z,
                    layer.position.0,
                    layer.position.1,
                    layer.error.0,
                    layer.error.1,
                    layer.n_hits
                )?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the track position of every event at each probe depth.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_tracks_csv(
        &mut self,
        results: &[EventReconstruction],
        probe_z: &[f64],
    ) -> Result<()> {
        writeln!(self.writer, "event,method,z,x,y")?;

        for result in results {
            let method = result.outcome.applied_method();
            for (z, x, y) in result.probe(probe_z) {
                writeln!(self.writer, "{},{},{},{},{}", result.event, method, z, x, y)?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes hits as a CSV hit file.
    ///
    /// # Errors
    /// Returns an error on serialization or write failure.
    pub fn write_hits_csv(&mut self, records: &[HitRecord]) -> Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.writer);
        csv.write_record(CSV_HEADER.split(','))?;
        for record in records {
            csv.serialize(CsvHitRow::from(record))?;
        }
        csv.flush()?;
        drop(csv);

        self.writer.flush()?;
        Ok(())
    }

    /// Writes hits as binary records.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_hits_binary(&mut self, records: &[HitRecord]) -> Result<()> {
        for record in records {
            self.writer.write_all(&encode_record(record))?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes run statistics as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error on serialization or write failure.
    pub fn write_statistics_json(&mut self, stats: &ReconstructionStatistics) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, stats)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{decode_record, read_csv_records};
    use hexreco_algorithms::{reconstruct_event, ReconstructionConfig};
    use hexreco_core::{CellAddress, CellType, Event, HexagonalGeometry, RawHit, SensorConfig};
    use tempfile::NamedTempFile;

    fn record(event: u32, layer: i16, energy: f64) -> HitRecord {
        HitRecord {
            event,
            hit: RawHit::new(CellAddress::new(layer, 1, -1, 2, -3), CellType::OUTER, energy),
        }
    }

    fn straight_result() -> EventReconstruction {
        let mut event = Event::new(42);
        for layer in 1..=3 {
            event.push(RawHit::new(
                CellAddress::on_central_sensor(layer, 0, 0),
                CellType::FULL,
                100.0,
            ));
        }
        let config = ReconstructionConfig::new()
            .with_sensor(SensorConfig::new().with_pedestal_threshold(0.0))
            .with_layer_pitch(10.0);
        reconstruct_event(&event, &HexagonalGeometry::new(), &config).unwrap()
    }

    #[test]
    fn test_encode_matches_decode() {
        let original = record(7, -2, 33.5);
        let decoded = decode_record(&encode_record(&original));
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_write_hits_binary() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        writer
            .write_hits_binary(&[record(1, 1, 10.0), record(1, 2, 20.0)])
            .unwrap();

        let data = std::fs::read(file.path()).unwrap();
        assert_eq!(data.len(), 2 * RECORD_SIZE);
        assert_eq!(data[15], 0);
    }

    #[test]
    fn test_write_hits_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        let records = [record(3, 4, 12.5), record(3, 5, 0.25)];
        writer.write_hits_csv(&records).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "3,4,1,-1,2,-3,4,12.5");
        assert_eq!(read_csv_records(file.path()).unwrap(), records);
    }

    #[test]
    fn test_write_hits_csv_empty_keeps_header() {
        let file = NamedTempFile::new().unwrap();
        DataFileWriter::create(file.path())
            .unwrap()
            .write_hits_csv(&[])
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.trim_end(), CSV_HEADER);
        assert!(read_csv_records(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_write_positions_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        writer.write_positions_csv(&[straight_result()]).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "event,layer,z,x,y,x_err,y_err,n_hits");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "42,1,10,0,0,0,0,1");
    }

    #[test]
    fn test_write_tracks_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        writer
            .write_tracks_csv(&[straight_result()], &[0.0, 50.0])
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "event,method,z,x,y");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("42,line,0,"));
        assert!(lines[2].starts_with("42,line,50,"));
    }

    #[test]
    fn test_write_statistics_json() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        let stats = ReconstructionStatistics::from_results(&[straight_result()]);
        writer.write_statistics_json(&stats).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(value["events"], 1);
        assert_eq!(value["layers"], 3);
        assert_eq!(value["fit_fallbacks"], 0);
    }
}

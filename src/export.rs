//! CSV export sink: flattens samples into `timestamp,id,unit,value` rows.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::types::{Metric, Sample};

const HEADER: &str = "timestamp,id,unit,value";

/// Append-mode writer for the durable measurement log.
///
/// Each sample flattens to one row per rail per metric, in the window's
/// row granularity: `U` then `I` then `P` for PCIE1, PCIE2, EPS1, EPS2.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Open (or create) the log at `path`. The header is written only when
    /// the file is new or empty, so restarts keep appending to one log.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{HEADER}")?;
        }
        info!("appending measurements to {}", path.display());
        Ok(Self { writer })
    }

    /// Append one sample's rows and flush them to disk.
    pub fn append(&mut self, sample: &Sample) -> io::Result<()> {
        let timestamp = sample.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        for reading in &sample.readings {
            for metric in Metric::ALL {
                writeln!(
                    self.writer,
                    "{},{},{},{:.3}",
                    timestamp,
                    reading.rail,
                    metric.unit_letter(),
                    reading.value(metric)
                )?;
            }
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rail, Reading, Sample};
    use crate::window::ROWS_PER_SAMPLE;
    use chrono::Local;
    use std::path::PathBuf;

    fn sample() -> Sample {
        let readings = std::array::from_fn(|i| Reading::from_scaled(Rail::ALL[i], 12.0, 1.5));
        Sample::new(Local::now(), readings)
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pmdmon-{}-{}.csv", tag, std::process::id()))
    }

    #[test]
    fn writes_header_once_across_reopens() {
        let path = temp_path("header");
        let _ = std::fs::remove_file(&path);

        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.append(&sample()).unwrap();
        }
        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.append(&sample()).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * ROWS_PER_SAMPLE);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.iter().filter(|l| **l == HEADER).count(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rows_follow_the_original_column_order() {
        let path = temp_path("rows");
        let _ = std::fs::remove_file(&path);

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&sample()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows.len(), ROWS_PER_SAMPLE);

        // First rail flattens as U, I, P with derived power.
        assert!(rows[0].ends_with(",PCIE1,U,12.000"), "row: {}", rows[0]);
        assert!(rows[1].ends_with(",PCIE1,I,1.500"), "row: {}", rows[1]);
        assert!(rows[2].ends_with(",PCIE1,P,18.000"), "row: {}", rows[2]);
        assert!(rows[3].contains(",PCIE2,U,"), "row: {}", rows[3]);

        std::fs::remove_file(&path).unwrap();
    }
}

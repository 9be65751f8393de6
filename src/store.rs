use crate::error::{FuelError, Result};
use crate::model::Reading;
use chrono::NaiveDateTime;
use scopeguard::{ScopeGuard, guard};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const LOG_FILENAME: &str = "fuel.csv";
pub const CURRENT_FILENAME: &str = "currprices.csv";
pub const PREVIOUS_FILENAME: &str = "prevprices.csv";
const LOCK_FILENAME: &str = ".fuel.lock";

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Current,
    Previous,
}

/// Held while a run touches the log directory. The lock file itself stays in place; the OS
/// drops the advisory lock on unlock or when the process dies.
pub type StoreLock = ScopeGuard<File, fn(File)>;

fn release_lock(file: File) {
    if let Err(err) = file.unlock() {
        log::warn!("Failed to release store lock: {}", err);
    }
}

/// Append-only price log plus the current/previous snapshot pair.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILENAME)
    }

    pub fn snapshot_path(&self, which: Snapshot) -> PathBuf {
        match which {
            Snapshot::Current => self.dir.join(CURRENT_FILENAME),
            Snapshot::Previous => self.dir.join(PREVIOUS_FILENAME),
        }
    }

    pub fn lock(&self) -> Result<StoreLock> {
        let path = self.dir.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| FuelError::io(&path, err))?;

        match file.try_lock() {
            Ok(()) => {
                log::debug!("acquired {}", path.display());
                Ok(guard(file, release_lock as fn(File)))
            }
            Err(TryLockError::WouldBlock) => Err(FuelError::Locked(path)),
            Err(TryLockError::Error(err)) => Err(FuelError::io(path, err)),
        }
    }

    pub fn append_reading(&self, reading: &Reading) -> Result<()> {
        let path = self.log_path();
        let line = encode_line(reading, &path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| FuelError::io(&path, err))?;
        // single write so a failure can't interleave with earlier lines
        file.write_all(&line).map_err(|err| FuelError::io(&path, err))?;
        log::debug!("appended {} prices to {}", reading.prices.len(), path.display());
        Ok(())
    }

    pub fn rotate_snapshot(&self, reading: &Reading) -> Result<()> {
        let current = self.snapshot_path(Snapshot::Current);
        let previous = self.snapshot_path(Snapshot::Previous);

        if current.exists() {
            fs::copy(&current, &previous).map_err(|err| FuelError::io(&previous, err))?;
            log::debug!("copied {} to {}", current.display(), previous.display());
        }

        let line = encode_line(reading, &current)?;
        fs::write(&current, line).map_err(|err| FuelError::io(&current, err))?;
        Ok(())
    }

    pub fn read_snapshot(&self, which: Snapshot) -> Result<Reading> {
        let path = self.snapshot_path(which);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FuelError::NotFound(path));
            }
            Err(err) => return Err(FuelError::io(&path, err)),
        };

        let mut reader = reader_builder().from_reader(content.as_slice());
        let record = match reader.records().next() {
            Some(record) => record.map_err(|err| FuelError::parse(&path, err.to_string()))?,
            None => return Err(FuelError::parse(&path, "empty snapshot")),
        };
        decode_record(&record).map_err(|reason| FuelError::parse(&path, reason))
    }
}

/// One row of the price log with its timestamp parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub time: NaiveDateTime,
    pub reading: Reading,
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Loads every readable row of a price log. Rows may carry different station counts;
/// rows that don't parse are skipped with a warning.
pub fn load_log(path: &Path) -> Result<Vec<LogRow>> {
    let file = fs::File::open(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => FuelError::NotFound(path.to_path_buf()),
        _ => FuelError::io(path, err),
    })?;

    let mut rows = Vec::new();
    for (index, record) in reader_builder().from_reader(file).records().enumerate() {
        let line = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::warn!("{}:{}: skipped: {}", path.display(), line, err);
                continue;
            }
        };
        let reading = match decode_record(&record) {
            Ok(reading) => reading,
            Err(reason) => {
                log::warn!("{}:{}: skipped: {}", path.display(), line, reason);
                continue;
            }
        };
        let Some(time) = parse_timestamp(&reading.timestamp) else {
            log::warn!(
                "{}:{}: skipped: bad timestamp {:?}",
                path.display(),
                line,
                reading.timestamp
            );
            continue;
        };
        rows.push(LogRow { time, reading });
    }
    Ok(rows)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

fn encode_line(reading: &Reading, path: &Path) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut record = Vec::with_capacity(reading.prices.len() + 1);
    record.push(reading.timestamp.clone());
    record.extend(reading.prices.iter().map(|p| p.to_string()));
    writer
        .write_record(&record)
        .map_err(|err| FuelError::parse(path, err.to_string()))?;
    writer
        .into_inner()
        .map_err(|err| FuelError::parse(path, err.to_string()))
}

fn decode_record(record: &csv::StringRecord) -> std::result::Result<Reading, String> {
    let mut fields = record.iter();
    let timestamp = match fields.next() {
        Some(ts) if !ts.is_empty() => ts.to_string(),
        _ => return Err("missing timestamp".to_string()),
    };

    let mut prices = Vec::with_capacity(record.len().saturating_sub(1));
    for field in fields {
        // trailing commas from older writers
        if field.is_empty() {
            continue;
        }
        let price: f64 = field
            .parse()
            .map_err(|_| format!("bad price {:?}", field))?;
        prices.push(price);
    }
    if prices.is_empty() {
        return Err("no prices".to_string());
    }
    Ok(Reading { timestamp, prices })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: &str, prices: &[f64]) -> Reading {
        Reading::new(ts, prices.to_vec())
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        let original = reading("2024-11-22T08:00:05", &[160.9, 161.9, 163.9, 0.1 + 0.2]);

        store.rotate_snapshot(&original).unwrap();
        let restored = store.read_snapshot(Snapshot::Current).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn first_rotation_has_no_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        store.rotate_snapshot(&reading("2024-11-22T08:00:05", &[160.9])).unwrap();

        assert!(matches!(
            store.read_snapshot(Snapshot::Previous),
            Err(FuelError::NotFound(_))
        ));
    }

    #[test]
    fn second_rotation_demotes_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        let first = reading("2024-11-22T08:00:05", &[160.9, 161.9]);
        let second = reading("2024-11-22T12:00:04", &[162.9, 163.9]);

        store.rotate_snapshot(&first).unwrap();
        store.rotate_snapshot(&second).unwrap();

        assert_eq!(store.read_snapshot(Snapshot::Previous).unwrap(), first);
        assert_eq!(store.read_snapshot(Snapshot::Current).unwrap(), second);
        let current = fs::read_to_string(store.snapshot_path(Snapshot::Current)).unwrap();
        assert_eq!(current, "2024-11-22T12:00:04,162.9,163.9\n");
    }

    #[test]
    fn append_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        store.append_reading(&reading("2024-11-22T08:00:05", &[160.9, 161.9, 163.9])).unwrap();
        store.append_reading(&reading("2024-11-22T12:00:04", &[160.9, 170.5])).unwrap();

        let log = fs::read_to_string(store.log_path()).unwrap();
        let expected = "2024-11-22T08:00:05,160.9,161.9,163.9\n\
                        2024-11-22T12:00:04,160.9,170.5\n";
        assert_eq!(log, expected);
    }

    #[test]
    fn append_to_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("missing"));
        assert!(matches!(
            store.append_reading(&reading("t", &[1.0])),
            Err(FuelError::Io { .. })
        ));
    }

    #[test]
    fn corrupt_snapshot_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        for content in ["", "2024-11-22T08:00:05\n", "2024-11-22T08:00:05,abc,161.9\n"] {
            fs::write(store.snapshot_path(Snapshot::Current), content).unwrap();
            assert!(
                matches!(
                    store.read_snapshot(Snapshot::Current),
                    Err(FuelError::Parse { .. })
                ),
                "{:?}",
                content
            );
        }
    }

    #[test]
    fn legacy_spaced_snapshot_parses() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        fs::write(
            store.snapshot_path(Snapshot::Previous),
            "2019-05-01T06:00:01, 145.9, 147.9\n",
        )
        .unwrap();

        let restored = store.read_snapshot(Snapshot::Previous).unwrap();
        assert_eq!(restored, reading("2019-05-01T06:00:01", &[145.9, 147.9]));
    }

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let held = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(FuelError::Locked(_))));
        drop(held);
        assert!(store.lock().is_ok());
        assert!(dir.path().join(LOCK_FILENAME).exists());
    }

    #[test]
    fn load_log_handles_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(
            &path,
            "2023-01-01 00:00,150.1,155.2\n2023-01-01 01:00,151.1,156.2,1.2\n",
        )
        .unwrap();

        let rows = load_log(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reading.prices, vec![150.1, 155.2]);
        assert_eq!(rows[1].reading.prices, vec![151.1, 156.2, 1.2]);
        assert_eq!(
            rows[1].time,
            NaiveDateTime::parse_from_str("2023-01-01 01:00", "%Y-%m-%d %H:%M").unwrap()
        );
    }

    #[test]
    fn load_log_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuel.csv");
        fs::write(
            &path,
            "2024-11-22T08:00:05,160.9,161.9\n\
             yesterday,150.0\n\
             2024-11-22T12:00:04,x\n\
             2024-11-23T08:00:02,170.5\n",
        )
        .unwrap();

        let rows = load_log(&path).unwrap();
        let stamps: Vec<_> = rows.iter().map(|r| r.reading.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["2024-11-22T08:00:05", "2024-11-23T08:00:02"]);
    }

    #[test]
    fn load_missing_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_log(&dir.path().join("nope.csv")),
            Err(FuelError::NotFound(_))
        ));
    }
}

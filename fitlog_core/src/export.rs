//! CSV export of summaries and raw entries.
//!
//! Files are written to a temp file next to the target and renamed into
//! place once fully synced, so a failed export never leaves half a file.

use crate::{DaySummary, Error, LogEntry, Result};
use std::path::Path;
use tempfile::NamedTempFile;

const SUMMARY_HEADERS: [&str; 7] = [
    "date",
    "total_calories",
    "total_burned",
    "total_protein",
    "total_carbs",
    "total_fats",
    "total_sleep",
];

const ENTRY_HEADERS: [&str; 10] = [
    "id",
    "timestamp",
    "kind",
    "description",
    "calories",
    "protein",
    "carbs",
    "fats",
    "sleep_hours",
    "duration_minutes",
];

/// A row in the entries CSV; field order matches [`ENTRY_HEADERS`]
#[derive(Debug, serde::Serialize)]
struct EntryRow<'a> {
    id: &'a str,
    timestamp: String,
    kind: &'static str,
    description: &'a str,
    calories: f64,
    protein: f64,
    carbs: f64,
    fats: f64,
    sleep_hours: f64,
    duration_minutes: f64,
}

impl<'a> From<&'a LogEntry> for EntryRow<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        let m = &entry.measures;
        EntryRow {
            id: &entry.id,
            timestamp: entry.timestamp.to_rfc3339(),
            kind: entry.kind.as_str(),
            description: &entry.description,
            calories: m.calories,
            protein: m.protein,
            carbs: m.carbs,
            fats: m.fats,
            sleep_hours: m.sleep_hours,
            duration_minutes: m.duration_minutes,
        }
    }
}

/// Write one row per day. Returns the number of rows written.
pub fn export_summaries(path: &Path, summaries: &[DaySummary]) -> Result<usize> {
    write_atomically(path, &SUMMARY_HEADERS, |writer| {
        for summary in summaries {
            writer.serialize(summary)?;
        }
        Ok(summaries.len())
    })
}

/// Write one row per log entry. Returns the number of rows written.
pub fn export_entries<'a, I>(path: &Path, entries: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    write_atomically(path, &ENTRY_HEADERS, |writer| {
        let mut count = 0;
        for entry in entries {
            writer.serialize(EntryRow::from(entry))?;
            count += 1;
        }
        Ok(count)
    })
}

/// The header row is written up front so an export with no rows still
/// carries it.
fn write_atomically<F>(path: &Path, headers: &[&str], write_rows: F) -> Result<usize>
where
    F: FnOnce(&mut csv::Writer<&std::fs::File>) -> Result<usize>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let count = {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());
        writer.write_record(headers)?;
        let count = write_rows(&mut writer)?;
        writer.flush()?;
        count
    };

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} rows to {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{summarize, DateWindow};
    use crate::{LogKind, Measures};
    use chrono::{DateTime, NaiveDate};

    fn entries() -> Vec<LogEntry> {
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap();
        vec![
            LogEntry::new(
                LogKind::Meal,
                "pasta, with sauce",
                Measures {
                    calories: 650.0,
                    carbs: 90.0,
                    ..Measures::default()
                },
                at("2024-03-01T13:00:00+01:00"),
            ),
            LogEntry::new(
                LogKind::Sleep,
                "night",
                Measures {
                    sleep_hours: 7.0,
                    ..Measures::default()
                },
                at("2024-03-02T07:00:00+01:00"),
            ),
        ]
    }

    #[test]
    fn test_export_summaries_one_row_per_day() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out").join("summary.csv");

        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let summaries = summarize(&entries(), DateWindow::trailing(end, 3).unwrap());
        let count = export_summaries(&path, &summaries).unwrap();
        assert_eq!(count, 3);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "date");
        assert_eq!(&headers[2], "total_burned");

        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][0], "2024-03-01");
        assert_eq!(&rows[1][1], "650.0");
    }

    #[test]
    fn test_export_entries_quotes_descriptions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("entries.csv");

        let count = export_entries(&path, &entries()).unwrap();
        assert_eq!(count, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][2], "meal");
        assert_eq!(&rows[0][3], "pasta, with sauce");
        assert_eq!(&rows[1][8], "7.0");
    }

    #[test]
    fn test_empty_exports_keep_header() {
        let temp_dir = tempfile::tempdir().unwrap();

        let path = temp_dir.path().join("entries.csv");
        let count = export_entries(&path, &Vec::<LogEntry>::new()).unwrap();
        assert_eq!(count, 0);
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![ENTRY_HEADERS.join(",")]);

        let path = temp_dir.path().join("summary.csv");
        export_summaries(&path, &[]).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<&str> = reader.headers().unwrap().iter().collect();
        assert_eq!(headers, SUMMARY_HEADERS);
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn test_export_overwrites_previous_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("entries.csv");

        export_entries(&path, &entries()).unwrap();
        export_entries(&path, &entries()[..1]).unwrap();

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 1);
    }
}

//! src/record.rs
//!
//! Saved chart records: one plain-text file per chart.
//!
//! ```text
//! <description line>
//! <x>,<y>          x with 6 decimals, y with 4
//! ...
//! ```
//!
//! Files are named after the local save time, `yyyy.MM.dd HH:mm:ss[ tag].txt`.
//! A save never overwrites: a name already taken gets ` (2)`, ` (3)`, ...
//! before the extension. Fields after the second on a data line are ignored.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{info, warn};
use thiserror::Error;

use crate::chart::Sample;

/// Default directory records are written to and browsed from.
pub const RECORDS_DIR: &str = "SensorRecords";

const EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no data to save")]
    NoData,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: empty record", path.display())]
    Empty { path: PathBuf },
    #[error("{}: line {line} is not `x,y`: {content:?}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

impl RecordError {
    fn io(path: &Path, source: io::Error) -> Self {
        RecordError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A chart loaded back from disk. Never mutated after load.
#[derive(Clone, Debug)]
pub struct SavedChart {
    /// File name without the `.txt` extension.
    pub name: String,
    /// First line of the file.
    pub label: String,
    pub samples: Vec<Sample>,
}

/// Result of scanning the records directory: the charts that loaded, plus a
/// per-file error for each one that did not.
#[derive(Debug, Default)]
pub struct SavedCharts {
    pub charts: Vec<SavedChart>,
    pub failures: Vec<RecordError>,
}

/// File name of a record without its extension,
/// `yyyy.MM.dd HH:mm:ss[ tag]`. Path separators in the tag become `_`.
fn record_stem(at: &DateTime<Local>, tag: &str) -> String {
    let tag = tag.trim().replace(['/', '\\'], "_");
    let stamp = at.format("%Y.%m.%d %H:%M:%S");
    if tag.is_empty() {
        stamp.to_string()
    } else {
        format!("{stamp} {tag}")
    }
}

/// Create a new record file named after `stem`, numbering it if the name
/// is taken.
fn create_record(dir: &Path, stem: &str) -> Result<(PathBuf, File), RecordError> {
    let mut n = 1u32;
    loop {
        let name = if n == 1 {
            format!("{stem}.{EXTENSION}")
        } else {
            format!("{stem} ({n}).{EXTENSION}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(RecordError::io(&path, e)),
        }
    }
}

/// Save `samples` under `dir`, stamped with the current local time.
pub fn save_chart(
    dir: &Path,
    label: &str,
    tag: &str,
    samples: &[Sample],
) -> Result<PathBuf, RecordError> {
    save_chart_at(dir, label, tag, samples, &Local::now())
}

/// Save `samples` under `dir` with an explicit timestamp.
///
/// An empty chart is rejected before anything touches the file system.
pub fn save_chart_at(
    dir: &Path,
    label: &str,
    tag: &str,
    samples: &[Sample],
    at: &DateTime<Local>,
) -> Result<PathBuf, RecordError> {
    if samples.is_empty() {
        return Err(RecordError::NoData);
    }
    fs::create_dir_all(dir).map_err(|e| RecordError::io(dir, e))?;

    let (path, file) = create_record(dir, &record_stem(at, tag))?;
    write_record(BufWriter::new(file), label, samples).map_err(|e| RecordError::io(&path, e))?;

    info!("saved {} samples to {}", samples.len(), path.display());
    Ok(path)
}

fn write_record<W: Write>(mut w: W, label: &str, samples: &[Sample]) -> io::Result<()> {
    // the label is a single line
    let label = label.lines().next().unwrap_or("");
    writeln!(w, "{label}")?;
    for s in samples {
        writeln!(w, "{:.6},{:.4}", s.x, s.y)?;
    }
    w.flush()
}

/// Parse the text of one record. `path` is only used for error reporting.
///
/// A line that is not two comma-separated numbers rejects the whole record.
pub fn parse_record(path: &Path, text: &str) -> Result<(String, Vec<Sample>), RecordError> {
    let mut lines = text.lines();
    let label = match lines.next() {
        Some(l) => l.to_string(),
        None => {
            return Err(RecordError::Empty {
                path: path.to_path_buf(),
            });
        }
    };

    let mut samples = Vec::new();
    for (idx, line) in lines.enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_pair(trimmed) {
            Some((x, y)) => samples.push(Sample::new(x, y)),
            None => {
                return Err(RecordError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 2,
                    content: trimmed.to_string(),
                });
            }
        }
    }
    Ok((label, samples))
}

/// The first two comma-separated fields as `(x, y)`, whitespace allowed
/// around either number. Further fields are ignored.
pub fn parse_pair(text: &str) -> Option<(f64, f64)> {
    let mut fields = text.split(',');
    let x = fields.next()?.trim().parse::<f64>().ok()?;
    let y = fields.next()?.trim().parse::<f64>().ok()?;
    Some((x, y))
}

/// Load a single record file.
pub fn load_record(path: &Path) -> Result<SavedChart, RecordError> {
    let text = fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;
    let (label, samples) = parse_record(path, &text)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SavedChart {
        name,
        label,
        samples,
    })
}

/// Load every `*.txt` record in `dir`, sorted by file name.
///
/// A missing directory is an empty list; a bad file is reported in
/// `failures` and does not stop the others from loading.
pub fn load_saved_charts(dir: &Path) -> SavedCharts {
    let mut out = SavedCharts::default();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return out,
        Err(e) => {
            out.failures.push(RecordError::io(dir, e));
            return out;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == EXTENSION))
        .collect();
    paths.sort();

    for path in paths {
        match load_record(&path) {
            Ok(chart) => out.charts.push(chart),
            Err(e) => {
                warn!("skipping record: {e}");
                out.failures.push(e);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time")
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(0.0, 1.5),
            Sample::new(0.123456789, -2.00004),
            Sample::new(12.5, 3.14159),
        ]
    }

    #[test]
    fn file_name_has_timestamp_and_optional_tag() {
        assert_eq!(record_stem(&at(), ""), "2024.03.09 14:05:07");
        assert_eq!(record_stem(&at(), " fan on "), "2024.03.09 14:05:07 fan on");
        assert_eq!(record_stem(&at(), "a/b"), "2024.03.09 14:05:07 a_b");
    }

    #[test]
    fn saved_file_has_label_then_fixed_precision_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = save_chart_at(dir.path(), "Differential pressure, Pa", "", &samples(), &at())
            .expect("save");
        let text = fs::read_to_string(path).expect("read back");
        assert_eq!(
            text,
            "Differential pressure, Pa\n\
             0.000000,1.5000\n\
             0.123457,-2.0000\n\
             12.500000,3.1416\n"
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = dir.path().join("records");
        let path = save_chart_at(&records, "bench run", "tag", &samples(), &at()).expect("save");

        let chart = load_record(&path).expect("load");
        assert_eq!(chart.name, "2024.03.09 14:05:07 tag");
        assert_eq!(chart.label, "bench run");
        assert_eq!(chart.samples.len(), 3);
        for (got, want) in chart.samples.iter().zip(samples()) {
            assert!((got.x - want.x).abs() <= 5e-7);
            assert!((got.y - want.y).abs() <= 5e-5);
        }
    }

    #[test]
    fn empty_chart_is_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = dir.path().join("records");
        let err = save_chart_at(&records, "label", "", &[], &at()).unwrap_err();
        assert!(matches!(err, RecordError::NoData));
        assert!(!records.exists());
    }

    #[test]
    fn write_failure_is_reported_as_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").expect("write");
        let err = save_chart_at(&blocker, "label", "", &samples(), &at()).unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
    }

    #[test]
    fn empty_label_line_is_kept() {
        let (label, samples) = parse_record(Path::new("r.txt"), "\n1.0,2.0\n").expect("parse");
        assert_eq!(label, "");
        assert_eq!(samples, vec![Sample::new(1.0, 2.0)]);
    }

    #[test]
    fn malformed_line_rejects_record() {
        let err = parse_record(Path::new("r.txt"), "label\n1.0,2.0\n3.0;4.0\n").unwrap_err();
        match err {
            RecordError::Malformed { line, content, .. } => {
                assert_eq!(line, 3);
                assert_eq!(content, "3.0;4.0");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn same_second_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = save_chart_at(dir.path(), "first", "run", &samples(), &at()).expect("save");
        let second =
            save_chart_at(dir.path(), "second", "run", &samples()[..1], &at()).expect("save");

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().and_then(|n| n.to_str()),
            Some("2024.03.09 14:05:07 run (2).txt")
        );
        assert_eq!(load_record(&first).expect("load").label, "first");
        assert_eq!(load_record(&second).expect("load").samples.len(), 1);
    }

    #[test]
    fn extra_fields_after_y_are_ignored() {
        assert_eq!(parse_pair("1,2,3"), Some((1.0, 2.0)));
        assert_eq!(parse_pair(" 1.5 , -2 "), Some((1.5, -2.0)));
        assert_eq!(parse_pair("1"), None);
        assert_eq!(parse_pair("1,"), None);
        let (_, samples) = parse_record(Path::new("r.txt"), "label\n0.5,7.0,extra\n").expect("parse");
        assert_eq!(samples, vec![Sample::new(0.5, 7.0)]);
    }

    #[test]
    fn empty_file_is_an_error() {
        let err = parse_record(Path::new("r.txt"), "").unwrap_err();
        assert!(matches!(err, RecordError::Empty { .. }));
    }

    #[test]
    fn bad_file_does_not_hide_good_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("2024.01.01 00:00:00.txt"), "a\n0.0,1.0\n").expect("write");
        fs::write(dir.path().join("2024.01.02 00:00:00.txt"), "b\nnot numbers\n").expect("write");
        fs::write(dir.path().join("2024.01.03 00:00:00.txt"), "c\n1.0,2.0\n2.0,3.0\n")
            .expect("write");
        fs::write(dir.path().join("notes.md"), "ignored").expect("write");

        let saved = load_saved_charts(dir.path());
        let names: Vec<_> = saved.charts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["2024.01.01 00:00:00", "2024.01.03 00:00:00"]);
        assert_eq!(saved.charts[1].samples.len(), 2);
        assert_eq!(saved.failures.len(), 1);
        assert!(matches!(saved.failures[0], RecordError::Malformed { line: 2, .. }));
    }

    #[test]
    fn missing_directory_is_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let saved = load_saved_charts(&dir.path().join("nope"));
        assert!(saved.charts.is_empty());
        assert!(saved.failures.is_empty());
    }
}

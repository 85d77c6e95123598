use crate::error::{Error, Result};
use crate::heart_analysis::{HeartRateSample, HeartRateSeries};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::path::Path;
use std::str::FromStr;

/// How column 0 of a heart rate file encodes time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Millisecond Unix timestamps (default)
    EpochMillis,
    /// Plain seconds
    Seconds,
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "millis" | "ms" => Ok(TimeUnit::EpochMillis),
            "seconds" | "s" => Ok(TimeUnit::Seconds),
            _ => Err(format!(
                "Invalid time unit: {}. Use millis for Unix timestamps in milliseconds or seconds for elapsed seconds",
                s
            )),
        }
    }
}

/// One parsed line of a whitespace-delimited table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based line number in the source text
    pub line: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row, the table does not have to be rectangular.
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(|r| r.values.len()).max().unwrap_or(0)
    }

    pub fn column(&self, column: usize) -> Result<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                row.values
                    .get(column)
                    .copied()
                    .ok_or_else(|| Error::MissingColumn {
                        line: row.line,
                        column,
                        found: row.values.len(),
                    })
            })
            .collect()
    }
}

/// Parse whitespace-delimited numbers, one record per line.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_table(text: &str) -> Result<Table> {
    let mut rows = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let values = trimmed
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| Error::Parse {
                    line: idx + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        rows.push(Row {
            line: idx + 1,
            values,
        });
    }

    if rows.is_empty() {
        return Err(Error::EmptyInput);
    }

    Ok(Table { rows })
}

pub fn read_table(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_table(&text)?;
    debug!(
        "Parsed {} rows ({} columns max) from {}",
        table.len(),
        table.max_columns(),
        path.display()
    );
    Ok(table)
}

/// Load one column of an ECG recording.
pub fn load_ecg_column(path: &Path, column: usize) -> Result<Vec<f64>> {
    let signal = read_table(path)?.column(column)?;
    info!(
        "Loaded {} ECG samples from column {} of {}",
        signal.len(),
        column,
        path.display()
    );
    Ok(signal)
}

/// Build a heart rate series from a table whose column 0 is time and column 1 is BPM.
pub fn heart_rate_series_from_table(table: &Table, unit: TimeUnit) -> Result<HeartRateSeries> {
    let times = table.column(0)?;
    let bpms = table.column(1)?;

    let first = times[0];
    let mut samples = Vec::with_capacity(times.len());

    for ((row, &time), &bpm) in table.rows.iter().zip(times.iter()).zip(bpms.iter()) {
        let (elapsed_s, timestamp) = match unit {
            TimeUnit::EpochMillis => {
                let timestamp = millis_to_datetime(time).ok_or_else(|| Error::InvalidTimestamp {
                    line: row.line,
                    value: time,
                })?;
                ((time - first) / 1000.0, Some(timestamp))
            }
            TimeUnit::Seconds => (time - first, None),
        };

        samples.push(HeartRateSample {
            elapsed_s,
            bpm,
            timestamp,
        });
    }

    HeartRateSeries::new(samples)
}

pub fn load_heart_rate_series(path: &Path, unit: TimeUnit) -> Result<HeartRateSeries> {
    let table = read_table(path)?;
    let series = heart_rate_series_from_table(&table, unit)?;
    info!(
        "Loaded {} heart rate samples spanning {:.1}s from {}",
        series.len(),
        series.duration_s(),
        path.display()
    );
    Ok(series)
}

fn millis_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(value.round() as i64)
}

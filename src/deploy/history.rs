//! Append-only deployment history

use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// One finished deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub environment: String,
    pub stack: String,
}

impl HistoryEntry {
    /// Entry stamped with the current time
    pub fn now(environment: &str, stack: &str, strf_format: &str, use_utc: bool) -> io::Result<Self> {
        let timestamp = if use_utc {
            format_timestamp(&Utc::now(), strf_format)?
        } else {
            format_timestamp(&Local::now(), strf_format)?
        };
        Ok(Self {
            timestamp,
            environment: environment.to_string(),
            stack: stack.to_string(),
        })
    }

    pub fn line(&self) -> String {
        format!("{} {} {}\n", self.timestamp, self.environment, self.stack)
    }
}

fn format_timestamp<Tz>(time: &DateTime<Tz>, strf_format: &str) -> io::Result<String>
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", time.format(strf_format)).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid timestamp format '{strf_format}'"),
        )
    })?;
    Ok(out)
}

/// Append `entry` to the log at `path`, creating it when missing
pub fn append(path: &Path, entry: &HistoryEntry) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.line().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_format() {
        let entry = HistoryEntry {
            timestamp: "2024-03-01 12:00:00".to_string(),
            environment: "production.toml".to_string(),
            stack: "1.2.3".to_string(),
        };
        assert_eq!(entry.line(), "2024-03-01 12:00:00 production.toml 1.2.3\n");
    }

    #[test]
    fn test_format_timestamp() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            format_timestamp(&time, "%Y-%m-%d %H:%M:%S").unwrap(),
            "2024-03-01 12:30:05"
        );
        assert_eq!(format_timestamp(&time, "%d/%m").unwrap(), "01/03");
    }

    #[test]
    fn test_now_uses_format() {
        let entry = HistoryEntry::now("staging.toml", "latest", "%Y", true).unwrap();
        assert_eq!(entry.timestamp.len(), 4);
        assert_eq!(entry.stack, "latest");
    }

    #[test]
    fn test_append_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("history");
        let entry = |stack: &str| HistoryEntry {
            timestamp: "ts".to_string(),
            environment: "env".to_string(),
            stack: stack.to_string(),
        };

        append(&path, &entry("1")).unwrap();
        append(&path, &entry("2")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "ts env 1\nts env 2\n");
    }
}

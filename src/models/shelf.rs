use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Reading-list status of a book on a user's shelf
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ShelfStatus {
    WantToRead,
    Reading,
    Read,
}

impl ShelfStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfStatus::WantToRead => "want-to-read",
            ShelfStatus::Reading => "reading",
            ShelfStatus::Read => "read",
        }
    }

    /// Statuses that count as reading history
    pub fn is_engaged(&self) -> bool {
        matches!(self, ShelfStatus::Reading | ShelfStatus::Read)
    }
}

impl Display for ShelfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShelfStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "want-to-read" => Ok(ShelfStatus::WantToRead),
            "reading" => Ok(ShelfStatus::Reading),
            "read" => Ok(ShelfStatus::Read),
            other => Err(format!(
                "Invalid status '{}': expected want-to-read, reading or read",
                other
            )),
        }
    }
}

/// One book in a user's read/reading history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub external_id: String,
    pub genre: String,
    pub status: ShelfStatus,
}

/// Number of books per shelf for one user
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShelfCounts {
    pub want_to_read: i64,
    pub reading: i64,
    pub read: i64,
}

impl ShelfCounts {
    pub fn add(&mut self, status: ShelfStatus, count: i64) {
        match status {
            ShelfStatus::WantToRead => self.want_to_read += count,
            ShelfStatus::Reading => self.reading += count,
            ShelfStatus::Read => self.read += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ShelfStatus::WantToRead).unwrap(),
            "\"want-to-read\""
        );
        let parsed: ShelfStatus = serde_json::from_str("\"reading\"").unwrap();
        assert_eq!(parsed, ShelfStatus::Reading);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("READ".parse::<ShelfStatus>(), Ok(ShelfStatus::Read));
        assert_eq!(
            "want-to-read".parse::<ShelfStatus>(),
            Ok(ShelfStatus::WantToRead)
        );
        assert!("finished".parse::<ShelfStatus>().is_err());
    }

    #[test]
    fn test_engaged_statuses() {
        assert!(ShelfStatus::Read.is_engaged());
        assert!(ShelfStatus::Reading.is_engaged());
        assert!(!ShelfStatus::WantToRead.is_engaged());
    }

    #[test]
    fn test_shelf_counts_add() {
        let mut counts = ShelfCounts::default();
        counts.add(ShelfStatus::Read, 3);
        counts.add(ShelfStatus::Reading, 1);
        assert_eq!(counts.read, 3);
        assert_eq!(counts.reading, 1);
        assert_eq!(counts.want_to_read, 0);
    }
}

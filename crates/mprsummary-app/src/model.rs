// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

pub const INVALID_STATUS_LABEL: &str = "Invalid Status";
pub const TOTAL_ROW_LABEL: &str = "Total no of MPRs with pending documentation tasks";
pub const STATUS_COLUMN_LABEL: &str = "Doc Status";
pub const COUNT_COLUMN_LABEL: &str = "MPR count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocStatus {
    NotStarted,
    DraftReceived,
    NoDraft,
    InProgress,
    IssuesPending,
}

impl DocStatus {
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::DraftReceived,
        Self::NoDraft,
        Self::InProgress,
        Self::IssuesPending,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::DraftReceived => "Draft Received",
            Self::NoDraft => "No Draft",
            Self::InProgress => "In-progress",
            Self::IssuesPending => "Issues Pending",
        }
    }

    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NotStarted),
            1 => Some(Self::DraftReceived),
            2 => Some(Self::NoDraft),
            3 => Some(Self::InProgress),
            4 => Some(Self::IssuesPending),
            _ => None,
        }
    }
}

/// Label shown for a raw wire code. Codes outside 0..=4 map to
/// [`INVALID_STATUS_LABEL`], which has no row in the table.
pub fn status_label(code: i64) -> &'static str {
    DocStatus::from_code(code).map_or(INVALID_STATUS_LABEL, DocStatus::label)
}

/// One record of the `/prcount` payload. `doc_status` is `None` when the
/// wire value is missing or not an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(
        rename = "docStatus",
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub doc_status: Option<i64>,
    pub count: u64,
}

impl StatusRecord {
    pub const fn new(doc_status: i64, count: u64) -> Self {
        Self {
            doc_status: Some(doc_status),
            count,
        }
    }

    pub fn status(&self) -> Option<DocStatus> {
        self.doc_status.and_then(DocStatus::from_code)
    }
}

fn lenient_code<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Code(i64),
        Other(#[allow(dead_code)] IgnoredAny),
    }

    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Code(code) => Some(code),
        RawCode::Other(_) => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRow {
    pub status: DocStatus,
    pub count: u64,
}

impl StatusRow {
    pub const fn label(&self) -> &'static str {
        self.status.label()
    }
}

/// Fixed five-row breakdown plus the pending-documentation total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    rows: [StatusRow; 5],
    total: u64,
}

impl Default for StatusTable {
    fn default() -> Self {
        Self {
            rows: DocStatus::ALL.map(|status| StatusRow { status, count: 0 }),
            total: 0,
        }
    }
}

impl StatusTable {
    pub fn rows(&self) -> &[StatusRow; 5] {
        &self.rows
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    pub fn count_for(&self, status: DocStatus) -> u64 {
        self.rows
            .iter()
            .find(|row| row.status == status)
            .map_or(0, |row| row.count)
    }

    pub fn is_zeroed(&self) -> bool {
        self.total == 0 && self.rows.iter().all(|row| row.count == 0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Overwrite the count of each row named by a record. Returns how many
    /// records carried a missing, malformed or unknown status code.
    pub fn apply_records(&mut self, records: &[StatusRecord]) -> usize {
        let mut dropped = 0;
        for record in records {
            let Some(status) = record.status() else {
                dropped += 1;
                continue;
            };
            if let Some(row) = self.rows.iter_mut().find(|row| row.status == status) {
                row.count = record.count;
            }
        }
        dropped
    }

    pub fn as_pairs(&self) -> Vec<(&'static str, u64)> {
        self.rows.iter().map(|row| (row.label(), row.count)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => bail!("unknown theme {other:?}; expected \"dark\" or \"light\""),
        }
    }
}

/// Last size reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

#[cfg(test)]
mod tests {
    use super::{
        DocStatus, INVALID_STATUS_LABEL, StatusRecord, StatusTable, Theme, status_label,
    };

    #[test]
    fn codes_map_to_fixed_labels() {
        let labels = (0..5).map(status_label).collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec![
                "Not Started",
                "Draft Received",
                "No Draft",
                "In-progress",
                "Issues Pending",
            ]
        );
        assert_eq!(status_label(5), INVALID_STATUS_LABEL);
        assert_eq!(status_label(-1), INVALID_STATUS_LABEL);
    }

    #[test]
    fn invalid_label_is_not_a_table_row() {
        let table = StatusTable::default();
        assert!(
            table
                .as_pairs()
                .iter()
                .all(|(label, _)| *label != INVALID_STATUS_LABEL)
        );
    }

    #[test]
    fn codes_follow_display_order() {
        for (code, status) in (0..).zip(DocStatus::ALL) {
            assert_eq!(DocStatus::from_code(code), Some(status));
        }
    }

    #[test]
    fn apply_records_overwrites_matching_rows_only() {
        let mut table = StatusTable::default();
        let dropped = table.apply_records(&[
            StatusRecord::new(0, 3),
            StatusRecord::new(2, 1),
        ]);

        assert_eq!(dropped, 0);
        assert_eq!(
            table.as_pairs(),
            vec![
                ("Not Started", 3),
                ("Draft Received", 0),
                ("No Draft", 1),
                ("In-progress", 0),
                ("Issues Pending", 0),
            ]
        );
    }

    #[test]
    fn apply_records_drops_unknown_codes() {
        let mut table = StatusTable::default();
        let dropped = table.apply_records(&[
            StatusRecord::new(9, 40),
            StatusRecord::new(4, 2),
        ]);

        assert_eq!(dropped, 1);
        assert_eq!(table.count_for(DocStatus::IssuesPending), 2);
        assert_eq!(table.rows().iter().map(|row| row.count).sum::<u64>(), 2);
    }

    #[test]
    fn later_record_for_same_status_wins() {
        let mut table = StatusTable::default();
        table.apply_records(&[
            StatusRecord::new(3, 5),
            StatusRecord::new(3, 8),
        ]);
        assert_eq!(table.count_for(DocStatus::InProgress), 8);
    }

    #[test]
    fn clear_resets_rows_and_total() {
        let mut table = StatusTable::default();
        table.apply_records(&[StatusRecord::new(1, 12)]);
        table.set_total(7);
        assert!(!table.is_zeroed());

        table.clear();
        assert!(table.is_zeroed());
        assert_eq!(table, StatusTable::default());
    }

    #[test]
    fn status_record_uses_wire_field_names() -> anyhow::Result<()> {
        let record: StatusRecord = serde_json::from_str(r#"{"docStatus":2,"count":4}"#)?;
        assert_eq!(record, StatusRecord::new(2, 4));
        Ok(())
    }

    #[test]
    fn malformed_codes_decode_as_missing() -> anyhow::Result<()> {
        let records: Vec<StatusRecord> = serde_json::from_str(
            r#"[{"docStatus":"2","count":1},{"count":5},{"docStatus":1.5,"count":9},{"docStatus":null,"count":2}]"#,
        )?;
        assert!(records.iter().all(|record| record.doc_status.is_none()));
        assert_eq!(
            records.iter().map(|record| record.count).collect::<Vec<_>>(),
            vec![1, 5, 9, 2]
        );
        Ok(())
    }

    #[test]
    fn apply_records_counts_malformed_codes_as_dropped() {
        let mut table = StatusTable::default();
        let dropped = table.apply_records(&[
            StatusRecord::new(0, 3),
            StatusRecord {
                doc_status: None,
                count: 5,
            },
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(table.count_for(DocStatus::NotStarted), 3);
        assert_eq!(table.rows().iter().map(|row| row.count).sum::<u64>(), 3);
    }

    #[test]
    fn theme_parse_accepts_known_names() -> anyhow::Result<()> {
        assert_eq!(Theme::parse("dark")?, Theme::Dark);
        assert_eq!(Theme::parse(" Light ")?, Theme::Light);
        let error = Theme::parse("sepia").expect_err("unknown theme should fail");
        assert!(error.to_string().contains("expected \"dark\" or \"light\""));
        Ok(())
    }
}

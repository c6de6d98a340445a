//! Per-output-file generation record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Generation progress of one output file, keyed by its content-derived name.
///
/// Rows are shared by every job that asks for the same fingerprint and format.
/// `url` is present once the file is complete; `submitted_at` is stamped each
/// time filter work is published for it and never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl FileStatus {
    /// A fresh, never-submitted file.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Pending,
            url: None,
            submitted_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn mark_complete(&mut self, url: impl Into<String>) {
        self.status = Status::Complete;
        self.url = Some(url.into());
    }

    pub fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.submitted_at = Some(at);
    }

    /// True if work was published for this file less than `window` before `now`.
    pub fn submitted_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.submitted_at.is_some_and(|at| now - at < window)
    }

    /// Incomplete and not covered by a recent submission.
    pub fn needs_dispatch(&self, now: DateTime<Utc>, retry_window: Duration) -> bool {
        !self.is_complete() && !self.submitted_within(now, retry_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_file_has_no_url_or_submission() {
        let f = FileStatus::pending("abc.csv");
        assert!(!f.is_complete());
        assert!(f.url.is_none());
        assert!(f.submitted_at.is_none());
    }

    #[test]
    fn retry_window_boundaries() {
        let now = Utc::now();
        let window = Duration::hours(1);
        let mut f = FileStatus::pending("abc.csv");
        assert!(f.needs_dispatch(now, window));

        f.mark_submitted(now - Duration::minutes(30));
        assert!(!f.needs_dispatch(now, window));

        f.mark_submitted(now - Duration::minutes(61));
        assert!(f.needs_dispatch(now, window));

        f.mark_complete("http://example.com/abc.csv");
        assert!(!f.needs_dispatch(now, window));
    }

    #[test]
    fn json_hides_submission_and_missing_url() {
        let mut f = FileStatus::pending("abc.csv");
        f.mark_submitted(Utc::now());
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json, serde_json::json!({"name": "abc.csv", "status": "Pending"}));

        f.mark_complete("http://example.com/abc.csv");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["url"], "http://example.com/abc.csv");
        assert_eq!(json["status"], "Complete");
    }
}

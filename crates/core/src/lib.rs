//! `filterjob-core`: domain building blocks for filter jobs.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, statuses, canonical dimension filters, the content fingerprint
//! used to deduplicate requests, and the job/file records themselves.

pub mod clock;
pub mod error;
pub mod file_status;
pub mod filter;
pub mod fingerprint;
pub mod format;
pub mod id;
pub mod job;
pub mod request;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use file_status::FileStatus;
pub use filter::{CanonicalFilters, DimensionFilter};
pub use fingerprint::Fingerprint;
pub use format::FileFormat;
pub use id::{DataSetId, JobId, RequestId};
pub use job::Job;
pub use request::{CreateJobRequest, FilterRequest};
pub use status::Status;

//! Infrastructure layer: collaborator adapters and the filter job engine.
//!
//! - `store`: job + file-status persistence (in-memory, Postgres)
//! - `datasets`: dataset input URLs and dimension values (in-memory, Postgres)
//! - `storage`: output bucket existence checks and download URLs (in-memory, HTTP)
//! - `queue`: filter work publishing (in-memory, Redis pub/sub behind `redis`)
//! - `jobs`: validator, reconciler, gate, dispatcher, orchestration, sweeper

pub mod datasets;
pub mod jobs;
pub mod queue;
pub mod storage;
pub mod store;

//! Filter job engine.
//!
//! ## Components
//!
//! - `DimensionValidator`: strips unknown dimension values, rejects dimensions with none left
//! - `Reconciler`: syncs file/job status with the output bucket
//! - `SubmissionGate`: pending-job backpressure (soft limit)
//! - `FilterDispatcher`: publishes filter work for files that need it
//! - `JobService`: the create and check-status flows
//! - `ExpirySweeper`: periodic removal of expired jobs and orphaned file rows

pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod reconciler;
pub mod service;
pub mod settings;
pub mod sweeper;
pub mod validator;

pub use dispatcher::FilterDispatcher;
pub use error::JobServiceError;
pub use gate::SubmissionGate;
pub use reconciler::Reconciler;
pub use service::JobService;
pub use settings::JobSettings;
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle};
pub use validator::DimensionValidator;

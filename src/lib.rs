//! flowrun: streaming client for resumable remote AI workflows
//!
//! Drives a long-running remote workflow over a chunked `id:` / `event:` /
//! `data:` stream. A run may stop mid-way to ask the user a question; the
//! client hands back a continuation token and resumes the same run when the
//! reply arrives, possibly from an unrelated request.
//!
//! # Quick Start
//!
//! ```no_run
//! use flowrun::prelude::*;
//!
//! # async fn example() -> flowrun::error::Result<()> {
//! let client = WorkflowClient::from_config(&FlowConfig::load(None)?)?;
//! let outcome = client
//!     .initiate_run(
//!         InitiateRun::builder()
//!             .workflow_kind(WorkflowKind::TrainingProgram)
//!             .subject_id("user-42")
//!             .build(),
//!     )
//!     .await?;
//! println!("{}", outcome.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod prelude;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

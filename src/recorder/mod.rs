//! Recording supervision
//!
//! - Supervisor: the cap-checking control loop
//! - state: outcome and summary types

pub mod state;
pub mod supervisor;

pub use state::{RecordingOutcome, RecordingSummary};
pub use supervisor::Supervisor;

pub mod report;
pub mod result;
pub mod status;

pub use report::{GroupReport, ReportError, RunReport};
pub use result::{FailureDetail, FailureKind, RunSummary, TestOutcome};
pub use status::TestStatus;

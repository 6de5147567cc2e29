mod reporter;

pub use reporter::{ReportSummary, Reporter};

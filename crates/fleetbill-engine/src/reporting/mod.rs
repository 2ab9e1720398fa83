//! Reporting module
//!
//! Per-tenant spend reports built from on-demand trip calculations.

pub mod summary;

pub use summary::{ClientBillingReport, LineOutcome, ReportBuilder, ReportLine, ReportTotals};

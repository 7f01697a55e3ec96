pub mod admin;
pub mod fleet;
pub mod reports;

pub use admin::{AdminListings, AdminRecord, AdminService, DashboardStats};
pub use fleet::{FleetService, ImportReport, ImportRowError};
pub use reports::{ReportQuery, ReportRow, ReportService, ReportStats};

use crate::constants::MISSING_REFERENCE_PLACEHOLDER;

/// Registry display attribute with the `N/A` degradation applied.
pub(crate) fn reference_display(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => MISSING_REFERENCE_PLACEHOLDER.to_string(),
    }
}

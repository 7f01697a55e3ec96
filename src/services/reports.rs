use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::constants::{
    MISSING_REFERENCE_PLACEHOLDER, RECORDS_COLLECTION, REPORT_EXPORT_HEADERS, VEHICLES_COLLECTION,
};
use crate::error::Result;
use crate::models::fleet::Vehicle;
use crate::models::operator::{Operator, OperatorRole};
use crate::models::records::{ChannelReading, TurnstileRecord};
use crate::store::{DocumentStore, FieldFilter, OrderBy};
use crate::utils::csv::{build_blob, report_export_filename, CsvExport};
use crate::utils::timezone::{day_window, format_date_br, format_datetime_br, now_in};

/// One report line: a stored record with vehicle display attributes resolved
/// from the registry, `N/A` when the reference no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub record: TurnstileRecord,
    pub vehicle_number: String,
    pub vehicle_plate: String,
    pub vehicle_type: String,
}

/// Narrowing applied on top of a loaded report.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    /// Case-insensitive needle over vehicle number, plate and operator name.
    pub search: String,
    /// Keep only records whose operation date falls on this local day.
    pub operation_day: Option<NaiveDate>,
}

/// Tile counters over a filtered report set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportStats {
    pub total: usize,
    pub mismatches: usize,
    pub journeys_closed: usize,
    pub journeys_open: usize,
}

/// Record history across operation days, scoped by viewer role.
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    timezone: Tz,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Records visible to the viewer, newest first. Operators see only their
    /// own submissions; admins see the whole fleet's.
    pub async fn load(&self, viewer: &Operator) -> Result<Vec<ReportRow>> {
        let mut filters = Vec::new();
        if viewer.role == OperatorRole::Operator {
            filters.push(FieldFilter::eq("operatorId", viewer.id.clone()));
        }
        let docs = self
            .store
            .query(
                RECORDS_COLLECTION,
                &filters,
                Some(&OrderBy::desc("createdAt")),
            )
            .await?;
        let records: Vec<TurnstileRecord> =
            docs.iter().map(TurnstileRecord::from_document).collect();
        debug!(
            viewer = %viewer.id,
            role = ?viewer.role,
            records = records.len(),
            "Report loaded"
        );

        let vehicles = self.prefetch_vehicles(&records).await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let vehicle = vehicles.get(&record.vehicle_id);
                ReportRow {
                    vehicle_number: super::reference_display(vehicle.map(|v| v.number.as_str())),
                    vehicle_plate: super::reference_display(vehicle.map(|v| v.plate.as_str())),
                    vehicle_type: super::reference_display(
                        vehicle.map(|v| v.vehicle_type.as_str()),
                    ),
                    record,
                }
            })
            .collect())
    }

    /// Apply the search and operation-day filters. Pure; reruns on every
    /// input change.
    pub fn filter(&self, rows: &[ReportRow], query: &ReportQuery) -> Vec<ReportRow> {
        let needle = query.search.trim().to_lowercase();
        let window = query.operation_day.map(|day| day_window(self.timezone, day));
        rows.iter()
            .filter(|row| {
                if !needle.is_empty() {
                    let hit = row.vehicle_number.to_lowercase().contains(&needle)
                        || row.vehicle_plate.to_lowercase().contains(&needle)
                        || row.record.operator_name.to_lowercase().contains(&needle);
                    if !hit {
                        return false;
                    }
                }
                if let Some((start, end)) = window {
                    match row.record.operation_date {
                        Some(op) => {
                            if op < start || op >= end {
                                return false;
                            }
                        }
                        None => return false,
                    }
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Counters over the filtered set.
    pub fn stats(rows: &[ReportRow]) -> ReportStats {
        ReportStats {
            total: rows.len(),
            mismatches: rows.iter().filter(|r| r.record.has_mismatch()).count(),
            journeys_closed: rows.iter().filter(|r| r.record.journey_closed).count(),
            journeys_open: rows.iter().filter(|r| !r.record.journey_closed).count(),
        }
    }

    /// Comma-delimited export of the filtered set, named for the current
    /// local date.
    pub fn export_csv(&self, rows: &[ReportRow]) -> CsvExport {
        let csv_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let record = &row.record;
                vec![
                    record
                        .operation_date
                        .map(|d| format_date_br(d, self.timezone))
                        .unwrap_or_else(|| MISSING_REFERENCE_PLACEHOLDER.to_string()),
                    record
                        .created_at
                        .map(|d| format_datetime_br(d, self.timezone))
                        .unwrap_or_else(|| MISSING_REFERENCE_PLACEHOLDER.to_string()),
                    row.vehicle_number.clone(),
                    row.vehicle_plate.clone(),
                    reading_field(record.physical),
                    reading_field(record.electronic),
                    journey_label(record.journey_closed).to_string(),
                    record.operator_name.clone(),
                ]
            })
            .collect();
        CsvExport {
            filename: report_export_filename(now_in(self.timezone).date_naive()),
            content: build_blob(&REPORT_EXPORT_HEADERS, &csv_rows, ','),
        }
    }

    async fn prefetch_vehicles(
        &self,
        records: &[TurnstileRecord],
    ) -> Result<HashMap<String, Vehicle>> {
        let mut map = HashMap::new();
        for record in records {
            let id = &record.vehicle_id;
            if id.is_empty() || map.contains_key(id) {
                continue;
            }
            if let Some(doc) = self.store.get(VEHICLES_COLLECTION, id).await? {
                map.insert(id.clone(), Vehicle::from_document(&doc));
            }
        }
        Ok(map)
    }
}

fn journey_label(closed: bool) -> &'static str {
    if closed {
        "Fechada"
    } else {
        "Aberta"
    }
}

fn reading_field(channel: ChannelReading) -> String {
    channel.value().map(|v| v.to_string()).unwrap_or_default()
}

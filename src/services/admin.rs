use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::constants::{
    COMPANIES_COLLECTION, MISMATCH_LISTING_LIMIT, OPEN_JOURNEY_LISTING_LIMIT,
    RECENT_RECORDS_LIMIT, RECORDS_COLLECTION, VEHICLES_COLLECTION,
};
use crate::error::Result;
use crate::models::fleet::Vehicle;
use crate::models::records::TurnstileRecord;
use crate::store::{DocumentStore, OrderBy};
use crate::utils::timezone::{day_start, now_in};

/// Fleet-wide tiles for the admin landing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub total_companies: usize,
    /// Records submitted since local midnight today.
    pub today_records: usize,
    pub mismatches: usize,
    pub open_journeys: usize,
}

/// One admin listing row with registry display attributes resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminRecord {
    pub record: TurnstileRecord,
    pub vehicle_number: String,
    pub vehicle_plate: String,
}

/// The capped listings below the tiles, each newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminListings {
    pub recent: Vec<AdminRecord>,
    pub mismatches: Vec<AdminRecord>,
    pub open_journeys: Vec<AdminRecord>,
}

/// Fleet-wide aggregates and triage listings for administrators.
pub struct AdminService {
    store: Arc<dyn DocumentStore>,
    timezone: Tz,
}

impl AdminService {
    pub fn new(store: Arc<dyn DocumentStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Counters over the whole store, not a single operation day.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let vehicles = self.store.query(VEHICLES_COLLECTION, &[], None).await?;
        let companies = self.store.query(COMPANIES_COLLECTION, &[], None).await?;
        let records = self.store.query(RECORDS_COLLECTION, &[], None).await?;
        let today = day_start(self.timezone, now_in(self.timezone).date_naive());

        let mut stats = DashboardStats {
            total_vehicles: vehicles.len(),
            active_vehicles: vehicles.iter().filter(|d| d.bool_field("isActive")).count(),
            total_companies: companies.len(),
            ..DashboardStats::default()
        };
        for doc in &records {
            let record = TurnstileRecord::from_document(doc);
            if record.created_at.map(|c| c >= today).unwrap_or(false) {
                stats.today_records += 1;
            }
            if record.has_mismatch() {
                stats.mismatches += 1;
            }
            if !record.journey_closed {
                stats.open_journeys += 1;
            }
        }
        debug!(?stats, "Dashboard stats computed");
        Ok(stats)
    }

    /// The recent, mismatch and open-journey listings. Each fills from the
    /// full newest-first record stream up to its own cap, so an old mismatch
    /// still surfaces when the recent window has moved past it.
    pub async fn listings(&self) -> Result<AdminListings> {
        let docs = self
            .store
            .query(RECORDS_COLLECTION, &[], Some(&OrderBy::desc("createdAt")))
            .await?;
        let records: Vec<TurnstileRecord> =
            docs.iter().map(TurnstileRecord::from_document).collect();
        let vehicles = self.prefetch_vehicles(&records).await?;

        let mut listings = AdminListings::default();
        for record in records {
            let vehicle = vehicles.get(&record.vehicle_id);
            let row = AdminRecord {
                vehicle_number: super::reference_display(vehicle.map(|v| v.number.as_str())),
                vehicle_plate: super::reference_display(vehicle.map(|v| v.plate.as_str())),
                record,
            };
            if row.record.has_mismatch() && listings.mismatches.len() < MISMATCH_LISTING_LIMIT {
                listings.mismatches.push(row.clone());
            }
            if !row.record.journey_closed
                && listings.open_journeys.len() < OPEN_JOURNEY_LISTING_LIMIT
            {
                listings.open_journeys.push(row.clone());
            }
            if listings.recent.len() < RECENT_RECORDS_LIMIT {
                listings.recent.push(row);
            }
        }
        Ok(listings)
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

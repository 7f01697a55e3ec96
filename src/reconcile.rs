use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::RECORDS_COLLECTION;
use crate::error::Result;
use crate::models::fleet::{Company, Vehicle, WorkItem};
use crate::models::records::{DoneRecord, MergedItem, TurnstileRecord};
use crate::store::{instant_to_value, DocumentStore, FieldFilter};
use crate::utils::timezone::day_window;

/// Day completion counters. `done` counts readings, `total` counts active
/// work items, so done can exceed total when a read vehicle later went
/// inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// The reconciled view of one operation day.
#[derive(Debug, Clone, Default)]
pub struct DayView {
    /// Done items first (store order), then pending items in roster order
    pub items: Vec<MergedItem>,
    pub progress: Progress,
}

/// Merges the day's submitted readings with the active-vehicle roster into
/// the pending/done view.
pub struct ReconciliationEngine {
    store: Arc<dyn DocumentStore>,
    timezone: Tz,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn DocumentStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Load and merge one operation day.
    ///
    /// Only the records query can fail the load. Vehicle and company
    /// reference lookups degrade per record to empty display fields; callers
    /// keep their previous view when an error does surface.
    pub async fn load_day(&self, day: NaiveDate, roster: &[WorkItem]) -> Result<DayView> {
        let (start, end) = day_window(self.timezone, day);
        let docs = self
            .store
            .query(
                RECORDS_COLLECTION,
                &[
                    FieldFilter::Gte("operationDate".into(), instant_to_value(start)),
                    FieldFilter::Lt("operationDate".into(), instant_to_value(end)),
                ],
                None,
            )
            .await?;
        let records: Vec<TurnstileRecord> =
            docs.iter().map(TurnstileRecord::from_document).collect();
        let readings = records.len();
        debug!(day = %day, readings, roster = roster.len(), "Reconciling operation day");

        let vehicles = self.prefetch_vehicles(&records).await;
        let companies = self.prefetch_companies(&vehicles).await;

        // One done item per vehicle; a duplicate reading keeps the newest
        // submission, matching the last-writer-wins stance.
        let mut items: Vec<MergedItem> = Vec::with_capacity(readings + roster.len());
        let mut done_slots: HashMap<String, usize> = HashMap::new();
        for mut record in records {
            let vehicle = vehicles.get(&record.vehicle_id);
            let vehicle_plate = vehicle.map(|v| v.plate.clone()).unwrap_or_default();
            // Display attributes come from the vehicle lookup, not the stored
            // record copy, and degrade to empty on a missing reference.
            record.vehicle_number = vehicle.map(|v| v.number.clone()).unwrap_or_default();
            let company_name = vehicle
                .and_then(|v| companies.get(&v.company_id))
                .map(|c| c.name.clone())
                .unwrap_or_default();
            let done = MergedItem::Done(DoneRecord {
                record,
                vehicle_plate,
                company_name,
            });
            match done_slots.get(done.vehicle_id()).copied() {
                Some(slot) => {
                    if done.created_at() >= items[slot].created_at() {
                        items[slot] = done;
                    }
                }
                None => {
                    done_slots.insert(done.vehicle_id().to_string(), items.len());
                    items.push(done);
                }
            }
        }

        for work in roster {
            if !done_slots.contains_key(&work.vehicle_id) {
                items.push(MergedItem::Pending(work.clone()));
            }
        }

        Ok(DayView {
            items,
            progress: Progress {
                done: readings,
                total: roster.len(),
            },
        })
    }

    /// Deduplicated vehicle lookups for the day's readings. A missing or
    /// failing reference is dropped here and shows up as empty display
    /// fields downstream.
    async fn prefetch_vehicles(&self, records: &[TurnstileRecord]) -> HashMap<String, Vehicle> {
        let mut map = HashMap::new();
        for record in records {
            let id = &record.vehicle_id;
            if id.is_empty() || map.contains_key(id) {
                continue;
            }
            match self.store.get(crate::constants::VEHICLES_COLLECTION, id).await {
                Ok(Some(doc)) => {
                    map.insert(id.clone(), Vehicle::from_document(&doc));
                }
                Ok(None) => {
                    debug!(vehicle_id = %id, "Reading references a missing vehicle");
                }
                Err(e) => {
                    warn!(vehicle_id = %id, "Vehicle lookup failed, degrading display: {e}");
                }
            }
        }
        map
    }

    async fn prefetch_companies(
        &self,
        vehicles: &HashMap<String, Vehicle>,
    ) -> HashMap<String, Company> {
        let mut map = HashMap::new();
        for vehicle in vehicles.values() {
            let id = &vehicle.company_id;
            if id.is_empty() || map.contains_key(id) {
                continue;
            }
            match self
                .store
                .get(crate::constants::COMPANIES_COLLECTION, id)
                .await
            {
                Ok(Some(doc)) => {
                    map.insert(id.clone(), Company::from_document(&doc));
                }
                Ok(None) => {
                    debug!(company_id = %id, "Vehicle references a missing company");
                }
                Err(e) => {
                    warn!(company_id = %id, "Company lookup failed, degrading display: {e}");
                }
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::{ChannelReading, NewRecord};
    use crate::store::{Fields, MemoryStore};
    use crate::utils::timezone::{day_start, SAO_PAULO_TZ};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn seed_company(store: &MemoryStore, name: &str) -> String {
        store
            .create(
                crate::constants::COMPANIES_COLLECTION,
                fields(&[("name", json!(name)), ("isActive", json!(true))]),
            )
            .await
            .unwrap()
    }

    async fn seed_vehicle(
        store: &MemoryStore,
        number: &str,
        plate: &str,
        company_id: &str,
    ) -> String {
        store
            .create(
                crate::constants::VEHICLES_COLLECTION,
                fields(&[
                    ("number", json!(number)),
                    ("plate", json!(plate)),
                    ("type", json!("ônibus")),
                    ("companyId", json!(company_id)),
                    ("isActive", json!(true)),
                ]),
            )
            .await
            .unwrap()
    }

    async fn seed_record(
        store: &MemoryStore,
        vehicle_id: &str,
        number: &str,
        day: NaiveDate,
        offset_minutes: i64,
    ) -> String {
        let record = NewRecord {
            vehicle_id: vehicle_id.to_string(),
            vehicle_number: number.to_string(),
            physical: ChannelReading::Counted(120),
            electronic: ChannelReading::Counted(118),
            observation: String::new(),
            journey_closed: false,
            operator_id: "op1".to_string(),
            operator_name: "Marina".to_string(),
            created_at: Utc::now() + Duration::minutes(offset_minutes),
            operation_date: day_start(SAO_PAULO_TZ, day),
        };
        store
            .create(RECORDS_COLLECTION, record.to_fields())
            .await
            .unwrap()
    }

    fn work_item(vehicle_id: &str, number: &str) -> WorkItem {
        WorkItem {
            vehicle_id: vehicle_id.to_string(),
            vehicle_number: number.to_string(),
            vehicle_plate: format!("PLT{number}"),
            company_id: "c1".to_string(),
            company_name: "Viação Azul".to_string(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[tokio::test]
    async fn test_partition_is_complete_and_disjoint() {
        let store = Arc::new(MemoryStore::new());
        let company = seed_company(&store, "Viação Azul").await;
        let v1 = seed_vehicle(&store, "1001", "AAA1A11", &company).await;
        let v2 = seed_vehicle(&store, "1002", "BBB2B22", &company).await;
        // An off-roster vehicle that was read anyway (went inactive later)
        let v3 = seed_vehicle(&store, "1003", "CCC3C33", &company).await;
        seed_record(&store, &v1, "1001", day(), 0).await;
        seed_record(&store, &v3, "1003", day(), 1).await;

        let roster = vec![work_item(&v1, "1001"), work_item(&v2, "1002")];
        let engine = ReconciliationEngine::new(store, SAO_PAULO_TZ);
        let view = engine.load_day(day(), &roster).await.unwrap();

        let ids: Vec<_> = view.items.iter().map(|i| i.vehicle_id()).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(unique.len(), 3);

        let done: HashSet<_> = view
            .items
            .iter()
            .filter(|i| i.is_done())
            .map(|i| i.vehicle_id().to_string())
            .collect();
        let pending: HashSet<_> = view
            .items
            .iter()
            .filter(|i| !i.is_done())
            .map(|i| i.vehicle_id().to_string())
            .collect();
        assert!(done.contains(&v1) && done.contains(&v3));
        assert!(pending.contains(&v2));
        assert!(done.is_disjoint(&pending));

        // done counts readings, total counts roster
        assert_eq!(view.progress, Progress { done: 2, total: 2 });
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_empty_display() {
        let store = Arc::new(MemoryStore::new());
        seed_record(&store, "ghost-vehicle", "", day(), 0).await;

        let engine = ReconciliationEngine::new(store, SAO_PAULO_TZ);
        let view = engine.load_day(day(), &[]).await.unwrap();

        assert_eq!(view.items.len(), 1);
        let done = view.items[0].as_done().unwrap();
        assert_eq!(done.vehicle_plate, "");
        assert_eq!(done.company_name, "");
        assert_eq!(view.items[0].vehicle_number(), "");
    }

    #[tokio::test]
    async fn test_company_join_resolves_display_name() {
        let store = Arc::new(MemoryStore::new());
        let company = seed_company(&store, "Transportes Sul").await;
        let v1 = seed_vehicle(&store, "2001", "DDD4D44", &company).await;
        seed_record(&store, &v1, "2001", day(), 0).await;

        let engine = ReconciliationEngine::new(store, SAO_PAULO_TZ);
        let view = engine.load_day(day(), &[work_item(&v1, "2001")]).await.unwrap();

        let done = view.items[0].as_done().unwrap();
        assert_eq!(done.company_name, "Transportes Sul");
        assert_eq!(done.vehicle_plate, "DDD4D44");
    }

    #[tokio::test]
    async fn test_duplicate_readings_collapse_to_newest() {
        let store = Arc::new(MemoryStore::new());
        let company = seed_company(&store, "Viação Azul").await;
        let v1 = seed_vehicle(&store, "3001", "EEE5E55", &company).await;
        seed_record(&store, &v1, "3001", day(), 0).await;
        let newer = seed_record(&store, &v1, "3001", day(), 30).await;

        let engine = ReconciliationEngine::new(store, SAO_PAULO_TZ);
        let view = engine.load_day(day(), &[work_item(&v1, "3001")]).await.unwrap();

        let done_items: Vec<_> = view.items.iter().filter(|i| i.is_done()).collect();
        assert_eq!(done_items.len(), 1);
        assert_eq!(done_items[0].as_done().unwrap().record.id, newer);
        // Progress still counts both submitted readings
        assert_eq!(view.progress, Progress { done: 2, total: 1 });
    }

    #[tokio::test]
    async fn test_other_days_are_not_loaded() {
        let store = Arc::new(MemoryStore::new());
        let company = seed_company(&store, "Viação Azul").await;
        let v1 = seed_vehicle(&store, "4001", "FFF6F66", &company).await;
        let other_day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        seed_record(&store, &v1, "4001", other_day, 0).await;

        let engine = ReconciliationEngine::new(store, SAO_PAULO_TZ);
        let view = engine.load_day(day(), &[work_item(&v1, "4001")]).await.unwrap();

        assert_eq!(view.progress.done, 0);
        assert!(!view.items[0].is_done());
    }
}

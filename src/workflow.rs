use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::connectivity::{Connectivity, ConnectivityMonitor, Transition};
use crate::constants::{
    DAY_EXPORT_HEADERS, OPERATION_DAY_KEY, RECORDS_COLLECTION, RECORD_LOGS_COLLECTION,
};
use crate::error::{Result, TrackerError};
use crate::filters::{self, ListAction, ListState, Page};
use crate::models::fleet::WorkItem;
use crate::models::operator::Operator;
use crate::models::records::{offline_sync_audit_fields, NewRecord, RecordForm};
use crate::offline::OfflineQueue;
use crate::reconcile::{DayView, Progress, ReconciliationEngine};
use crate::services::FleetService;
use crate::storage::LocalStore;
use crate::store::{instant_to_value, DocumentStore, Fields};
use crate::utils::csv::{build_blob, day_export_filename, CsvExport};
use crate::utils::timezone::{
    day_start, format_datetime_br, format_operation_day, parse_operation_day,
};

/// How a submission landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Written straight to the store.
    Created { id: String },
    /// Captured locally while offline, awaiting the next drain.
    Queued { local_id: String },
}

/// Operator-screen state behind the workflow lock.
struct DashboardState {
    operation_day: Option<NaiveDate>,
    roster: Vec<WorkItem>,
    view: DayView,
    list: ListState,
    /// Bumped on every day switch; a reload that started under an older
    /// generation discards its result instead of overwriting newer state.
    generation: u64,
}

/// The operator's day screen: day selection, submissions (online or queued),
/// the reconciled view and its filter pipeline, and the offline drain.
///
/// All store traffic runs outside the state lock, so a slow reload never
/// blocks filter dispatches or submissions.
pub struct OperatorWorkflow {
    store: Arc<dyn DocumentStore>,
    local: Arc<dyn LocalStore>,
    queue: OfflineQueue,
    monitor: ConnectivityMonitor,
    engine: ReconciliationEngine,
    fleet: FleetService,
    operator: Operator,
    timezone: Tz,
    state: Mutex<DashboardState>,
}

impl OperatorWorkflow {
    /// Assemble the workflow and restore the persisted operation day.
    /// Connectivity starts online; the view stays empty until the first
    /// `refresh` or `select_operation_day`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        local: Arc<dyn LocalStore>,
        operator: Operator,
        config: &AppConfig,
    ) -> Self {
        let queue = OfflineQueue::new(local.clone());
        let engine = ReconciliationEngine::new(store.clone(), config.timezone);
        let fleet = FleetService::new(store.clone());
        let operation_day = restore_operation_day(local.as_ref());
        Self {
            store,
            local,
            queue,
            monitor: ConnectivityMonitor::default(),
            engine,
            fleet,
            operator,
            timezone: config.timezone,
            state: Mutex::new(DashboardState {
                operation_day,
                roster: Vec::new(),
                view: DayView::default(),
                list: ListState::new(config.default_page_size),
                generation: 0,
            }),
        }
    }

    pub async fn operation_day(&self) -> Option<NaiveDate> {
        self.state.lock().await.operation_day
    }

    pub fn connectivity(&self) -> Connectivity {
        self.monitor.current()
    }

    /// Queued submissions awaiting drain.
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Parse, persist and switch to a new operation day, then reload.
    /// Filters and the page window carry over from the previous day.
    pub async fn select_operation_day(&self, raw: &str) -> Result<()> {
        let day = parse_operation_day(raw)?;
        self.local
            .set(OPERATION_DAY_KEY, &format_operation_day(day))?;
        {
            let mut state = self.state.lock().await;
            state.operation_day = Some(day);
            state.generation += 1;
        }
        info!(day = %day, "Operation day selected");
        self.refresh().await
    }

    /// Load the vehicle roster without touching records; the submission
    /// select list needs it before a day is chosen.
    pub async fn load_roster(&self) -> Result<Vec<WorkItem>> {
        let roster = self.fleet.load_roster().await?;
        let mut state = self.state.lock().await;
        state.roster = roster.clone();
        Ok(roster)
    }

    /// Reload the roster and the selected day's records, then swap the
    /// merged view in. On failure the previous view stays. A result that
    /// raced with a day switch is discarded.
    pub async fn refresh(&self) -> Result<()> {
        let (day, generation) = {
            let state = self.state.lock().await;
            let day = state.operation_day.ok_or_else(no_day_selected)?;
            (day, state.generation)
        };

        let roster = self.fleet.load_roster().await?;
        let view = self.engine.load_day(day, &roster).await?;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(day = %day, "Discarding reload for a superseded day");
            return Ok(());
        }
        state.roster = roster;
        state.view = view;
        debug!(
            done = state.view.progress.done,
            total = state.view.progress.total,
            "Day view refreshed"
        );
        Ok(())
    }

    /// Validate and submit one reading for the selected day.
    ///
    /// Offline submissions are captured in the local queue and count as
    /// accepted; they replay through the same create path on the next drain.
    pub async fn submit_reading(&self, form: &RecordForm) -> Result<SubmissionOutcome> {
        let (day, work_item) = {
            let state = self.state.lock().await;
            let day = state.operation_day.ok_or_else(no_day_selected)?;
            if form.vehicle_id.is_empty() {
                return Err(TrackerError::validation("vehicleId", "select a vehicle"));
            }
            let work_item = state
                .roster
                .iter()
                .find(|w| w.vehicle_id == form.vehicle_id)
                .cloned()
                .ok_or_else(|| {
                    TrackerError::validation("vehicleId", "vehicle is not on the day's roster")
                })?;
            (day, work_item)
        };
        let (physical, electronic) = form.channels()?;

        let record = NewRecord {
            vehicle_id: form.vehicle_id.clone(),
            vehicle_number: work_item.vehicle_number.clone(),
            physical,
            electronic,
            observation: form.observation.clone(),
            journey_closed: form.journey_closed,
            operator_id: self.operator.id.clone(),
            operator_name: self.operator.name.clone(),
            created_at: Utc::now(),
            operation_date: day_start(self.timezone, day),
        };

        let outcome = if self.monitor.is_offline() {
            let entry = self.queue.enqueue(record.to_fields())?;
            info!(
                local_id = %entry.local_id,
                vehicle = %record.vehicle_number,
                "Submission queued while offline"
            );
            SubmissionOutcome::Queued {
                local_id: entry.local_id,
            }
        } else {
            let id = self
                .store
                .create(RECORDS_COLLECTION, record.to_fields())
                .await?;
            info!(record_id = %id, vehicle = %record.vehicle_number, "Reading submitted");
            SubmissionOutcome::Created { id }
        };

        if let Err(e) = self.refresh().await {
            warn!("View reload after submission failed: {e}");
        }
        Ok(outcome)
    }

    /// Rewrite one stored record's reading fields. Editing requires
    /// connectivity; updates have no offline path.
    pub async fn save_edit(&self, record_id: &str, form: &RecordForm) -> Result<()> {
        let (physical, electronic) = form.channels()?;
        if self.monitor.is_offline() {
            return Err(TrackerError::store("cannot edit a record while offline"));
        }

        let (physical_value, physical_unreadable) = physical.as_parts();
        let (electronic_value, validator_broken) = electronic.as_parts();
        let mut fields = Fields::new();
        fields.insert(
            "physicalReading".into(),
            physical_value.map(Value::from).unwrap_or(Value::Null),
        );
        fields.insert(
            "electronicReading".into(),
            electronic_value.map(Value::from).unwrap_or(Value::Null),
        );
        fields.insert("physicalUnreadable".into(), Value::Bool(physical_unreadable));
        fields.insert("validatorBroken".into(), Value::Bool(validator_broken));
        fields.insert("observation".into(), Value::String(form.observation.clone()));
        fields.insert("journeyClosed".into(), Value::Bool(form.journey_closed));
        fields.insert("updatedAt".into(), instant_to_value(Utc::now()));
        self.store
            .update(RECORDS_COLLECTION, record_id, fields)
            .await?;
        info!(record_id, "Record updated");

        if let Err(e) = self.refresh().await {
            warn!("View reload after edit failed: {e}");
        }
        Ok(())
    }

    /// Feed one connectivity signal in. An offline-to-online edge drains the
    /// queue; the drained entry count comes back.
    pub async fn set_connectivity(&self, next: Connectivity) -> Result<usize> {
        match self.monitor.apply(next) {
            Transition::WentOnline => self.sync_offline_queue().await,
            _ => Ok(0),
        }
    }

    /// Replay every queued submission in FIFO order through the normal
    /// create path, writing one audit-log entry per replayed record.
    ///
    /// Holds the drain permit for the duration; when a drain is already
    /// running this call backs off as a no-op. Any replay failure aborts
    /// with the whole queue intact for the next attempt.
    pub async fn sync_offline_queue(&self) -> Result<usize> {
        let _permit = match self.monitor.begin_drain() {
            Some(permit) => permit,
            None => {
                debug!("Drain already in progress; backing off");
                return Ok(0);
            }
        };

        let store = self.store.clone();
        let drained = self
            .queue
            .drain_all(|entry| {
                let store = store.clone();
                async move {
                    store
                        .create(RECORDS_COLLECTION, entry.payload.clone())
                        .await?;
                    store
                        .create(
                            RECORD_LOGS_COLLECTION,
                            offline_sync_audit_fields(&entry.payload, Utc::now()),
                        )
                        .await?;
                    Ok(())
                }
            })
            .await?;

        if drained > 0 {
            info!(drained, "Offline queue synchronized");
            let has_day = self.state.lock().await.operation_day.is_some();
            if has_day {
                if let Err(e) = self.refresh().await {
                    warn!("View reload after drain failed: {e}");
                }
            }
        }
        Ok(drained)
    }

    /// Apply one listing action to the filter/page state.
    pub async fn dispatch(&self, action: ListAction) {
        let mut state = self.state.lock().await;
        state.list = filters::reduce(&state.list, action);
    }

    /// The current filtered, sorted page of the day view.
    pub async fn page(&self) -> Page {
        let state = self.state.lock().await;
        filters::apply(&state.view.items, &state.list)
    }

    pub async fn list_state(&self) -> ListState {
        self.state.lock().await.list.clone()
    }

    pub async fn progress(&self) -> Progress {
        self.state.lock().await.view.progress
    }

    /// Semicolon-delimited export of every completed reading of the day,
    /// regardless of the active filters.
    pub async fn export_day_csv(&self) -> Result<CsvExport> {
        let state = self.state.lock().await;
        let day = state.operation_day.ok_or_else(no_day_selected)?;
        let rows: Vec<Vec<String>> = state
            .view
            .items
            .iter()
            .filter_map(|item| item.as_done())
            .map(|done| {
                let record = &done.record;
                vec![
                    record.vehicle_number.clone(),
                    done.vehicle_plate.clone(),
                    done.company_name.clone(),
                    reading_cell(record.physical.value()),
                    reading_cell(record.electronic.value()),
                    yes_no(record.physical.is_defective()),
                    yes_no(record.electronic.is_defective()),
                    record.observation.clone(),
                    yes_no(record.journey_closed),
                    record.operator_name.clone(),
                    record
                        .created_at
                        .map(|c| format_datetime_br(c, self.timezone))
                        .unwrap_or_default(),
                ]
            })
            .collect();
        Ok(CsvExport {
            filename: day_export_filename(day),
            content: build_blob(&DAY_EXPORT_HEADERS, &rows, ';'),
        })
    }
}

fn no_day_selected() -> TrackerError {
    TrackerError::validation("operationDate", "select the operation day first")
}

fn restore_operation_day(local: &dyn LocalStore) -> Option<NaiveDate> {
    let raw = local.get(OPERATION_DAY_KEY).ok().flatten()?;
    match parse_operation_day(&raw) {
        Ok(day) => Some(day),
        Err(_) => {
            warn!(stored = %raw, "Discarding malformed persisted operation day");
            None
        }
    }
}

fn reading_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "Sim" } else { "Não" };
    label.to_string()
}

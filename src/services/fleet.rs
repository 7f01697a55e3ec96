use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::constants::{COMPANIES_COLLECTION, VEHICLES_COLLECTION};
use crate::error::{Result, TrackerError};
use crate::models::fleet::{Company, Vehicle, WorkItem};
use crate::store::{instant_to_value, DocumentStore, FieldFilter, Fields, OrderBy};

/// Row-rejection motives surfaced on the registry screen, in the display
/// language of the rest of the export surface.
pub const IMPORT_DUPLICATE_NUMBER: &str = "Número de veículo já cadastrado";
pub const IMPORT_UNKNOWN_COMPANY: &str = "Empresa não encontrada";
pub const IMPORT_BLANK_FIELDS: &str = "Campos obrigatórios em branco";

/// One rejected roster import row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRowError {
    /// 1-based position among the non-blank lines of the file.
    pub line: usize,
    pub number: String,
    pub reason: String,
}

/// Outcome of a roster CSV import: rows created plus per-row rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<ImportRowError>,
}

/// Fleet registry: companies and vehicles, plus the active-roster join the
/// operation day runs against.
pub struct FleetService {
    store: Arc<dyn DocumentStore>,
}

impl FleetService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every company ordered by name, for the registry screen.
    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let docs = self
            .store
            .query(COMPANIES_COLLECTION, &[], Some(&OrderBy::asc("name")))
            .await?;
        Ok(docs.iter().map(Company::from_document).collect())
    }

    /// Active companies ordered by name: the set vehicles may reference.
    pub async fn active_companies(&self) -> Result<Vec<Company>> {
        let docs = self
            .store
            .query(
                COMPANIES_COLLECTION,
                &[FieldFilter::eq("isActive", true)],
                Some(&OrderBy::asc("name")),
            )
            .await?;
        Ok(docs.iter().map(Company::from_document).collect())
    }

    pub async fn create_company(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("name", "company name is required"));
        }
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::String(name.to_string()));
        fields.insert("isActive".into(), Value::Bool(true));
        fields.insert("createdAt".into(), instant_to_value(Utc::now()));
        let id = self.store.create(COMPANIES_COLLECTION, fields).await?;
        info!(company_id = %id, name, "Company created");
        Ok(id)
    }

    pub async fn rename_company(&self, id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("name", "company name is required"));
        }
        self.ensure_exists(COMPANIES_COLLECTION, "company", id).await?;
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::String(name.to_string()));
        self.store.update(COMPANIES_COLLECTION, id, fields).await
    }

    pub async fn set_company_active(&self, id: &str, active: bool) -> Result<()> {
        self.ensure_exists(COMPANIES_COLLECTION, "company", id).await?;
        let mut fields = Fields::new();
        fields.insert("isActive".into(), Value::Bool(active));
        self.store.update(COMPANIES_COLLECTION, id, fields).await?;
        info!(company_id = %id, active, "Company active flag updated");
        Ok(())
    }

    /// Every vehicle ordered by number, for the registry screen and the
    /// duplicate-number check.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let docs = self
            .store
            .query(VEHICLES_COLLECTION, &[], Some(&OrderBy::asc("number")))
            .await?;
        Ok(docs.iter().map(Vehicle::from_document).collect())
    }

    pub async fn active_vehicles(&self) -> Result<Vec<Vehicle>> {
        let docs = self
            .store
            .query(
                VEHICLES_COLLECTION,
                &[FieldFilter::eq("isActive", true)],
                None,
            )
            .await?;
        Ok(docs.iter().map(Vehicle::from_document).collect())
    }

    /// The day's work roster: every active vehicle joined with its company
    /// display name. Only active companies join; an unresolved reference
    /// degrades to an empty name.
    pub async fn load_roster(&self) -> Result<Vec<WorkItem>> {
        let vehicles = self.active_vehicles().await?;
        let companies = self.active_companies().await?;
        let names: HashMap<&str, &str> = companies
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();
        Ok(vehicles
            .iter()
            .map(|vehicle| {
                let name = names
                    .get(vehicle.company_id.as_str())
                    .copied()
                    .unwrap_or_default();
                WorkItem::from_vehicle(vehicle, name)
            })
            .collect())
    }

    /// Register one vehicle. The plate is stored upper-case and the vehicle
    /// number must be unique across the whole registry, active or not.
    pub async fn create_vehicle(
        &self,
        number: &str,
        plate: &str,
        vehicle_type: &str,
        company_id: &str,
    ) -> Result<String> {
        let number = number.trim();
        let plate = plate.trim().to_uppercase();
        if number.is_empty() {
            return Err(TrackerError::validation(
                "number",
                "vehicle number is required",
            ));
        }
        if plate.is_empty() {
            return Err(TrackerError::validation("plate", "plate is required"));
        }
        if company_id.trim().is_empty() {
            return Err(TrackerError::validation(
                "companyId",
                "company is required",
            ));
        }
        let existing = self
            .store
            .query(
                VEHICLES_COLLECTION,
                &[FieldFilter::eq("number", number)],
                None,
            )
            .await?;
        if !existing.is_empty() {
            return Err(TrackerError::validation("number", IMPORT_DUPLICATE_NUMBER));
        }
        let id = self
            .store
            .create(
                VEHICLES_COLLECTION,
                vehicle_fields(number, &plate, vehicle_type.trim(), company_id.trim()),
            )
            .await?;
        info!(vehicle_id = %id, number, "Vehicle created");
        Ok(id)
    }

    pub async fn set_vehicle_active(&self, id: &str, active: bool) -> Result<()> {
        self.ensure_exists(VEHICLES_COLLECTION, "vehicle", id).await?;
        let mut fields = Fields::new();
        fields.insert("isActive".into(), Value::Bool(active));
        self.store.update(VEHICLES_COLLECTION, id, fields).await?;
        info!(vehicle_id = %id, active, "Vehicle active flag updated");
        Ok(())
    }

    /// Bulk roster import from semicolon-separated text, one vehicle per
    /// line: `number;plate;type;company-name`.
    ///
    /// Rows are validated independently so one bad line never blocks the
    /// rest: blank required fields, an already-registered number (in the
    /// store or earlier in the same file) and an unknown active-company name
    /// each reject only their own row. Valid rows are created as active
    /// vehicles with the plate upper-cased.
    pub async fn import_roster_csv(&self, text: &str) -> Result<ImportReport> {
        let companies = self.active_companies().await?;
        let company_ids: HashMap<String, &str> = companies
            .iter()
            .map(|c| (c.name.to_lowercase(), c.id.as_str()))
            .collect();
        let mut known_numbers: HashSet<String> = self
            .list_vehicles()
            .await?
            .into_iter()
            .map(|v| v.number)
            .collect();

        let mut report = ImportReport::default();
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate();
        for (index, line) in rows {
            let line_no = index + 1;
            let mut parts = line.split(';');
            let number = parts.next().unwrap_or_default().trim().to_string();
            let plate = parts.next().unwrap_or_default().trim().to_uppercase();
            let vehicle_type = parts.next().unwrap_or_default().trim().to_string();
            let company = parts.next().unwrap_or_default().trim().to_string();

            if number.is_empty() || plate.is_empty() || company.is_empty() {
                report.errors.push(row_error(line_no, &number, IMPORT_BLANK_FIELDS));
                continue;
            }
            if known_numbers.contains(&number) {
                report
                    .errors
                    .push(row_error(line_no, &number, IMPORT_DUPLICATE_NUMBER));
                continue;
            }
            let company_id = match company_ids.get(&company.to_lowercase()) {
                Some(id) => *id,
                None => {
                    report
                        .errors
                        .push(row_error(line_no, &number, IMPORT_UNKNOWN_COMPANY));
                    continue;
                }
            };

            self.store
                .create(
                    VEHICLES_COLLECTION,
                    vehicle_fields(&number, &plate, &vehicle_type, company_id),
                )
                .await?;
            known_numbers.insert(number);
            report.imported += 1;
        }

        info!(
            imported = report.imported,
            rejected = report.errors.len(),
            "Roster import finished"
        );
        Ok(report)
    }

    async fn ensure_exists(
        &self,
        collection: &str,
        entity: &'static str,
        id: &str,
    ) -> Result<()> {
        match self.store.get(collection, id).await? {
            Some(_) => Ok(()),
            None => Err(TrackerError::lookup(entity, id)),
        }
    }
}

fn row_error(line: usize, number: &str, reason: &str) -> ImportRowError {
    ImportRowError {
        line,
        number: number.to_string(),
        reason: reason.to_string(),
    }
}

fn vehicle_fields(number: &str, plate: &str, vehicle_type: &str, company_id: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("number".into(), Value::String(number.to_string()));
    fields.insert("plate".into(), Value::String(plate.to_string()));
    fields.insert("type".into(), Value::String(vehicle_type.to_string()));
    fields.insert("companyId".into(), Value::String(company_id.to_string()));
    fields.insert("isActive".into(), Value::Bool(true));
    fields.insert("createdAt".into(), instant_to_value(Utc::now()));
    fields
}

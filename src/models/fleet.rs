use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

/// A transport company owning vehicles.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.string_or_empty("name"),
            is_active: doc.bool_field("isActive"),
            created_at: doc.instant_field("createdAt"),
        }
    }
}

/// A fleet vehicle expected to produce one reading per operation day.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Vehicle {
    pub id: String,
    pub number: String,
    pub plate: String,
    pub vehicle_type: String,
    pub company_id: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            number: doc.string_or_empty("number"),
            plate: doc.string_or_empty("plate"),
            vehicle_type: doc.string_or_empty("type"),
            company_id: doc.string_or_empty("companyId"),
            is_active: doc.bool_field("isActive"),
            created_at: doc.instant_field("createdAt"),
        }
    }
}

/// An active vehicle joined with its company display name: the unit of work
/// for one operation day. Identity is `vehicle_id`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkItem {
    pub vehicle_id: String,
    pub vehicle_number: String,
    pub vehicle_plate: String,
    pub company_id: String,
    pub company_name: String,
}

impl WorkItem {
    pub fn from_vehicle(vehicle: &Vehicle, company_name: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle.id.clone(),
            vehicle_number: vehicle.number.clone(),
            vehicle_plate: vehicle.plate.clone(),
            company_id: vehicle.company_id.clone(),
            company_name: company_name.into(),
        }
    }
}

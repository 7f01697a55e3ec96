use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants;
use crate::error::{Result, TrackerError};
use crate::models::fleet::WorkItem;
use crate::store::{instant_to_value, Document, Fields};

/// One turnstile counter channel.
///
/// A channel either produced a count or was flagged defective (physical
/// counter unreadable, electronic validator broken). The two-field shape
/// (nullable value + boolean flag) exists only at the document boundary;
/// a document carrying neither value nor flag is normalized to defective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelReading {
    Counted(i64),
    Defective,
}

impl ChannelReading {
    /// Rebuild a channel from its stored pair. The defect flag wins over a
    /// value that slipped in beside it.
    pub fn from_parts(value: Option<i64>, defect: bool) -> Self {
        if defect {
            Self::Defective
        } else {
            value.map(Self::Counted).unwrap_or(Self::Defective)
        }
    }

    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Counted(v) => Some(*v),
            Self::Defective => None,
        }
    }

    pub fn is_defective(&self) -> bool {
        matches!(self, Self::Defective)
    }

    /// Stored pair form: (nullable value, defect flag).
    pub fn as_parts(&self) -> (Option<i64>, bool) {
        match self {
            Self::Counted(v) => (Some(*v), false),
            Self::Defective => (None, true),
        }
    }
}

/// Mismatch: both channels counted and the counts disagree. A defective
/// channel never classifies as a mismatch.
pub fn channels_mismatch(physical: ChannelReading, electronic: ChannelReading) -> bool {
    match (physical.value(), electronic.value()) {
        (Some(p), Some(e)) => p != e,
        _ => false,
    }
}

/// Absolute count difference, present only when both channels counted.
pub fn channels_difference(physical: ChannelReading, electronic: ChannelReading) -> Option<i64> {
    match (physical.value(), electronic.value()) {
        (Some(p), Some(e)) => Some((p - e).abs()),
        _ => None,
    }
}

/// Operator-entered submission form, exactly as the input surface hands it
/// over: free-text counter values plus defect checkboxes.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RecordForm {
    pub vehicle_id: String,
    pub physical_value: String,
    pub physical_unreadable: bool,
    pub electronic_value: String,
    pub validator_broken: bool,
    pub observation: String,
    pub journey_closed: bool,
}

impl RecordForm {
    /// Validate both channels: each needs a numeric value or its defect flag.
    /// The defect flag wins over any entered value.
    pub fn channels(&self) -> Result<(ChannelReading, ChannelReading)> {
        let physical = parse_channel(
            &self.physical_value,
            self.physical_unreadable,
            "physicalReading",
            "enter the physical reading or mark it unreadable",
        )?;
        let electronic = parse_channel(
            &self.electronic_value,
            self.validator_broken,
            "electronicReading",
            "enter the electronic reading or mark the validator broken",
        )?;
        Ok((physical, electronic))
    }
}

fn parse_channel(
    raw: &str,
    defect: bool,
    field: &'static str,
    missing_message: &str,
) -> Result<ChannelReading> {
    if defect {
        return Ok(ChannelReading::Defective);
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation(field, missing_message));
    }
    trimmed
        .parse::<i64>()
        .map(ChannelReading::Counted)
        .map_err(|_| {
            TrackerError::validation(field, format!("'{trimmed}' is not a whole number"))
        })
}

/// A validated create payload, not yet assigned a store id. This is what the
/// offline queue carries (in wire form) and what the store receives.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub vehicle_id: String,
    pub vehicle_number: String,
    pub physical: ChannelReading,
    pub electronic: ChannelReading,
    pub observation: String,
    pub journey_closed: bool,
    pub operator_id: String,
    pub operator_name: String,
    pub created_at: DateTime<Utc>,
    pub operation_date: DateTime<Utc>,
}

impl NewRecord {
    /// Wire form for `create`: camelCase keys, channels flattened to their
    /// nullable-value + defect-flag pairs.
    pub fn to_fields(&self) -> Fields {
        let (physical_value, physical_unreadable) = self.physical.as_parts();
        let (electronic_value, validator_broken) = self.electronic.as_parts();
        let mut fields = Fields::new();
        fields.insert("vehicleId".into(), Value::String(self.vehicle_id.clone()));
        fields.insert(
            "vehicleNumber".into(),
            Value::String(self.vehicle_number.clone()),
        );
        fields.insert("physicalReading".into(), int_or_null(physical_value));
        fields.insert("electronicReading".into(), int_or_null(electronic_value));
        fields.insert("physicalUnreadable".into(), Value::Bool(physical_unreadable));
        fields.insert("validatorBroken".into(), Value::Bool(validator_broken));
        fields.insert("observation".into(), Value::String(self.observation.clone()));
        fields.insert("journeyClosed".into(), Value::Bool(self.journey_closed));
        fields.insert("operatorId".into(), Value::String(self.operator_id.clone()));
        fields.insert(
            "operatorName".into(),
            Value::String(self.operator_name.clone()),
        );
        fields.insert("createdAt".into(), instant_to_value(self.created_at));
        fields.insert("operationDate".into(), instant_to_value(self.operation_date));
        fields
    }
}

fn int_or_null(value: Option<i64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// A stored turnstile record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TurnstileRecord {
    pub id: String,
    pub vehicle_id: String,
    pub vehicle_number: String,
    pub physical: ChannelReading,
    pub electronic: ChannelReading,
    pub observation: String,
    pub journey_closed: bool,
    pub operator_id: String,
    pub operator_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub operation_date: Option<DateTime<Utc>>,
}

impl TurnstileRecord {
    /// Lenient mapping from a stored document; missing display fields become
    /// empty strings rather than failing the batch.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            vehicle_id: doc.string_or_empty("vehicleId"),
            vehicle_number: doc.string_or_empty("vehicleNumber"),
            physical: ChannelReading::from_parts(
                doc.i64_field("physicalReading"),
                doc.bool_field("physicalUnreadable"),
            ),
            electronic: ChannelReading::from_parts(
                doc.i64_field("electronicReading"),
                doc.bool_field("validatorBroken"),
            ),
            observation: doc.string_or_empty("observation"),
            journey_closed: doc.bool_field("journeyClosed"),
            operator_id: doc.string_or_empty("operatorId"),
            operator_name: doc.string_or_empty("operatorName"),
            created_at: doc.instant_field("createdAt"),
            operation_date: doc.instant_field("operationDate"),
        }
    }

    pub fn has_mismatch(&self) -> bool {
        channels_mismatch(self.physical, self.electronic)
    }

    pub fn difference(&self) -> Option<i64> {
        channels_difference(self.physical, self.electronic)
    }
}

/// A completed item in the merged day view: the record plus display
/// attributes resolved from the vehicle and company references.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DoneRecord {
    pub record: TurnstileRecord,
    pub vehicle_plate: String,
    pub company_name: String,
}

/// One entry of the reconciled day view, exactly one per vehicle: either a
/// vehicle still awaiting its reading or a completed record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MergedItem {
    Pending(WorkItem),
    Done(DoneRecord),
}

impl MergedItem {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn vehicle_id(&self) -> &str {
        match self {
            Self::Pending(item) => &item.vehicle_id,
            Self::Done(done) => &done.record.vehicle_id,
        }
    }

    pub fn vehicle_number(&self) -> &str {
        match self {
            Self::Pending(item) => &item.vehicle_number,
            Self::Done(done) => &done.record.vehicle_number,
        }
    }

    pub fn vehicle_plate(&self) -> &str {
        match self {
            Self::Pending(item) => &item.vehicle_plate,
            Self::Done(done) => &done.vehicle_plate,
        }
    }

    pub fn company_name(&self) -> &str {
        match self {
            Self::Pending(item) => &item.company_name,
            Self::Done(done) => &done.company_name,
        }
    }

    /// Operator display name; pending items have none.
    pub fn operator_name(&self) -> &str {
        match self {
            Self::Pending(_) => "",
            Self::Done(done) => &done.record.operator_name,
        }
    }

    /// Submission instant; pending items (and malformed documents) have none.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending(_) => None,
            Self::Done(done) => done.record.created_at,
        }
    }

    pub fn journey_closed(&self) -> Option<bool> {
        match self {
            Self::Pending(_) => None,
            Self::Done(done) => Some(done.record.journey_closed),
        }
    }

    /// Three-way discrepancy classification: `Some(true)` mismatch,
    /// `Some(false)` clean match, `None` for pending items or any defective
    /// channel (excluded from both filter answers).
    pub fn discrepancy(&self) -> Option<bool> {
        match self {
            Self::Pending(_) => None,
            Self::Done(done) => {
                let record = &done.record;
                match (record.physical.value(), record.electronic.value()) {
                    (Some(p), Some(e)) => Some(p != e),
                    _ => None,
                }
            }
        }
    }

    pub fn as_done(&self) -> Option<&DoneRecord> {
        match self {
            Self::Done(done) => Some(done),
            Self::Pending(_) => None,
        }
    }
}

/// Audit-log fields for one replayed offline submission.
pub fn offline_sync_audit_fields(payload: &Fields, drained_at: DateTime<Utc>) -> Fields {
    let copy_str = |key: &str| -> Value {
        Value::String(
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )
    };
    let mut fields = Fields::new();
    fields.insert(
        "action".into(),
        Value::String(constants::ACTION_CREATE_OFFLINE_SYNC.into()),
    );
    fields.insert("vehicleId".into(), copy_str("vehicleId"));
    fields.insert("operatorId".into(), copy_str("operatorId"));
    fields.insert("operatorName".into(), copy_str("operatorName"));
    fields.insert("createdAt".into(), instant_to_value(drained_at));
    fields.insert("payload".into(), Value::Object(payload.clone()));
    fields
}

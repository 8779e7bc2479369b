//! Tracked field catalog for contractors and service points.
//!
//! Every field that can appear in a change-set is listed here together with
//! its wire name, database column and value kind. Values cross the change-set
//! boundary as `serde_json::Value` and are converted into a typed
//! [`FieldValue`] before anything is written.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::snapshot::{ContractorSnapshot, ServicePointSnapshot};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Contractor status
// ---------------------------------------------------------------------------

/// Commercial status of a contractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractorStatus {
    Potential,
    Active,
    Inactive,
}

impl ContractorStatus {
    /// String representation for the wire format and database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Potential => "potential",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse from the database / wire representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "potential" => Ok(Self::Potential),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(CoreError::Validation(format!(
                "Unknown contractor status '{other}'. Must be one of: potential, active, inactive"
            ))),
        }
    }
}

impl std::fmt::Display for ContractorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// How a tracked field is stored and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Nullable text. Empty strings are stored as NULL.
    Text,
    /// Non-empty text.
    RequiredText,
    /// Non-null integer.
    Integer,
    /// Non-null boolean.
    Boolean,
    /// Nullable foreign key.
    Reference,
    /// [`ContractorStatus`] stored as text.
    Status,
}

/// A type-checked value ready to be written to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(i32),
    Boolean(bool),
    Reference(Option<DbId>),
    Status(ContractorStatus),
}

impl FieldValue {
    /// Convert a change-set value into a typed value for `kind`.
    ///
    /// `field` is only used in error messages.
    pub fn from_json(kind: FieldKind, field: &str, value: &Value) -> Result<Self, CoreError> {
        let mismatch = |expected: &str| {
            CoreError::Validation(format!(
                "Field '{field}' expects {expected}, got {value}"
            ))
        };

        match kind {
            FieldKind::Text => match value {
                Value::Null => Ok(Self::Text(None)),
                Value::String(s) if s.is_empty() => Ok(Self::Text(None)),
                Value::String(s) => Ok(Self::Text(Some(s.clone()))),
                _ => Err(mismatch("a string or null")),
            },
            FieldKind::RequiredText => match value {
                Value::String(s) if !s.trim().is_empty() => Ok(Self::Text(Some(s.clone()))),
                _ => Err(mismatch("a non-empty string")),
            },
            FieldKind::Integer => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Self::Integer)
                .ok_or_else(|| mismatch("an integer")),
            FieldKind::Boolean => value
                .as_bool()
                .map(Self::Boolean)
                .ok_or_else(|| mismatch("a boolean")),
            FieldKind::Reference => match value {
                Value::Null => Ok(Self::Reference(None)),
                Value::String(s) if s.is_empty() => Ok(Self::Reference(None)),
                Value::String(s) => s
                    .parse::<DbId>()
                    .map(|id| Self::Reference(Some(id)))
                    .map_err(|_| mismatch("a UUID string or null")),
                _ => Err(mismatch("a UUID string or null")),
            },
            FieldKind::Status => match value {
                Value::String(s) => ContractorStatus::parse(s).map(Self::Status),
                _ => Err(mismatch("a contractor status string")),
            },
        }
    }

    /// The change-set representation of this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(v) => v.clone().map(Value::String).unwrap_or(Value::Null),
            Self::Integer(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Reference(id) => id.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null),
            Self::Status(s) => Value::String(s.as_str().to_string()),
        }
    }

    fn into_text(self, field: &str) -> Result<Option<String>, CoreError> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(kind_error(field, &other)),
        }
    }

    fn into_required_text(self, field: &str) -> Result<String, CoreError> {
        match self {
            Self::Text(Some(v)) => Ok(v),
            other => Err(kind_error(field, &other)),
        }
    }

    fn into_integer(self, field: &str) -> Result<i32, CoreError> {
        match self {
            Self::Integer(n) => Ok(n),
            other => Err(kind_error(field, &other)),
        }
    }

    fn into_boolean(self, field: &str) -> Result<bool, CoreError> {
        match self {
            Self::Boolean(b) => Ok(b),
            other => Err(kind_error(field, &other)),
        }
    }

    fn into_reference(self, field: &str) -> Result<Option<DbId>, CoreError> {
        match self {
            Self::Reference(id) => Ok(id),
            other => Err(kind_error(field, &other)),
        }
    }

    fn into_status(self, field: &str) -> Result<ContractorStatus, CoreError> {
        match self {
            Self::Status(s) => Ok(s),
            other => Err(kind_error(field, &other)),
        }
    }
}

fn kind_error(field: &str, value: &FieldValue) -> CoreError {
    CoreError::Validation(format!("Value {value:?} does not fit field '{field}'"))
}

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn reference(value: &Option<DbId>) -> Value {
    value.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Contractor fields
// ---------------------------------------------------------------------------

/// Scalar fields of a contractor that participate in diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractorField {
    Inn,
    Name,
    IsChain,
    Status,
    CityId,
    AgreementId,
    ManagerId,
    Notes,
    Description,
    IndividualTerms,
    IsHidden,
}

impl ContractorField {
    pub const ALL: [Self; 11] = [
        Self::Inn,
        Self::Name,
        Self::IsChain,
        Self::Status,
        Self::CityId,
        Self::AgreementId,
        Self::ManagerId,
        Self::Notes,
        Self::Description,
        Self::IndividualTerms,
        Self::IsHidden,
    ];

    /// Key used in the change-set wire format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Inn => "inn",
            Self::Name => "name",
            Self::IsChain => "isChain",
            Self::Status => "status",
            Self::CityId => "cityId",
            Self::AgreementId => "agreementId",
            Self::ManagerId => "managerId",
            Self::Notes => "notes",
            Self::Description => "description",
            Self::IndividualTerms => "individualTerms",
            Self::IsHidden => "isHidden",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Column in the `contractors` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Inn => "inn",
            Self::Name => "name",
            Self::IsChain => "is_chain",
            Self::Status => "status",
            Self::CityId => "city_id",
            Self::AgreementId => "agreement_id",
            Self::ManagerId => "manager_id",
            Self::Notes => "notes",
            Self::Description => "description",
            Self::IndividualTerms => "individual_terms",
            Self::IsHidden => "is_hidden",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Name => FieldKind::RequiredText,
            Self::Inn | Self::Notes | Self::Description | Self::IndividualTerms => FieldKind::Text,
            Self::IsChain | Self::IsHidden => FieldKind::Boolean,
            Self::Status => FieldKind::Status,
            Self::CityId | Self::AgreementId | Self::ManagerId => FieldKind::Reference,
        }
    }

    /// Read the field from a snapshot in change-set representation.
    pub fn read(self, c: &ContractorSnapshot) -> Value {
        match self {
            Self::Inn => text(&c.inn),
            Self::Name => Value::String(c.name.clone()),
            Self::IsChain => Value::Bool(c.is_chain),
            Self::Status => Value::String(c.status.as_str().to_string()),
            Self::CityId => reference(&c.city_id),
            Self::AgreementId => reference(&c.agreement_id),
            Self::ManagerId => reference(&c.manager_id),
            Self::Notes => text(&c.notes),
            Self::Description => text(&c.description),
            Self::IndividualTerms => text(&c.individual_terms),
            Self::IsHidden => Value::Bool(c.is_hidden),
        }
    }

    /// Write a typed value into a snapshot.
    pub fn write(self, c: &mut ContractorSnapshot, value: FieldValue) -> Result<(), CoreError> {
        let name = self.name();
        match self {
            Self::Inn => c.inn = value.into_text(name)?,
            Self::Name => c.name = value.into_required_text(name)?,
            Self::IsChain => c.is_chain = value.into_boolean(name)?,
            Self::Status => c.status = value.into_status(name)?,
            Self::CityId => c.city_id = value.into_reference(name)?,
            Self::AgreementId => c.agreement_id = value.into_reference(name)?,
            Self::ManagerId => c.manager_id = value.into_reference(name)?,
            Self::Notes => c.notes = value.into_text(name)?,
            Self::Description => c.description = value.into_text(name)?,
            Self::IndividualTerms => c.individual_terms = value.into_text(name)?,
            Self::IsHidden => c.is_hidden = value.into_boolean(name)?,
        }
        Ok(())
    }

    /// Convert a change-set value for this field.
    pub fn parse_value(self, value: &Value) -> Result<FieldValue, CoreError> {
        FieldValue::from_json(self.kind(), self.name(), value)
    }
}

// ---------------------------------------------------------------------------
// Service point fields
// ---------------------------------------------------------------------------

/// Scalar fields of a service point that participate in diffs.
///
/// Addon links and files are diffed separately (see `changeset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServicePointField {
    Name,
    Address,
    CrmId,
    CityId,
    FrontsCount,
    FrontsOnService,
    Description,
    Notes,
    IndividualTerms,
}

impl ServicePointField {
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::Address,
        Self::CrmId,
        Self::CityId,
        Self::FrontsCount,
        Self::FrontsOnService,
        Self::Description,
        Self::Notes,
        Self::IndividualTerms,
    ];

    /// Key used in the change-set wire format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::CrmId => "crmId",
            Self::CityId => "cityId",
            Self::FrontsCount => "frontsCount",
            Self::FrontsOnService => "frontsOnService",
            Self::Description => "description",
            Self::Notes => "notes",
            Self::IndividualTerms => "individualTerms",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Column in the `service_points` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::CrmId => "crm_id",
            Self::CityId => "city_id",
            Self::FrontsCount => "fronts_count",
            Self::FrontsOnService => "fronts_on_service",
            Self::Description => "description",
            Self::Notes => "notes",
            Self::IndividualTerms => "individual_terms",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Name => FieldKind::RequiredText,
            Self::Address | Self::CrmId | Self::Description | Self::Notes | Self::IndividualTerms => {
                FieldKind::Text
            }
            Self::CityId => FieldKind::Reference,
            Self::FrontsCount | Self::FrontsOnService => FieldKind::Integer,
        }
    }

    pub fn read(self, p: &ServicePointSnapshot) -> Value {
        match self {
            Self::Name => Value::String(p.name.clone()),
            Self::Address => text(&p.address),
            Self::CrmId => text(&p.crm_id),
            Self::CityId => reference(&p.city_id),
            Self::FrontsCount => Value::from(p.fronts_count),
            Self::FrontsOnService => Value::from(p.fronts_on_service),
            Self::Description => text(&p.description),
            Self::Notes => text(&p.notes),
            Self::IndividualTerms => text(&p.individual_terms),
        }
    }

    pub fn write(self, p: &mut ServicePointSnapshot, value: FieldValue) -> Result<(), CoreError> {
        let name = self.name();
        match self {
            Self::Name => p.name = value.into_required_text(name)?,
            Self::Address => p.address = value.into_text(name)?,
            Self::CrmId => p.crm_id = value.into_text(name)?,
            Self::CityId => p.city_id = value.into_reference(name)?,
            Self::FrontsCount => p.fronts_count = value.into_integer(name)?,
            Self::FrontsOnService => p.fronts_on_service = value.into_integer(name)?,
            Self::Description => p.description = value.into_text(name)?,
            Self::Notes => p.notes = value.into_text(name)?,
            Self::IndividualTerms => p.individual_terms = value.into_text(name)?,
        }
        Ok(())
    }

    pub fn parse_value(self, value: &Value) -> Result<FieldValue, CoreError> {
        FieldValue::from_json(self.kind(), self.name(), value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

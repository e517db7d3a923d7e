//! Common types used across SOX Hub
//!
//! Domain enums for the control registry plus the partial change set that
//! flows through change requests, direct edits, and version history entries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HubError;

/// A role a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// May manage users, edit controls directly, and decide change requests
    Admin,
    /// May own controls and submit change requests against them
    ControlOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ControlOwner => "control-owner",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "control-owner" => Ok(Role::ControlOwner),
            _ => Err(HubError::Parse(format!("invalid role: {}", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Active,
    Inactive,
    Draft,
    Pending,
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::Active => "active",
            ControlStatus::Inactive => "inactive",
            ControlStatus::Draft => "draft",
            ControlStatus::Pending => "pending",
        }
    }
}

impl std::str::FromStr for ControlStatus {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ControlStatus::Active),
            "inactive" => Ok(ControlStatus::Inactive),
            "draft" => Ok(ControlStatus::Draft),
            "pending" => Ok(ControlStatus::Pending),
            _ => Err(HubError::Parse(format!("invalid control status: {}", s))),
        }
    }
}

impl std::fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a control prevents or detects an error condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Preventive,
    Detective,
}

impl ControlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlType::Preventive => "preventive",
            ControlType::Detective => "detective",
        }
    }
}

impl std::str::FromStr for ControlType {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preventive" => Ok(ControlType::Preventive),
            "detective" => Ok(ControlType::Detective),
            _ => Err(HubError::Parse(format!("invalid control type: {}", s))),
        }
    }
}

impl std::fmt::Display for ControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How often a control is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
    AdHoc,
}

impl ControlFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlFrequency::Daily => "daily",
            ControlFrequency::Weekly => "weekly",
            ControlFrequency::Monthly => "monthly",
            ControlFrequency::Quarterly => "quarterly",
            ControlFrequency::Annual => "annual",
            ControlFrequency::AdHoc => "ad-hoc",
        }
    }
}

impl std::str::FromStr for ControlFrequency {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ControlFrequency::Daily),
            "weekly" => Ok(ControlFrequency::Weekly),
            "monthly" => Ok(ControlFrequency::Monthly),
            "quarterly" => Ok(ControlFrequency::Quarterly),
            "annual" => Ok(ControlFrequency::Annual),
            "ad-hoc" => Ok(ControlFrequency::AdHoc),
            _ => Err(HubError::Parse(format!("invalid control frequency: {}", s))),
        }
    }
}

impl std::fmt::Display for ControlFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review status of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(HubError::Parse(format!("invalid request status: {}", s))),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Change Sets
// ============================================================================

/// A partial set of control fields, proposed by a change request or applied
/// by a direct edit. `None` means "leave unchanged".
///
/// Status is deliberately absent: status transitions are a separate admin
/// operation and never travel through a change set. Unknown fields are
/// rejected at deserialization so a proposal cannot smuggle them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<ControlFrequency>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<ControlType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_risks: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_procedures: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_requirements: Option<String>,
}

impl ControlChanges {
    /// True when no field is proposed
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.owner_id.is_none()
            && self.frequency.is_none()
            && self.control_type.is_none()
            && self.related_risks.is_none()
            && self.test_procedures.is_none()
            && self.evidence_requirements.is_none()
    }

    /// Names of the fields this change set touches, in declaration order
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.owner_id.is_some() {
            fields.push("owner_id");
        }
        if self.frequency.is_some() {
            fields.push("frequency");
        }
        if self.control_type.is_some() {
            fields.push("control_type");
        }
        if self.related_risks.is_some() {
            fields.push("related_risks");
        }
        if self.test_procedures.is_some() {
            fields.push("test_procedures");
        }
        if self.evidence_requirements.is_some() {
            fields.push("evidence_requirements");
        }
        fields
    }
}

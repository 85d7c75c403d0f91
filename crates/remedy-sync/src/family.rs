//! Family context and the request/response shapes of the family backend
//!
//! A [`FamilyContext`] exists only while this device is part of a shared
//! family inventory. It is created when the user creates or joins a family
//! and cleared when they leave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryPatch, NewEntry};

/// The shared-inventory session of this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyContext {
    /// Family share code
    pub family_id: String,
    /// Family display name, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// This device's member id
    pub member_id: String,
    /// This device's member display name
    pub member_name: String,
    /// Whether the real-time inventory subscription is running
    #[serde(default)]
    pub sync_active: bool,
}

impl From<FamilyMembership> for FamilyContext {
    fn from(membership: FamilyMembership) -> Self {
        Self {
            family_id: membership.family_id,
            family_name: membership.family_name,
            member_id: membership.member_id,
            member_name: membership.member_name,
            sync_active: false,
        }
    }
}

/// Body of `POST /api/family`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyRequest {
    /// Family display name
    pub family_name: String,
    /// Display name of the creating member
    pub member_name: String,
}

/// Body of `POST /api/family/{family_id}/join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFamilyRequest {
    /// Display name of the joining member
    pub member_name: String,
}

/// Response of the create and join endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMembership {
    /// Family share code
    pub family_id: String,
    /// Family display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Assigned member id
    pub member_id: String,
    /// Member display name
    pub member_name: String,
}

/// A member as listed by `GET /api/family/{family_id}/members`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    /// Member id
    pub id: String,
    /// Display name
    pub name: String,
    /// When the member joined
    pub joined_at: DateTime<Utc>,
}

/// Body of `POST /api/family/{family_id}/medicines`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    /// Entry fields
    #[serde(flatten)]
    pub entry: NewEntry,
    /// Display name of the member making the change
    pub updated_by: String,
}

/// Body of `PUT /api/family/{family_id}/medicines/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineUpdateRequest {
    /// Fields to change
    #[serde(flatten)]
    pub patch: EntryPatch,
    /// Display name of the member making the change
    pub updated_by: String,
}

/// Body of `DELETE /api/family/{family_id}/medicines/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMedicineRequest {
    /// Display name of the member making the change
    pub updated_by: String,
}

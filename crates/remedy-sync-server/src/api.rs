//! HTTP API for families and their shared inventory

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use remedy_sync::family::{
    CreateFamilyRequest, DeleteMedicineRequest, JoinFamilyRequest, MedicineRequest,
    MedicineUpdateRequest,
};
use remedy_sync::{EntryId, FamilyMember, FamilyMembership, InventoryEntry};
use tracing::{info, warn};

use crate::db::FamilyRecord;
use crate::AppState;

type ApiError = (StatusCode, String);

/// Create the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/family", post(create_family))
        .route("/api/family/{family_id}/join", post(join_family))
        .route("/api/family/{family_id}/members", get(list_members))
        .route(
            "/api/family/{family_id}/members/{member_id}",
            delete(remove_member),
        )
        .route(
            "/api/family/{family_id}/medicines",
            get(list_medicines).post(add_medicine),
        )
        .route(
            "/api/family/{family_id}/medicines/{id}",
            delete(delete_medicine).put(update_medicine),
        )
        .with_state(state)
}

fn internal(e: anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn require_family(state: &AppState, family_id: &str) -> Result<FamilyRecord, ApiError> {
    state
        .db
        .get_family(family_id)
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Family not found".to_string()))
}

fn require_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, format!("{field} is required")));
    }
    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

/// Create a family; the caller becomes its first member
async fn create_family(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFamilyRequest>,
) -> Result<Json<FamilyMembership>, ApiError> {
    require_name("familyName", &req.family_name)?;
    require_name("memberName", &req.member_name)?;

    let family = state.db.create_family(&req.family_name).map_err(internal)?;
    let member = state
        .db
        .add_member(&family.id, &req.member_name)
        .map_err(internal)?;

    info!(family_id = %family.id, member = %member.name, "Family created");

    Ok(Json(FamilyMembership {
        family_id: family.id,
        family_name: Some(family.name),
        member_id: member.id,
        member_name: member.name,
    }))
}

/// Join an existing family
async fn join_family(
    State(state): State<Arc<AppState>>,
    Path(family_id): Path<String>,
    Json(req): Json<JoinFamilyRequest>,
) -> Result<Json<FamilyMembership>, ApiError> {
    require_name("memberName", &req.member_name)?;
    let family = require_family(&state, &family_id).map_err(|e| {
        warn!(family_id = %family_id, "Join failed: unknown family");
        e
    })?;

    let member = state
        .db
        .add_member(&family.id, &req.member_name)
        .map_err(internal)?;

    info!(family_id = %family.id, member = %member.name, "Member joined");

    Ok(Json(FamilyMembership {
        family_id: family.id,
        family_name: Some(family.name),
        member_id: member.id,
        member_name: member.name,
    }))
}

/// List the members of a family
async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(family_id): Path<String>,
) -> Result<Json<Vec<FamilyMember>>, ApiError> {
    require_family(&state, &family_id)?;
    let members = state.db.list_members(&family_id).map_err(internal)?;
    Ok(Json(members))
}

/// Remove a member from a family
async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((family_id, member_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    require_family(&state, &family_id)?;

    if state
        .db
        .remove_member(&family_id, &member_id)
        .map_err(internal)?
    {
        info!(family_id = %family_id, member_id = %member_id, "Member left");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Member not found".to_string()))
    }
}

/// The family's whole inventory
async fn list_medicines(
    State(state): State<Arc<AppState>>,
    Path(family_id): Path<String>,
) -> Result<Json<Vec<InventoryEntry>>, ApiError> {
    require_family(&state, &family_id)?;
    let entries = state.db.list_medicines(&family_id).map_err(internal)?;
    Ok(Json(entries))
}

/// Add a medicine, or return the existing one with 409 if the
/// (name, potency, company) triple is taken
async fn add_medicine(
    State(state): State<Arc<AppState>>,
    Path(family_id): Path<String>,
    Json(req): Json<MedicineRequest>,
) -> Result<Response, ApiError> {
    require_family(&state, &family_id)?;
    req.entry
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    if let Some(existing) = state
        .db
        .find_duplicate(&family_id, &req.entry)
        .map_err(internal)?
    {
        warn!(family_id = %family_id, id = existing.id, "Rejected duplicate medicine");
        return Ok((StatusCode::CONFLICT, Json(existing)).into_response());
    }

    let stored = state
        .db
        .insert_medicine(&family_id, &req.entry, &req.updated_by)
        .map_err(internal)?;

    info!(family_id = %family_id, id = stored.id, by = %req.updated_by, "Medicine added");
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

/// Apply a partial update to a medicine
async fn update_medicine(
    State(state): State<Arc<AppState>>,
    Path((family_id, id)): Path<(String, EntryId)>,
    Json(req): Json<MedicineUpdateRequest>,
) -> Result<Json<InventoryEntry>, ApiError> {
    require_family(&state, &family_id)?;
    req.patch
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let updated = state
        .db
        .update_medicine(&family_id, id, &req.patch, &req.updated_by)
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Medicine not found".to_string()))?;

    info!(family_id = %family_id, id, by = %req.updated_by, "Medicine updated");
    Ok(Json(updated))
}

/// Delete a medicine
async fn delete_medicine(
    State(state): State<Arc<AppState>>,
    Path((family_id, id)): Path<(String, EntryId)>,
    Json(req): Json<DeleteMedicineRequest>,
) -> Result<StatusCode, ApiError> {
    require_family(&state, &family_id)?;

    if state.db.delete_medicine(&family_id, id).map_err(internal)? {
        info!(family_id = %family_id, id, by = %req.updated_by, "Medicine deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Medicine not found".to_string()))
    }
}

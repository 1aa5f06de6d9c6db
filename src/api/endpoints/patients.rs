//! Patient record CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db::repository;
use crate::models::{Patient, PatientDraft};

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

fn validate(draft: &PatientDraft) -> Result<(), ApiError> {
    if draft.first_name.trim().is_empty() || draft.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Patient name must not be empty".into()));
    }
    Ok(())
}

/// `POST /api/patients` — register a patient.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(draft): Json<PatientDraft>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    validate(&draft)?;

    let conn = ctx.state.open_db()?;
    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: draft.first_name.trim().to_string(),
        last_name: draft.last_name.trim().to_string(),
        date_of_birth: draft.date_of_birth,
        phone: draft.phone,
        email: draft.email,
        created_at: Local::now().naive_local(),
    };
    repository::insert_patient(&conn, &patient)?;

    ctx.state.record_audit(
        &staff.staff_id,
        "create_patient",
        "patient",
        &patient.id.to_string(),
        "ok",
    );
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients` — list patients.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<PatientsResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let patients = repository::list_patients(&conn)?;
    Ok(Json(PatientsResponse { patients }))
}

/// `GET /api/patients/:id` — patient detail.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.state.open_db()?;
    let patient = repository::get_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {id}")))?;
    Ok(Json(patient))
}

/// `PUT /api/patients/:id` — update a patient record.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(draft): Json<PatientDraft>,
) -> Result<Json<Patient>, ApiError> {
    validate(&draft)?;

    let conn = ctx.state.open_db()?;
    let mut patient = repository::get_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {id}")))?;

    patient.first_name = draft.first_name.trim().to_string();
    patient.last_name = draft.last_name.trim().to_string();
    patient.date_of_birth = draft.date_of_birth;
    patient.phone = draft.phone;
    patient.email = draft.email;
    repository::update_patient(&conn, &patient)?;

    ctx.state
        .record_audit(&staff.staff_id, "update_patient", "patient", &id.to_string(), "ok");
    Ok(Json(patient))
}

/// `DELETE /api/patients/:id` — remove a patient record. Refused while
/// queue entries still reference it.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.state.open_db()?;
    repository::delete_patient(&conn, &id)?;

    ctx.state
        .record_audit(&staff.staff_id, "delete_patient", "patient", &id.to_string(), "ok");
    Ok(StatusCode::NO_CONTENT)
}

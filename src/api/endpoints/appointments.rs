//! Appointment booking and day listings.
//!
//! Booking creates a `Scheduled` queue entry; everything after that goes
//! through the queue lifecycle endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db::repository;
use crate::models::QueueEntry;
use crate::queue::service;

#[derive(Deserialize)]
pub struct BookRequest {
    pub patient_id: Uuid,
    pub date: NaiveDate,
    /// "HH:MM", optional.
    pub time: Option<String>,
}

#[derive(Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub date: NaiveDate,
    pub appointments: Vec<QueueEntry>,
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ApiError::BadRequest(format!("Invalid time '{s}', expected HH:MM")))
}

/// `POST /api/appointments` — book a scheduled appointment.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<QueueEntry>), ApiError> {
    let time = req.time.as_deref().map(parse_time).transpose()?;

    let conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();
    let entry = service::book(&conn, &req.patient_id, req.date, time, now)?;

    ctx.state.record_audit(
        &staff.staff_id,
        "book_appointment",
        "queue_entry",
        &entry.id.to_string(),
        "ok",
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /api/appointments?date=` — the day's entries, booked and walk-in
/// alike. Defaults to today.
pub async fn for_day(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<DayQuery>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let conn = ctx.state.open_db()?;
    let appointments = repository::entries_for_day(&conn, date)?;
    Ok(Json(AppointmentsResponse { date, appointments }))
}

/// `GET /api/appointments/:id` — entry detail.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueEntry>, ApiError> {
    let conn = ctx.state.open_db()?;
    let entry = repository::get_entry(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Appointment not found: {id}")))?;
    Ok(Json(entry))
}

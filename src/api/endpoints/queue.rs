//! Walk-in / queue lifecycle endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::appointments::parse_time;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::{QueueEntry, QueueStats, StaffRole};
use crate::queue::{order, service};

#[derive(Deserialize)]
pub struct WalkInRequest {
    pub patient_id: Uuid,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub diagnosis_summary: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_date: NaiveDate,
    /// "HH:MM", optional.
    pub new_time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub queue: Vec<QueueEntry>,
}

#[derive(Serialize)]
pub struct NextResponse {
    pub next: Option<QueueEntry>,
}

#[derive(Serialize)]
pub struct RescheduleResponse {
    pub original: QueueEntry,
    pub replacement: QueueEntry,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub reset: usize,
}

/// Record the domain-level audit event for a transition, success or not.
fn audited<T>(
    ctx: &ApiContext,
    staff: &StaffContext,
    action: &str,
    id: &Uuid,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.audit_status(),
    };
    ctx.state
        .record_audit(&staff.staff_id, action, "queue_entry", &id.to_string(), status);
    result
}

/// `POST /api/queue/walk-in` — register an arriving walk-in patient.
pub async fn walk_in(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<WalkInRequest>,
) -> Result<(StatusCode, Json<QueueEntry>), ApiError> {
    let mut conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();

    let entry = service::walk_in(&mut conn, &req.patient_id, now).map_err(ApiError::from)?;

    ctx.state.record_audit(
        &staff.staff_id,
        "walk_in",
        "queue_entry",
        &entry.id.to_string(),
        "ok",
    );
    ctx.state.notifier().notify_role(
        StaffRole::Doctor,
        format!("Ticket {} joined the queue", entry.ticket_number.unwrap_or_default()),
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `PUT /api/queue/:id/check-in` — check in a scheduled appointment.
pub async fn check_in(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueEntry>, ApiError> {
    let mut conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();

    let result = service::check_in(&mut conn, &id, now).map_err(ApiError::from);
    let entry = audited(&ctx, &staff, "check_in", &id, result)?;

    ctx.state.notifier().notify_role(
        StaffRole::Doctor,
        format!("Ticket {} joined the queue", entry.ticket_number.unwrap_or_default()),
    );
    Ok(Json(entry))
}

/// `PUT /api/queue/:id/start` — patient enters the consultation room.
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueEntry>, ApiError> {
    let conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();

    let result = service::start_consultation(&conn, &id, now).map_err(ApiError::from);
    let entry = audited(&ctx, &staff, "start", &id, result)?;
    Ok(Json(entry))
}

/// `PUT /api/queue/:id/complete` — finish the consultation.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteRequest>>,
) -> Result<Json<QueueEntry>, ApiError> {
    let conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();
    let diagnosis = body.as_ref().and_then(|b| b.diagnosis_summary.as_deref());

    let result = service::complete(&conn, &id, diagnosis, now).map_err(ApiError::from);
    let entry = audited(&ctx, &staff, "complete", &id, result)?;

    ctx.state.notifier().notify_role(
        StaffRole::Secretary,
        format!("Ticket {} completed", entry.ticket_number.unwrap_or_default()),
    );
    Ok(Json(entry))
}

/// `PUT /api/queue/:id/cancel` — cancel from any non-terminal status.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<QueueEntry>, ApiError> {
    let conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();
    let reason = body.as_ref().and_then(|b| b.reason.as_deref());

    let result = service::cancel(&conn, &id, reason, now).map_err(ApiError::from);
    let entry = audited(&ctx, &staff, "cancel", &id, result)?;
    Ok(Json(entry))
}

/// `PUT /api/queue/:id/no-show` — the patient never arrived.
pub async fn no_show(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueEntry>, ApiError> {
    let conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();

    let result = service::mark_no_show(&conn, &id, now).map_err(ApiError::from);
    let entry = audited(&ctx, &staff, "no_show", &id, result)?;
    Ok(Json(entry))
}

/// `PUT /api/queue/:id/reschedule` — move to a new date; the original is
/// closed out and a linked replacement entry is created.
pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<RescheduleResponse>, ApiError> {
    let new_time = req.new_time.as_deref().map(parse_time).transpose()?;

    let mut conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();

    let result = service::reschedule(
        &mut conn,
        &id,
        req.new_date,
        new_time,
        req.reason.as_deref(),
        now,
    )
    .map_err(ApiError::from);
    let (original, replacement) = audited(&ctx, &staff, "reschedule", &id, result)?;

    Ok(Json(RescheduleResponse {
        original,
        replacement,
    }))
}

/// `PUT /api/queue/reorder` — reassign the waiting line order.
pub async fn reorder(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<QueueResponse>, ApiError> {
    let mut conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();
    let day = now.date();

    let result = order::reorder(&mut conn, day, &req.ordered_ids, now).map_err(ApiError::from);
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.audit_status(),
    };
    ctx.state
        .record_audit(&staff.staff_id, "reorder", "queue", &day.to_string(), status);

    Ok(Json(QueueResponse { queue: result? }))
}

/// `GET /api/queue/today` — the live waiting line.
pub async fn today(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<QueueResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let day = Local::now().date_naive();
    let queue = order::today_queue(&conn, day)?;
    Ok(Json(QueueResponse { queue }))
}

/// `GET /api/queue/next` — who is next in line.
pub async fn next(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<NextResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let day = Local::now().date_naive();
    let next = order::next_in_line(&conn, day)?;
    Ok(Json(NextResponse { next }))
}

/// `GET /api/queue/stats?date=` — daily dashboard numbers.
pub async fn stats(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<DayQuery>,
) -> Result<Json<QueueStats>, ApiError> {
    let conn = ctx.state.open_db()?;
    let day = query.date.unwrap_or_else(|| Local::now().date_naive());
    let stats = service::queue_stats(&conn, day)?;
    Ok(Json(stats))
}

/// `DELETE /api/queue/reset?date=` — administrative bulk reset.
/// Admin role only.
pub async fn reset(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Query(query): Query<DayQuery>,
) -> Result<Json<ResetResponse>, ApiError> {
    if staff.role != StaffRole::Admin {
        return Err(ApiError::Forbidden("Queue reset requires the admin role".into()));
    }

    let mut conn = ctx.state.open_db()?;
    let now = Local::now().naive_local();
    let day = query.date.unwrap_or_else(|| now.date());

    let reset = service::reset_day(&mut conn, day, now)?;

    ctx.state
        .record_audit(&staff.staff_id, "reset_day", "queue", &day.to_string(), "ok");
    ctx.state
        .notifier()
        .notify_role(StaffRole::Secretary, format!("Queue for {day} was reset"));
    Ok(Json(ResetResponse { reset }))
}

use crate::api::load_employee;
use crate::auth::auth::GatewayCaller;
use crate::error::WorkflowError;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;
use crate::workflow::geofence::{Coordinate, GeofenceVerdict};
use crate::workflow::session_tracker::SessionTracker;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AttendanceRequest {
    #[schema(example = "acme", value_type = String)]
    pub tenant_id: TenantId,
    #[schema(example = "emp-001", value_type = String)]
    pub employee_id: EmployeeId,
    #[schema(example = 48.8600, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 2.2945, nullable = true)]
    pub longitude: Option<f64>,
}

impl AttendanceRequest {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

#[derive(Serialize, ToSchema)]
pub struct LocationResponse {
    pub verdict: GeofenceVerdict,
    #[schema(nullable = true)]
    pub warning: Option<String>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked in", body = crate::workflow::WorkflowReply, example = json!({
            "ok": true,
            "text": "Checked in at 08:02.",
            "notification": null
        })),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "ok": false,
            "text": "You already checked in today at 08:02.",
            "retry": false
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee"),
        (status = 503, description = "Storage unavailable, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    payload: web::Json<AttendanceRequest>,
) -> Result<HttpResponse, WorkflowError> {
    let store = store.get_ref();
    let employee =
        load_employee(store, &caller, &payload.tenant_id, &payload.employee_id).await?;

    let checked_in = SessionTracker::new(store)
        .check_in(&employee, Utc::now(), payload.coordinate())
        .await?;

    Ok(HttpResponse::Ok().json(checked_in.reply()))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked out", body = crate::workflow::WorkflowReply, example = json!({
            "ok": true,
            "text": "Checked out. Time worked: 8h05.",
            "notification": null
        })),
        (status = 409, description = "No open session", body = Object, example = json!({
            "ok": false,
            "text": "No open session found: please check in first.",
            "retry": false
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee"),
        (status = 503, description = "Storage unavailable, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    payload: web::Json<AttendanceRequest>,
) -> Result<HttpResponse, WorkflowError> {
    let store = store.get_ref();
    let employee =
        load_employee(store, &caller, &payload.tenant_id, &payload.employee_id).await?;

    let checked_out = SessionTracker::new(store)
        .check_out(&employee, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(checked_out.reply()))
}

/// Location compliance check, without recording anything
#[utoipa::path(
    post,
    path = "/api/attendance/location",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Geofence verdict", body = LocationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn evaluate_location(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    payload: web::Json<AttendanceRequest>,
) -> Result<HttpResponse, WorkflowError> {
    let store = store.get_ref();
    let employee =
        load_employee(store, &caller, &payload.tenant_id, &payload.employee_id).await?;

    let verdict = SessionTracker::new(store)
        .evaluate_location(&employee, payload.coordinate())
        .await?;

    Ok(HttpResponse::Ok().json(LocationResponse {
        warning: verdict.warning_text(),
        verdict,
    }))
}

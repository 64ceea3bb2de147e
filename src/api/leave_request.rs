use crate::api::load_employee;
use crate::auth::auth::GatewayCaller;
use crate::error::WorkflowError;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;
use crate::workflow::leave_workflow::LeaveWorkflow;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "acme", value_type = String)]
    pub tenant_id: TenantId,
    #[schema(example = "emp-001", value_type = String)]
    pub employee_id: EmployeeId,
    /// Raw text as typed, e.g. "05/09" or "leave on 05/09/2026"
    #[schema(example = "05/09/2026")]
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveDecision {
    #[schema(example = "acme", value_type = String)]
    pub tenant_id: TenantId,
    #[schema(example = "mgr-001", value_type = String)]
    pub manager_id: EmployeeId,
    /// Raw reply, e.g. "OK #1a2b3c4d" or "NON #1a2b3c4d"
    #[schema(example = "OK #1a2b3c4d")]
    pub text: String,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request text",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Request recorded and routed to the manager",
         body = crate::workflow::WorkflowReply,
         example = json!({
            "ok": true,
            "text": "Leave request #1a2b3c4d for 05/09/2026 sent to Jane.",
            "notification": {
                "to": "+221770000009",
                "text": "Awa requests leave on 05/09/2026. Reply OK #1a2b3c4d to approve or NON #1a2b3c4d to reject."
            }
         })
        ),
        (status = 400, description = "Date not understood"),
        (status = 422, description = "Recorded, but the tenant has no manager"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, WorkflowError> {
    let store = store.get_ref();
    let employee =
        load_employee(store, &caller, &payload.tenant_id, &payload.employee_id).await?;

    let created = LeaveWorkflow::new(store)
        .create_request(&employee, &payload.text, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(created.reply(&employee)))
}

/* =========================
Approve / reject (manager)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/decision",
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Decision applied", body = crate::workflow::WorkflowReply, example = json!({
            "ok": true,
            "text": "Leave request #1a2b3c4d approved.",
            "notification": {
                "to": "+221770000001",
                "text": "Your leave request for 05/09/2026 was approved."
            }
        })),
        (status = 400, description = "Reply not understood"),
        (status = 403, description = "Sender is not a manager"),
        (status = 409, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn decide_leave(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    payload: web::Json<LeaveDecision>,
) -> Result<HttpResponse, WorkflowError> {
    let store = store.get_ref();
    let manager = load_employee(store, &caller, &payload.tenant_id, &payload.manager_id).await?;

    let decided = LeaveWorkflow::new(store)
        .apply_manager_decision(&manager, &payload.text)
        .await?;

    Ok(HttpResponse::Ok().json(decided.reply()))
}

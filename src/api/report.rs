use crate::api::load_employee;
use crate::auth::auth::GatewayCaller;
use crate::error::WorkflowError;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;
use crate::workflow::weekly_report::{
    DEFAULT_HISTORY_DAYS, History, WeeklyAggregator, WeeklySummary,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Trailing window in days (1-90, default 7)
    pub days: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct WeeklyReportResponse {
    pub text: String,
    pub summary: WeeklySummary,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub text: String,
    pub history: History,
}

#[utoipa::path(
    get,
    path = "/api/report/{tenant_id}/{employee_id}/weekly",
    params(
        ("tenant_id" = String, Path, description = "Tenant of the employee"),
        ("employee_id" = String, Path, description = "Employee to summarize")
    ),
    responses(
        (status = 200, description = "Summary since Monday 00:00 UTC", body = WeeklyReportResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn weekly_summary(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, WorkflowError> {
    let (tenant_id, employee_id) = path.into_inner();
    let (tenant_id, employee_id) = (TenantId(tenant_id), EmployeeId(employee_id));
    let store = store.get_ref();
    load_employee(store, &caller, &tenant_id, &employee_id).await?;

    let summary = WeeklyAggregator::new(store)
        .summarize(&employee_id, &tenant_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(WeeklyReportResponse {
        text: summary.render(),
        summary,
    }))
}

#[utoipa::path(
    get,
    path = "/api/report/{tenant_id}/{employee_id}/history",
    params(
        ("tenant_id" = String, Path, description = "Tenant of the employee"),
        ("employee_id" = String, Path, description = "Employee whose sessions to list"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Sessions, newest first", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn history(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    path: web::Path<(String, String)>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, WorkflowError> {
    let (tenant_id, employee_id) = path.into_inner();
    let (tenant_id, employee_id) = (TenantId(tenant_id), EmployeeId(employee_id));
    let store = store.get_ref();
    load_employee(store, &caller, &tenant_id, &employee_id).await?;

    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let history = WeeklyAggregator::new(store)
        .history(&employee_id, &tenant_id, days, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        text: history.render(),
        history,
    }))
}

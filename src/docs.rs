use crate::api::attendance::{AttendanceRequest, LocationResponse};
use crate::api::inbound::InboundMessage;
use crate::api::leave_request::{CreateLeave, LeaveDecision};
use crate::api::report::{HistoryResponse, WeeklyReportResponse};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::tenant::{EmployeeId, TenantId};
use crate::workflow::geofence::{GeofenceReason, GeofenceVerdict};
use crate::workflow::weekly_report::{History, HistoryEntry, WeeklySummary};
use crate::workflow::{Notification, WorkflowReply};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presence Workflow API",
        version = "0.1.0",
        description = r#"
## Chat-driven attendance and leave engine

Employees of many organisations (tenants) report presence and request leave by chat;
managers answer with short commands. A messaging gateway calls this API and delivers
the returned text.

### 🔹 Operations
- **Attendance**: check-in (with optional GPS, geofenced against the employee's site), check-out, location check
- **Leave**: request a day off from free text, approve/reject with `OK #id` / `NON #id`
- **Reports**: weekly summary and session history
- **Inbound**: one endpoint that takes a raw chat event and does all of the above

### 🔐 Security
Every endpoint requires a gateway **JWT Bearer** token. Tokens may be restricted to a single tenant.

### 📦 Response Format
`{ ok, text, notification }`: `text` goes back to the sender, `notification` (if any)
is an addressed message the gateway must deliver.
"#,
    ),
    paths(
        crate::api::inbound::receive,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::evaluate_location,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::decide_leave,

        crate::api::report::weekly_summary,
        crate::api::report::history
    ),
    components(
        schemas(
            InboundMessage,
            AttendanceRequest,
            LocationResponse,
            CreateLeave,
            LeaveDecision,
            WorkflowReply,
            Notification,
            GeofenceVerdict,
            GeofenceReason,
            WeeklyReportResponse,
            WeeklySummary,
            HistoryResponse,
            History,
            HistoryEntry,
            LeaveRequest,
            LeaveStatus,
            TenantId,
            EmployeeId
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Inbound", description = "Raw chat events"),
        (name = "Attendance", description = "Check-in, check-out and geofencing"),
        (name = "Leave", description = "Leave requests and manager decisions"),
        (name = "Report", description = "Weekly summary and history"),
    )
)]
pub struct ApiDoc;

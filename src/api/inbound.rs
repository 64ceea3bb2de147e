use crate::auth::auth::GatewayCaller;
use crate::error::WorkflowError;
use crate::model::tenant::TenantId;
use crate::store::PresenceStore;
use crate::utils::sender_cache::SenderCache;
use crate::workflow::geofence::Coordinate;
use crate::workflow::router::InboundRouter;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

/// One chat event as received by the messaging gateway.
#[derive(Deserialize, ToSchema)]
pub struct InboundMessage {
    #[schema(example = "acme", value_type = String)]
    pub tenant_id: TenantId,
    /// Sender phone number in any common notation
    #[schema(example = "whatsapp:+221 77 000 00 01")]
    pub from: String,
    #[schema(example = "LEAVE 05/09", nullable = true)]
    pub text: Option<String>,
    #[schema(nullable = true)]
    pub latitude: Option<f64>,
    #[schema(nullable = true)]
    pub longitude: Option<f64>,
}

/// Resolves the sender, then runs whatever the message asks for
#[utoipa::path(
    post,
    path = "/api/inbound",
    request_body = InboundMessage,
    responses(
        (status = 200, description = "Reply for the sender, possibly with a notification to deliver", body = crate::workflow::WorkflowReply),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown sender"),
        (status = 503, description = "Storage unavailable, ask the sender to resend")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Inbound"
)]
#[instrument(
    name = "inbound_message",
    skip(caller, store, senders, payload),
    fields(tenant_id = %payload.tenant_id, gateway = %caller.name)
)]
pub async fn receive(
    caller: GatewayCaller,
    store: web::Data<dyn PresenceStore>,
    senders: web::Data<SenderCache>,
    payload: web::Json<InboundMessage>,
) -> Result<HttpResponse, WorkflowError> {
    caller.require_tenant(&payload.tenant_id)?;
    let store = store.get_ref();

    let sender = senders
        .resolve(store, &payload.tenant_id, &payload.from)
        .await?;

    let location = Coordinate::from_parts(payload.latitude, payload.longitude);
    let reply = InboundRouter::new(store)
        .handle(
            &sender,
            payload.text.as_deref().unwrap_or_default(),
            location,
            Utc::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(reply))
}

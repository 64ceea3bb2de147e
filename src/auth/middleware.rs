use crate::auth::auth::GatewayCaller;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::tenant::TenantId;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::{Value, json};

fn bearer_token(req: &ServiceRequest) -> Result<&str, &'static str> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;
    header
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")
}

fn reject(req: ServiceRequest, body: Value) -> ServiceResponse<BoxBody> {
    tracing::debug!(path = %req.path(), "Gateway request rejected");
    req.into_response(HttpResponse::Unauthorized().json(body).map_into_boxed_body())
}

/// Verifies the gateway token and exposes the caller as [`GatewayCaller`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|config| config.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let verified = match bearer_token(&req) {
        Ok(token) => verify_token(token, &secret)
            .map_err(|e| json!({"ok": false, "text": "Invalid or expired token", "details": e})),
        Err(reason) => Err(json!({"ok": false, "text": reason})),
    };

    match verified {
        Ok(claims) => {
            req.extensions_mut().insert(GatewayCaller {
                name: claims.sub,
                tenant_scope: claims.tenant_id.map(TenantId),
            });
            next.call(req).await
        }
        Err(body) => Ok(reject(req, body)),
    }
}

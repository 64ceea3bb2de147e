use crate::error::WorkflowError;
use crate::model::tenant::TenantId;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// The authenticated messaging gateway calling the engine.
#[derive(Debug, Clone)]
pub struct GatewayCaller {
    pub name: String,

    /// Present only if the token is restricted to one tenant
    pub tenant_scope: Option<TenantId>,
}

impl FromRequest for GatewayCaller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // inserted by auth_middleware
        match req.extensions().get::<GatewayCaller>() {
            Some(caller) => ready(Ok(caller.clone())),
            None => ready(Err(ErrorUnauthorized("Missing gateway credentials"))),
        }
    }
}

impl GatewayCaller {
    /// Tenant-scoped tokens may only act on their own tenant.
    pub fn require_tenant(&self, tenant: &TenantId) -> Result<(), WorkflowError> {
        match &self.tenant_scope {
            Some(scope) if scope != tenant => {
                Err(WorkflowError::Forbidden("Token not valid for this tenant"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_token_is_confined_to_its_tenant() {
        let caller = GatewayCaller {
            name: "gw".into(),
            tenant_scope: Some(TenantId::from("acme")),
        };
        assert!(caller.require_tenant(&TenantId::from("acme")).is_ok());
        assert!(caller.require_tenant(&TenantId::from("globex")).is_err());
    }

    #[test]
    fn unscoped_token_reaches_every_tenant() {
        let caller = GatewayCaller {
            name: "gw".into(),
            tenant_scope: None,
        };
        assert!(caller.require_tenant(&TenantId::from("globex")).is_ok());
    }
}

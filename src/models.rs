use serde::{Deserialize, Serialize};

/// Claims carried by the messaging gateway's bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Gateway name, for logs.
    pub sub: String,
    pub exp: usize,
    pub jti: String,
    /// Present only if this token is restricted to one tenant
    pub tenant_id: Option<String>,
}

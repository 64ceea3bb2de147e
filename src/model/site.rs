use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tenant::{SiteId, TenantId};

/// Compliance radius applied when a site has none configured.
pub const DEFAULT_SITE_RADIUS_M: u32 = 200;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Site {
    pub id: SiteId,
    pub tenant_id: TenantId,
    #[schema(example = "Head office")]
    pub name: String,
    #[schema(example = 48.8584, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 2.2945, nullable = true)]
    pub longitude: Option<f64>,
    /// Meters; `None` means [`DEFAULT_SITE_RADIUS_M`].
    #[schema(example = 200, nullable = true)]
    pub radius_m: Option<u32>,
}

impl Site {
    pub fn effective_radius(&self) -> u32 {
        self.radius_m.unwrap_or(DEFAULT_SITE_RADIUS_M)
    }
}

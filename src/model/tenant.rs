use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Isolated customer organization. Every record carries one and no lookup crosses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "acme")]
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "emp-001")]
pub struct EmployeeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "site-hq")]
pub struct SiteId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EmployeeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SiteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

impl From<&str> for EmployeeId {
    fn from(value: &str) -> Self {
        EmployeeId(value.to_string())
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        SiteId(value.to_string())
    }
}

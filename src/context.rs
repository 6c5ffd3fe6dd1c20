//! Caller identity supplied by the transport layer.
//!
//! Authentication happens upstream; the core only reads these values.

/// Tenant and acting user for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    tenant_id: u32,
    user_id: u32,
    username: String,
}

impl CallerContext {
    /// Builds a context from already validated identity values.
    pub fn new(tenant_id: u32, user_id: u32, username: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            username: username.into(),
        }
    }

    /// Tenant the operation is scoped to.
    #[must_use]
    pub const fn tenant_id(&self) -> u32 {
        self.tenant_id
    }

    /// Acting user id.
    #[must_use]
    pub const fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Acting username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

//! Who is submitting

use crate::errors::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Resolves the signed-in user, if any
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in or the session is no longer valid
    async fn current_user(&self) -> Result<Option<Uuid>>;
}

/// Fixed answer, for tests and trusted local tooling
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(pub Option<Uuid>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<Uuid>> {
        Ok(self.0)
    }
}

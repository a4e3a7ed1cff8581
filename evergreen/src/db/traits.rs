use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    FamilyMember, FamilyMemberPatch, NewFamilyMember, PaymentConfirmation, SubscriptionRecord,
};

/// Persistence for family members. Every call is scoped to one memorial; a
/// member of another memorial behaves as if it did not exist.
#[async_trait]
pub trait FamilyMemberStore: Send + Sync {
    async fn list_family_members(&self, memorial_id: &str) -> Result<Vec<FamilyMember>>;
    async fn get_family_member(&self, memorial_id: &str, id: &str) -> Result<Option<FamilyMember>>;
    async fn create_family_member(
        &self,
        memorial_id: &str,
        member: &NewFamilyMember,
    ) -> Result<FamilyMember>;

    /// Apply `patch` as-is. Returns `None` when the member does not exist.
    async fn update_family_member(
        &self,
        memorial_id: &str,
        id: &str,
        patch: &FamilyMemberPatch,
    ) -> Result<Option<FamilyMember>>;
}

/// Ledger of confirmed premium subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Mark the member premium and record `confirmation` in one transaction.
    /// Either both writes land or neither does. Returns `None` when the
    /// member does not exist.
    async fn confirm_subscription(
        &self,
        memorial_id: &str,
        member_id: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<Option<(FamilyMember, SubscriptionRecord)>>;
    async fn list_subscriptions(
        &self,
        memorial_id: &str,
        member_id: &str,
    ) -> Result<Vec<SubscriptionRecord>>;
}

/// A complete database backend: every store plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: FamilyMemberStore + SubscriptionStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}

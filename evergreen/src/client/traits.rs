use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FamilyMember, FamilyMemberPatch, NewFamilyMember, PaymentMethod};

/// Member persistence as the tree container sees it: list, create, update,
/// all scoped to one memorial.
#[async_trait]
pub trait MemberRecordStore: Send + Sync {
    async fn list_members(&self, memorial_id: &str) -> Result<Vec<FamilyMember>>;

    /// Returns the stored record including its assigned id.
    async fn create_member(
        &self,
        memorial_id: &str,
        member: NewFamilyMember,
    ) -> Result<FamilyMember>;

    async fn update_member(
        &self,
        memorial_id: &str,
        member_id: &str,
        patch: FamilyMemberPatch,
    ) -> Result<FamilyMember>;
}

/// Premium upgrade boundary. Returns the member once the subscription is
/// confirmed and `is_premium` has been flipped server-side.
#[async_trait]
pub trait SubscriptionGateway: Send + Sync {
    async fn subscribe(
        &self,
        memorial_id: &str,
        member_id: &str,
        method: PaymentMethod,
        payment_token: Option<String>,
    ) -> Result<FamilyMember>;
}

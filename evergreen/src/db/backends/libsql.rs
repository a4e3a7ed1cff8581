use crate::db::connection::Database;
use crate::db::repository::{FamilyMemberRepository, SubscriptionRepository};
use crate::db::traits::{DatabaseBackend, FamilyMemberStore, SubscriptionStore};
use crate::error::Result;
use crate::models::{
    FamilyMember, FamilyMemberPatch, NewFamilyMember, PaymentConfirmation, SubscriptionRecord,
};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FamilyMemberStore for LibSqlBackend {
    async fn list_family_members(&self, memorial_id: &str) -> Result<Vec<FamilyMember>> {
        let conn = self.db.connect()?;
        FamilyMemberRepository::list_by_memorial(&conn, memorial_id).await
    }

    async fn get_family_member(&self, memorial_id: &str, id: &str) -> Result<Option<FamilyMember>> {
        let conn = self.db.connect()?;
        FamilyMemberRepository::get(&conn, memorial_id, id).await
    }

    async fn create_family_member(
        &self,
        memorial_id: &str,
        member: &NewFamilyMember,
    ) -> Result<FamilyMember> {
        let conn = self.db.connect()?;
        FamilyMemberRepository::create(&conn, memorial_id, member).await
    }

    async fn update_family_member(
        &self,
        memorial_id: &str,
        id: &str,
        patch: &FamilyMemberPatch,
    ) -> Result<Option<FamilyMember>> {
        let conn = self.db.connect()?;
        let Some(mut member) = FamilyMemberRepository::get(&conn, memorial_id, id).await? else {
            return Ok(None);
        };

        patch.apply_to(&mut member);
        if !FamilyMemberRepository::update(&conn, &member).await? {
            return Ok(None);
        }
        Ok(Some(member))
    }
}

#[async_trait]
impl SubscriptionStore for LibSqlBackend {
    async fn confirm_subscription(
        &self,
        memorial_id: &str,
        member_id: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<Option<(FamilyMember, SubscriptionRecord)>> {
        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        let outcome: Result<Option<(FamilyMember, SubscriptionRecord)>> = async {
            if !FamilyMemberRepository::set_premium(&tx, memorial_id, member_id, true).await? {
                return Ok(None);
            }
            let record =
                SubscriptionRepository::create(&tx, memorial_id, member_id, confirmation).await?;
            let member = FamilyMemberRepository::get(&tx, memorial_id, member_id).await?;
            Ok(member.map(|m| (m, record)))
        }
        .await;

        match outcome {
            Ok(Some(confirmed)) => {
                tx.commit().await?;
                Ok(Some(confirmed))
            }
            Ok(None) => {
                tx.rollback().await?;
                Ok(None)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(
                        memorial_id,
                        member_id,
                        error = %rollback_error,
                        "Failed to roll back subscription transaction"
                    );
                }
                Err(error)
            }
        }
    }

    async fn list_subscriptions(
        &self,
        memorial_id: &str,
        member_id: &str,
    ) -> Result<Vec<SubscriptionRecord>> {
        let conn = self.db.connect()?;
        SubscriptionRepository::list_by_member(&conn, memorial_id, member_id).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::client::{MemberRecordStore, SubscriptionGateway};
use crate::db::DatabaseBackend;
use crate::error::{EvergreenError, Result};
use crate::hierarchy::{organize, Forest};
use crate::models::{
    validate_image_url, FamilyMember, FamilyMemberPatch, NewFamilyMember, PaymentMethod,
    SubscriptionRequest,
};
use crate::services::payment::PaymentProcessor;

/// Write rules and the upgrade flow on top of the member store.
#[derive(Clone)]
pub struct FamilyService {
    db: Arc<dyn DatabaseBackend>,
    payments: Arc<dyn PaymentProcessor>,
    pending: PendingSubscriptions,
}

impl FamilyService {
    pub fn new(db: Arc<dyn DatabaseBackend>, payments: Arc<dyn PaymentProcessor>) -> Self {
        Self {
            db,
            payments,
            pending: PendingSubscriptions::default(),
        }
    }

    pub async fn list(&self, memorial_id: &str) -> Result<Vec<FamilyMember>> {
        self.db.list_family_members(memorial_id).await
    }

    /// Load a memorial and organize it into a forest.
    pub async fn tree(&self, memorial_id: &str) -> Result<Forest> {
        let members = self.db.list_family_members(memorial_id).await?;
        Ok(organize(&members))
    }

    pub async fn get(&self, memorial_id: &str, member_id: &str) -> Result<FamilyMember> {
        self.db
            .get_family_member(memorial_id, member_id)
            .await?
            .ok_or_else(|| not_found(member_id))
    }

    pub async fn create(&self, memorial_id: &str, mut member: NewFamilyMember) -> Result<FamilyMember> {
        member.name = required("name", &member.name)?;
        member.relationship = required("relationship", &member.relationship)?;

        if member.is_premium {
            return Err(premium_requires_subscription());
        }

        // New members start free; premium content has nowhere to show.
        if member.bio.is_some() || member.image_url.is_some() {
            tracing::debug!(memorial_id, "Ignoring premium content on new free member");
            member.bio = None;
            member.image_url = None;
        }

        member.parent_id = member.parent_id.filter(|p| !p.trim().is_empty());
        if let Some(parent_id) = &member.parent_id {
            self.ensure_exists(memorial_id, parent_id).await?;
        }

        let created = self.db.create_family_member(memorial_id, &member).await?;
        tracing::info!(
            memorial_id,
            member_id = %created.id,
            parent_id = ?created.parent_id,
            "Created family member"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        memorial_id: &str,
        member_id: &str,
        mut patch: FamilyMemberPatch,
    ) -> Result<FamilyMember> {
        let current = self.get(memorial_id, member_id).await?;

        if let Some(name) = &patch.name {
            patch.name = Some(required("name", name)?);
        }
        if let Some(relationship) = &patch.relationship {
            patch.relationship = Some(required("relationship", relationship)?);
        }

        if patch.is_premium == Some(true) && !current.is_premium {
            return Err(premium_requires_subscription());
        }

        let premium_after = patch.is_premium.unwrap_or(current.is_premium);
        if !premium_after && patch.touches_premium_content() {
            tracing::debug!(memorial_id, member_id, "Ignoring premium content write on free member");
            patch.bio = None;
            patch.image_url = None;
        }
        if let Some(Some(url)) = &patch.image_url {
            validate_image_url(url)?;
        }

        if let Some(Some(parent_id)) = &patch.parent_id {
            if parent_id.trim().is_empty() {
                patch.parent_id = Some(None);
            } else {
                self.check_new_parent(memorial_id, member_id, parent_id).await?;
            }
        }

        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self
            .db
            .update_family_member(memorial_id, member_id, &patch)
            .await?
            .ok_or_else(|| not_found(member_id))?;

        if current.is_premium && !updated.is_premium {
            tracing::info!(memorial_id, member_id, "Member demoted; premium content hidden");
        }
        tracing::info!(memorial_id, member_id, "Updated family member");
        Ok(updated)
    }

    /// Confirm payment, then flip `is_premium` and record the confirmation
    /// together. Already-premium members are returned without charging
    /// again; a second subscribe for a member still being confirmed is a
    /// `Conflict`.
    pub async fn subscribe(&self, request: SubscriptionRequest) -> Result<FamilyMember> {
        let _claim = self
            .pending
            .claim(&request.memorial_id, &request.member_id)
            .ok_or_else(|| {
                EvergreenError::Conflict(format!(
                    "A subscription for '{}' is already being processed",
                    request.member_id
                ))
            })?;

        let member = self.get(&request.memorial_id, &request.member_id).await?;
        if member.is_premium {
            tracing::info!(member_id = %member.id, "Member already premium; skipping charge");
            return Ok(member);
        }

        let confirmation = self.payments.confirm(&request).await?;

        let (upgraded, _) = self
            .db
            .confirm_subscription(&request.memorial_id, &request.member_id, &confirmation)
            .await
            .map_err(|error| {
                tracing::error!(
                    memorial_id = %request.memorial_id,
                    member_id = %request.member_id,
                    reference = %confirmation.reference,
                    error = %error,
                    "Payment confirmed but upgrade was not stored"
                );
                error
            })?
            .ok_or_else(|| not_found(&request.member_id))?;

        tracing::info!(
            memorial_id = %request.memorial_id,
            member_id = %request.member_id,
            method = %confirmation.method,
            reference = %confirmation.reference,
            "Subscription confirmed; member upgraded to premium"
        );
        Ok(upgraded)
    }

    async fn ensure_exists(&self, memorial_id: &str, member_id: &str) -> Result<()> {
        match self.db.get_family_member(memorial_id, member_id).await? {
            Some(_) => Ok(()),
            None => Err(EvergreenError::Validation(format!(
                "Parent member '{member_id}' does not exist in this memorial"
            ))),
        }
    }

    /// Reject self-parenting, unknown parents, and moves that would close a
    /// cycle.
    async fn check_new_parent(&self, memorial_id: &str, member_id: &str, parent_id: &str) -> Result<()> {
        if parent_id == member_id {
            return Err(EvergreenError::Validation(
                "A member cannot be their own parent".to_string(),
            ));
        }

        let members = self.db.list_family_members(memorial_id).await?;
        let parents: HashMap<&str, Option<&str>> = members
            .iter()
            .map(|m| (m.id.as_str(), m.parent_id.as_deref()))
            .collect();

        if !parents.contains_key(parent_id) {
            return Err(EvergreenError::Validation(format!(
                "Parent member '{parent_id}' does not exist in this memorial"
            )));
        }

        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(id) = cursor {
            if id == member_id {
                return Err(EvergreenError::Conflict(format!(
                    "Moving '{member_id}' under '{parent_id}' would make it its own ancestor"
                )));
            }
            if !seen.insert(id) {
                break;
            }
            cursor = parents.get(id).copied().flatten();
        }
        Ok(())
    }
}

type MemberKey = (String, String);

/// Members whose subscription is between the premium check and the stored
/// upgrade.
#[derive(Clone, Default)]
struct PendingSubscriptions(Arc<Mutex<HashSet<MemberKey>>>);

impl PendingSubscriptions {
    /// Returns `None` when the member is already claimed.
    fn claim(&self, memorial_id: &str, member_id: &str) -> Option<PendingClaim> {
        let key = (memorial_id.to_string(), member_id.to_string());
        let mut pending = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key.clone()) {
            return None;
        }
        Some(PendingClaim {
            pending: self.0.clone(),
            key,
        })
    }
}

/// Releases the claim on drop, including on error paths.
struct PendingClaim {
    pending: Arc<Mutex<HashSet<MemberKey>>>,
    key: MemberKey,
}

impl Drop for PendingClaim {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EvergreenError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn not_found(member_id: &str) -> EvergreenError {
    EvergreenError::NotFound(format!("Family member '{member_id}' not found"))
}

fn premium_requires_subscription() -> EvergreenError {
    EvergreenError::Validation(
        "Premium status requires a confirmed subscription".to_string(),
    )
}

#[async_trait]
impl MemberRecordStore for FamilyService {
    async fn list_members(&self, memorial_id: &str) -> Result<Vec<FamilyMember>> {
        self.list(memorial_id).await
    }

    async fn create_member(&self, memorial_id: &str, member: NewFamilyMember) -> Result<FamilyMember> {
        self.create(memorial_id, member).await
    }

    async fn update_member(
        &self,
        memorial_id: &str,
        member_id: &str,
        patch: FamilyMemberPatch,
    ) -> Result<FamilyMember> {
        self.update(memorial_id, member_id, patch).await
    }
}

#[async_trait]
impl SubscriptionGateway for FamilyService {
    async fn subscribe(
        &self,
        memorial_id: &str,
        member_id: &str,
        method: PaymentMethod,
        payment_token: Option<String>,
    ) -> Result<FamilyMember> {
        FamilyService::subscribe(
            self,
            SubscriptionRequest {
                memorial_id: memorial_id.to_string(),
                member_id: member_id.to_string(),
                method,
                payment_token,
            },
        )
        .await
    }
}

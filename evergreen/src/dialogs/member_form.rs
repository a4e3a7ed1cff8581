//! Add/edit dialog state for a family member.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EvergreenError, Result};
use crate::models::{validate_image_url, FamilyMember, FamilyMemberPatch, NewFamilyMember};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { member_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTab {
    Basic,
    Extended,
}

/// Outcome of flipping the premium switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumToggle {
    /// Member already premium; extended fields are now editable.
    ExtendedTabOpened,
    /// Member must go through the upgrade flow first. The switch stays off.
    UpgradeRequired,
    /// A member that does not exist yet cannot subscribe; save first.
    SaveRequired,
    /// Switched off; back on the basic tab.
    Disabled,
}

/// What the dialog hands to the caller's save handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPayload {
    pub parent_id: Option<String>,
    pub name: String,
    pub relationship: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub is_premium: bool,
}

impl MemberPayload {
    pub fn into_new_member(self) -> NewFamilyMember {
        NewFamilyMember {
            parent_id: self.parent_id,
            name: self.name,
            relationship: self.relationship,
            birth_date: self.birth_date,
            death_date: self.death_date,
            bio: self.bio,
            image_url: self.image_url,
            is_premium: self.is_premium,
        }
    }

    /// Full-form update. Premium content is only written for premium members;
    /// otherwise whatever is stored stays put, hidden.
    pub fn into_patch(self) -> FamilyMemberPatch {
        let (bio, image_url) = if self.is_premium {
            (Some(self.bio), Some(self.image_url))
        } else {
            (None, None)
        };

        FamilyMemberPatch {
            parent_id: Some(self.parent_id),
            name: Some(self.name),
            relationship: Some(self.relationship),
            birth_date: Some(self.birth_date),
            death_date: Some(self.death_date),
            bio,
            image_url,
            is_premium: Some(self.is_premium),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemberForm {
    mode: FormMode,
    pub parent_id: Option<String>,
    pub name: String,
    pub relationship: String,
    /// ISO `YYYY-MM-DD`, empty when unknown.
    pub birth_date: String,
    pub death_date: String,
    pub bio: String,
    pub image_url: String,
    was_premium: bool,
    is_premium: bool,
    tab: FormTab,
    in_flight: bool,
}

impl MemberForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            parent_id: None,
            name: String::new(),
            relationship: String::new(),
            birth_date: String::new(),
            death_date: String::new(),
            bio: String::new(),
            image_url: String::new(),
            was_premium: false,
            is_premium: false,
            tab: FormTab::Basic,
            in_flight: false,
        }
    }

    /// New member placed under `parent_id`.
    pub fn create_child_of(parent_id: impl Into<String>) -> Self {
        let mut form = Self::create();
        form.parent_id = Some(parent_id.into());
        form
    }

    pub fn edit(member: &FamilyMember) -> Self {
        Self {
            mode: FormMode::Edit {
                member_id: member.id.clone(),
            },
            parent_id: member.parent_id.clone(),
            name: member.name.clone(),
            relationship: member.relationship.clone(),
            birth_date: member
                .birth_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            death_date: member
                .death_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            bio: member.bio.clone().unwrap_or_default(),
            image_url: member.image_url.clone().unwrap_or_default(),
            was_premium: member.is_premium,
            is_premium: member.is_premium,
            tab: FormTab::Basic,
            in_flight: false,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn member_id(&self) -> Option<&str> {
        match &self.mode {
            FormMode::Create => None,
            FormMode::Edit { member_id } => Some(member_id),
        }
    }

    pub fn tab(&self) -> FormTab {
        self.tab
    }

    pub fn is_premium(&self) -> bool {
        self.is_premium
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Switch tabs. The extended tab is only reachable for premium members.
    pub fn select_tab(&mut self, tab: FormTab) -> bool {
        if tab == FormTab::Extended && !self.is_premium {
            return false;
        }
        self.tab = tab;
        true
    }

    pub fn set_premium(&mut self, on: bool) -> PremiumToggle {
        if !on {
            self.is_premium = false;
            self.tab = FormTab::Basic;
            return PremiumToggle::Disabled;
        }

        if self.was_premium {
            self.is_premium = true;
            self.tab = FormTab::Extended;
            PremiumToggle::ExtendedTabOpened
        } else if self.mode == FormMode::Create {
            PremiumToggle::SaveRequired
        } else {
            PremiumToggle::UpgradeRequired
        }
    }

    /// Validate the fields and package them for the save handler.
    pub fn payload(&self) -> Result<MemberPayload> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EvergreenError::Validation("Name is required".to_string()));
        }
        let relationship = self.relationship.trim();
        if relationship.is_empty() {
            return Err(EvergreenError::Validation(
                "Relationship is required".to_string(),
            ));
        }

        let birth_date = parse_optional_date("birth date", &self.birth_date)?;
        let death_date = parse_optional_date("death date", &self.death_date)?;

        let (bio, image_url) = if self.is_premium {
            let bio = non_empty(&self.bio);
            let image_url = non_empty(&self.image_url);
            if let Some(url) = &image_url {
                validate_image_url(url)?;
            }
            (bio, image_url)
        } else {
            (None, None)
        };

        Ok(MemberPayload {
            parent_id: self.parent_id.clone().filter(|p| !p.is_empty()),
            name: name.to_string(),
            relationship: relationship.to_string(),
            birth_date,
            death_date,
            bio,
            image_url,
            is_premium: self.is_premium,
        })
    }

    /// Validate and mark the form as submitting. Fails while a previous
    /// submission is still outstanding.
    pub fn begin_submit(&mut self) -> Result<MemberPayload> {
        if self.in_flight {
            return Err(EvergreenError::InFlight);
        }
        let payload = self.payload()?;
        self.in_flight = true;
        Ok(payload)
    }

    pub fn finish_submit(&mut self) {
        self.in_flight = false;
    }

    /// Hand the payload to `save`. Edits are kept on failure so the user can
    /// retry or cancel.
    pub async fn submit<F, Fut, T>(&mut self, save: F) -> Result<T>
    where
        F: FnOnce(MemberPayload) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let payload = self.begin_submit()?;
        let result = save(payload).await;
        self.finish_submit();
        result
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_optional_date(label: &str, value: &str) -> Result<Option<NaiveDate>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| EvergreenError::Validation(format!("Invalid {label} '{trimmed}': {e}")))
}

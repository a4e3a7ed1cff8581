//! Client-side container for one memorial's family tree.
//!
//! Owns the flat member list, the organized forest, the expansion state and
//! whichever dialog is open. Every successful mutation patches the list and
//! rebuilds the forest from scratch.

use std::sync::Arc;

use super::traits::{MemberRecordStore, SubscriptionGateway};
use crate::dialogs::{FormTab, MemberForm, PremiumToggle, SubscriptionForm};
use crate::error::{EvergreenError, Result};
use crate::hierarchy::{organize, render_rows, ExpansionState, Forest, RenderOptions, TreeRow};
use crate::models::FamilyMember;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Loaded,
    /// Initial load failed. Nothing is rendered until an explicit reload.
    Error { message: String },
    /// Add/edit dialog open over the tree.
    Editing,
    /// Upgrade dialog open; the edit dialog is closed.
    Upgrading,
}

pub struct FamilyTreeSession {
    memorial_id: String,
    store: Arc<dyn MemberRecordStore>,
    gateway: Arc<dyn SubscriptionGateway>,
    state: SessionState,
    members: Vec<FamilyMember>,
    forest: Forest,
    expansion: ExpansionState,
    expansion_initialized: bool,
    editor: Option<MemberForm>,
    upgrade: Option<SubscriptionForm>,
    notice: Option<String>,
}

impl FamilyTreeSession {
    pub fn new(
        memorial_id: impl Into<String>,
        store: Arc<dyn MemberRecordStore>,
        gateway: Arc<dyn SubscriptionGateway>,
    ) -> Self {
        Self {
            memorial_id: memorial_id.into(),
            store,
            gateway,
            state: SessionState::Loading,
            members: Vec::new(),
            forest: Forest::default(),
            expansion: ExpansionState::new(),
            expansion_initialized: false,
            editor: None,
            upgrade: None,
            notice: None,
        }
    }

    pub fn memorial_id(&self) -> &str {
        &self.memorial_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn members(&self) -> &[FamilyMember] {
        &self.members
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Last transient failure message (failed save or subscription).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn editor(&self) -> Option<&MemberForm> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut MemberForm> {
        self.editor.as_mut()
    }

    pub fn upgrade_form(&self) -> Option<&SubscriptionForm> {
        self.upgrade.as_ref()
    }

    pub fn upgrade_form_mut(&mut self) -> Option<&mut SubscriptionForm> {
        self.upgrade.as_mut()
    }

    /// Fetch the member list. On failure the session enters
    /// [`SessionState::Error`] and stays there until [`Self::reload`].
    pub async fn load(&mut self) -> Result<()> {
        self.state = SessionState::Loading;
        self.editor = None;
        self.upgrade = None;

        match self.store.list_members(&self.memorial_id).await {
            Ok(members) => {
                self.members = members;
                self.rebuild();
                if !self.expansion_initialized {
                    self.expansion = ExpansionState::expand_all(&self.forest);
                    self.expansion_initialized = true;
                }
                tracing::debug!(
                    memorial_id = %self.memorial_id,
                    members = self.members.len(),
                    "Family tree loaded"
                );
                self.state = SessionState::Loaded;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(memorial_id = %self.memorial_id, error = %e, "Failed to load family tree");
                self.members.clear();
                self.forest = Forest::default();
                self.state = SessionState::Error {
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    pub async fn reload(&mut self) -> Result<()> {
        self.load().await
    }

    /// Visible rows for the current expansion state.
    pub fn rows(&self, editable: bool) -> Vec<TreeRow> {
        render_rows(&self.forest, &self.expansion, RenderOptions { editable })
    }

    /// Flip one node's expansion. Independent of the dialog state.
    pub fn toggle(&mut self, member_id: &str) -> bool {
        self.expansion.toggle(member_id)
    }

    pub fn collapse(&mut self, member_id: &str) {
        self.expansion.collapse(member_id);
    }

    pub fn open_add(&mut self) -> Result<&mut MemberForm> {
        self.open_editor(MemberForm::create())
    }

    pub fn open_add_child(&mut self, parent_id: &str) -> Result<&mut MemberForm> {
        self.find(parent_id)?;
        self.open_editor(MemberForm::create_child_of(parent_id))
    }

    pub fn open_edit(&mut self, member_id: &str) -> Result<&mut MemberForm> {
        let form = MemberForm::edit(self.find(member_id)?);
        self.open_editor(form)
    }

    /// Save the open dialog through the store. On failure the dialog stays
    /// open with its edits and local state is untouched.
    pub async fn submit(&mut self) -> Result<FamilyMember> {
        if self.state != SessionState::Editing {
            return Err(not_open("edit"));
        }
        let Some(mut form) = self.editor.take() else {
            return Err(not_open("edit"));
        };

        let store = Arc::clone(&self.store);
        let memorial_id = self.memorial_id.clone();
        let editing = form.member_id().map(str::to_string);
        let result = form
            .submit(|payload| async move {
                match editing {
                    Some(member_id) => {
                        store
                            .update_member(&memorial_id, &member_id, payload.into_patch())
                            .await
                    }
                    None => {
                        store
                            .create_member(&memorial_id, payload.into_new_member())
                            .await
                    }
                }
            })
            .await;

        match result {
            Ok(saved) => {
                self.upsert(saved.clone());
                self.expansion.expand(&saved.id);
                if let Some(parent_id) = &saved.parent_id {
                    self.expansion.expand(parent_id);
                }
                self.notice = None;
                self.state = SessionState::Loaded;
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(memorial_id = %self.memorial_id, error = %e, "Saving family member failed");
                self.notice = Some(e.to_string());
                self.editor = Some(form);
                Err(e)
            }
        }
    }

    /// Flip the open dialog's premium switch on. A member that is not yet
    /// premium is handed to the upgrade dialog.
    pub fn request_upgrade(&mut self) -> Result<PremiumToggle> {
        if self.state != SessionState::Editing {
            return Err(not_open("edit"));
        }
        let form = self.editor.as_mut().ok_or_else(|| not_open("edit"))?;
        let outcome = form.set_premium(true);

        match outcome {
            PremiumToggle::UpgradeRequired => {
                let member_id = form.member_id().unwrap_or_default().to_string();
                let member = self.find(&member_id)?;
                let upgrade = SubscriptionForm::new(member);
                self.editor = None;
                self.upgrade = Some(upgrade);
                self.state = SessionState::Upgrading;
            }
            PremiumToggle::SaveRequired => {
                self.notice = Some("Save this member before upgrading to premium".to_string());
            }
            PremiumToggle::ExtendedTabOpened | PremiumToggle::Disabled => {}
        }
        Ok(outcome)
    }

    /// Run the open upgrade dialog. On success the member list is patched and
    /// the edit dialog reopens on the now-premium member's extended tab.
    pub async fn complete_upgrade(&mut self) -> Result<FamilyMember> {
        if self.state != SessionState::Upgrading {
            return Err(not_open("upgrade"));
        }
        let Some(mut form) = self.upgrade.take() else {
            return Err(not_open("upgrade"));
        };

        match form.submit(self.gateway.as_ref()).await {
            Ok(member) => {
                self.upsert(member.clone());
                let mut editor = MemberForm::edit(&member);
                editor.select_tab(FormTab::Extended);
                self.editor = Some(editor);
                self.notice = None;
                self.state = SessionState::Editing;
                Ok(member)
            }
            Err(e) => {
                tracing::warn!(
                    memorial_id = %self.memorial_id,
                    member_id = %form.member_id(),
                    error = %e,
                    "Subscription failed"
                );
                self.notice = Some(e.to_string());
                self.upgrade = Some(form);
                Err(e)
            }
        }
    }

    pub fn cancel_upgrade(&mut self) {
        if self.state == SessionState::Upgrading {
            self.upgrade = None;
            self.state = SessionState::Loaded;
        }
    }

    /// Close any open dialog, discarding its edits.
    pub fn cancel(&mut self) {
        if matches!(self.state, SessionState::Editing | SessionState::Upgrading) {
            self.editor = None;
            self.upgrade = None;
            self.state = SessionState::Loaded;
        }
    }

    fn open_editor(&mut self, form: MemberForm) -> Result<&mut MemberForm> {
        if self.state != SessionState::Loaded {
            return Err(EvergreenError::Conflict(
                "The family tree is not ready for editing".to_string(),
            ));
        }
        self.notice = None;
        self.state = SessionState::Editing;
        Ok(self.editor.insert(form))
    }

    fn find(&self, member_id: &str) -> Result<&FamilyMember> {
        self.members
            .iter()
            .find(|m| m.id == member_id)
            .ok_or_else(|| EvergreenError::NotFound(format!("Family member {member_id} not found")))
    }

    /// Append a new record or replace the existing one by id, then rebuild.
    fn upsert(&mut self, member: FamilyMember) {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.forest = organize(&self.members);
        if !self.forest.warnings.is_empty() {
            tracing::warn!(
                memorial_id = %self.memorial_id,
                warnings = ?self.forest.warnings,
                "Family tree data needed repair"
            );
        }
    }
}

fn not_open(dialog: &str) -> EvergreenError {
    EvergreenError::Conflict(format!("No {dialog} dialog is open"))
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvergreenError, Result};

/// One person in a memorial's genealogy, exactly as the store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: String,
    pub memorial_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub relationship: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FamilyMember {
    pub fn new(id: String, memorial_id: String, name: String, relationship: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            memorial_id,
            parent_id: None,
            name,
            relationship,
            birth_date: None,
            death_date: None,
            bio: None,
            image_url: None,
            is_premium: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Biography as outsiders may see it. Stored text survives demotion but
    /// stays hidden until the member is premium again.
    pub fn visible_bio(&self) -> Option<&str> {
        if self.is_premium {
            self.bio.as_deref()
        } else {
            None
        }
    }

    pub fn visible_image_url(&self) -> Option<&str> {
        if self.is_premium {
            self.image_url.as_deref()
        } else {
            None
        }
    }
}

/// Derived, in-memory tree node. Built by the organizer, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMemberWithChildren {
    #[serde(flatten)]
    pub member: FamilyMember,
    pub children: Vec<FamilyMemberWithChildren>,
}

impl FamilyMemberWithChildren {
    pub fn leaf(member: FamilyMember) -> Self {
        Self {
            member,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.member.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Writable fields for a new member. The memorial comes from the request scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFamilyMember {
    pub parent_id: Option<String>,
    pub name: String,
    pub relationship: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

/// Partial update. `None` leaves a field untouched; for nullable columns
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyMemberPatch {
    pub parent_id: Option<Option<String>>,
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub death_date: Option<Option<NaiveDate>>,
    pub bio: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_premium: Option<bool>,
}

impl FamilyMemberPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn touches_premium_content(&self) -> bool {
        self.bio.is_some() || self.image_url.is_some()
    }

    /// Apply every present field onto `member` and bump `updated_at`.
    pub fn apply_to(&self, member: &mut FamilyMember) {
        if let Some(parent_id) = &self.parent_id {
            member.parent_id = parent_id.clone();
        }
        if let Some(name) = &self.name {
            member.name = name.clone();
        }
        if let Some(relationship) = &self.relationship {
            member.relationship = relationship.clone();
        }
        if let Some(birth_date) = self.birth_date {
            member.birth_date = birth_date;
        }
        if let Some(death_date) = self.death_date {
            member.death_date = death_date;
        }
        if let Some(bio) = &self.bio {
            member.bio = bio.clone();
        }
        if let Some(image_url) = &self.image_url {
            member.image_url = image_url.clone();
        }
        if let Some(is_premium) = self.is_premium {
            member.is_premium = is_premium;
        }
        member.updated_at = Utc::now();
    }
}

/// Image references must be absolute http(s) URLs.
pub fn validate_image_url(value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(EvergreenError::Validation(format!(
            "Image URL must use http or https, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> FamilyMember {
        FamilyMember::new(
            id.to_string(),
            "mem_1".to_string(),
            format!("Person {id}"),
            "Sibling".to_string(),
        )
    }

    #[test]
    fn premium_content_hidden_when_not_premium() {
        let mut m = member("a");
        m.bio = Some("Loved the sea".to_string());
        m.image_url = Some("https://img.example.com/a.jpg".to_string());

        assert_eq!(m.visible_bio(), None);
        assert_eq!(m.visible_image_url(), None);

        m.is_premium = true;
        assert_eq!(m.visible_bio(), Some("Loved the sea"));
        assert_eq!(m.visible_image_url(), Some("https://img.example.com/a.jpg"));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut m = member("a").with_parent("p");
        m.birth_date = NaiveDate::from_ymd_opt(1931, 3, 4);

        let patch = FamilyMemberPatch {
            name: Some("Renamed".to_string()),
            birth_date: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut m);

        assert_eq!(m.name, "Renamed");
        assert_eq!(m.relationship, "Sibling");
        assert_eq!(m.parent_id.as_deref(), Some("p"));
        assert!(m.birth_date.is_none());
    }

    #[test]
    fn patch_clears_parent() {
        let mut m = member("a").with_parent("p");
        let patch = FamilyMemberPatch {
            parent_id: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut m);
        assert!(m.parent_id.is_none());
    }

    #[test]
    fn subtree_size_counts_all_descendants() {
        let mut root = FamilyMemberWithChildren::leaf(member("1"));
        let mut child = FamilyMemberWithChildren::leaf(member("2"));
        child.children.push(FamilyMemberWithChildren::leaf(member("3")));
        root.children.push(child);
        root.children.push(FamilyMemberWithChildren::leaf(member("4")));

        assert_eq!(root.size(), 4);
        assert!(root.has_children());
    }

    #[test]
    fn node_serializes_flat_with_children() {
        let node = FamilyMemberWithChildren::leaf(member("1"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["children"], serde_json::json!([]));
    }
}

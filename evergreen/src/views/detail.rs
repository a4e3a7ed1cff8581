use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::FamilyMember;

/// Long-form date used on memorial pages, e.g. `March 4, 1931`.
pub const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Whichever of the two dates are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lifespan {
    Born { born: String },
    Died { died: String },
    Span { born: String, died: String },
}

impl Lifespan {
    pub fn from_dates(birth: Option<NaiveDate>, death: Option<NaiveDate>) -> Option<Self> {
        match (birth, death) {
            (None, None) => None,
            (Some(b), None) => Some(Lifespan::Born {
                born: format_date(b),
            }),
            (None, Some(d)) => Some(Lifespan::Died {
                died: format_date(d),
            }),
            (Some(b), Some(d)) => Some(Lifespan::Span {
                born: format_date(b),
                died: format_date(d),
            }),
        }
    }
}

impl std::fmt::Display for Lifespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifespan::Born { born } => write!(f, "Born {born}"),
            Lifespan::Died { died } => write!(f, "Died {died}"),
            Lifespan::Span { born, died } => write!(f, "{born} - {died}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PremiumSection {
    /// Shown instead of premium content on free members.
    Upsell { message: String, action: String },
    Extended {
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bio: Option<String>,
    },
}

/// Read-only presentation of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub member_id: String,
    pub name: String,
    pub relationship: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<Lifespan>,
    pub premium: PremiumSection,
}

impl MemberDetail {
    pub fn from_member(member: &FamilyMember) -> Self {
        let premium = if member.is_premium {
            PremiumSection::Extended {
                image_url: member.image_url.clone(),
                bio: member.bio.clone(),
            }
        } else {
            PremiumSection::Upsell {
                message: format!(
                    "Upgrade {} to add a biography and photo to their place in the family tree.",
                    member.name
                ),
                action: "Upgrade".to_string(),
            }
        };

        Self {
            member_id: member.id.clone(),
            name: member.name.clone(),
            relationship: member.relationship.clone(),
            lifespan: Lifespan::from_dates(member.birth_date, member.death_date),
            premium,
        }
    }

    pub fn shows_premium_content(&self) -> bool {
        matches!(self.premium, PremiumSection::Extended { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn member() -> FamilyMember {
        FamilyMember::new(
            "m1".to_string(),
            "memorial_1".to_string(),
            "Edith".to_string(),
            "Grandmother".to_string(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn lifespan_covers_every_date_combination() {
        assert_eq!(Lifespan::from_dates(None, None), None);
        assert_eq!(
            Lifespan::from_dates(date(1931, 3, 4), None),
            Some(Lifespan::Born {
                born: "March 4, 1931".to_string()
            })
        );
        assert_eq!(
            Lifespan::from_dates(None, date(2020, 11, 21)),
            Some(Lifespan::Died {
                died: "November 21, 2020".to_string()
            })
        );
        let span = Lifespan::from_dates(date(1931, 3, 4), date(2020, 11, 21)).unwrap();
        assert_eq!(span.to_string(), "March 4, 1931 - November 21, 2020");
    }

    #[test]
    fn free_member_gets_upsell_even_with_stored_content() {
        let mut m = member();
        m.bio = Some("Stale biography".to_string());
        m.image_url = Some("https://img.example.com/edith.jpg".to_string());

        let detail = MemberDetail::from_member(&m);
        assert!(!detail.shows_premium_content());
        match detail.premium {
            PremiumSection::Upsell { action, .. } => assert_eq!(action, "Upgrade"),
            other => panic!("expected upsell, got {other:?}"),
        }
    }

    #[test]
    fn premium_member_shows_only_populated_parts() {
        let mut m = member();
        m.is_premium = true;
        m.bio = Some("Kept bees for forty years.".to_string());

        let detail = MemberDetail::from_member(&m);
        assert_eq!(
            detail.premium,
            PremiumSection::Extended {
                image_url: None,
                bio: Some("Kept bees for forty years.".to_string()),
            }
        );

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json["premium"].get("imageUrl").is_none());
        assert!(json["premium"].get("image_url").is_none());
        assert!(json.get("lifespan").is_none());
    }

    #[test]
    fn premium_member_without_content_is_not_an_error() {
        let mut m = member();
        m.is_premium = true;
        let detail = MemberDetail::from_member(&m);
        assert_eq!(
            detail.premium,
            PremiumSection::Extended {
                image_url: None,
                bio: None
            }
        );
    }
}

//! Family member request/response DTOs for the v1 API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::common::double_option;
use crate::hierarchy::{Forest, HierarchyWarning, TreeRow};
use crate::models::{self, PaymentMethod};
use crate::views::MemberDetail;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/memorials/{memorialId}/family`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyMemberRequest {
    /// Parent member in the same memorial. Omit for a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    /// Free text, e.g. "Grandmother".
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    /// Ignored unless the member is premium. New members never are.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Must be false; premium is granted through the subscribe endpoint.
    #[serde(default)]
    pub is_premium: bool,
}

impl From<CreateFamilyMemberRequest> for models::NewFamilyMember {
    fn from(req: CreateFamilyMemberRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            name: req.name,
            relationship: req.relationship,
            birth_date: req.birth_date,
            death_date: req.death_date,
            bio: req.bio,
            image_url: req.image_url,
            is_premium: req.is_premium,
        }
    }
}

impl From<models::NewFamilyMember> for CreateFamilyMemberRequest {
    fn from(member: models::NewFamilyMember) -> Self {
        Self {
            parent_id: member.parent_id,
            name: member.name,
            relationship: member.relationship,
            birth_date: member.birth_date,
            death_date: member.death_date,
            bio: member.bio,
            image_url: member.image_url,
            is_premium: member.is_premium,
        }
    }
}

/// Request body for `PATCH /v1/memorials/{memorialId}/family/{memberId}`.
///
/// Absent fields are left unchanged. On nullable fields an explicit `null`
/// clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFamilyMemberRequest {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = Date)]
    pub death_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    /// `false` demotes. `true` is only accepted for members already premium.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

impl From<UpdateFamilyMemberRequest> for models::FamilyMemberPatch {
    fn from(req: UpdateFamilyMemberRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            name: req.name,
            relationship: req.relationship,
            birth_date: req.birth_date,
            death_date: req.death_date,
            bio: req.bio,
            image_url: req.image_url,
            is_premium: req.is_premium,
        }
    }
}

impl From<models::FamilyMemberPatch> for UpdateFamilyMemberRequest {
    fn from(patch: models::FamilyMemberPatch) -> Self {
        Self {
            parent_id: patch.parent_id,
            name: patch.name,
            relationship: patch.relationship,
            birth_date: patch.birth_date,
            death_date: patch.death_date,
            bio: patch.bio,
            image_url: patch.image_url,
            is_premium: patch.is_premium,
        }
    }
}

/// Request body for `POST /v1/memorials/{memorialId}/family/{memberId}/subscribe`.
///
/// Raw card data is never accepted here; `paymentToken` is an opaque value
/// issued by the payment processor's own client.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

/// Query parameters for `GET /v1/memorials/{memorialId}/family/tree`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FamilyTreeQuery {
    /// Member ids to render collapsed. Repeat the key for several.
    #[serde(default)]
    pub collapsed: Vec<String>,
    /// Offer the edit action on each row.
    #[serde(default)]
    pub editable: bool,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// A member as the outside world sees it. Premium content is omitted while
/// the member is not premium, even if it is still stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberResponse {
    /// Unique member ID (nanoid, 21 chars).
    pub member_id: String,
    pub memorial_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_premium: bool,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<models::FamilyMember> for FamilyMemberResponse {
    fn from(member: models::FamilyMember) -> Self {
        let bio = member.visible_bio().map(str::to_string);
        let image_url = member.visible_image_url().map(str::to_string);
        Self {
            member_id: member.id,
            memorial_id: member.memorial_id,
            parent_id: member.parent_id,
            name: member.name,
            relationship: member.relationship,
            birth_date: member.birth_date,
            death_date: member.death_date,
            bio,
            image_url,
            is_premium: member.is_premium,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl From<FamilyMemberResponse> for models::FamilyMember {
    fn from(resp: FamilyMemberResponse) -> Self {
        Self {
            id: resp.member_id,
            memorial_id: resp.memorial_id,
            parent_id: resp.parent_id,
            name: resp.name,
            relationship: resp.relationship,
            birth_date: resp.birth_date,
            death_date: resp.death_date,
            bio: resp.bio,
            image_url: resp.image_url,
            is_premium: resp.is_premium,
            created_at: resp.created_at,
            updated_at: resp.updated_at,
        }
    }
}

/// Response for `GET /v1/memorials/{memorialId}/family`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFamilyMembersResponse {
    /// Every member of the memorial, in insertion order.
    pub members: Vec<FamilyMemberResponse>,
}

/// One node of the organized forest.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTreeNodeResponse {
    #[serde(flatten)]
    pub member: FamilyMemberResponse,
    #[schema(value_type = Vec<Object>)]
    pub children: Vec<FamilyTreeNodeResponse>,
}

/// Response for `GET /v1/memorials/{memorialId}/family/tree`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTreeResponse {
    pub roots: Vec<FamilyTreeNodeResponse>,
    /// Visible rows for the requested expansion state, in display order.
    pub rows: Vec<TreeRow>,
    /// Data problems repaired while organizing (cycles, duplicate ids).
    pub warnings: Vec<HierarchyWarning>,
    pub total: usize,
}

impl FamilyTreeResponse {
    pub fn new(forest: &Forest, rows: Vec<TreeRow>) -> Self {
        Self {
            roots: convert_forest(forest),
            rows,
            warnings: forest.warnings.clone(),
            total: forest.len(),
        }
    }
}

/// Convert without recursion: pre-order ids, then build nodes bottom-up.
fn convert_forest(forest: &Forest) -> Vec<FamilyTreeNodeResponse> {
    let walk = forest.walk();
    let mut built: Vec<Option<FamilyTreeNodeResponse>> = vec![None; walk.len()];
    let mut child_slots: Vec<Vec<usize>> = vec![Vec::new(); walk.len()];
    let mut roots = Vec::new();
    let mut ancestors: Vec<(usize, usize)> = Vec::new();

    for (index, (depth, _)) in walk.iter().enumerate() {
        while ancestors.last().is_some_and(|&(d, _)| d >= *depth) {
            ancestors.pop();
        }
        match ancestors.last() {
            Some(&(_, parent)) => child_slots[parent].push(index),
            None => roots.push(index),
        }
        ancestors.push((*depth, index));
    }

    for index in (0..walk.len()).rev() {
        let children = child_slots[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(FamilyTreeNodeResponse {
            member: FamilyMemberResponse::from(walk[index].1.member.clone()),
            children,
        });
    }

    roots.into_iter().filter_map(|index| built[index].take()).collect()
}

/// Response for `GET /v1/memorials/{memorialId}/family/{memberId}`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberDetailResponse {
    pub member: FamilyMemberResponse,
    /// Read-only presentation used by the detail dialog.
    pub detail: MemberDetail,
}

impl From<models::FamilyMember> for FamilyMemberDetailResponse {
    fn from(member: models::FamilyMember) -> Self {
        let detail = MemberDetail::from_member(&member);
        Self {
            member: member.into(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::organize;
    use pretty_assertions::assert_eq;

    fn member(id: &str, parent_id: Option<&str>) -> models::FamilyMember {
        let mut m = models::FamilyMember::new(
            id.to_string(),
            "mem_1".to_string(),
            format!("Name {id}"),
            "Relative".to_string(),
        );
        m.parent_id = parent_id.map(str::to_string);
        m
    }

    #[test]
    fn patch_request_keeps_null_distinct_from_absent() {
        let req: UpdateFamilyMemberRequest =
            serde_json::from_str(r#"{"parentId":null,"name":"Edith"}"#).unwrap();
        let patch: models::FamilyMemberPatch = req.into();
        assert_eq!(patch.parent_id, Some(None));
        assert_eq!(patch.name.as_deref(), Some("Edith"));
        assert_eq!(patch.bio, None);

        let back = serde_json::to_value(UpdateFamilyMemberRequest::from(patch)).unwrap();
        assert_eq!(back, serde_json::json!({"parentId": null, "name": "Edith"}));
    }

    #[test]
    fn response_hides_content_of_free_member() {
        let mut m = member("a", None);
        m.bio = Some("Stale".to_string());
        m.image_url = Some("https://img.example.com/a.jpg".to_string());

        let json = serde_json::to_value(FamilyMemberResponse::from(m.clone())).unwrap();
        assert!(json.get("bio").is_none());
        assert!(json.get("imageUrl").is_none());

        m.is_premium = true;
        let json = serde_json::to_value(FamilyMemberResponse::from(m)).unwrap();
        assert_eq!(json["bio"], "Stale");
        assert_eq!(json["memberId"], "a");
    }

    #[test]
    fn tree_response_mirrors_forest_shape() {
        let forest = organize(&[
            member("1", None),
            member("2", Some("1")),
            member("3", Some("2")),
            member("4", Some("1")),
            member("5", None),
        ]);
        let resp = FamilyTreeResponse::new(&forest, Vec::new());

        assert_eq!(resp.total, 5);
        assert_eq!(resp.roots.len(), 2);
        let first = &resp.roots[0];
        assert_eq!(first.member.member_id, "1");
        let child_ids: Vec<&str> = first
            .children
            .iter()
            .map(|c| c.member.member_id.as_str())
            .collect();
        assert_eq!(child_ids, vec!["2", "4"]);
        assert_eq!(first.children[0].children[0].member.member_id, "3");
        assert!(resp.roots[1].children.is_empty());
    }

    #[test]
    fn tree_node_serializes_flat_with_children() {
        let forest = organize(&[member("1", None), member("2", Some("1"))]);
        let json = serde_json::to_value(FamilyTreeResponse::new(&forest, Vec::new())).unwrap();
        assert_eq!(json["roots"][0]["memberId"], "1");
        assert_eq!(json["roots"][0]["children"][0]["memberId"], "2");
        assert_eq!(json["warnings"], serde_json::json!([]));
    }

    #[test]
    fn subscribe_request_defaults_to_card() {
        let req: SubscribeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.method, PaymentMethod::Card);
        assert!(req.payment_token.is_none());
    }
}

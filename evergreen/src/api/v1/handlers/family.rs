//! v1 family member handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{
    CreateFamilyMemberRequest, FamilyMemberDetailResponse, FamilyMemberResponse, FamilyTreeQuery,
    FamilyTreeResponse, ListFamilyMembersResponse, SubscribeRequest, UpdateFamilyMemberRequest,
};
use crate::api::v1::response::{ApiError, ApiResponse, ResponseMeta};
use crate::api::AppState;
use crate::hierarchy::{render_rows, ExpansionState, RenderOptions};
use crate::models::SubscriptionRequest;

/// `GET /api/v1/memorials/{memorialId}/family`
#[utoipa::path(
    get,
    path = "/api/v1/memorials/{memorialId}/family",
    tag = "family",
    operation_id = "family.list",
    params(("memorialId" = String, Path, description = "Memorial ID")),
    responses(
        (status = 200, description = "Members in insertion order", body = ListFamilyMembersResponse),
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(memorial_id): Path<String>,
) -> ApiResponse<ListFamilyMembersResponse> {
    match state.family.list(&memorial_id).await {
        Ok(members) => {
            let total = members.len() as u64;
            ApiResponse::success_with_meta(
                ListFamilyMembersResponse {
                    members: members.into_iter().map(FamilyMemberResponse::from).collect(),
                },
                ResponseMeta { total: Some(total) },
            )
        }
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/memorials/{memorialId}/family/tree`
///
/// Every node starts expanded; ids listed in `collapsed` are folded.
#[utoipa::path(
    get,
    path = "/api/v1/memorials/{memorialId}/family/tree",
    tag = "family",
    operation_id = "family.tree",
    params(
        ("memorialId" = String, Path, description = "Memorial ID"),
        FamilyTreeQuery,
    ),
    responses(
        (status = 200, description = "Organized forest and visible rows", body = FamilyTreeResponse),
    )
)]
pub async fn get_tree(
    State(state): State<AppState>,
    Path(memorial_id): Path<String>,
    Query(query): Query<FamilyTreeQuery>,
) -> ApiResponse<FamilyTreeResponse> {
    let forest = match state.family.tree(&memorial_id).await {
        Ok(forest) => forest,
        Err(e) => return e.into(),
    };

    if !forest.warnings.is_empty() {
        tracing::warn!(
            memorial_id = %memorial_id,
            warnings = forest.warnings.len(),
            "Family tree data needed repair"
        );
    }

    let mut expansion = ExpansionState::expand_all(&forest);
    for id in &query.collapsed {
        expansion.collapse(id);
    }
    let rows = render_rows(
        &forest,
        &expansion,
        RenderOptions {
            editable: query.editable,
        },
    );

    ApiResponse::success(FamilyTreeResponse::new(&forest, rows))
}

/// `POST /api/v1/memorials/{memorialId}/family`
#[utoipa::path(
    post,
    path = "/api/v1/memorials/{memorialId}/family",
    tag = "family",
    operation_id = "family.create",
    params(("memorialId" = String, Path, description = "Memorial ID")),
    request_body = CreateFamilyMemberRequest,
    responses(
        (status = 201, description = "Member created", body = FamilyMemberResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    Path(memorial_id): Path<String>,
    AppJson(req): AppJson<CreateFamilyMemberRequest>,
) -> ApiResponse<FamilyMemberResponse> {
    match state.family.create(&memorial_id, req.into()).await {
        Ok(member) => ApiResponse::created(FamilyMemberResponse::from(member)),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/memorials/{memorialId}/family/{memberId}`
#[utoipa::path(
    get,
    path = "/api/v1/memorials/{memorialId}/family/{memberId}",
    tag = "family",
    operation_id = "family.get",
    params(
        ("memorialId" = String, Path, description = "Memorial ID"),
        ("memberId" = String, Path, description = "Family member ID"),
    ),
    responses(
        (status = 200, description = "Member found", body = FamilyMemberDetailResponse),
        (status = 404, description = "Member not found", body = ApiError),
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path((memorial_id, member_id)): Path<(String, String)>,
) -> ApiResponse<FamilyMemberDetailResponse> {
    match state.family.get(&memorial_id, &member_id).await {
        Ok(member) => ApiResponse::success(FamilyMemberDetailResponse::from(member)),
        Err(e) => e.into(),
    }
}

/// `PATCH /api/v1/memorials/{memorialId}/family/{memberId}`
#[utoipa::path(
    patch,
    path = "/api/v1/memorials/{memorialId}/family/{memberId}",
    tag = "family",
    operation_id = "family.update",
    params(
        ("memorialId" = String, Path, description = "Memorial ID"),
        ("memberId" = String, Path, description = "Family member ID"),
    ),
    request_body = UpdateFamilyMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = FamilyMemberResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Member not found", body = ApiError),
        (status = 409, description = "Move would create a cycle", body = ApiError),
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    Path((memorial_id, member_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpdateFamilyMemberRequest>,
) -> ApiResponse<FamilyMemberResponse> {
    match state
        .family
        .update(&memorial_id, &member_id, req.into())
        .await
    {
        Ok(member) => ApiResponse::success(FamilyMemberResponse::from(member)),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/memorials/{memorialId}/family/{memberId}/subscribe`
#[utoipa::path(
    post,
    path = "/api/v1/memorials/{memorialId}/family/{memberId}/subscribe",
    tag = "family",
    operation_id = "family.subscribe",
    params(
        ("memorialId" = String, Path, description = "Memorial ID"),
        ("memberId" = String, Path, description = "Family member ID"),
    ),
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Member is premium", body = FamilyMemberResponse),
        (status = 402, description = "Payment declined", body = ApiError),
        (status = 404, description = "Member not found", body = ApiError),
        (status = 409, description = "A subscription for this member is already in progress", body = ApiError),
    )
)]
pub async fn subscribe_member(
    State(state): State<AppState>,
    Path((memorial_id, member_id)): Path<(String, String)>,
    AppJson(req): AppJson<SubscribeRequest>,
) -> ApiResponse<FamilyMemberResponse> {
    let request = SubscriptionRequest {
        memorial_id,
        member_id,
        method: req.method,
        payment_token: req.payment_token,
    };
    match state.family.subscribe(request).await {
        Ok(member) => ApiResponse::success(FamilyMemberResponse::from(member)),
        Err(e) => e.into(),
    }
}

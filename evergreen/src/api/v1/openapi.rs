use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::{hierarchy, models, views};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Evergreen API",
        version = "1.0.0",
        description = "Family trees for digital memorials: members, hierarchy, and premium upgrades.",
    ),
    paths(
        handlers::health::health_check,
        handlers::family::list_members,
        handlers::family::get_tree,
        handlers::family::create_member,
        handlers::family::get_member,
        handlers::family::update_member,
        handlers::family::subscribe_member,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Family
        dto::family::CreateFamilyMemberRequest,
        dto::family::UpdateFamilyMemberRequest,
        dto::family::SubscribeRequest,
        dto::family::FamilyMemberResponse,
        dto::family::ListFamilyMembersResponse,
        dto::family::FamilyTreeNodeResponse,
        dto::family::FamilyTreeResponse,
        dto::family::FamilyMemberDetailResponse,
        models::PaymentMethod,
        // Hierarchy and presentation
        hierarchy::TreeRow,
        hierarchy::Toggle,
        hierarchy::Avatar,
        hierarchy::RowAction,
        hierarchy::HierarchyWarning,
        views::MemberDetail,
        views::Lifespan,
        views::PremiumSection,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::PaymentsStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "family", description = "Family members, tree view, and premium subscriptions"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

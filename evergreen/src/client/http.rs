//! HTTP client for the v1 family API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::traits::{MemberRecordStore, SubscriptionGateway};
use crate::api::v1::dto::{
    CreateFamilyMemberRequest, FamilyMemberDetailResponse, FamilyMemberResponse,
    ListFamilyMembersResponse, SubscribeRequest, UpdateFamilyMemberRequest,
};
use crate::api::v1::response::ApiResponse;
use crate::config::ClientConfig;
use crate::error::{EvergreenError, Result};
use crate::models::{FamilyMember, FamilyMemberPatch, NewFamilyMember, PaymentMethod};

/// Longest slice of a non-envelope error body kept in the error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpFamilyClient {
    client: Client,
    base_url: Url,
}

impl HttpFamilyClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_base_url(&config.server_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(EvergreenError::Validation(format!(
                "Server URL '{base_url}' cannot be used as a base"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Member plus its read-only detail view.
    pub async fn get_member(
        &self,
        memorial_id: &str,
        member_id: &str,
    ) -> Result<FamilyMemberDetailResponse> {
        let url = self.family_url(memorial_id, &[member_id])?;
        self.send(self.client.request(Method::GET, url)).await
    }

    /// `/api/v1/memorials/{memorialId}/family/{tail...}` with every segment
    /// percent-encoded.
    fn family_url(&self, memorial_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                EvergreenError::Validation("Server URL cannot be used as a base".to_string())
            })?;
            segments
                .pop_if_empty()
                .extend(["api", "v1", "memorials", memorial_id, "family"])
                .extend(tail);
        }
        Ok(url)
    }

    async fn send<T>(&self, request: RequestBuilder) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
            Ok(envelope) => envelope.into_result(),
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => {
                let body = String::from_utf8_lossy(&bytes);
                let message: String = body.chars().take(MAX_ERROR_BODY).collect();
                tracing::debug!(status = status.as_u16(), "Non-envelope error response");
                Err(EvergreenError::Remote {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl MemberRecordStore for HttpFamilyClient {
    async fn list_members(&self, memorial_id: &str) -> Result<Vec<FamilyMember>> {
        let url = self.family_url(memorial_id, &[])?;
        let list: ListFamilyMembersResponse =
            self.send(self.client.request(Method::GET, url)).await?;
        Ok(list.members.into_iter().map(FamilyMember::from).collect())
    }

    async fn create_member(
        &self,
        memorial_id: &str,
        member: NewFamilyMember,
    ) -> Result<FamilyMember> {
        let url = self.family_url(memorial_id, &[])?;
        let body = CreateFamilyMemberRequest::from(member);
        let created: FamilyMemberResponse = self
            .send(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(created.into())
    }

    async fn update_member(
        &self,
        memorial_id: &str,
        member_id: &str,
        patch: FamilyMemberPatch,
    ) -> Result<FamilyMember> {
        let url = self.family_url(memorial_id, &[member_id])?;
        let body = UpdateFamilyMemberRequest::from(patch);
        let updated: FamilyMemberResponse = self
            .send(self.client.request(Method::PATCH, url).json(&body))
            .await?;
        Ok(updated.into())
    }
}

#[async_trait]
impl SubscriptionGateway for HttpFamilyClient {
    async fn subscribe(
        &self,
        memorial_id: &str,
        member_id: &str,
        method: PaymentMethod,
        payment_token: Option<String>,
    ) -> Result<FamilyMember> {
        let url = self.family_url(memorial_id, &[member_id, "subscribe"])?;
        let body = SubscribeRequest {
            method,
            payment_token,
        };
        let member: FamilyMemberResponse = self
            .send(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(member.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpFamilyClient {
        HttpFamilyClient::with_base_url(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn family_url_encodes_segments() {
        let url = client("http://localhost:3000")
            .family_url("mem 1", &["a/b", "subscribe"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/v1/memorials/mem%201/family/a%2Fb/subscribe"
        );
    }

    #[test]
    fn family_url_keeps_base_path() {
        let url = client("https://example.com/evergreen/")
            .family_url("m1", &[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/evergreen/api/v1/memorials/m1/family"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let err = HttpFamilyClient::with_base_url("mailto:someone@example.com", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, EvergreenError::Validation(_)));
    }
}

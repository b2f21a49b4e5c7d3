//! HTTP access to the remote circle service.

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::error::ApiError;
use super::types::{Circle, CircleDraft, Member, MemberRole};

/// Operations the remote circle service offers.
#[async_trait]
pub trait CircleRemote: Send + Sync {
  async fn create_circle(&self, draft: &CircleDraft) -> Result<Circle, ApiError>;

  async fn get_circle(&self, id: &str) -> Result<Circle, ApiError>;

  async fn list_circles(&self) -> Result<Vec<Circle>, ApiError>;

  /// Returns the member as the remote stored it.
  async fn add_member(&self, circle_id: &str, member: &Member) -> Result<Member, ApiError>;

  /// Returns the circle that was joined.
  async fn join_by_code(&self, code: &str, member: &Member) -> Result<Circle, ApiError>;
}

/// reqwest-backed client. Clone is cheap; the connection pool is shared.
#[derive(Clone)]
pub struct CircleApiClient {
  client: Client,
  base_url: Url,
  token: Option<String>,
}

impl CircleApiClient {
  pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL '{}': {}", base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API base URL '{}' cannot carry a path", base_url));
    }

    let client = Client::builder()
      .timeout(timeout)
      .connect_timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Join path segments onto the base URL, percent-encoding each one.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    debug!(%method, %url, "Circle API request");
    let builder = self.client.request(method, url);
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Check if response is successful, returning an error with body if not.
  async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
      Ok(response)
    } else {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      Err(ApiError::from_status(status, &body))
    }
  }

  async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
    let response = Self::check_response(builder.send().await?).await?;
    Ok(response.json().await?)
  }
}

#[async_trait]
impl CircleRemote for CircleApiClient {
  async fn create_circle(&self, draft: &CircleDraft) -> Result<Circle, ApiError> {
    let url = self.endpoint(&["circles"]);
    self.send(self.request(Method::POST, url).json(draft)).await
  }

  async fn get_circle(&self, id: &str) -> Result<Circle, ApiError> {
    let url = self.endpoint(&["circles", id]);
    self.send(self.request(Method::GET, url)).await
  }

  async fn list_circles(&self) -> Result<Vec<Circle>, ApiError> {
    let url = self.endpoint(&["circles"]);
    self.send(self.request(Method::GET, url)).await
  }

  async fn add_member(&self, circle_id: &str, member: &Member) -> Result<Member, ApiError> {
    let url = self.endpoint(&["circles", circle_id, "members"]);
    let mut body = member.clone();
    if body.role.is_none() {
      body.role = Some(MemberRole::Member);
    }
    self.send(self.request(Method::POST, url).json(&body)).await
  }

  async fn join_by_code(&self, code: &str, member: &Member) -> Result<Circle, ApiError> {
    let url = self.endpoint(&["circles", "join", code]);
    self.send(self.request(Method::POST, url).json(member)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::RemoteFailure;

  fn client(base: &str) -> CircleApiClient {
    CircleApiClient::new(base, Duration::from_secs(2), None).unwrap()
  }

  #[test]
  fn test_endpoint_building() {
    let api = client("http://localhost:8080/api");
    assert_eq!(
      api.endpoint(&["circles"]).as_str(),
      "http://localhost:8080/api/circles"
    );
    assert_eq!(
      api.endpoint(&["circles", "a b/c", "members"]).as_str(),
      "http://localhost:8080/api/circles/a%20b%2Fc/members"
    );

    let trailing = client("http://localhost:8080/api/");
    assert_eq!(
      trailing.endpoint(&["circles", "join", "AB12CD34"]).as_str(),
      "http://localhost:8080/api/circles/join/AB12CD34"
    );
  }

  #[test]
  fn test_rejects_bad_base_url() {
    assert!(CircleApiClient::new("not a url", Duration::from_secs(1), None).is_err());
    assert!(CircleApiClient::new("mailto:ops@example.com", Duration::from_secs(1), None).is_err());
  }

  #[tokio::test]
  async fn test_closed_port_is_unreachable() {
    let api = client("http://127.0.0.1:1/api");
    let err = api.list_circles().await.unwrap_err();
    assert!(err.is_unreachable(), "{}", err);
  }
}

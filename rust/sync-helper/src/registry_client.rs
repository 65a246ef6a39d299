//! HTTP client for the enode registry

use reqwest::{Response, StatusCode};
use std::time::Duration;

use crate::error::RegistryClientError;
use crate::types::{EnodeRequest, ErrorBody, RegisterValidatorRequest, UpdateCompleteRequest};

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RegistryClient {
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, RegistryClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Announce our enode
    pub async fn post_enode(&self, enode: &str) -> Result<(), RegistryClientError> {
        let response = self
            .http
            .post(self.url("/post-enode"))
            .header(reqwest::header::AUTHORIZATION, self.token.as_str())
            .json(&EnodeRequest { enode })
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Current peer list
    pub async fn get_enodes(&self) -> Result<Vec<String>, RegistryClientError> {
        let response = self.http.get(self.url("/get-enode")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn register_validator(
        &self,
        request: &RegisterValidatorRequest<'_>,
    ) -> Result<(), RegistryClientError> {
        let response = self
            .http
            .post(self.url("/api/register-validator"))
            .header(reqwest::header::AUTHORIZATION, self.token.as_str())
            .json(request)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    pub async fn report_update(
        &self,
        request: &UpdateCompleteRequest<'_>,
    ) -> Result<(), RegistryClientError> {
        let response = self
            .http
            .post(self.url("/api/update-complete"))
            .header(reqwest::header::AUTHORIZATION, self.token.as_str())
            .json(request)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

/// Map non-2xx responses onto typed errors, using the `{error}` body if present
async fn check(response: Response) -> Result<Response, RegistryClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);

    Err(match status {
        StatusCode::BAD_REQUEST => RegistryClientError::Validation(message),
        StatusCode::UNAUTHORIZED => RegistryClientError::Unauthorized,
        StatusCode::CONFLICT => RegistryClientError::Conflict(message),
        other => RegistryClientError::Status {
            code: other.as_u16(),
            message,
        },
    })
}

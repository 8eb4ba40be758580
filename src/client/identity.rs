use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::EcosystemUser;

/// External identity service: resolves or creates the user owning a wallet.
/// A black box to this crate; the reconciler only calls it.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn ensure_ecosystem_user(
        &self,
        wallet: &str,
        email: Option<&str>,
        role: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<EcosystemUser>;
}

pub struct HttpIdentityService {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpIdentityService {
    pub fn new(url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            token: token.map(str::to_string),
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn ensure_ecosystem_user(
        &self,
        wallet: &str,
        email: Option<&str>,
        role: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<EcosystemUser> {
        let payload = serde_json::json!({
            "wallet": wallet,
            "email": email,
            "role": role,
            "metadata": metadata,
        });

        let mut request = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(8))
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("calling identity service")?;

        if !response.status().is_success() {
            return Err(anyhow!("identity service returned {}", response.status()));
        }

        let user: EcosystemUser =
            response.json().await.context("decoding identity response")?;

        tracing::debug!("ecosystem user {} ensured for wallet {}", user.id, wallet);
        Ok(user)
    }
}

/// Used when no identity service is configured; the reconciler treats the
/// user as unresolved and carries on.
pub struct NoopIdentityService;

#[async_trait]
impl IdentityService for NoopIdentityService {
    async fn ensure_ecosystem_user(
        &self,
        _wallet: &str,
        _email: Option<&str>,
        _role: Option<&str>,
        _metadata: Option<&Value>,
    ) -> Result<EcosystemUser> {
        Err(anyhow!("no identity service configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn posts_wallet_and_returns_user_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ensure-user")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"id": "user-42"}"#)
            .create_async()
            .await;

        let service = HttpIdentityService::new(&format!("{}/ensure-user", server.url()), Some("tok"));
        let user = service
            .ensure_ecosystem_user("EQAbcDef", Some("a@b.c"), Some("payer"), None)
            .await
            .unwrap();

        assert_eq!(user.id, "user-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/ensure-user").with_status(500).create_async().await;

        let service = HttpIdentityService::new(&format!("{}/ensure-user", server.url()), None);
        assert!(service.ensure_ecosystem_user("EQAbcDef", None, None, None).await.is_err());
    }
}

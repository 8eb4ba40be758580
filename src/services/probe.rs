use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::models::Transport;

/// Unified result of an outbound probe. Callers never branch on which
/// transport served the request.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub transport: Transport,
    pub ok: bool,
}

#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &str) -> Result<ProbeResponse>;

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<ProbeResponse>;
}

/// Native transport backed by reqwest.
pub struct FetchProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl FetchProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl HttpProbe for FetchProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let body = response.text().await.unwrap_or_default();

        Ok(ProbeResponse { status, body, transport: Transport::Fetch, ok })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<ProbeResponse> {
        let mut request = self.client.post(url).timeout(self.timeout).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.with_context(|| format!("POST {}", url))?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let body = response.text().await.unwrap_or_default();

        Ok(ProbeResponse { status, body, transport: Transport::Fetch, ok })
    }
}

/// Subprocess transport driving curl, for environments where the native
/// client cannot complete a request.
pub struct CurlProbe {
    timeout_secs: u64,
}

impl CurlProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// One-time capability check at startup.
    pub async fn available() -> bool {
        Command::new("curl")
            .arg("--version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: Vec<String>, url: &str) -> Result<ProbeResponse> {
        // -w appends the status code after the body on a marker line.
        let output = Command::new("curl")
            .args(&args)
            .output()
            .await
            .with_context(|| format!("curl {}", url))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("curl exited with {}: {}", output.status, stderr.trim()));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let (body, status) = match raw.rsplit_once("\n__STATUS__:") {
            Some((body, code)) => {
                let status: u16 = code.trim().parse().context("curl status trailer")?;
                (body.to_string(), status)
            }
            None => return Err(anyhow!("curl produced no status trailer")),
        };

        Ok(ProbeResponse {
            status,
            body,
            transport: Transport::Subprocess,
            ok: (200..300).contains(&status),
        })
    }
}

#[async_trait]
impl HttpProbe for CurlProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        let args = vec![
            "-sS".to_string(),
            "-m".to_string(),
            self.timeout_secs.to_string(),
            "-w".to_string(),
            "\n__STATUS__:%{http_code}".to_string(),
            url.to_string(),
        ];
        self.run(args, url).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<ProbeResponse> {
        let mut args = vec![
            "-sS".to_string(),
            "-m".to_string(),
            self.timeout_secs.to_string(),
            "-X".to_string(),
            "POST".to_string(),
            "-H".to_string(),
            "Content-Type: application/json".to_string(),
        ];
        if let Some(token) = bearer {
            args.push("-H".to_string());
            args.push(format!("Authorization: Bearer {}", token));
        }
        args.push("-d".to_string());
        args.push(body.to_string());
        args.push("-w".to_string());
        args.push("\n__STATUS__:%{http_code}".to_string());
        args.push(url.to_string());

        self.run(args, url).await
    }
}

/// Prefers the native client and retries once over curl when the native call
/// fails at the transport level. The fallback's own failure propagates as an
/// error, never as a definitive verdict.
pub struct FallbackProbe {
    fetch: FetchProbe,
    curl: Option<CurlProbe>,
}

impl FallbackProbe {
    pub async fn detect(timeout_secs: u64) -> Self {
        let curl = if CurlProbe::available().await {
            Some(CurlProbe::new(timeout_secs))
        } else {
            tracing::warn!("curl not available, subprocess transport disabled");
            None
        };

        Self { fetch: FetchProbe::new(timeout_secs), curl }
    }

    pub fn fetch_only(timeout_secs: u64) -> Self {
        Self { fetch: FetchProbe::new(timeout_secs), curl: None }
    }
}

#[async_trait]
impl HttpProbe for FallbackProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        match self.fetch.get(url).await {
            Ok(response) => Ok(response),
            Err(native_err) => match &self.curl {
                Some(curl) => {
                    tracing::debug!("native GET failed ({}), retrying over curl", native_err);
                    curl.get(url).await
                }
                None => Err(native_err),
            },
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<ProbeResponse> {
        match self.fetch.post_json(url, body, bearer).await {
            Ok(response) => Ok(response),
            Err(native_err) => match &self.curl {
                Some(curl) => {
                    tracing::debug!("native POST failed ({}), retrying over curl", native_err);
                    curl.post_json(url, body, bearer).await
                }
                None => Err(native_err),
            },
        }
    }
}

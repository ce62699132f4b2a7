// Typed HTTP client for the observatory backend's {code, msg, info} envelope
use crate::application::error::DashboardError;
use crate::infrastructure::config::join_url;
use reqwest::multipart::Form;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const TOKEN_HEADER: &str = "x-api-token";
const SUCCESS: i64 = 200;

/// Every backend response. `code == 200` is success; anything else carries a
/// user-facing `msg`. Extra top-level fields are kept in `extra`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub info: Option<T>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl<T> Envelope<T> {
    fn message(&self) -> String {
        self.msg.clone().unwrap_or_default()
    }

    /// Classify a non-success envelope. A message mentioning the token means the session expired.
    pub fn check(&self) -> Result<(), DashboardError> {
        if self.code == SUCCESS {
            return Ok(());
        }
        let msg = self.message();
        if msg.contains("Token") {
            Err(DashboardError::SessionExpired(msg))
        } else {
            Err(DashboardError::Server {
                code: self.code,
                msg,
            })
        }
    }

    pub fn into_info(self) -> Result<T, DashboardError> {
        self.check()?;
        let code = self.code;
        self.info.ok_or(DashboardError::Server {
            code,
            msg: "The server returned no data.".to_string(),
        })
    }

    /// Success message of a mutation.
    pub fn into_message(self) -> Result<String, DashboardError> {
        self.check()?;
        Ok(self.message())
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
    ) -> Result<Envelope<T>, DashboardError> {
        let request = self.http.get(self.url(path));
        self.send(with_token(request, token), path).await
    }

    pub async fn post<B, T>(
        &self,
        token: Option<&str>,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, DashboardError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        self.send(with_token(request, token), path).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
        form: Form,
    ) -> Result<Envelope<T>, DashboardError> {
        let request = self.http.post(self.url(path)).multipart(form);
        self.send(with_token(request, token), path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<Envelope<T>, DashboardError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {}", path, e);
            DashboardError::from(e)
        })?;
        let status = response.status();
        let body = response.bytes().await?;

        // Error envelopes may arrive with a non-2xx status; the envelope wins when it parses.
        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) => {
                if envelope.code != SUCCESS {
                    tracing::warn!(
                        "Backend rejected {} with code {}: {}",
                        path,
                        envelope.code,
                        envelope.message()
                    );
                }
                Ok(envelope)
            }
            Err(_) if !status.is_success() => Err(DashboardError::Server {
                code: i64::from(status.as_u16()),
                msg: format!("The server answered {}", status),
            }),
            Err(e) => {
                tracing::error!("Undecodable response from {}: {}", path, e);
                Err(DashboardError::Network(format!("invalid response from {}: {}", path, e)))
            }
        }
    }
}

fn with_token(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.header(TOKEN_HEADER, token),
        None => request,
    }
}

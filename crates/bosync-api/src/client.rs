// Gateway HTTP client
//
// Wraps `reqwest::Client` with gateway-scoped URL construction, bearer
// token management, and response decoding. Endpoint groups (ontology,
// subscriptions, live data, alarms) are implemented as inherent methods
// in separate files to keep this module focused on transport mechanics.

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::auth::{self, AccessToken, ClientCredentials};
use crate::error::Error;
use crate::transport::TransportConfig;

// ── Error response shape from the gateway ────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default, alias = "title")]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one gateway of the ontology API.
///
/// Every request goes to `{base}/gateway/{gateway_id}/api/v1/{endpoint}`
/// with a bearer token obtained through the client-credentials grant.
/// The token is fetched lazily and cached until shortly before expiry.
pub struct OntologyClient {
    http: reqwest::Client,
    base_url: Url,
    gateway_id: String,
    credentials: ClientCredentials,
    token: RwLock<Option<AccessToken>>,
}

impl OntologyClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        gateway_id: impl Into<String>,
        credentials: ClientCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, gateway_id, credentials))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        gateway_id: impl Into<String>,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            http,
            base_url,
            gateway_id: gateway_id.into(),
            credentials,
            token: RwLock::new(None),
        }
    }

    /// The gateway this client talks to.
    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    /// The API base URL (without the gateway segment).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Token management ─────────────────────────────────────────────

    /// Force a fresh token exchange.
    ///
    /// Not required before other calls (tokens are fetched on demand), but
    /// useful to surface credential problems up front.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let token = auth::request_token(&self.http, &self.credentials).await?;
        *self.token.write().await = Some(token);
        Ok(())
    }

    /// Return a usable bearer token, exchanging credentials when needed.
    async fn bearer(&self) -> Result<secrecy::SecretString, Error> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
        }
        let token = auth::request_token(&self.http, &self.credentials).await?;
        let secret = token.token.clone();
        *guard = Some(token);
        Ok(secret)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/gateway/{gateway_id}/api/v1/{endpoint}`.
    pub(crate) fn url(&self, endpoint: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/gateway/{}/api/v1/{endpoint}", self.gateway_id);
        Ok(Url::parse(&full)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        let url = self.url(endpoint)?;
        debug!("GET {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(endpoint)?;
        debug!("GET {url} params={params:?}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(endpoint)?;
        debug!("POST {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// POST and decode the body only when the gateway sent one.
    pub(crate) async fn post_optional<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Option<T>, Error> {
        let url = self.url(endpoint)?;
        debug!("POST {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.parse_error(status, resp).await);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode(body).map(Some)
    }

    pub(crate) async fn post_no_response<B: Serialize + Sync + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(endpoint)?;
        debug!("POST {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    pub(crate) async fn put_no_response<B: Serialize + Sync + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(endpoint)?;
        debug!("PUT {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    /// DELETE with a JSON body (subscription removal identifies the
    /// subscription in the body, not the path).
    pub(crate) async fn delete_with_body<B: Serialize + Sync + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(endpoint)?;
        debug!("DELETE {url}");

        let token = self.bearer().await?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            decode(body)
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Error::TokenExpired;
        }

        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                message: Some(message),
            }) => message,
            _ if raw.is_empty() => status.to_string(),
            _ => preview(&raw).to_owned(),
        };

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

/// First 200 bytes of a body, cut on a char boundary.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> OntologyClient {
        let credentials = ClientCredentials::new(
            "client",
            "secret".to_string().into(),
            Url::parse("https://login.example/token").unwrap(),
        );
        OntologyClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            "gw-1",
            credentials,
        )
    }

    #[test]
    fn url_is_gateway_scoped() {
        let c = client("https://api.example/proxy/v1");
        assert_eq!(
            c.url("core/application/data").unwrap().as_str(),
            "https://api.example/proxy/v1/gateway/gw-1/api/v1/core/application/data"
        );
    }

    #[test]
    fn url_ignores_trailing_slash_on_base() {
        let c = client("https://api.example/proxy/v1/");
        assert_eq!(
            c.url("core/application/data/version").unwrap().path(),
            "/proxy/v1/gateway/gw-1/api/v1/core/application/data/version"
        );
    }
}

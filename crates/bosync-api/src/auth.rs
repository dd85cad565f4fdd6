// Client-credentials token exchange.
//
// The gateway sits behind an OAuth2 identity provider. Every account owns
// a client id/secret pair; a form POST to the token endpoint yields a
// short-lived bearer token that is attached to every gateway request.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::client::preview;
use crate::error::Error;

/// Scope requested when the account does not override it.
pub const DEFAULT_TOKEN_SCOPE: &str = "api://openbos/.default";

/// Tokens are refreshed this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Credentials for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_url: Url,
    pub scope: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString, token_url: Url) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            token_url,
            scope: DEFAULT_TOKEN_SCOPE.to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// A bearer token plus the instant after which it must be refreshed.
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    pub(crate) token: SecretString,
    refresh_after: Option<Instant>,
}

impl AccessToken {
    pub(crate) fn is_fresh(&self) -> bool {
        self.refresh_after.is_none_or(|deadline| Instant::now() < deadline)
    }
}

/// Exchange client credentials for an access token.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    credentials: &ClientCredentials,
) -> Result<AccessToken, Error> {
    debug!("POST {} (client_credentials)", credentials.token_url);

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.expose_secret()),
        ("scope", credentials.scope.as_str()),
    ];

    let resp = http
        .post(credentials.token_url.clone())
        .form(&form)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Authentication {
            message: format!("token endpoint returned HTTP {status}: {}", preview(&body)),
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

    let Some(token) = parsed.access_token.filter(|t| !t.is_empty()) else {
        return Err(Error::Authentication {
            message: "token response carried no access_token".into(),
        });
    };

    let refresh_after = parsed.expires_in.map(|secs| {
        Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN)
    });

    debug!(expires_in = ?parsed.expires_in, "obtained access token");

    Ok(AccessToken {
        token: SecretString::from(token),
        refresh_after,
    })
}

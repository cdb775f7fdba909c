//! Reddit saved-listing client.
//!
//! Authenticates as a script app with the OAuth password grant and reads
//! `/user/{name}/saved`. The bearer token is cached until shortly before it
//! expires.

use super::ContentSource;
use crate::config::HttpConfig;
use crate::models::{Item, ItemKind};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before Reddit says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Credentials of a Reddit script app and the account it acts for.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Me {
    name: String,
}

#[derive(Debug)]
struct CachedToken {
    value: SecretString,
    expires_at: Instant,
}

/// Reddit API client.
pub struct RedditClient {
    credentials: RedditCredentials,
    auth_url: String,
    api_url: String,
    client: reqwest::blocking::Client,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("username", &self.credentials.username)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl RedditClient {
    /// Default token endpoint.
    pub const DEFAULT_AUTH_URL: &'static str = "https://www.reddit.com/api/v1/access_token";

    /// Default API base URL for authenticated requests.
    pub const DEFAULT_API_URL: &'static str = "https://oauth.reddit.com";

    /// Creates a client for the given account.
    #[must_use]
    pub fn new(credentials: RedditCredentials, http: &HttpConfig) -> Self {
        let user_agent = user_agent(&credentials.username);
        Self {
            credentials,
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            client: http.build_client(&user_agent),
            token: Mutex::new(None),
        }
    }

    /// Checks that the credentials work and belong to the configured user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if authentication fails or the
    /// token belongs to a different account.
    #[tracing::instrument(skip(self), fields(username = %self.credentials.username))]
    pub fn verify_authentication(&self) -> Result<()> {
        let me: Me = self.get_json(&format!("{}/api/v1/me", self.api_url))?;
        if me.name.eq_ignore_ascii_case(&self.credentials.username) {
            tracing::info!("Reddit authentication verified");
            Ok(())
        } else {
            Err(unavailable(format!(
                "authenticated as '{}' but configured for '{}'",
                me.name, self.credentials.username
            )))
        }
    }

    fn bearer_token(&self) -> Result<SecretString> {
        let mut guard = self
            .token
            .lock()
            .map_err(|e| unavailable(format!("token cache poisoned: {e}")))?;

        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token()?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    fn invalidate_token(&self) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
    }

    fn request_token(&self) -> Result<CachedToken> {
        tracing::debug!(provider = "reddit", "Requesting access token");

        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(self.credentials.client_secret.expose_secret()),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.expose_secret()),
            ])
            .send()
            .map_err(|e| transport_error("reddit_token", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "reddit",
                status = %status,
                body = %body,
                "Token request rejected"
            );
            return Err(unavailable(format!("token request returned {status}")));
        }

        let body = response
            .text()
            .map_err(|e| transport_error("reddit_token", &e))?;
        parse_token(&body, Instant::now())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.bearer_token()?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .map_err(|e| transport_error("reddit_request", &e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token();
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "reddit",
                status = %status,
                body = %body,
                "Reddit API returned error status"
            );
            return Err(unavailable(format!("API returned status: {status}")));
        }

        response.json().map_err(|e| {
            tracing::error!(provider = "reddit", error = %e, "Failed to parse Reddit response");
            unavailable(format!("decode error: {e}"))
        })
    }
}

impl ContentSource for RedditClient {
    fn name(&self) -> &'static str {
        "reddit"
    }

    #[tracing::instrument(skip(self), fields(username = %self.credentials.username))]
    fn fetch_saved(&self, limit: usize) -> Result<Vec<Item>> {
        let url = format!(
            "{}/user/{}/saved?limit={limit}&sort=new&raw_json=1",
            self.api_url, self.credentials.username
        );
        let listing: Listing = self.get_json(&url)?;
        let items = items_from_listing(listing);
        tracing::debug!(count = items.len(), "Fetched saved items");
        Ok(items)
    }
}

fn user_agent(username: &str) -> String {
    format!(
        "script:reddit2dynalist:v{} (by /u/{username})",
        env!("CARGO_PKG_VERSION")
    )
}

fn unavailable(cause: impl Into<String>) -> Error {
    Error::SourceUnavailable {
        cause: cause.into(),
    }
}

fn transport_error(operation: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_decode() {
        "decode"
    } else {
        "request"
    };
    tracing::error!(
        provider = "reddit",
        operation,
        error = %e,
        error_kind,
        "Reddit request failed"
    );
    unavailable(format!("{error_kind} error: {e}"))
}

fn parse_token(body: &str, now: Instant) -> Result<CachedToken> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| unavailable(format!("malformed token response: {e}")))?;

    // Reddit answers bad credentials with 200 and an `error` field.
    if let Some(error) = response.error {
        return Err(unavailable(format!("token request failed: {error}")));
    }
    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unavailable("token response has no access_token"))?;

    let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
    Ok(CachedToken {
        value: SecretString::from(access_token),
        expires_at: now + lifetime,
    })
}

/// Decodes a saved listing body into items, preserving listing order.
///
/// # Errors
///
/// Returns [`Error::SourceUnavailable`] if the body is not a listing.
pub fn parse_listing(body: &str) -> Result<Vec<Item>> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| unavailable(format!("decode error: {e}")))?;
    Ok(items_from_listing(listing))
}

fn items_from_listing(listing: Listing) -> Vec<Item> {
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| !thing.data.name.is_empty())
        .map(item_from_thing)
        .collect()
}

fn item_from_thing(thing: Thing) -> Item {
    let data = thing.data;
    let kind = ItemKind::from_thing_kind(&thing.kind);
    let created_at = data
        .created_utc
        .and_then(timestamp_from_secs)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let item = match kind {
        ItemKind::Comment => Item::comment(data.name, data.author, data.permalink),
        ItemKind::Post => Item::post(
            data.name,
            data.author,
            data.title.unwrap_or_default(),
            data.permalink,
        ),
    };
    item.with_created_at(created_at)
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}

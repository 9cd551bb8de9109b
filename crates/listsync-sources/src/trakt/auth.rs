use chrono::{Duration, Utc};
use listsync_models::Credential;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use tracing::{debug, info};
use crate::error::RemoteError;

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const USER_AGENT: &str = concat!("listsync/", env!("CARGO_PKG_VERSION"));

/// Tokens are treated as expired this long before the remote says they are
const EXPIRY_MARGIN_SECS: i64 = 120;

/// Create the shared reqwest Client with a per-request timeout
pub fn create_trakt_client(timeout: StdDuration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Standard OAuth refresh-token grant against `{api_url}/oauth/token`.
///
/// The remote rotates refresh tokens, so the returned credential must replace
/// the stored one.
pub async fn refresh_access_token(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    credential: &Credential,
) -> Result<Credential, RemoteError> {
    const OPERATION: &str = "token refresh";

    let payload = serde_json::json!({
        "refresh_token": credential.refresh_token,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "refresh_token"
    });

    debug!(user = %credential.user, "Requesting Trakt token refresh");

    let response = client
        .post(format!("{}/oauth/token", api_url))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|source| RemoteError::Transport { operation: OPERATION, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            operation: OPERATION,
            status: status.as_u16(),
            body,
        });
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| RemoteError::Decode { operation: OPERATION, message: e.to_string() })?;

    let refreshed = credential_from_response(credential, token_response);
    info!(user = %refreshed.user, expires_at = %refreshed.expires_at, "Refreshed Trakt access token");
    Ok(refreshed)
}

fn credential_from_response(previous: &Credential, token_response: TokenResponse) -> Credential {
    let expires_at = Utc::now() + Duration::seconds(token_response.expires_in - EXPIRY_MARGIN_SECS);
    Credential {
        user: previous.user.clone(),
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listsync_models::UserRef;

    #[test]
    fn test_credential_from_response_applies_margin() {
        let previous = Credential {
            user: UserRef::new("alice"),
            access_token: "old".to_string(),
            refresh_token: "old-refresh".to_string(),
            expires_at: Utc::now() - Duration::hours(1),
        };
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "new",
            "refresh_token": "new-refresh",
            "expires_in": 7776000,
            "token_type": "bearer",
            "scope": "public"
        }))
        .unwrap();

        let before = Utc::now();
        let refreshed = credential_from_response(&previous, response);
        assert_eq!(refreshed.user, previous.user);
        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.refresh_token, "new-refresh");
        let expected = before + Duration::seconds(7776000 - EXPIRY_MARGIN_SECS);
        assert!((refreshed.expires_at - expected).num_seconds().abs() < 5);
    }
}

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use librespot::core::authentication::Credentials;
use rspotify::Token;

use crate::error::InitError;

const SPOTIFY_REDIRECT_URI: &str = "http://127.0.0.1:8898/login";
pub const SCOPES: &str =
    "streaming user-read-private playlist-read-private playlist-read-collaborative user-library-read";

const RESPONSE: &str = r#"
<!doctype html>
<html>
<head><title>Success</title></head>
<body><h1>Authentication Successful!</h1><script>window.close();</script></body>
</html>
"#;
const REFRESH_TOKEN_FILE: &str = "refresh_token";

/// Credentials for the streaming session plus a Web API token for metadata
#[derive(Clone)]
pub struct AuthResult {
    pub credentials: Credentials,
    pub web_token: Token,
}

fn scopes() -> Vec<&'static str> {
    SCOPES.split_whitespace().collect()
}

fn store_refresh_token(dir: &Path, refresh_token: &str) {
    let path = dir.join(REFRESH_TOKEN_FILE);
    let saved = fs::create_dir_all(dir).and_then(|()| fs::write(&path, refresh_token));
    match saved {
        Ok(()) => tracing::debug!("Saved refresh token to disk"),
        Err(e) => tracing::warn!(error = %e, path = %path.display(), "Could not save refresh token"),
    }
}

async fn perform_browser_auth(client_id: &str, credentials_dir: &Path) -> Result<String, InitError> {
    tracing::info!("Starting browser-based OAuth flow");
    let client = librespot_oauth::OAuthClientBuilder::new(client_id, SPOTIFY_REDIRECT_URI, scopes())
        .open_in_browser()
        .with_custom_message(RESPONSE)
        .build()
        .map_err(|e| InitError::Auth(e.to_string()))?;

    let token = client
        .get_access_token_async()
        .await
        .map_err(|e| InitError::Auth(e.to_string()))?;

    store_refresh_token(credentials_dir, &token.refresh_token);
    tracing::info!("Browser authentication completed successfully");
    Ok(token.access_token)
}

async fn refresh_stored_token(
    client_id: &str,
    credentials_dir: &Path,
    refresh_token: &str,
) -> Result<String, InitError> {
    let client = librespot_oauth::OAuthClientBuilder::new(client_id, SPOTIFY_REDIRECT_URI, scopes())
        .build()
        .map_err(|e| InitError::Auth(e.to_string()))?;

    let token = client
        .refresh_token_async(refresh_token)
        .await
        .map_err(|e| InitError::Auth(e.to_string()))?;

    store_refresh_token(credentials_dir, &token.refresh_token);
    tracing::debug!("Token refreshed successfully");
    Ok(token.access_token)
}

/// Obtain an access token, reusing the stored refresh token when it still works
pub async fn perform_oauth_flow(
    client_id: &str,
    credentials_dir: Option<PathBuf>,
) -> Result<AuthResult, InitError> {
    if client_id.trim().is_empty() {
        return Err(InitError::MissingApplicationKey);
    }
    let credentials_dir = credentials_dir.ok_or(InitError::CacheDirUnavailable)?;

    let stored_refresh_token = fs::read_to_string(credentials_dir.join(REFRESH_TOKEN_FILE)).ok();

    let access_token = match stored_refresh_token {
        Some(refresh_token) => {
            tracing::info!("Found stored refresh token");
            match refresh_stored_token(client_id, &credentials_dir, refresh_token.trim()).await {
                Ok(access_token) => access_token,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored refresh token failed, re-authenticating");
                    perform_browser_auth(client_id, &credentials_dir).await?
                }
            }
        }
        None => {
            tracing::info!("No stored credentials found, starting browser authentication");
            perform_browser_auth(client_id, &credentials_dir).await?
        }
    };

    Ok(AuthResult {
        credentials: Credentials::with_access_token(access_token.clone()),
        web_token: Token {
            access_token,
            expires_in: chrono::Duration::seconds(3600),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(3600)),
            scopes: SCOPES
                .split_whitespace()
                .map(|s| s.to_string())
                .collect::<HashSet<String>>(),
            refresh_token: None,
        },
    })
}

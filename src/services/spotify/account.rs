use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{OptionExt, Result, WrapErr, eyre};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::services::spotify::client::{SpotifyApiCredentials, SpotifyHttpAdapter};
use crate::spotify_rs::auth::{exchange_code_for_token, initiate_oauth, refresh_access_token};
use crate::spotify_rs::types::SpotifyTokenResponse;

/// Token cache on disk, the JSON token response of the last exchange.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SpotifyTokenResponse>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("Failed to read token cache: {}", self.path.display()))?;
        let token = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse token cache: {}", self.path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &SpotifyTokenResponse) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create token cache directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, contents)
            .wrap_err_with(|| format!("Failed to write token cache: {}", self.path.display()))
    }
}

pub struct SpotifyAccountService {
    credentials: SpotifyApiCredentials,
    store: TokenStore,
}

impl SpotifyAccountService {
    pub fn new(credentials: SpotifyApiCredentials, store: TokenStore) -> Self {
        Self { credentials, store }
    }

    /// Refreshes the cached token and returns a client using the fresh access token.
    pub async fn connect(&self, requests_per_second: NonZeroU32) -> Result<SpotifyHttpAdapter> {
        let cached = self.store.load()?.ok_or_else(|| {
            eyre!(
                "No Spotify token found at {}. Run the `auth` command first.",
                self.store.path().display()
            )
        })?;
        let refresh_token = cached
            .refresh_token
            .clone()
            .ok_or_eyre("Cached Spotify token has no refresh token. Run the `auth` command again.")?;

        let mut token = refresh_access_token(
            self.credentials.client_id(),
            self.credentials.client_secret(),
            &refresh_token,
        )
        .await
        .wrap_err("Failed to refresh Spotify access token")?;

        // Spotify only sometimes rotates the refresh token
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }
        self.store.save(&token)?;
        log::debug!("Refreshed Spotify access token, expires in {}s", token.expires_in);

        Ok(SpotifyHttpAdapter::new(token.access_token, requests_per_second))
    }

    /// Interactive authorization code flow: prints the authorize URL, reads the redirected
    /// URL from stdin and stores the resulting token.
    pub async fn authorize(&self) -> Result<()> {
        let (response, session) =
            initiate_oauth(self.credentials.client_id(), self.credentials.redirect_uri());

        println!("Open this URL in a browser and authorize the app:\n\n{}\n", response.auth_url);
        println!("Then paste the full URL you were redirected to:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .wrap_err("Failed to read redirect URL from stdin")?;

        let code = parse_redirect(line.trim(), &session.state)?;

        let token = exchange_code_for_token(
            self.credentials.client_id(),
            self.credentials.client_secret(),
            &code,
            self.credentials.redirect_uri(),
            &session.code_verifier,
        )
        .await
        .wrap_err("Failed to exchange authorization code")?;

        self.store.save(&token)?;
        println!("Spotify token saved to {}", self.store.path().display());
        Ok(())
    }
}

/// Extracts the authorization code from a redirect URL after checking its state.
fn parse_redirect(redirect_url: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(redirect_url)
        .wrap_err_with(|| format!("Invalid redirect URL: {}", redirect_url))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(eyre!("Spotify denied authorization: {}", error));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(eyre!("OAuth state mismatch, refusing the redirect"));
    }
    code.ok_or_eyre("Redirect URL has no `code` parameter")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(refresh: Option<&str>) -> SpotifyTokenResponse {
        SpotifyTokenResponse {
            access_token: "access".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            refresh_token: refresh.map(str::to_string),
            scope: "playlist-modify-public playlist-read-private".into(),
        }
    }

    #[test]
    fn test_token_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&token(Some("refresh"))).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_token_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(TokenStore::new(path).load().is_err());
    }

    #[tokio::test]
    async fn test_connect_without_cached_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let service = SpotifyAccountService::new(
            SpotifyApiCredentials::new("id".into(), "secret".into(), "http://x".into()),
            TokenStore::new(dir.path().join("token.json")),
        );

        let result = service.connect(NonZeroU32::new(1).unwrap()).await;

        let message = format!("{:?}", result.err().unwrap());
        assert!(message.contains("Run the `auth` command first"));
    }

    #[test]
    fn test_parse_redirect() {
        let code = parse_redirect(
            "http://127.0.0.1:8888/callback?code=AQB123&state=abc",
            "abc",
        )
        .unwrap();
        assert_eq!(code, "AQB123");
    }

    #[test]
    fn test_parse_redirect_state_mismatch() {
        let result = parse_redirect("http://127.0.0.1:8888/callback?code=AQB&state=evil", "abc");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_redirect_denied() {
        let result = parse_redirect(
            "http://127.0.0.1:8888/callback?error=access_denied&state=abc",
            "abc",
        );
        assert!(format!("{}", result.unwrap_err()).contains("access_denied"));
    }
}

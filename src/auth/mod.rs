//! Authentication module for LokalChat
//!
//! Username/password login against the REST auth endpoints; access and
//! refresh tokens are persisted in the config file and refreshed on demand.

pub mod tokens;

pub use tokens::{StoredToken, TokenStore};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::models::User;

/// Response shape of `/auth/login`, `/auth/register` and `/auth/refresh`.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Access token lifetime in seconds, when the server reports one.
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    user: Option<User>,
}

/// Read the password from the terminal (or a pipe) when not given as a flag.
fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Empty password");
    }
    Ok(password)
}

fn store_session(config: &mut Config, resp: AuthResponse) -> Result<()> {
    config.set_access_token(resp.access_token, resp.expires_in);
    if let Some(rt) = resp.refresh_token {
        config.set_refresh_token(rt);
    }
    if let Some(ref user) = resp.user {
        config.set_user(user);
    }
    config.save()
}

/// Log in with username/password and persist the session.
pub async fn login(username: &str, password: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };

    let url = format!("{}/auth/login", config.api_url());
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Login failed ({}): {}", status.as_u16(), body);
    }

    let auth: AuthResponse = resp.json().await.context("Failed to parse login response")?;
    let name = auth
        .user
        .as_ref()
        .map(|u| u.label().to_string())
        .unwrap_or_else(|| username.to_string());
    store_session(&mut config, auth)?;

    println!("Logged in as {}", name);
    Ok(())
}

/// Register a new account and persist the session.
pub async fn register(username: &str, display_name: &str, password: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };

    let url = format!("{}/auth/register", config.api_url());
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "display_name": display_name,
        }))
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Registration failed ({}): {}", status.as_u16(), body);
    }

    let auth: AuthResponse = resp
        .json()
        .await
        .context("Failed to parse register response")?;
    store_session(&mut config, auth)?;

    println!("Registered and logged in as {}", username);
    Ok(())
}

/// Exchange the refresh token for a new access token.
///
/// Returns `Ok(false)` when no refresh token is stored; errors only on a
/// failed exchange.
pub async fn refresh() -> Result<bool> {
    let mut config = Config::load()?;
    let refresh_token = match config.get_refresh_token() {
        Some(rt) => rt,
        None => return Ok(false),
    };

    tracing::info!("Refreshing access token...");

    let url = format!("{}/auth/refresh", config.api_url());
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?;

    if !resp.status().is_success() {
        bail!("Token refresh rejected with {}", resp.status().as_u16());
    }

    let auth: AuthResponse = resp
        .json()
        .await
        .context("Failed to parse refresh response")?;
    config.set_access_token(auth.access_token, auth.expires_in);
    if let Some(rt) = auth.refresh_token {
        config.set_refresh_token(rt);
    }
    config.save()?;

    tracing::info!("Access token refreshed");
    Ok(true)
}

/// Invalidate the session server-side (best effort) and clear stored tokens.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;

    if let Some(token) = config.get_access_token() {
        let url = format!("{}/auth/logout", config.api_url());
        let result = reqwest::Client::new()
            .post(&url)
            .bearer_auth(&token.token)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!("Server-side logout failed (tokens cleared anyway): {:#}", e);
        }
    }

    config.clear_tokens();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Print current authentication status.
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    match config.get_access_token() {
        Some(token) => {
            let who = config
                .get_user()
                .map(|u| format!("{} ({})", u.label(), u.username))
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Logged in: {}", who);
            if token.is_expired() {
                println!("Access token: expired (will refresh on next request)");
            } else {
                println!("Access token: valid");
            }
            println!(
                "Refresh token: {}",
                if config.get_refresh_token().is_some() {
                    "present"
                } else {
                    "absent"
                }
            );
            println!("API: {}", config.api_url());
            println!("Socket: {}", config.socket_url());
        }
        None => {
            println!("Not logged in. Run 'lokal-cli login <username>'.");
        }
    }

    Ok(())
}

//! User profile, search and admin REST endpoints

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::{AdminStats, User};

/// Fetch the current user's profile.
pub async fn me_data(client: &ApiClient) -> Result<User> {
    let resp = client.get("/users/me").await?;
    resp.json().await.context("Failed to parse profile")
}

/// Update the current user's profile. Only the given fields are sent.
pub async fn update_profile_data(
    client: &ApiClient,
    display_name: Option<&str>,
    password: Option<&str>,
    avatar_path: Option<&str>,
) -> Result<User> {
    let mut body = serde_json::Map::new();
    if let Some(v) = display_name {
        body.insert("display_name".into(), v.into());
    }
    if let Some(v) = password {
        body.insert("password".into(), v.into());
    }
    if let Some(v) = avatar_path {
        body.insert("avatar_path".into(), v.into());
    }

    let resp = client
        .put("/users/me", &serde_json::Value::Object(body))
        .await?;
    resp.json().await.context("Failed to parse updated profile")
}

/// Upload an avatar image; returns the stored path/URL.
pub async fn upload_avatar_data(client: &ApiClient, path: &std::path::Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("avatar")
        .to_string();

    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);

    #[derive(serde::Deserialize)]
    struct UploadResponse {
        url: String,
    }

    let resp = client.post_multipart("/files/avatar", form).await?;
    let upload: UploadResponse = resp.json().await.context("Failed to parse upload response")?;
    Ok(upload.url)
}

/// Search users by name/username (for adding chat members).
pub async fn search_users_data(client: &ApiClient, query: &str) -> Result<Vec<User>> {
    let resp = client.get(&search_path(query)).await?;
    resp.json().await.context("Failed to parse search results")
}

/// Build the search path with the query URL-encoded.
fn search_path(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("/users/search?query={}", encoded)
}

// ---------------------------------------------------------------------------
// Admin endpoints
// ---------------------------------------------------------------------------

pub async fn admin_list_users_data(client: &ApiClient) -> Result<Vec<User>> {
    let resp = client.get("/admin/users").await?;
    resp.json().await.context("Failed to parse user list")
}

pub async fn admin_create_user_data(
    client: &ApiClient,
    username: &str,
    password: &str,
    display_name: &str,
    is_admin: bool,
) -> Result<User> {
    let body = serde_json::json!({
        "username": username,
        "password": password,
        "display_name": display_name,
        "is_admin": is_admin,
    });
    let resp = client.post("/admin/users", &body).await?;
    resp.json().await.context("Failed to parse created user")
}

pub async fn admin_update_user_data(
    client: &ApiClient,
    user_id: &str,
    body: &serde_json::Value,
) -> Result<User> {
    let resp = client
        .put(&format!("/admin/users/{}", user_id), body)
        .await?;
    resp.json().await.context("Failed to parse updated user")
}

pub async fn admin_delete_user_data(client: &ApiClient, user_id: &str) -> Result<()> {
    client.delete(&format!("/admin/users/{}", user_id)).await?;
    Ok(())
}

pub async fn admin_stats_data(client: &ApiClient) -> Result<AdminStats> {
    let resp = client.get("/admin/stats").await?;
    resp.json().await.context("Failed to parse stats")
}

// ---------------------------------------------------------------------------
// CLI-facing functions (print to stdout)
// ---------------------------------------------------------------------------

/// Update the current profile; uploads the avatar first when given.
pub async fn update_profile(
    display_name: Option<String>,
    password: Option<String>,
    avatar: Option<&std::path::Path>,
) -> Result<()> {
    let client = ApiClient::new().await?;

    let avatar_path = match avatar {
        Some(path) => Some(upload_avatar_data(&client, path).await?),
        None => None,
    };

    let user = update_profile_data(
        &client,
        display_name.as_deref(),
        password.as_deref(),
        avatar_path.as_deref(),
    )
    .await?;

    // Keep the cached user in sync with the server.
    let mut config = crate::config::Config::load()?;
    config.set_user(&user);
    config.save()?;

    println!("Profile updated.");
    Ok(())
}

/// Show the current user (verify auth works).
pub async fn whoami() -> Result<()> {
    let client = ApiClient::new().await?;
    let user = me_data(&client).await?;

    println!("\nCurrent User:");
    println!("  Name: {}", user.label());
    println!("  Username: {}", user.username);
    println!("  ID: {}", user.id);
    if user.is_admin {
        println!("  Role: admin");
    }

    Ok(())
}

/// Search users and print matches.
pub async fn search_users(query: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let users = search_users_data(&client, query).await?;

    if users.is_empty() {
        println!("(no users matched '{}')", query);
        return Ok(());
    }

    for user in &users {
        println!("{}  [{}]  {}", user.label(), user.username, user.id);
    }

    Ok(())
}

/// List all users (admin).
pub async fn admin_list_users() -> Result<()> {
    let client = ApiClient::new().await?;
    let users = admin_list_users_data(&client).await?;

    println!("\nUsers:");
    println!("{:-<60}", "");
    for user in &users {
        let flags = match (user.is_admin, user.is_active) {
            (true, true) => " [admin]",
            (true, false) => " [admin, disabled]",
            (false, false) => " [disabled]",
            (false, true) => "",
        };
        println!("{}  ({}){}", user.label(), user.username, flags);
        println!("  ID: {}", user.id);
    }

    Ok(())
}

/// Create a user (admin).
pub async fn admin_create_user(
    username: &str,
    password: &str,
    display_name: &str,
    is_admin: bool,
) -> Result<()> {
    let client = ApiClient::new().await?;
    let user = admin_create_user_data(&client, username, password, display_name, is_admin).await?;
    println!("Created user {} ({})", user.username, user.id);
    Ok(())
}

/// Update a user (admin).
pub async fn admin_update_user(
    user_id: &str,
    display_name: Option<String>,
    is_admin: Option<bool>,
    is_active: Option<bool>,
) -> Result<()> {
    let client = ApiClient::new().await?;

    let mut body = serde_json::Map::new();
    if let Some(v) = display_name {
        body.insert("display_name".into(), v.into());
    }
    if let Some(v) = is_admin {
        body.insert("is_admin".into(), v.into());
    }
    if let Some(v) = is_active {
        body.insert("is_active".into(), v.into());
    }

    let user =
        admin_update_user_data(&client, user_id, &serde_json::Value::Object(body)).await?;
    println!("Updated user {}", user.username);
    Ok(())
}

/// Delete a user (admin).
pub async fn admin_delete_user(user_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    admin_delete_user_data(&client, user_id).await?;
    println!("Deleted user {}", user_id);
    Ok(())
}

/// Print server statistics (admin).
pub async fn admin_stats() -> Result<()> {
    let client = ApiClient::new().await?;
    let stats = admin_stats_data(&client).await?;

    println!("\nServer Stats ({})", stats.timestamp);
    println!("  Users: {} total, {} active, {} online",
        stats.total_users, stats.active_users, stats.online_users);
    println!("  Chats: {}", stats.total_chats);
    println!("  Messages: {}", stats.total_messages);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::search_path;

    #[test]
    fn search_path_passes_safe_chars() {
        assert_eq!(search_path("alice_1.x"), "/users/search?query=alice_1.x");
    }

    #[test]
    fn search_path_encodes_the_rest() {
        assert_eq!(search_path("a b&c"), "/users/search?query=a+b%26c");
        assert_eq!(search_path("ü"), "/users/search?query=%C3%BC");
    }
}

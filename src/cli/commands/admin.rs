//! Create-admin command handler

use crate::config::Config;
use crate::db::{NewUser, Store};
use crate::services::user_service::{validate_email, validate_password, validate_username};

pub async fn cmd_create_admin(
    config: &Config,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    validate_username(username)?;
    validate_email(&email)?;
    validate_password(password)?;

    let store = Store::new(&config.general.database_path).await?;

    if store.get_user_by_username(username).await?.is_some() {
        anyhow::bail!("Username already taken: {username}");
    }
    if store.get_user_by_email(&email).await?.is_some() {
        anyhow::bail!("Email already registered: {email}");
    }

    let user = store
        .create_user(
            NewUser {
                username: username.to_string(),
                email,
                password: password.to_string(),
                full_name: None,
                is_admin: true,
            },
            &config.security,
        )
        .await?;

    println!("✓ Created administrator '{}' (id {})", user.username, user.id);
    Ok(())
}

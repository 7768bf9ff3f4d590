use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Makes sure the configured first admin exists, is active, holds the admin role and
/// signs in with the configured password.
pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin bootstrap");
        return Ok(());
    }

    let email = admin.first_admin_email.trim();

    if let Some(user) = repositories::users::find_by_email(state.db(), email).await? {
        let password_matches =
            security::verify_password(&admin.first_admin_password, &user.hashed_password)
                .unwrap_or(false);

        if password_matches && user.role == UserRole::Admin && user.is_active {
            tracing::info!(email = %email, "First admin already up to date");
            return Ok(());
        }
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)?;
    let user = repositories::users::upsert_admin(
        state.db(),
        &Uuid::new_v4().to_string(),
        email,
        &hashed_password,
        primitive_now_utc(),
    )
    .await?;

    tracing::info!(user_id = %user.id, email = %email, action = "admin_bootstrap", "Ensured first admin");
    Ok(())
}

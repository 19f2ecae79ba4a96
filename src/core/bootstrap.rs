use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) async fn ensure_super_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_super_admin_password.is_empty() {
        tracing::warn!("FIRST_SUPER_ADMIN_PASSWORD not configured; skipping super admin creation");
        return Ok(());
    }

    let email = &admin.first_super_admin_email;

    let user = repositories::users::find_by_email(state.db(), email).await?;

    let now = primitive_now_utc();

    if let Some(user) = user {
        let mut needs_update = false;
        let verified =
            security::verify_password(&admin.first_super_admin_password, &user.hashed_password)
                .unwrap_or(false);

        let hashed_password = if verified {
            None
        } else {
            needs_update = true;
            Some(security::hash_password(&admin.first_super_admin_password)?)
        };

        let role = if user.role != UserRole::SuperAdmin {
            needs_update = true;
            Some(UserRole::SuperAdmin)
        } else {
            None
        };

        let is_active = if !user.is_active {
            needs_update = true;
            Some(true)
        } else {
            None
        };

        if needs_update {
            repositories::users::update(
                state.db(),
                &user.id,
                repositories::users::UpdateUser {
                    full_name: None,
                    role,
                    school_id: None,
                    phone: None,
                    is_active,
                    hashed_password,
                    updated_at: now,
                },
            )
            .await?;

            tracing::info!("Updated default super admin {email}");
        } else {
            tracing::info!("Default super admin already up to date");
        }

        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_super_admin_password)?;

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            hashed_password,
            full_name: "Super Admin",
            role: UserRole::SuperAdmin,
            school_id: None,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!("Created default super admin {email}");
    Ok(())
}

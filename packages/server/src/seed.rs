use sea_orm::*;
use tracing::info;

use crate::entity::{role, role_permission};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "organizer", "contestant"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "contest:create"),
    ("admin", "contest:manage"),
    ("admin", "contest:delete"),
    ("admin", "task:manage"),
    ("admin", "attempt:submit"),
    ("admin", "attempt:view_all"),
    ("admin", "attempt:review"),
    ("admin", "news:manage"),
    ("admin", "import:run"),
    // Organizer: everything except contest deletion
    ("organizer", "contest:create"),
    ("organizer", "contest:manage"),
    ("organizer", "task:manage"),
    ("organizer", "attempt:submit"),
    ("organizer", "attempt:view_all"),
    ("organizer", "attempt:review"),
    ("organizer", "news:manage"),
    ("organizer", "import:run"),
    // Contestant
    ("contestant", "attempt:submit"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    let mut mappings_inserted = 0u32;
    for &(role_name, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role_name.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => mappings_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    info!(
        roles = roles_inserted,
        mappings = mappings_inserted,
        "Seeded roles and permissions"
    );

    Ok(())
}

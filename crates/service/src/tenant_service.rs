use uuid::Uuid;
use sea_orm::{DatabaseConnection, EntityTrait, ActiveModelTrait, Set};

use models::tenant;
use crate::errors::ServiceError;

/// Create a tenant.
pub async fn create_tenant(db: &DatabaseConnection, name: &str) -> Result<tenant::Model, ServiceError> {
    let created = tenant::create(db, name).await?;
    tracing::info!(tenant_id = %created.id, "tenant_created");
    Ok(created)
}

/// Get tenant by id.
pub async fn get_tenant(db: &DatabaseConnection, id: Uuid) -> Result<Option<tenant::Model>, ServiceError> {
    Ok(tenant::Entity::find_by_id(id).one(db).await?)
}

/// Like [`get_tenant`] but absent is an error.
pub async fn require_tenant(db: &DatabaseConnection, id: Uuid) -> Result<tenant::Model, ServiceError> {
    get_tenant(db, id).await?.ok_or_else(|| ServiceError::not_found("tenant"))
}

/// Update tenant name.
pub async fn update_tenant_name(db: &DatabaseConnection, id: Uuid, name: &str) -> Result<tenant::Model, ServiceError> {
    tenant::validate_name(name)?;
    let mut am: tenant::ActiveModel = tenant::Entity::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| ServiceError::not_found("tenant"))?
        .into();
    am.name = Set(name.trim().to_string());
    Ok(am.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn tenant_crud_service() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;

        let name = format!("svc_tenant_{}", Uuid::new_v4());
        let t = create_tenant(&db, &name).await?;
        assert_eq!(t.name, name);

        let found = require_tenant(&db, t.id).await?;
        assert_eq!(found.id, t.id);

        let updated = update_tenant_name(&db, t.id, " Downtown Gym ").await?;
        assert_eq!(updated.name, "Downtown Gym");

        assert!(matches!(require_tenant(&db, Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(create_tenant(&db, "").await, Err(ServiceError::Validation(_))));
        Ok(())
    }
}

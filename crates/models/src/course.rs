use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors, tenant};

pub const MAX_CAPACITY: i32 = 10_000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub starts_at: DateTimeWithTimeZone,
    pub max_capacity: i32,
    pub current_bookings: i32,
    /// optimistic lock; bumped on every booking change
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Tenant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Tenant => Entity::belongs_to(tenant::Entity).from(Column::TenantId).to(tenant::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn remaining_seats(&self) -> i32 { (self.max_capacity - self.current_bookings).max(0) }

    pub fn is_full(&self) -> bool { self.current_bookings >= self.max_capacity }
}

pub fn validate_capacity(capacity: i32) -> Result<(), errors::ModelError> {
    if capacity <= 0 || capacity > MAX_CAPACITY {
        return Err(errors::ModelError::Validation(format!("max_capacity must be within 1..={MAX_CAPACITY}")));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("course name required".into())); }
    if name.chars().count() > 128 { return Err(errors::ModelError::Validation("course name too long (<=128)".into())); }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    name: &str,
    starts_at: DateTime<Utc>,
    max_capacity: i32,
) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    validate_capacity(max_capacity)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set(name.trim().to_string()),
        starts_at: Set(starts_at.into()),
        max_capacity: Set(max_capacity),
        current_bookings: Set(0),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

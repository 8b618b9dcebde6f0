use chrono::{DateTime, Duration, Utc};
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::tenant;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub phone: String,
    pub card_no: Option<String>,
    pub name: String,
    #[serde(skip_serializing)]
    pub id_card_encrypted: Option<String>,
    pub validity_start: DateTimeWithTimeZone,
    pub validity_end: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Tenant,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Tenant => Entity::belongs_to(tenant::Entity).from(Column::TenantId).to(tenant::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn validity_end_utc(&self) -> DateTime<Utc> { self.validity_end.with_timezone(&Utc) }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.validity_end_utc() <= now
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none() && self.validity_start.with_timezone(&Utc) <= now && !self.is_expired(now)
    }

    /// Whole days left before expiry, rounded up; 0 once expired.
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        let left = self.validity_end_utc() - now;
        if left <= Duration::zero() { return 0; }
        let days = left.num_days();
        if left > Duration::days(days) { days + 1 } else { days }
    }
}

/// Input for [`create`]; `id_card_encrypted` must already be ciphertext.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub tenant_id: Uuid,
    pub phone: String,
    pub card_no: Option<String>,
    pub name: String,
    pub id_card_encrypted: Option<String>,
    pub validity_start: DateTime<Utc>,
    pub validity_end: DateTime<Utc>,
}

pub fn validate_phone(phone: &str) -> Result<(), errors::ModelError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !(7..=20).contains(&phone.len()) || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(errors::ModelError::Validation("phone must be 7-20 digits with optional leading '+'".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("name required".into())); }
    if name.chars().count() > 128 { return Err(errors::ModelError::Validation("name too long (<=128)".into())); }
    Ok(())
}

pub fn validate_card_no(card_no: &str) -> Result<(), errors::ModelError> {
    if card_no.is_empty() || card_no.len() > 32 || !card_no.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(errors::ModelError::Validation("card_no must be 1-32 alphanumeric characters".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewMember) -> Result<Model, errors::ModelError> {
    validate_phone(&input.phone)?;
    validate_name(&input.name)?;
    if let Some(card) = &input.card_no { validate_card_no(card)?; }
    if input.validity_end < input.validity_start {
        return Err(errors::ModelError::Validation("validity_end before validity_start".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(input.tenant_id),
        phone: Set(input.phone),
        card_no: Set(input.card_no),
        name: Set(input.name.trim().to_string()),
        id_card_encrypted: Set(input.id_card_encrypted),
        validity_start: Set(input.validity_start.into()),
        validity_end: Set(input.validity_end.into()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    Ok(am.insert(db).await?)
}

pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, errors::ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id).one(db).await?.ok_or_else(|| errors::ModelError::Validation("member not found".into()))?.into();
    let now = Utc::now().into();
    found.deleted_at = Set(Some(now));
    found.updated_at = Set(now);
    Ok(found.update(db).await?)
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool, errors::ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(end: DateTime<Utc>) -> Model {
        let start = end - Duration::days(30);
        Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            phone: "13800000000".into(),
            card_no: None,
            name: "Ann".into(),
            id_card_encrypted: None,
            validity_start: start.into(),
            validity_end: end.into(),
            created_at: start.into(),
            updated_at: start.into(),
            deleted_at: None,
        }
    }

    #[test]
    fn active_until_end_exclusive() {
        let now = Utc::now();
        let m = sample(now + Duration::hours(1));
        assert!(m.is_active(now));
        assert!(!m.is_expired(now));
        assert!(m.is_expired(now + Duration::hours(1)));
        assert!(!m.is_active(now + Duration::hours(1)));
    }

    #[test]
    fn soft_deleted_member_is_not_active() {
        let now = Utc::now();
        let mut m = sample(now + Duration::days(3));
        m.deleted_at = Some(now.into());
        assert!(!m.is_active(now));
        assert!(!m.is_expired(now));
    }

    #[test]
    fn remaining_days_rounds_up() {
        let now = Utc::now();
        assert_eq!(sample(now + Duration::days(2) + Duration::minutes(1)).remaining_days(now), 3);
        assert_eq!(sample(now + Duration::days(2)).remaining_days(now), 2);
        assert_eq!(sample(now - Duration::days(1)).remaining_days(now), 0);
    }

    #[test]
    fn phone_validation() {
        assert!(validate_phone("+8613800000000").is_ok());
        assert!(validate_phone("5551234").is_ok());
        assert!(validate_phone("555-1234").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("+").is_err());
    }

    #[test]
    fn card_and_name_validation() {
        assert!(validate_card_no("VIP-0001").is_ok());
        assert!(validate_card_no("").is_err());
        assert!(validate_card_no("has space").is_err());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(129)).is_err());
    }
}

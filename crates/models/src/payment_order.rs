use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{PaymentProvider, PaymentStatus};
use crate::{errors, member, tenant};

/// 1,000,000.00 in the smallest currency unit
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    #[sea_orm(unique)]
    pub order_no: String,
    pub amount_cents: i64,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub gateway_txn_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Tenant, Member }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Tenant => Entity::belongs_to(tenant::Entity).from(Column::TenantId).to(tenant::Column::Id).into(),
            Relation::Member => Entity::belongs_to(member::Entity).from(Column::MemberId).to(member::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_amount(amount_cents: i64) -> Result<(), errors::ModelError> {
    if amount_cents <= 0 || amount_cents > MAX_AMOUNT_CENTS {
        return Err(errors::ModelError::Validation(format!("amount_cents must be within 1..={MAX_AMOUNT_CENTS}")));
    }
    Ok(())
}

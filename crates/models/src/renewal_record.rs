use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::PaymentStatus;
use crate::{member, payment_order};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "renewal_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub previous_end: DateTimeWithTimeZone,
    pub new_end: DateTimeWithTimeZone,
    /// days requested by the renewal, excluding bonus
    pub days_added: i32,
    pub bonus_days: i32,
    pub amount_cents: i64,
    pub payment_status: PaymentStatus,
    pub payment_order_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub applied_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Member, PaymentOrder }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Member => Entity::belongs_to(member::Entity).from(Column::MemberId).to(member::Column::Id).into(),
            Relation::PaymentOrder => Entity::belongs_to(payment_order::Entity).from(Column::PaymentOrderId).to(payment_order::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_applied(&self) -> bool { self.applied_at.is_some() }
}

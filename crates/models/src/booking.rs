use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::BookingStatus;
use crate::{course, member};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub member_id: Uuid,
    pub status: BookingStatus,
    pub created_at: DateTimeWithTimeZone,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Course, Member }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Course => Entity::belongs_to(course::Entity).from(Column::CourseId).to(course::Column::Id).into(),
            Relation::Member => Entity::belongs_to(member::Entity).from(Column::MemberId).to(member::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

use crate::models::{CodePurpose, NewVerificationCode, TargetType, VerificationCode};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verification_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub target: String,
    pub target_type: TargetType,
    pub code: String,
    pub purpose: CodePurpose,
    pub expire_time: DateTimeUtc,
    pub used: bool,
    pub create_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for VerificationCode {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            target: model.target,
            target_type: model.target_type,
            code: model.code,
            purpose: model.purpose,
            expire_time: model.expire_time,
            used: model.used,
            create_time: model.create_time,
        }
    }
}

impl From<NewVerificationCode> for ActiveModel {
    fn from(input: NewVerificationCode) -> Self {
        ActiveModel {
            id: NotSet,
            target: Set(input.target),
            target_type: Set(input.target_type),
            code: Set(input.code),
            purpose: Set(input.purpose),
            expire_time: Set(input.expire_time),
            used: Set(false),
            create_time: Set(input.create_time),
        }
    }
}

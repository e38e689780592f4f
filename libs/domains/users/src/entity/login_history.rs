use crate::models::{LoginHistory, NewLoginRecord};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "login_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub account: String,
    pub login_time: DateTimeUtc,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub login_status: i16,
    pub fail_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for LoginHistory {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            account: model.account,
            login_time: model.login_time,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            login_status: model.login_status,
            fail_reason: model.fail_reason,
        }
    }
}

impl From<NewLoginRecord> for ActiveModel {
    fn from(input: NewLoginRecord) -> Self {
        ActiveModel {
            id: NotSet,
            user_id: Set(input.user_id),
            account: Set(input.account),
            login_time: Set(input.login_time),
            ip_address: Set(input.ip_address),
            user_agent: Set(input.user_agent),
            login_status: Set(input.login_status),
            fail_reason: Set(input.fail_reason),
        }
    }
}

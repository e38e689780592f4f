use crate::models::{NewUser, Role, User};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: Option<String>,
    pub account: String,
    pub avatar_url: Option<String>,
    pub gender: Option<i16>,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: i16,
    pub role: Role,
    pub deleted: bool,
    pub create_time: DateTimeUtc,
    pub update_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            account: model.account,
            avatar_url: model.avatar_url,
            gender: model.gender,
            password: model.password,
            phone: model.phone,
            email: model.email,
            status: model.status,
            role: model.role,
            deleted: model.deleted,
            create_time: model.create_time,
            update_time: model.update_time,
        }
    }
}

// Timestamps come from column defaults.
impl From<NewUser> for ActiveModel {
    fn from(input: NewUser) -> Self {
        ActiveModel {
            id: NotSet,
            username: Set(None),
            account: Set(input.account),
            avatar_url: Set(None),
            gender: Set(None),
            password: Set(input.password),
            phone: Set(input.phone),
            email: Set(input.email),
            status: Set(input.status),
            role: Set(input.role),
            deleted: Set(false),
            create_time: NotSet,
            update_time: NotSet,
        }
    }
}

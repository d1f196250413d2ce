// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::IntoActiveModel;

use crate::reconcile::natural_key::{NaturalKeyed, SurrogateKeyed};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "media_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub url: String,
    pub title: String,
    pub pic_path: Option<String>,
    pub vid_path: Option<String>,
    pub created_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl NaturalKeyed for Model {
    type Entity = Entity;

    fn key_column() -> Column {
        Column::Url
    }

    fn key(&self) -> String {
        self.url.clone()
    }
}

impl SurrogateKeyed for Model {
    type Entity = Entity;

    fn id_column() -> Column {
        Column::Id
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// 对账候选记录
///
/// "此记录必须存在"的输入形式，按 `url` 业务键与持久化实体对齐
#[derive(Clone, Debug, PartialEq)]
pub struct MediaCandidate {
    pub url: String,
    pub title: String,
    pub pic_path: Option<String>,
    pub vid_path: Option<String>,
}

impl NaturalKeyed for MediaCandidate {
    type Entity = Entity;

    fn key_column() -> Column {
        Column::Url
    }

    fn key(&self) -> String {
        self.url.clone()
    }
}

impl IntoActiveModel<ActiveModel> for MediaCandidate {
    fn into_active_model(self) -> ActiveModel {
        ActiveModel {
            id: NotSet,
            url: Set(self.url),
            title: Set(self.title),
            pic_path: Set(self.pic_path),
            vid_path: Set(self.vid_path),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}

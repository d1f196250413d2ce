// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::EntityTrait;

/// 业务唯一键特质
///
/// 把候选记录和持久化模型绑定到同一个唯一键列上。
/// 唯一性由存储层的唯一约束保证，应用层不做检查。
pub trait NaturalKeyed {
    type Entity: EntityTrait;

    /// 承载业务唯一键的列
    fn key_column() -> <Self::Entity as EntityTrait>::Column;

    /// 该记录的键值
    fn key(&self) -> String;
}

/// 代理数字标识特质
///
/// 创建时分配一次、永不复用的代理ID，用于按ID对齐并行数组
pub trait SurrogateKeyed {
    type Entity: EntityTrait;

    /// 代理ID列
    fn id_column() -> <Self::Entity as EntityTrait>::Column;

    /// 该记录的代理ID
    fn id(&self) -> i64;
}

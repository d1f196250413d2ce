// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, TransactionTrait, TryInsertResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::natural_key::{NaturalKeyed, SurrogateKeyed};

/// 对账错误类型
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// 数据库错误
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// 对账服务
///
/// 给定一批"此记录必须存在"的候选，在一个事务内保证每个候选
/// 恰好对应一条持久化实体，并按调用方顺序返回。
pub struct ReconcileService {
    db: Arc<DatabaseConnection>,
}

impl ReconcileService {
    /// 创建新的对账服务实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 按业务唯一键批量更新插入
    ///
    /// 返回与输入顺序1:1对齐的实体；无法解析的候选被丢弃。
    /// 同一个键在输入中出现多次时，对应位置引用同一条实体。
    ///
    /// # 参数
    ///
    /// * `candidates` - 候选记录，共享同一个唯一键属性
    /// * `update_attrs` - 对已存在的行，从候选覆盖这些列；为空则不更新
    pub async fn bulk_upsert<C, A>(
        &self,
        candidates: Vec<C>,
        update_attrs: &[<C::Entity as EntityTrait>::Column],
    ) -> Result<Vec<<C::Entity as EntityTrait>::Model>, ReconcileError>
    where
        C: NaturalKeyed + IntoActiveModel<A> + Clone + Send + Sync,
        <C::Entity as EntityTrait>::Model:
            NaturalKeyed<Entity = C::Entity> + IntoActiveModel<A> + Clone,
        A: ActiveModelTrait<Entity = C::Entity> + ActiveModelBehavior + Send,
    {
        let rows = self.reconcile::<C, A>(candidates, update_attrs).await?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// 按业务唯一键批量更新插入，保留输入位置
    ///
    /// 与 [`Self::bulk_upsert`] 相同，但无法解析的候选保留为 `None`
    /// 占位符，输出基数与输入严格一致
    pub async fn bulk_upsert_keep_positions<C, A>(
        &self,
        candidates: Vec<C>,
        update_attrs: &[<C::Entity as EntityTrait>::Column],
    ) -> Result<Vec<Option<<C::Entity as EntityTrait>::Model>>, ReconcileError>
    where
        C: NaturalKeyed + IntoActiveModel<A> + Clone + Send + Sync,
        <C::Entity as EntityTrait>::Model:
            NaturalKeyed<Entity = C::Entity> + IntoActiveModel<A> + Clone,
        A: ActiveModelTrait<Entity = C::Entity> + ActiveModelBehavior + Send,
    {
        self.reconcile::<C, A>(candidates, update_attrs).await
    }

    /// 五步对账：批量查询、差分、定向更新、插入或忽略、重排
    ///
    /// 全部步骤在一个事务内执行。并发写入者在第1步和第4步之间
    /// 抢先插入同一个键时，冲突子句让本次插入静默空操作，
    /// 第5步的重查仍会把该键解析到真实的持久化行。
    async fn reconcile<C, A>(
        &self,
        candidates: Vec<C>,
        update_attrs: &[<C::Entity as EntityTrait>::Column],
    ) -> Result<Vec<Option<<C::Entity as EntityTrait>::Model>>, ReconcileError>
    where
        C: NaturalKeyed + IntoActiveModel<A> + Clone + Send + Sync,
        <C::Entity as EntityTrait>::Model:
            NaturalKeyed<Entity = C::Entity> + IntoActiveModel<A> + Clone,
        A: ActiveModelTrait<Entity = C::Entity> + ActiveModelBehavior + Send,
    {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        info!("going to reconcile {} candidates", candidates.len());
        let keys: Vec<String> = candidates.iter().map(NaturalKeyed::key).collect();
        let txn = self.db.begin().await?;

        // 1. Lookup: one batched select over every candidate key.
        let existing = <C::Entity as EntityTrait>::find()
            .filter(C::key_column().is_in(keys.clone()))
            .all(&txn)
            .await?;
        let existing_keys: HashSet<String> = existing.iter().map(NaturalKeyed::key).collect();

        // 2. Diff + 3. Update: overwrite only the named columns on rows whose
        // key is already present.
        if !update_attrs.is_empty() {
            let mut by_key: HashMap<String, C> = HashMap::new();
            for candidate in &candidates {
                if existing_keys.contains(&candidate.key()) {
                    by_key.insert(candidate.key(), candidate.clone());
                }
            }
            for row in &existing {
                let Some(candidate) = by_key.get(&row.key()) else {
                    continue;
                };
                let source = candidate.clone().into_active_model();
                let mut target = row.clone().into_active_model();
                for column in update_attrs {
                    match source.get(*column) {
                        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => {
                            target.set(*column, value)
                        }
                        ActiveValue::NotSet => {}
                    }
                }
                target.update(&txn).await?;
            }
        }

        // 4. Create: single insert-or-ignore statement for the new keys.
        let fresh: Vec<A> = candidates
            .iter()
            .filter(|candidate| !existing_keys.contains(&candidate.key()))
            .cloned()
            .map(IntoActiveModel::into_active_model)
            .collect();
        if !fresh.is_empty() {
            let outcome = <C::Entity as EntityTrait>::insert_many(fresh)
                .on_conflict(OnConflict::column(C::key_column()).do_nothing().to_owned())
                .on_empty_do_nothing()
                .exec(&txn)
                .await?;
            if let TryInsertResult::Conflicted = outcome {
                debug!("every new row collided with a concurrent insert");
            }
        }

        // 5. Rearrange: re-select and map every candidate position back to
        // its persisted row by key.
        let merged = <C::Entity as EntityTrait>::find()
            .filter(C::key_column().is_in(keys.clone()))
            .all(&txn)
            .await?;
        txn.commit().await?;

        let by_key: HashMap<String, <C::Entity as EntityTrait>::Model> = merged
            .into_iter()
            .map(|model| (model.key(), model))
            .collect();
        Ok(keys.iter().map(|key| by_key.get(key).cloned()).collect())
    }

    /// 按代理ID批量查询，返回与输入ID顺序1:1对齐的结果
    ///
    /// 缺失的ID保留为 `None` 占位符
    pub async fn find_by_ids<M>(&self, ids: &[i64]) -> Result<Vec<Option<M>>, ReconcileError>
    where
        M: SurrogateKeyed + Clone + Send + Sync,
        M::Entity: EntityTrait<Model = M>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = <M::Entity as EntityTrait>::find()
            .filter(M::id_column().is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await?;

        let by_id: HashMap<i64, M> = rows.into_iter().map(|model| (model.id(), model)).collect();
        Ok(ids.iter().map(|id| by_id.get(id).cloned()).collect())
    }

    /// 按业务唯一键查询单条实体
    pub async fn find_by_key<M>(&self, key: &str) -> Result<Option<M>, ReconcileError>
    where
        M: NaturalKeyed + Send + Sync,
        M::Entity: EntityTrait<Model = M>,
    {
        Ok(<M::Entity as EntityTrait>::find()
            .filter(M::key_column().eq(key))
            .one(self.db.as_ref())
            .await?)
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;

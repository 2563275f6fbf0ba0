//! Ledger repository: categories and transactions of one family at a time.

use async_trait::async_trait;
use chrono::Utc;
use nestegg_core::ledger::{
    Category, CategoryRef, LedgerLine, NewCategory, NewTransaction, Selection, Transaction,
    name_key,
};
use nestegg_core::{LedgerStore, StoreError, StoreResult};
use nestegg_shared::types::{FamilyId, TransactionId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{store_err, store_err_with, to_category, to_transaction};
use crate::entities::{categories, families, transactions};

/// Ledger repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn category_exists(name: &str) -> String {
    format!("Category already exists: {name}")
}

/// Locks the family row for the rest of the transaction.
///
/// Writers that resolve or create categories take this lock first, so two
/// requests naming the same new category run one after the other.
async fn lock_family<C: ConnectionTrait>(conn: &C, family: FamilyId) -> StoreResult<()> {
    families::Entity::find_by_id(family.get())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(store_err)?
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound("Family not found".to_string()))
}

async fn insert_category<C: ConnectionTrait>(
    conn: &C,
    family: FamilyId,
    new: &NewCategory,
) -> Result<categories::Model, DbErr> {
    categories::ActiveModel {
        family_id: Set(family.get()),
        name: Set(new.name.clone()),
        name_key: Set(name_key(&new.name)),
        monthly_budget: Set(new.monthly_budget),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn list_categories(&self, family: FamilyId) -> StoreResult<Vec<Category>> {
        categories::Entity::find()
            .filter(categories::Column::FamilyId.eq(family.get()))
            .order_by_asc(categories::Column::Name)
            .order_by_asc(categories::Column::Id)
            .all(&self.db)
            .await
            .map(|rows| rows.into_iter().map(to_category).collect())
            .map_err(store_err)
    }

    async fn create_category(&self, family: FamilyId, new: NewCategory) -> StoreResult<Category> {
        let created = insert_category(&self.db, family, &new)
            .await
            .map_err(|e| store_err_with(e, &category_exists(&new.name)))?;

        tracing::info!(family_id = %family, category_id = created.id, "category created");
        Ok(to_category(created))
    }

    async fn seed_categories(
        &self,
        family: FamilyId,
        defaults: Vec<NewCategory>,
    ) -> StoreResult<usize> {
        let txn = self.db.begin().await.map_err(store_err)?;
        lock_family(&txn, family).await?;

        let existing = categories::Entity::find()
            .filter(categories::Column::FamilyId.eq(family.get()))
            .count(&txn)
            .await
            .map_err(store_err)?;
        if existing > 0 {
            return Ok(0);
        }

        for new in &defaults {
            insert_category(&txn, family, new)
                .await
                .map_err(|e| store_err_with(e, &category_exists(&new.name)))?;
        }

        txn.commit().await.map_err(store_err)?;
        Ok(defaults.len())
    }

    async fn record_transaction(
        &self,
        family: FamilyId,
        category: &CategoryRef,
        new: NewTransaction,
    ) -> StoreResult<(Transaction, Category)> {
        let txn = self.db.begin().await.map_err(store_err)?;
        lock_family(&txn, family).await?;

        let known: Vec<Category> = categories::Entity::find()
            .filter(categories::Column::FamilyId.eq(family.get()))
            .all(&txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(to_category)
            .collect();

        let category = match category.select(&known) {
            None => return Err(StoreError::NotFound("Category not found".to_string())),
            Some(Selection::Existing(found)) => found.clone(),
            Some(Selection::Create(new_category)) => {
                let created = insert_category(&txn, family, &new_category)
                    .await
                    .map_err(|e| store_err_with(e, &category_exists(&new_category.name)))?;
                tracing::debug!(
                    family_id = %family,
                    category_id = created.id,
                    "category created implicitly"
                );
                to_category(created)
            }
        };

        let inserted = transactions::ActiveModel {
            family_id: Set(family.get()),
            category_id: Set(category.id.get()),
            amount: Set(new.amount),
            transaction_type: Set(new.transaction_type.into()),
            note: Set(new.note),
            occurred_at: Set(new.occurred_at.into()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(store_err)?;

        txn.commit().await.map_err(store_err)?;

        tracing::info!(
            family_id = %family,
            transaction_id = inserted.id,
            category_id = %category.id,
            "transaction recorded"
        );
        Ok((to_transaction(inserted), category))
    }

    async fn list_ledger(&self, family: FamilyId) -> StoreResult<Vec<LedgerLine>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::FamilyId.eq(family.get()))
            .find_also_related(categories::Entity)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|(tx, category)| LedgerLine {
                transaction: to_transaction(tx),
                category_name: category.map_or_else(|| "Unknown".to_string(), |c| c.name),
            })
            .collect())
    }

    async fn delete_transaction(&self, family: FamilyId, id: TransactionId) -> StoreResult<bool> {
        let txn = self.db.begin().await.map_err(store_err)?;

        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id.get()))
            .filter(transactions::Column::FamilyId.eq(family.get()))
            .exec(&txn)
            .await
            .map_err(store_err)?;

        txn.commit().await.map_err(store_err)?;

        let deleted = result.rows_affected == 1;
        if deleted {
            tracing::info!(family_id = %family, transaction_id = %id, "transaction deleted");
        }
        Ok(deleted)
    }
}

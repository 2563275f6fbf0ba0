//! In-memory store.
//!
//! Implements both store traits over plain vectors guarded by one
//! `RwLock`. Every write holds the lock for its whole duration, which gives
//! the same all-or-nothing behavior as a database transaction. Used by tests
//! and by `memory://` development runs; nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use nestegg_core::auth::{
    ExternalProfile, Family, NewPasswordUser, Resolution, User, plan_resolution,
};
use nestegg_core::ledger::{
    Category, CategoryRef, LedgerLine, NewCategory, NewTransaction, Selection, Transaction,
    name_key,
};
use nestegg_core::{IdentityStore, LedgerStore, StoreError, StoreResult};
use nestegg_shared::types::{CategoryId, FamilyId, TransactionId, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    family_seq: i64,
    user_seq: i64,
    category_seq: i64,
    transaction_seq: i64,
    families: Vec<Family>,
    users: Vec<User>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn family_or_create(&mut self, name: &str) -> Family {
        if let Some(found) = self.families.iter().find(|f| f.name == name) {
            return found.clone();
        }
        self.family_seq += 1;
        let family = Family {
            id: FamilyId(self.family_seq),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.families.push(family.clone());
        family
    }

    fn has_family(&self, family: FamilyId) -> bool {
        self.families.iter().any(|f| f.id == family)
    }

    fn insert_user(&mut self, mut user: User) -> StoreResult<User> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }
        self.user_seq += 1;
        user.id = UserId(self.user_seq);
        self.users.push(user.clone());
        Ok(user)
    }

    fn family_categories(&self, family: FamilyId) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|c| c.family_id == family)
            .cloned()
            .collect()
    }

    fn insert_category(&mut self, family: FamilyId, new: NewCategory) -> StoreResult<Category> {
        let key = name_key(&new.name);
        if self
            .categories
            .iter()
            .any(|c| c.family_id == family && name_key(&c.name) == key)
        {
            return Err(StoreError::Conflict(format!(
                "Category already exists: {}",
                new.name
            )));
        }
        self.category_seq += 1;
        let category = Category {
            id: CategoryId(self.category_seq),
            family_id: family,
            name: new.name,
            monthly_budget: new.monthly_budget,
            created_at: Utc::now(),
        };
        self.categories.push(category.clone());
        Ok(category)
    }
}

/// Store keeping every table in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn register_password_user(&self, new: NewPasswordUser) -> StoreResult<(User, Family)> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }

        let family = tables.family_or_create(&new.family_name);
        let user = tables.insert_user(User {
            id: UserId(0),
            email: new.email,
            password_hash: Some(new.password_hash),
            external_id: None,
            name: None,
            picture: None,
            family_id: family.id,
            created_at: Utc::now(),
        })?;

        Ok((user, family))
    }

    async fn resolve_external_user(&self, profile: &ExternalProfile) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        let position = tables.users.iter().position(|u| u.email == profile.email);
        let existing = position.map(|i| &tables.users[i]);

        match (plan_resolution(existing, profile), position) {
            (Resolution::AlreadyLinked, Some(i)) => Ok(tables.users[i].clone()),
            (Resolution::Link, Some(i)) => {
                if tables
                    .users
                    .iter()
                    .any(|u| u.external_id.as_deref() == Some(profile.external_id.as_str()))
                {
                    return Err(StoreError::Conflict(
                        "external identity already linked".to_string(),
                    ));
                }
                let user = &mut tables.users[i];
                user.external_id = Some(profile.external_id.clone());
                user.name = profile.name.clone().or_else(|| user.name.take());
                user.picture = profile.picture.clone().or_else(|| user.picture.take());
                Ok(user.clone())
            }
            (Resolution::Create { family_name }, _) => {
                let family = tables.family_or_create(&family_name);
                tables.insert_user(User {
                    id: UserId(0),
                    email: profile.email.clone(),
                    password_hash: None,
                    external_id: Some(profile.external_id.clone()),
                    name: profile.name.clone(),
                    picture: profile.picture.clone(),
                    family_id: family.id,
                    created_at: Utc::now(),
                })
            }
            (_, None) => Err(StoreError::Backend(
                "resolution planned against a missing user".to_string(),
            )),
        }
    }

    async fn list_families(&self) -> StoreResult<Vec<Family>> {
        Ok(self.tables.read().await.families.clone())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_categories(&self, family: FamilyId) -> StoreResult<Vec<Category>> {
        let mut categories = self.tables.read().await.family_categories(family);
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn create_category(&self, family: FamilyId, new: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if !tables.has_family(family) {
            return Err(StoreError::NotFound("Family not found".to_string()));
        }
        tables.insert_category(family, new)
    }

    async fn seed_categories(
        &self,
        family: FamilyId,
        defaults: Vec<NewCategory>,
    ) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        if !tables.has_family(family) {
            return Err(StoreError::NotFound("Family not found".to_string()));
        }
        if tables.categories.iter().any(|c| c.family_id == family) {
            return Ok(0);
        }

        let count = defaults.len();
        for new in defaults {
            tables.insert_category(family, new)?;
        }
        Ok(count)
    }

    async fn record_transaction(
        &self,
        family: FamilyId,
        category: &CategoryRef,
        new: NewTransaction,
    ) -> StoreResult<(Transaction, Category)> {
        let mut tables = self.tables.write().await;
        if !tables.has_family(family) {
            return Err(StoreError::NotFound("Family not found".to_string()));
        }

        let known = tables.family_categories(family);
        let category = match category.select(&known) {
            None => return Err(StoreError::NotFound("Category not found".to_string())),
            Some(Selection::Existing(found)) => found.clone(),
            Some(Selection::Create(new_category)) => tables.insert_category(family, new_category)?,
        };

        tables.transaction_seq += 1;
        let transaction = Transaction {
            id: TransactionId(tables.transaction_seq),
            family_id: family,
            category_id: category.id,
            amount: new.amount,
            transaction_type: new.transaction_type,
            note: new.note,
            occurred_at: new.occurred_at,
            created_at: Utc::now(),
        };
        tables.transactions.push(transaction.clone());

        Ok((transaction, category))
    }

    async fn list_ledger(&self, family: FamilyId) -> StoreResult<Vec<LedgerLine>> {
        let tables = self.tables.read().await;

        let mut lines: Vec<LedgerLine> = tables
            .transactions
            .iter()
            .filter(|t| t.family_id == family)
            .map(|t| LedgerLine {
                transaction: t.clone(),
                category_name: tables
                    .categories
                    .iter()
                    .find(|c| c.id == t.category_id)
                    .map_or_else(|| "Unknown".to_string(), |c| c.name.clone()),
            })
            .collect();
        lines.sort_by(|a, b| {
            b.transaction
                .occurred_at
                .cmp(&a.transaction.occurred_at)
                .then(b.transaction.id.cmp(&a.transaction.id))
        });
        Ok(lines)
    }

    async fn delete_transaction(&self, family: FamilyId, id: TransactionId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.transactions.len();
        tables
            .transactions
            .retain(|t| !(t.id == id && t.family_id == family));
        Ok(tables.transactions.len() < before)
    }
}

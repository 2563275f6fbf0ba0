//! Identity repository: users and the families they belong to.

use async_trait::async_trait;
use chrono::Utc;
use nestegg_core::auth::{ExternalProfile, Family, NewPasswordUser, Resolution, User, plan_resolution};
use nestegg_core::{IdentityStore, StoreError, StoreResult};
use nestegg_shared::types::UserId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{is_unique_violation, store_err, store_err_with, to_family, to_user};
use crate::entities::{families, users};

const USER_EXISTS: &str = "user already exists";
const EXTERNAL_ID_TAKEN: &str = "external identity already linked";

/// A second pass sees the row committed by whoever won the first.
const RESOLVE_ATTEMPTS: usize = 2;

/// Outcome of one external resolution transaction.
enum Attempt {
    Resolved(users::Model),
    /// A concurrent login inserted the same email or external id first.
    LostCreateRace,
}

/// Identity repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    db: DatabaseConnection,
}

impl IdentityRepository {
    /// Creates a new identity repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Runs one locked lookup-then-write pass for an external login.
    ///
    /// The row lock serializes logins for an existing email. A missing row
    /// cannot be locked, so two first logins may both try to insert; the
    /// loser rolls back and reports `LostCreateRace`.
    async fn try_resolve_external(&self, profile: &ExternalProfile) -> StoreResult<Attempt> {
        let txn = self.db.begin().await.map_err(store_err)?;

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&profile.email))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(store_err)?;

        let plan = plan_resolution(existing.clone().map(to_user).as_ref(), profile);
        let user = match (plan, existing) {
            (Resolution::AlreadyLinked, Some(model)) => model,
            (Resolution::Link, Some(model)) => {
                let name = profile.name.clone().or_else(|| model.name.clone());
                let picture = profile.picture.clone().or_else(|| model.picture.clone());
                let mut active: users::ActiveModel = model.into();
                active.external_id = Set(Some(profile.external_id.clone()));
                active.name = Set(name);
                active.picture = Set(picture);
                let linked = active
                    .update(&txn)
                    .await
                    .map_err(|e| store_err_with(e, EXTERNAL_ID_TAKEN))?;
                tracing::info!(user_id = linked.id, "external identity linked");
                linked
            }
            (Resolution::Create { family_name }, _) => {
                let family = get_or_create_family(&txn, &family_name)
                    .await
                    .map_err(store_err)?;
                match insert_user(&txn, &profile.email, None, Some(profile), family.id).await {
                    Ok(created) => {
                        tracing::info!(
                            user_id = created.id,
                            family_id = family.id,
                            "external user created"
                        );
                        created
                    }
                    Err(e) if is_unique_violation(&e) => {
                        txn.rollback().await.map_err(store_err)?;
                        return Ok(Attempt::LostCreateRace);
                    }
                    Err(e) => return Err(store_err(e)),
                }
            }
            (_, None) => {
                return Err(StoreError::Backend(
                    "resolution planned against a missing user".to_string(),
                ));
            }
        };

        txn.commit().await.map_err(store_err)?;
        Ok(Attempt::Resolved(user))
    }
}

/// Returns the family with exactly this name, creating it if needed.
///
/// `ON CONFLICT DO NOTHING` makes a concurrent creation of the same name
/// wait and then fall through to the select.
pub(crate) async fn get_or_create_family<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<families::Model, DbErr> {
    let family = families::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    families::Entity::insert(family)
        .on_conflict(
            OnConflict::column(families::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    families::Entity::find()
        .filter(families::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("family {name}")))
}

async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    password_hash: Option<String>,
    profile: Option<&ExternalProfile>,
    family_id: i64,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        external_id: Set(profile.map(|p| p.external_id.clone())),
        name: Set(profile.and_then(|p| p.name.clone())),
        picture: Set(profile.and_then(|p| p.picture.clone())),
        family_id: Set(family_id),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

#[async_trait]
impl IdentityStore for IdentityRepository {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map(|found| found.map(to_user))
            .map_err(store_err)
    }

    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        users::Entity::find_by_id(id.get())
            .one(&self.db)
            .await
            .map(|found| found.map(to_user))
            .map_err(store_err)
    }

    async fn register_password_user(&self, new: NewPasswordUser) -> StoreResult<(User, Family)> {
        let txn = self.db.begin().await.map_err(store_err)?;

        let taken = users::Entity::find()
            .filter(users::Column::Email.eq(&new.email))
            .one(&txn)
            .await
            .map_err(store_err)?;
        if taken.is_some() {
            return Err(StoreError::Conflict(USER_EXISTS.to_string()));
        }

        let family = get_or_create_family(&txn, &new.family_name)
            .await
            .map_err(store_err)?;
        let user = insert_user(&txn, &new.email, Some(new.password_hash), None, family.id)
            .await
            .map_err(|e| store_err_with(e, USER_EXISTS))?;

        txn.commit().await.map_err(store_err)?;

        tracing::info!(user_id = user.id, family_id = family.id, "password user registered");
        Ok((to_user(user), to_family(family)))
    }

    async fn resolve_external_user(&self, profile: &ExternalProfile) -> StoreResult<User> {
        for _ in 0..RESOLVE_ATTEMPTS {
            if let Attempt::Resolved(user) = self.try_resolve_external(profile).await? {
                return Ok(to_user(user));
            }
            tracing::debug!("concurrent external login created the user, retrying");
        }
        Err(StoreError::Conflict(EXTERNAL_ID_TAKEN.to_string()))
    }

    async fn list_families(&self) -> StoreResult<Vec<Family>> {
        families::Entity::find()
            .order_by_asc(families::Column::Id)
            .all(&self.db)
            .await
            .map(|rows| rows.into_iter().map(to_family).collect())
            .map_err(store_err)
    }
}

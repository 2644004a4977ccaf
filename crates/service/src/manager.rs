//! Generic data access shared by every entity.
//!
//! [`ObjectManager`] runs one algorithm (filter, window, create, replace,
//! patch, delete) against any entity implementing [`Record`]. Entity-specific
//! rules live in the services.

use std::fmt::{Debug, Display};
use std::marker::PhantomData;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityName, EntityTrait,
    IdenStatic, IntoActiveModel, QueryFilter, QuerySelect, Value,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use models::{category, comment, news, user};

use crate::pagination::Window;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{table}: more than one row matches {column} = {value}")]
    Ambiguous { table: String, column: String, value: String },
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Entity with a single identity column the manager can reload rows by.
pub trait Record: EntityTrait {
    type Id: Into<Value> + Copy + Debug + Display + Send + Sync;

    fn id_column() -> Self::Column;
    fn id_of(model: &Self::Model) -> Self::Id;
}

/// Full set of writable column values; applying it overwrites every one of
/// them, nulling optional columns the form leaves empty.
pub trait Replacement<E: EntityTrait>: Send {
    fn overwrite(self, row: &mut E::ActiveModel);
}

/// Sparse column values; only the fields the patch carries are written.
pub trait Patch<E: EntityTrait>: Send {
    fn apply(self, row: &mut E::ActiveModel);
}

/// Conjunction of `column = value` terms.
pub struct Filters<E: EntityTrait> {
    terms: Vec<(E::Column, Value)>,
}

impl<E: EntityTrait> Filters<E> {
    pub fn none() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn eq(mut self, column: E::Column, value: impl Into<Value>) -> Self {
        self.terms.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn into_condition(self) -> Condition {
        self.terms
            .into_iter()
            .fold(Condition::all(), |cond, (column, value)| cond.add(column.eq(value)))
    }
}

impl<E: EntityTrait> Default for Filters<E> {
    fn default() -> Self {
        Self::none()
    }
}

fn table_name<E: EntityTrait>() -> String {
    E::default().table_name().to_owned()
}

/// Stateless CRUD over entity `E`, executed on the caller's [`Session`].
pub struct ObjectManager<E>(PhantomData<E>);

impl<E> ObjectManager<E>
where
    E: Record,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    /// Rows matching every filter term, windowed, in storage order.
    #[instrument(skip_all, fields(table = %table_name::<E>(), offset = window.offset, limit = window.limit))]
    pub async fn list(
        session: &mut Session,
        filters: Filters<E>,
        window: Window,
    ) -> Result<Vec<E::Model>, ManagerError> {
        let txn = session.txn().await?;
        let rows = E::find()
            .filter(filters.into_condition())
            .offset(window.offset)
            .limit(window.limit)
            .all(txn)
            .await?;
        debug!(count = rows.len(), "rows listed");
        Ok(rows)
    }

    /// The single row where `column = value`. More than one match is a fault.
    pub async fn get<V>(session: &mut Session, column: E::Column, value: V) -> Result<Option<E::Model>, ManagerError>
    where
        V: Into<Value> + Send,
    {
        let value = value.into();
        let txn = session.txn().await?;
        let mut rows = E::find()
            .filter(column.eq(value.clone()))
            .limit(2)
            .all(txn)
            .await?;
        if rows.len() > 1 {
            return Err(ManagerError::Ambiguous {
                table: table_name::<E>(),
                column: column.as_str().to_owned(),
                value: format!("{value:?}"),
            });
        }
        Ok(rows.pop())
    }

    pub async fn get_by_id(session: &mut Session, id: E::Id) -> Result<Option<E::Model>, ManagerError> {
        Self::get(session, E::id_column(), id).await
    }

    /// Stage `row`; with `commit`, commit the session and return the stored row.
    #[instrument(skip_all, fields(table = %table_name::<E>(), commit = commit))]
    pub async fn create(session: &mut Session, row: E::ActiveModel, commit: bool) -> Result<E::Model, ManagerError> {
        let txn = session.txn().await?;
        let model = row.insert(txn).await?;
        if commit {
            return Self::commit_and_reload(session, model).await;
        }
        Ok(model)
    }

    /// Overwrite every column of the row at `column = value`. `None` when no row matches.
    #[instrument(skip_all, fields(table = %table_name::<E>(), column = column.as_str(), commit = commit))]
    pub async fn update<V, R>(
        session: &mut Session,
        column: E::Column,
        value: V,
        commit: bool,
        replacement: R,
    ) -> Result<Option<E::Model>, ManagerError>
    where
        V: Into<Value> + Send,
        R: Replacement<E>,
    {
        Self::rewrite(session, column, value.into(), commit, |row| replacement.overwrite(row)).await
    }

    /// Write only the fields carried by `patch`. `None` when no row matches.
    #[instrument(skip_all, fields(table = %table_name::<E>(), column = column.as_str(), commit = commit))]
    pub async fn partial_update<V, P>(
        session: &mut Session,
        column: E::Column,
        value: V,
        commit: bool,
        patch: P,
    ) -> Result<Option<E::Model>, ManagerError>
    where
        V: Into<Value> + Send,
        P: Patch<E>,
    {
        Self::rewrite(session, column, value.into(), commit, |row| patch.apply(row)).await
    }

    /// Remove every row where `column = value`; returns how many went.
    #[instrument(skip_all, fields(table = %table_name::<E>(), column = column.as_str(), commit = commit))]
    pub async fn delete<V>(session: &mut Session, column: E::Column, value: V, commit: bool) -> Result<u64, ManagerError>
    where
        V: Into<Value> + Send,
    {
        let value = value.into();
        let txn = session.txn().await?;
        let res = E::delete_many().filter(column.eq(value)).exec(txn).await?;
        if commit {
            session.commit().await?;
        }
        debug!(rows = res.rows_affected, "rows deleted");
        Ok(res.rows_affected)
    }

    async fn rewrite<F>(
        session: &mut Session,
        column: E::Column,
        value: Value,
        commit: bool,
        write: F,
    ) -> Result<Option<E::Model>, ManagerError>
    where
        F: FnOnce(&mut E::ActiveModel) + Send,
    {
        let Some(found) = Self::get(session, column, value).await? else {
            return Ok(None);
        };
        let mut row = found.clone().into_active_model();
        write(&mut row);
        let model = if row.is_changed() {
            let txn = session.txn().await?;
            row.update(txn).await?
        } else {
            found
        };
        if commit {
            return Self::commit_and_reload(session, model).await.map(Some);
        }
        Ok(Some(model))
    }

    /// Once the commit succeeds the call succeeds; a failed reload falls back
    /// to the row as written.
    async fn commit_and_reload(session: &mut Session, model: E::Model) -> Result<E::Model, ManagerError> {
        let id = E::id_of(&model);
        session.commit().await?;
        match Self::get_by_id(session, id).await {
            Ok(reloaded) => Ok(reloaded.unwrap_or(model)),
            Err(e) => {
                warn!(table = %table_name::<E>(), %id, error = %e, "reload after commit failed");
                Ok(model)
            }
        }
    }
}

impl Record for category::Entity {
    type Id = i32;

    fn id_column() -> Self::Column { category::Column::Id }
    fn id_of(model: &Self::Model) -> i32 { model.id }
}

impl Record for news::Entity {
    type Id = i32;

    fn id_column() -> Self::Column { news::Column::Id }
    fn id_of(model: &Self::Model) -> i32 { model.id }
}

impl Record for comment::Entity {
    type Id = i32;

    fn id_column() -> Self::Column { comment::Column::Id }
    fn id_of(model: &Self::Model) -> i32 { model.id }
}

impl Record for user::Entity {
    type Id = Uuid;

    fn id_column() -> Self::Column { user::Column::Id }
    fn id_of(model: &Self::Model) -> Uuid { model.id }
}

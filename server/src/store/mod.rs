//! Persistence abstraction for users, sessions, recipes and labels.
//!
//! Every recipe and label operation takes the owning user's id and only ever
//! sees that user's rows: a row owned by someone else looks exactly like a
//! missing one. Handlers map `None`/`false` results to 404.
//!
//! Two implementations exist:
//! - [`PgStore`]: Postgres through diesel, one transaction per write
//! - [`MemoryStore`]: in-process maps, used by tests and `RECIPEBOX_STORE=memory`

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{Label, RecipeWithLabels, User};
use chrono::{DateTime, Utc};
use recipebox_core::{LabelKind, NewAccount, RecipeChanges, RecipeDraft, RecipeFilter};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Store lock poisoned")]
    Poisoned,
}

pub trait Store: Send + Sync + fmt::Debug {
    /// Insert a user. Fails with `Conflict` when the email is taken.
    fn create_user(&self, account: &NewAccount, password_hash: &str) -> Result<User, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Active user owning an unexpired session with this token hash.
    fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// The user's recipes matching `filter`, newest (highest id) first.
    fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithLabels>, StoreError>;

    fn get_recipe(&self, user_id: i64, id: i64) -> Result<Option<RecipeWithLabels>, StoreError>;

    /// Insert the recipe and attach get-or-created labels owned by `user_id`.
    fn create_recipe(
        &self,
        user_id: i64,
        draft: &RecipeDraft,
    ) -> Result<RecipeWithLabels, StoreError>;

    /// Apply scalar changes, then replace each relation whose list is present.
    fn update_recipe(
        &self,
        user_id: i64,
        id: i64,
        changes: &RecipeChanges,
    ) -> Result<Option<RecipeWithLabels>, StoreError>;

    fn delete_recipe(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    fn set_recipe_image(
        &self,
        user_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<RecipeWithLabels>, StoreError>;

    /// The user's labels of one kind, ordered by name.
    fn list_labels(
        &self,
        kind: LabelKind,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError>;

    /// Fails with `Conflict` when another label of the user already has `name`.
    fn rename_label(
        &self,
        kind: LabelKind,
        user_id: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Label>, StoreError>;

    /// Delete the label along with its recipe associations.
    fn delete_label(&self, kind: LabelKind, user_id: i64, id: i64) -> Result<bool, StoreError>;
}

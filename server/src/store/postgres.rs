use super::{Store, StoreError};
use crate::db::DbPool;
use crate::models::{
    Label, NewRecipe, NewSession, NewUser, Recipe, RecipeChangeset, RecipeWithLabels, User,
};
use crate::schema::{recipes, sessions, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use recipebox_core::{LabelKind, NewAccount, RecipeChanges, RecipeDraft, RecipeFilter};
use std::collections::HashMap;
use std::fmt;

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Tag and ingredient tables share a shape, so their queries are stamped out
/// once per (label table, link table, link column) triple.
macro_rules! label_queries {
    ($module:ident, $labels:ident, $links:ident, $label_id:ident) => {
        mod $module {
            use crate::models::Label;
            use crate::schema::{$labels, $links};
            use diesel::prelude::*;

            /// Resolve `name` for the user, inserting it if absent.
            pub fn get_or_create(
                conn: &mut PgConnection,
                user_id: i64,
                name: &str,
            ) -> QueryResult<i64> {
                diesel::insert_into($labels::table)
                    .values(($labels::user_id.eq(user_id), $labels::name.eq(name)))
                    .on_conflict(($labels::user_id, $labels::name))
                    .do_nothing()
                    .execute(conn)?;

                $labels::table
                    .filter($labels::user_id.eq(user_id))
                    .filter($labels::name.eq(name))
                    .select($labels::id)
                    .first(conn)
            }

            pub fn attach(
                conn: &mut PgConnection,
                user_id: i64,
                recipe_id: i64,
                names: &[String],
            ) -> QueryResult<()> {
                for name in names {
                    let label_id = get_or_create(conn, user_id, name)?;
                    diesel::insert_into($links::table)
                        .values((
                            $links::recipe_id.eq(recipe_id),
                            $links::$label_id.eq(label_id),
                        ))
                        .on_conflict_do_nothing()
                        .execute(conn)?;
                }
                Ok(())
            }

            /// Drop every association of the recipe; the label rows stay.
            pub fn clear(conn: &mut PgConnection, recipe_id: i64) -> QueryResult<usize> {
                diesel::delete($links::table.filter($links::recipe_id.eq(recipe_id))).execute(conn)
            }

            pub fn for_recipes(
                conn: &mut PgConnection,
                recipe_ids: &[i64],
            ) -> QueryResult<Vec<(i64, Label)>> {
                $links::table
                    .inner_join($labels::table)
                    .filter($links::recipe_id.eq_any(recipe_ids))
                    .order($labels::id.asc())
                    .select(($links::recipe_id, ($labels::id, $labels::name)))
                    .load(conn)
            }

            /// Recipes attached to any of `label_ids`.
            pub fn recipe_ids_matching(
                conn: &mut PgConnection,
                label_ids: &[i64],
            ) -> QueryResult<Vec<i64>> {
                $links::table
                    .filter($links::$label_id.eq_any(label_ids))
                    .select($links::recipe_id)
                    .distinct()
                    .load(conn)
            }

            pub fn list(
                conn: &mut PgConnection,
                user_id: i64,
                assigned_only: bool,
            ) -> QueryResult<Vec<Label>> {
                let mut query = $labels::table
                    .filter($labels::user_id.eq(user_id))
                    .into_boxed();

                if assigned_only {
                    let assigned: Vec<i64> = $links::table
                        .inner_join($labels::table)
                        .filter($labels::user_id.eq(user_id))
                        .select($links::$label_id)
                        .distinct()
                        .load(conn)?;
                    query = query.filter($labels::id.eq_any(assigned));
                }

                query
                    .order(($labels::name.asc(), $labels::id.asc()))
                    .select(($labels::id, $labels::name))
                    .load(conn)
            }

            pub fn rename(
                conn: &mut PgConnection,
                user_id: i64,
                id: i64,
                name: &str,
            ) -> QueryResult<Option<Label>> {
                diesel::update(
                    $labels::table
                        .filter($labels::id.eq(id))
                        .filter($labels::user_id.eq(user_id)),
                )
                .set($labels::name.eq(name))
                .returning(($labels::id, $labels::name))
                .get_result(conn)
                .optional()
            }

            /// Link rows go with the label through ON DELETE CASCADE.
            pub fn delete(conn: &mut PgConnection, user_id: i64, id: i64) -> QueryResult<usize> {
                diesel::delete(
                    $labels::table
                        .filter($labels::id.eq(id))
                        .filter($labels::user_id.eq(user_id)),
                )
                .execute(conn)
            }
        }
    };
}

label_queries!(tag_queries, tags, recipe_tags, tag_id);
label_queries!(ingredient_queries, ingredients, recipe_ingredients, ingredient_id);

fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Group `(recipe_id, label)` rows by recipe, keeping query order.
fn group_labels(rows: Vec<(i64, Label)>) -> HashMap<i64, Vec<Label>> {
    let mut grouped: HashMap<i64, Vec<Label>> = HashMap::new();
    for (recipe_id, label) in rows {
        grouped.entry(recipe_id).or_default().push(label);
    }
    grouped
}

/// Attach tags and ingredients to loaded recipes with two queries total.
fn with_labels(
    conn: &mut PgConnection,
    recipes: Vec<Recipe>,
) -> QueryResult<Vec<RecipeWithLabels>> {
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut tags = group_labels(tag_queries::for_recipes(conn, &ids)?);
    let mut ingredients = group_labels(ingredient_queries::for_recipes(conn, &ids)?);

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithLabels {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

fn load_recipe(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> QueryResult<Option<RecipeWithLabels>> {
    let recipe: Option<Recipe> = recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::user_id.eq(user_id))
        .select(Recipe::as_select())
        .first(conn)
        .optional()?;

    match recipe {
        Some(recipe) => Ok(with_labels(conn, vec![recipe])?.pop()),
        None => Ok(None),
    }
}

fn replace_labels(
    conn: &mut PgConnection,
    kind: LabelKind,
    user_id: i64,
    recipe_id: i64,
    names: &[String],
) -> QueryResult<()> {
    match kind {
        LabelKind::Tag => {
            tag_queries::clear(conn, recipe_id)?;
            tag_queries::attach(conn, user_id, recipe_id, names)
        }
        LabelKind::Ingredient => {
            ingredient_queries::clear(conn, recipe_id)?;
            ingredient_queries::attach(conn, user_id, recipe_id, names)
        }
    }
}

pub struct PgStore {
    pool: DbPool,
}

impl fmt::Debug for PgStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PgPooled, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl Store for PgStore {
    fn create_user(&self, account: &NewAccount, password_hash: &str) -> Result<User, StoreError> {
        let mut conn = self.conn()?;

        let new_user = NewUser {
            email: &account.email,
            name: &account.name,
            password_hash,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
        };

        diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("User")
                } else {
                    e.into()
                }
            })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(sessions::table)
            .values(&NewSession {
                user_id,
                token_hash,
                expires_at,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn()?;
        Ok(sessions::table
            .inner_join(users::table)
            .filter(sessions::token_hash.eq(token_hash))
            .filter(sessions::expires_at.gt(now))
            .filter(users::is_active.eq(true))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithLabels>, StoreError> {
        let mut conn = self.conn()?;

        let mut query = recipes::table
            .filter(recipes::user_id.eq(user_id))
            .into_boxed();

        if let Some(tag_ids) = &filter.tags {
            let matching = tag_queries::recipe_ids_matching(&mut conn, tag_ids)?;
            query = query.filter(recipes::id.eq_any(matching));
        }
        if let Some(ingredient_ids) = &filter.ingredients {
            let matching = ingredient_queries::recipe_ids_matching(&mut conn, ingredient_ids)?;
            query = query.filter(recipes::id.eq_any(matching));
        }

        let rows: Vec<Recipe> = query
            .order(recipes::id.desc())
            .select(Recipe::as_select())
            .load(&mut conn)?;

        Ok(with_labels(&mut conn, rows)?)
    }

    fn get_recipe(&self, user_id: i64, id: i64) -> Result<Option<RecipeWithLabels>, StoreError> {
        let mut conn = self.conn()?;
        Ok(load_recipe(&mut conn, user_id, id)?)
    }

    fn create_recipe(
        &self,
        user_id: i64,
        draft: &RecipeDraft,
    ) -> Result<RecipeWithLabels, StoreError> {
        let mut conn = self.conn()?;

        let created = conn.transaction::<_, DieselError, _>(|conn| {
            let new_recipe = NewRecipe {
                user_id,
                title: &draft.title,
                time_minutes: draft.time_minutes,
                price: &draft.price,
                link: &draft.link,
                description: &draft.description,
            };

            let recipe: Recipe = diesel::insert_into(recipes::table)
                .values(&new_recipe)
                .returning(Recipe::as_returning())
                .get_result(conn)?;

            tag_queries::attach(conn, user_id, recipe.id, &draft.tags)?;
            ingredient_queries::attach(conn, user_id, recipe.id, &draft.ingredients)?;

            load_recipe(conn, user_id, recipe.id)?.ok_or(DieselError::NotFound)
        })?;

        Ok(created)
    }

    fn update_recipe(
        &self,
        user_id: i64,
        id: i64,
        changes: &RecipeChanges,
    ) -> Result<Option<RecipeWithLabels>, StoreError> {
        let mut conn = self.conn()?;

        let updated = conn.transaction::<_, DieselError, _>(|conn| {
            let changeset = RecipeChangeset {
                title: changes.title.as_deref(),
                time_minutes: changes.time_minutes,
                price: changes.price.as_ref(),
                link: changes.link.as_deref(),
                description: changes.description.as_deref(),
                updated_at: Utc::now(),
            };

            let touched = diesel::update(
                recipes::table
                    .filter(recipes::id.eq(id))
                    .filter(recipes::user_id.eq(user_id)),
            )
            .set(&changeset)
            .execute(conn)?;

            if touched == 0 {
                return Ok(None);
            }

            for kind in [LabelKind::Tag, LabelKind::Ingredient] {
                if let Some(names) = changes.labels(kind) {
                    replace_labels(conn, kind, user_id, id, names)?;
                }
            }

            load_recipe(conn, user_id, id)
        })?;

        Ok(updated)
    }

    fn delete_recipe(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            recipes::table
                .filter(recipes::id.eq(id))
                .filter(recipes::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn set_recipe_image(
        &self,
        user_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<RecipeWithLabels>, StoreError> {
        let mut conn = self.conn()?;

        let touched = diesel::update(
            recipes::table
                .filter(recipes::id.eq(id))
                .filter(recipes::user_id.eq(user_id)),
        )
        .set((
            recipes::image.eq(Some(image)),
            recipes::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        if touched == 0 {
            return Ok(None);
        }
        Ok(load_recipe(&mut conn, user_id, id)?)
    }

    fn list_labels(
        &self,
        kind: LabelKind,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError> {
        let mut conn = self.conn()?;
        let labels = match kind {
            LabelKind::Tag => tag_queries::list(&mut conn, user_id, assigned_only)?,
            LabelKind::Ingredient => ingredient_queries::list(&mut conn, user_id, assigned_only)?,
        };
        Ok(labels)
    }

    fn rename_label(
        &self,
        kind: LabelKind,
        user_id: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        let mut conn = self.conn()?;
        let renamed = match kind {
            LabelKind::Tag => tag_queries::rename(&mut conn, user_id, id, name),
            LabelKind::Ingredient => ingredient_queries::rename(&mut conn, user_id, id, name),
        };
        renamed.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(kind.display_name())
            } else {
                e.into()
            }
        })
    }

    fn delete_label(&self, kind: LabelKind, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let deleted = match kind {
            LabelKind::Tag => tag_queries::delete(&mut conn, user_id, id)?,
            LabelKind::Ingredient => ingredient_queries::delete(&mut conn, user_id, id)?,
        };
        Ok(deleted > 0)
    }
}

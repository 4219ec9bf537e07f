use super::{Store, StoreError};
use crate::models::{Label, Recipe, RecipeWithLabels, User};
use chrono::{DateTime, Utc};
use recipebox_core::{LabelKind, NewAccount, RecipeChanges, RecipeDraft, RecipeFilter};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct LabelRow {
    user_id: i64,
    name: String,
}

#[derive(Debug, Clone)]
struct SessionRow {
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
}

/// One label table plus its (recipe_id, label_id) link table.
#[derive(Debug, Default)]
struct LabelTable {
    rows: BTreeMap<i64, LabelRow>,
    links: BTreeSet<(i64, i64)>,
    next_id: i64,
}

impl LabelTable {
    fn get_or_create(&mut self, user_id: i64, name: &str) -> i64 {
        let existing = self
            .rows
            .iter()
            .find(|(_, row)| row.user_id == user_id && row.name == name)
            .map(|(id, _)| *id);

        existing.unwrap_or_else(|| {
            self.next_id += 1;
            self.rows.insert(
                self.next_id,
                LabelRow {
                    user_id,
                    name: name.to_string(),
                },
            );
            self.next_id
        })
    }

    fn attach(&mut self, user_id: i64, recipe_id: i64, names: &[String]) {
        for name in names {
            let label_id = self.get_or_create(user_id, name);
            self.links.insert((recipe_id, label_id));
        }
    }

    fn clear(&mut self, recipe_id: i64) {
        self.links.retain(|(linked_recipe, _)| *linked_recipe != recipe_id);
    }

    fn for_recipe(&self, recipe_id: i64) -> Vec<Label> {
        // Links are ordered by (recipe_id, label_id), so labels come out by id
        self.links
            .range((recipe_id, i64::MIN)..=(recipe_id, i64::MAX))
            .filter_map(|(_, label_id)| {
                self.rows.get(label_id).map(|row| Label {
                    id: *label_id,
                    name: row.name.clone(),
                })
            })
            .collect()
    }

    fn recipe_matches(&self, recipe_id: i64, label_ids: &[i64]) -> bool {
        label_ids
            .iter()
            .any(|label_id| self.links.contains(&(recipe_id, *label_id)))
    }

    fn owned(&self, user_id: i64, id: i64) -> Option<&LabelRow> {
        self.rows.get(&id).filter(|row| row.user_id == user_id)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    sessions: Vec<SessionRow>,
    recipes: BTreeMap<i64, Recipe>,
    tags: LabelTable,
    ingredients: LabelTable,
    next_user_id: i64,
    next_recipe_id: i64,
}

impl MemoryState {
    fn labels(&self, kind: LabelKind) -> &LabelTable {
        match kind {
            LabelKind::Tag => &self.tags,
            LabelKind::Ingredient => &self.ingredients,
        }
    }

    fn labels_mut(&mut self, kind: LabelKind) -> &mut LabelTable {
        match kind {
            LabelKind::Tag => &mut self.tags,
            LabelKind::Ingredient => &mut self.ingredients,
        }
    }

    fn assemble(&self, recipe: &Recipe) -> RecipeWithLabels {
        RecipeWithLabels {
            recipe: recipe.clone(),
            tags: self.tags.for_recipe(recipe.id),
            ingredients: self.ingredients.for_recipe(recipe.id),
        }
    }

    fn owned_recipe(&self, user_id: i64, id: i64) -> Option<&Recipe> {
        self.recipes.get(&id).filter(|r| r.user_id == user_id)
    }
}

/// Process-local [`Store`]. Data lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn create_user(&self, account: &NewAccount, password_hash: &str) -> Result<User, StoreError> {
        let mut state = self.write()?;

        if state.users.values().any(|u| u.email == account.email) {
            return Err(StoreError::Conflict("User"));
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            email: account.email.clone(),
            name: account.name.clone(),
            password_hash: password_hash.to_string(),
            is_active: true,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.read()?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.sessions.push(SessionRow {
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
        });
        Ok(())
    }

    fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let state = self.read()?;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
            .and_then(|s| state.users.get(&s.user_id))
            .filter(|u| u.is_active)
            .cloned())
    }

    fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithLabels>, StoreError> {
        let state = self.read()?;
        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .filter(|r| {
                filter
                    .tags
                    .as_deref()
                    .map_or(true, |ids| state.tags.recipe_matches(r.id, ids))
            })
            .filter(|r| {
                filter
                    .ingredients
                    .as_deref()
                    .map_or(true, |ids| state.ingredients.recipe_matches(r.id, ids))
            })
            .map(|r| state.assemble(r))
            .collect())
    }

    fn get_recipe(&self, user_id: i64, id: i64) -> Result<Option<RecipeWithLabels>, StoreError> {
        let state = self.read()?;
        Ok(state.owned_recipe(user_id, id).map(|r| state.assemble(r)))
    }

    fn create_recipe(
        &self,
        user_id: i64,
        draft: &RecipeDraft,
    ) -> Result<RecipeWithLabels, StoreError> {
        let mut state = self.write()?;

        state.next_recipe_id += 1;
        let now = Utc::now();
        let recipe = Recipe {
            id: state.next_recipe_id,
            user_id,
            title: draft.title.clone(),
            time_minutes: draft.time_minutes,
            price: draft.price.clone(),
            link: draft.link.clone(),
            description: draft.description.clone(),
            image: None,
            created_at: now,
            updated_at: now,
        };
        let id = recipe.id;
        state.recipes.insert(id, recipe);

        for kind in [LabelKind::Tag, LabelKind::Ingredient] {
            state
                .labels_mut(kind)
                .attach(user_id, id, draft.labels(kind));
        }

        Ok(state.assemble(&state.recipes[&id]))
    }

    fn update_recipe(
        &self,
        user_id: i64,
        id: i64,
        changes: &RecipeChanges,
    ) -> Result<Option<RecipeWithLabels>, StoreError> {
        let mut state = self.write()?;

        let Some(recipe) = state.recipes.get_mut(&id).filter(|r| r.user_id == user_id) else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            recipe.title = title.clone();
        }
        if let Some(minutes) = changes.time_minutes {
            recipe.time_minutes = minutes;
        }
        if let Some(price) = &changes.price {
            recipe.price = price.clone();
        }
        if let Some(link) = &changes.link {
            recipe.link = link.clone();
        }
        if let Some(description) = &changes.description {
            recipe.description = description.clone();
        }
        recipe.updated_at = Utc::now();

        for kind in [LabelKind::Tag, LabelKind::Ingredient] {
            if let Some(names) = changes.labels(kind) {
                let table = state.labels_mut(kind);
                table.clear(id);
                table.attach(user_id, id, names);
            }
        }

        Ok(state.recipes.get(&id).map(|r| state.assemble(r)))
    }

    fn delete_recipe(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut state = self.write()?;

        if state.owned_recipe(user_id, id).is_none() {
            return Ok(false);
        }
        state.recipes.remove(&id);
        state.tags.clear(id);
        state.ingredients.clear(id);
        Ok(true)
    }

    fn set_recipe_image(
        &self,
        user_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<RecipeWithLabels>, StoreError> {
        let mut state = self.write()?;

        let Some(recipe) = state.recipes.get_mut(&id).filter(|r| r.user_id == user_id) else {
            return Ok(None);
        };
        recipe.image = Some(image.to_string());
        recipe.updated_at = Utc::now();

        Ok(state.recipes.get(&id).map(|r| state.assemble(r)))
    }

    fn list_labels(
        &self,
        kind: LabelKind,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError> {
        let state = self.read()?;
        let table = state.labels(kind);

        let mut labels: Vec<Label> = table
            .rows
            .iter()
            .filter(|(_, row)| row.user_id == user_id)
            .filter(|(id, _)| {
                !assigned_only || table.links.iter().any(|(_, label_id)| label_id == *id)
            })
            .map(|(id, row)| Label {
                id: *id,
                name: row.name.clone(),
            })
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(labels)
    }

    fn rename_label(
        &self,
        kind: LabelKind,
        user_id: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        let mut state = self.write()?;
        let table = state.labels_mut(kind);

        if table.owned(user_id, id).is_none() {
            return Ok(None);
        }
        let taken = table
            .rows
            .iter()
            .any(|(other_id, row)| *other_id != id && row.user_id == user_id && row.name == name);
        if taken {
            return Err(StoreError::Conflict(kind.display_name()));
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.name = name.to_string();
        Ok(Some(Label {
            id,
            name: row.name.clone(),
        }))
    }

    fn delete_label(&self, kind: LabelKind, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        let table = state.labels_mut(kind);

        if table.owned(user_id, id).is_none() {
            return Ok(false);
        }
        table.rows.remove(&id);
        table.links.retain(|(_, label_id)| *label_id != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn draft(title: &str, tags: &[&str], ingredients: &[&str]) -> RecipeDraft {
        RecipeDraft {
            title: title.to_string(),
            time_minutes: 10,
            price: BigDecimal::from(5).with_scale(2),
            link: String::new(),
            description: String::new(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn user(store: &MemoryStore, email: &str) -> i64 {
        let account = NewAccount::regular(email, "testpass").unwrap();
        store.create_user(&account, "hash").unwrap().id
    }

    #[test]
    fn test_get_or_create_reuses_rows_per_user() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com");
        let bob = user(&store, "bob@example.com");

        let first = store.create_recipe(alice, &draft("A", &["vegan"], &[])).unwrap();
        let second = store.create_recipe(alice, &draft("B", &["vegan"], &[])).unwrap();
        let other = store.create_recipe(bob, &draft("C", &["vegan"], &[])).unwrap();

        assert_eq!(first.tags[0].id, second.tags[0].id);
        assert_ne!(first.tags[0].id, other.tags[0].id);
        assert_eq!(store.list_labels(LabelKind::Tag, alice, false).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        user(&store, "alice@example.com");
        let account = NewAccount::regular("alice@example.com", "x").unwrap();
        assert!(matches!(
            store.create_user(&account, "hash"),
            Err(StoreError::Conflict("User"))
        ));
    }

    #[test]
    fn test_expired_session_rejected() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com");
        let now = Utc::now();
        store
            .create_session(alice, "expired", now - chrono::Duration::seconds(1))
            .unwrap();
        store
            .create_session(alice, "live", now + chrono::Duration::days(1))
            .unwrap();

        assert!(store.user_for_token("expired", now).unwrap().is_none());
        assert_eq!(store.user_for_token("live", now).unwrap().unwrap().id, alice);
    }

    #[test]
    fn test_deleting_label_detaches_it() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com");
        let recipe = store
            .create_recipe(alice, &draft("A", &["quick", "vegan"], &[]))
            .unwrap();

        assert!(store
            .delete_label(LabelKind::Tag, alice, recipe.tags[0].id)
            .unwrap());
        let reloaded = store.get_recipe(alice, recipe.recipe.id).unwrap().unwrap();
        assert_eq!(reloaded.tags.len(), 1);
        assert_eq!(reloaded.tags[0].name, "vegan");
    }

    #[test]
    fn test_assigned_only_skips_unused_labels() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com");
        store
            .create_recipe(alice, &draft("A", &[], &["salt", "pepper"]))
            .unwrap();
        let recipe = store.create_recipe(alice, &draft("B", &[], &[])).unwrap();
        let changes = RecipeChanges {
            ingredients: Some(vec!["cumin".to_string()]),
            ..Default::default()
        };
        store.update_recipe(alice, recipe.recipe.id, &changes).unwrap();
        store
            .update_recipe(
                alice,
                recipe.recipe.id,
                &RecipeChanges {
                    ingredients: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();

        let all = store.list_labels(LabelKind::Ingredient, alice, false).unwrap();
        let names: Vec<&str> = all.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["cumin", "pepper", "salt"]);

        let assigned = store.list_labels(LabelKind::Ingredient, alice, true).unwrap();
        let names: Vec<&str> = assigned.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["pepper", "salt"]);
    }
}

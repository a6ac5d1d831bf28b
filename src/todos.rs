//! The signed-in user's todo list and the calls that change it.
//!
//! Local state only ever mirrors what the backend returned: items are added
//! from create responses, replaced by update responses and dropped after a
//! successful delete. A failed call leaves the list exactly as it was.
//!
//! Every mutation is split into `begin_*` (validation and the in-flight flag
//! of the triggering control) and `finish_*` (reconciliation), so callers can
//! run the request wherever they like. The async methods compose the two.

use crate::api::TodoBackend;
use crate::error::{ClientError, Result};
use crate::forms::TodoDraft;
use crate::models::{NewTodo, Todo, TodoChanges};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    pub fn next(self) -> Filter {
        match self {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Counts {
    pub fn for_filter(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.total,
            Filter::Active => self.active,
            Filter::Completed => self.completed,
        }
    }
}

pub struct TodoList {
    todos: Vec<Todo>,
    filter: Filter,
    loading: bool,
    creating: bool,
    pending: HashSet<u64>,
}

impl Default for TodoList {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoList {
    /// Empty list, loading until the first fetch finishes.
    pub fn new() -> Self {
        TodoList {
            todos: Vec::new(),
            filter: Filter::All,
            loading: true,
            creating: false,
            pending: HashSet::new(),
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Items passing the current filter, in list order.
    pub fn visible(&self) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|t| self.filter.matches(t))
            .collect()
    }

    pub fn counts(&self) -> Counts {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        Counts {
            total: self.todos.len(),
            active: self.todos.len() - completed,
            completed,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains(&id)
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    pub fn finish_fetch(&mut self, result: Result<Vec<Todo>>) -> Result<()> {
        self.loading = false;
        let todos = result?;
        debug!(count = todos.len(), "Todo list loaded");
        self.todos = todos;
        Ok(())
    }

    pub async fn fetch(&mut self, backend: &dyn TodoBackend, token: &str) -> Result<()> {
        self.begin_fetch();
        let result = backend.list_todos(token).await;
        self.finish_fetch(result)
    }

    pub fn begin_create(&mut self, draft: &TodoDraft) -> Result<NewTodo> {
        if self.creating {
            return Err(ClientError::Busy);
        }
        let new = draft.to_new_todo()?;
        self.creating = true;
        Ok(new)
    }

    pub fn finish_create(&mut self, result: Result<Todo>) -> Result<()> {
        self.creating = false;
        let todo = result?;
        info!(id = todo.id, title = %todo.title, "Todo created");
        self.todos.insert(0, todo);
        Ok(())
    }

    pub async fn create(
        &mut self,
        backend: &dyn TodoBackend,
        token: &str,
        draft: &TodoDraft,
    ) -> Result<()> {
        let new = self.begin_create(draft)?;
        let result = backend.create_todo(token, &new).await;
        self.finish_create(result)
    }

    /// Marks `id` in flight and returns the fields that actually differ,
    /// or `None` when there is nothing to send.
    pub fn begin_update(&mut self, id: u64, changes: TodoChanges) -> Result<Option<TodoChanges>> {
        if self.pending.contains(&id) {
            return Err(ClientError::Busy);
        }
        let current = self.get(id).ok_or(ClientError::UnknownTodo(id))?;
        let changes = changes.against(current);
        if changes.is_empty() {
            return Ok(None);
        }
        self.pending.insert(id);
        Ok(Some(changes))
    }

    pub fn begin_edit(&mut self, id: u64, draft: &TodoDraft) -> Result<Option<TodoChanges>> {
        let changes = draft.to_changes()?;
        self.begin_update(id, changes)
    }

    pub fn begin_toggle(&mut self, id: u64) -> Result<TodoChanges> {
        let current = self.get(id).ok_or(ClientError::UnknownTodo(id))?;
        let changes = TodoChanges::toggle(current);
        self.begin_update(id, changes)?
            .ok_or(ClientError::UnknownTodo(id))
    }

    pub fn finish_update(&mut self, id: u64, result: Result<Todo>) -> Result<()> {
        self.pending.remove(&id);
        let updated = result?;
        match self.todos.iter_mut().find(|t| t.id == updated.id) {
            Some(slot) => *slot = updated,
            None => warn!(id = updated.id, "Updated todo no longer in list"),
        }
        Ok(())
    }

    pub async fn update(
        &mut self,
        backend: &dyn TodoBackend,
        token: &str,
        id: u64,
        changes: TodoChanges,
    ) -> Result<()> {
        let Some(changes) = self.begin_update(id, changes)? else {
            return Ok(());
        };
        let result = backend.update_todo(token, id, &changes).await;
        self.finish_update(id, result)
    }

    pub async fn edit(
        &mut self,
        backend: &dyn TodoBackend,
        token: &str,
        id: u64,
        draft: &TodoDraft,
    ) -> Result<()> {
        let changes = draft.to_changes()?;
        self.update(backend, token, id, changes).await
    }

    pub async fn toggle(&mut self, backend: &dyn TodoBackend, token: &str, id: u64) -> Result<()> {
        let changes = self.begin_toggle(id)?;
        let result = backend.update_todo(token, id, &changes).await;
        self.finish_update(id, result)
    }

    /// Asks `confirm` first; a declined deletion returns `Ok(false)` and
    /// sends nothing.
    pub fn begin_delete<F>(&mut self, id: u64, confirm: F) -> Result<bool>
    where
        F: FnOnce(&Todo) -> bool,
    {
        if self.pending.contains(&id) {
            return Err(ClientError::Busy);
        }
        let todo = self.get(id).ok_or(ClientError::UnknownTodo(id))?;
        if !confirm(todo) {
            debug!(id, "Deletion not confirmed");
            return Ok(false);
        }
        self.pending.insert(id);
        Ok(true)
    }

    pub fn finish_delete(&mut self, id: u64, result: Result<()>) -> Result<()> {
        self.pending.remove(&id);
        result?;
        self.todos.retain(|t| t.id != id);
        info!(id, "Todo deleted");
        Ok(())
    }

    pub async fn delete<F>(
        &mut self,
        backend: &dyn TodoBackend,
        token: &str,
        id: u64,
        confirm: F,
    ) -> Result<bool>
    where
        F: FnOnce(&Todo) -> bool,
    {
        if !self.begin_delete(id, confirm)? {
            return Ok(false);
        }
        let result = backend.delete_todo(token, id).await;
        self.finish_delete(id, result)?;
        Ok(true)
    }
}

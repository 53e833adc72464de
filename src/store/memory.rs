//! In-Memory Fallback Store
//!
//! Keeps todos in a mutex-guarded `Vec` in insertion order. Identifiers come
//! from a monotonic counter that starts at 1 and only advances on successful
//! creates, so ids are never reused even after deletes. All data is lost on
//! process restart.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::failover::RecordStore;
use super::types::{StoreError, Todo};

pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

struct MemoryInner {
    todos: Vec<Todo>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                todos: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.inner.lock().todos.clone())
    }

    async fn create(&self, title: &str, description: &str) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock();
        if inner.todos.iter().any(|todo| todo.title == title) {
            return Err(StoreError::DuplicateTitle);
        }

        let now = Utc::now();
        let todo = Todo {
            id: inner.next_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        // The counter only moves on success, so a rejected duplicate does
        // not burn an id.
        inner.next_id += 1;
        inner.todos.push(todo.clone());
        Ok(todo)
    }

    async fn get_by_id(&self, id: &str) -> Result<Todo, StoreError> {
        self.inner
            .lock()
            .todos
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock();
        if inner
            .todos
            .iter()
            .any(|todo| todo.title == title && todo.id != id)
        {
            return Err(StoreError::DuplicateTitle);
        }

        let todo = inner
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound)?;
        todo.title = title.to_string();
        todo.description = description.to_string();
        todo.updated_at = Utc::now();
        Ok(todo.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let index = inner
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or(StoreError::NotFound)?;
        inner.todos.remove(index);
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, StoreError> {
        Ok(self
            .inner
            .lock()
            .todos
            .iter()
            .find(|todo| todo.title == title)
            .cloned())
    }
}

use std::time::Duration;

use tracing::{debug, warn};
use validator::Validate;

use crate::cache::{QueryCache, QueryKey, QueryOptions};
use crate::client::{ApiClient, ApiRequest};
use crate::error::{ClientError, Result};
use crate::models::{NewTodo, Todo, TodoList, TodoPatch};

pub const TODO_LIST_PATH: &str = "/api/todo/list";
pub const TODO_PATH: &str = "/api/todo";

const TODO_STALE_TIME: Duration = Duration::from_secs(30);

/// Path of one to-do, with `id` encoded as a single segment.
fn todo_path(id: &str) -> Result<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ClientError::NotFound(format!("invalid todo id '{}'", id)));
    }
    Ok(format!("{}/{}", TODO_PATH, urlencoding::encode(id)))
}

/// CRUD over the current user's to-do items.
///
/// Every successful write invalidates the cached list.
#[derive(Clone)]
pub struct TodoService {
    api: ApiClient,
    cache: QueryCache,
}

impl TodoService {
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        TodoService { api, cache }
    }

    fn options() -> QueryOptions {
        QueryOptions::default().stale_time(TODO_STALE_TIME)
    }

    pub async fn list_todos(&self) -> Result<Vec<Todo>> {
        let api = self.api.clone();
        self.cache
            .read(QueryKey::Todos, Self::options(), move || {
                let api = api.clone();
                async move {
                    let list: TodoList = api.fetch_json(ApiRequest::get(TODO_LIST_PATH)).await?;
                    Ok(list.todos)
                }
            })
            .await
    }

    pub async fn get_todo(&self, id: &str) -> Result<Todo> {
        let path = todo_path(id)?;
        let api = self.api.clone();
        self.cache
            .read(QueryKey::Todo(id.to_string()), Self::options(), move || {
                let api = api.clone();
                let request = ApiRequest::get(path.clone());
                async move { api.fetch_json::<Todo>(request).await }
            })
            .await
    }

    pub async fn create_todo(&self, todo: &NewTodo) -> Result<Todo> {
        todo.validate()?;
        let request = ApiRequest::post(TODO_PATH).json(todo)?;
        let created: Todo = self
            .cache
            .write(&[QueryKey::Todos], self.api.fetch_json(request))
            .await
            .inspect_err(|e| warn!("Create todo failed: {}", e))?;
        debug!(id = created.id.as_str(), "todo created");
        Ok(created)
    }

    pub async fn update_todo(&self, id: &str, patch: &TodoPatch) -> Result<Todo> {
        patch.validate()?;
        let request = ApiRequest::put(todo_path(id)?).json(patch)?;
        self.cache
            .write(
                &[QueryKey::Todos, QueryKey::Todo(id.to_string())],
                self.api.fetch_json(request),
            )
            .await
            .inspect_err(|e| warn!("Update todo failed: {}", e))
    }

    pub async fn delete_todo(&self, id: &str) -> Result<()> {
        let request = ApiRequest::delete(todo_path(id)?);
        self.cache
            .write(&[QueryKey::Todos], self.api.fetch_empty(request))
            .await
            .inspect_err(|e| warn!("Delete todo failed: {}", e))?;
        self.cache.remove(&QueryKey::Todo(id.to_string()));
        Ok(())
    }

    /// Mark a to-do completed or not completed.
    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<Todo> {
        let action = if completed { "complete" } else { "incomplete" };
        let request = ApiRequest::post(format!("{}/{}", todo_path(id)?, action));
        self.cache
            .write(
                &[QueryKey::Todos, QueryKey::Todo(id.to_string())],
                self.api.fetch_json(request),
            )
            .await
            .inspect_err(|e| warn!("Setting todo {} to {} failed: {}", id, action, e))
    }
}

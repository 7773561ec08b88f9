use async_trait::async_trait;
use folio_api_types::{CategoryRow, NewTodoRow, TodoPatchRow, TodoRow};
use reqwest::Method;
use tracing::info;

use crate::application::repos::{CategoriesRepo, RepoError, TodosRepo};
use crate::domain::entities::{CategoryRecord, TodoRecord};

use super::{BackendClient, eq, single_row};

const CATEGORIES_TABLE: &str = "categories";
const TODO_TABLE: &str = "todo";

#[async_trait]
impl CategoriesRepo for BackendClient {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows: Vec<CategoryRow> = self
            .rest(
                Method::GET,
                CATEGORIES_TABLE,
                &[("select", "*".into()), ("order", "name.asc".into())],
                None,
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| CategoryRecord {
                id: row.id,
                name: row.name,
            })
            .collect())
    }
}

#[async_trait]
impl TodosRepo for BackendClient {
    async fn list_todos(&self) -> Result<Vec<TodoRecord>, RepoError> {
        let rows: Vec<TodoRow> = self
            .rest(
                Method::GET,
                TODO_TABLE,
                &[("select", "*".into()), ("order", "id.asc".into())],
                None,
            )
            .await?;
        Ok(rows.into_iter().map(todo_from_row).collect())
    }

    async fn insert_todo(&self, task: &str) -> Result<TodoRecord, RepoError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(RepoError::Rejected {
                message: "task must not be empty".into(),
            });
        }
        let body = serde_json::to_value(NewTodoRow {
            task: task.to_string(),
        })
        .map_err(RepoError::from_persistence)?;
        let rows: Vec<TodoRow> = self.rest(Method::POST, TODO_TABLE, &[], Some(body)).await?;
        let todo = todo_from_row(single_row(rows)?);
        info!(target = "infra::backend::catalog", todo_id = todo.id, "todo added");
        Ok(todo)
    }

    async fn set_todo_complete(
        &self,
        id: i64,
        is_complete: bool,
    ) -> Result<TodoRecord, RepoError> {
        let body = serde_json::to_value(TodoPatchRow { is_complete })
            .map_err(RepoError::from_persistence)?;
        let rows: Vec<TodoRow> = self
            .rest(Method::PATCH, TODO_TABLE, &[("id", eq(id))], Some(body))
            .await?;
        Ok(todo_from_row(single_row(rows)?))
    }

    async fn delete_todo(&self, id: i64) -> Result<(), RepoError> {
        self.rest_unit(Method::DELETE, TODO_TABLE, &[("id", eq(id))])
            .await?;
        info!(target = "infra::backend::catalog", todo_id = id, "todo deleted");
        Ok(())
    }
}

fn todo_from_row(row: TodoRow) -> TodoRecord {
    TodoRecord {
        id: row.id,
        task: row.task,
        is_complete: row.is_complete,
        inserted_at: row.inserted_at,
    }
}

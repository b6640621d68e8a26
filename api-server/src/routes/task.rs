//! Task API endpoints
//!
//! `POST /tasks` stores a pending task and hands it to the worker,
//! `GET /tasks` lists every stored task.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tasktrack_core::task::{NewTask, Task};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Body of `POST /tasks`.
///
/// `id`, `status` and `created_at` are assigned server-side; any client
/// value for them is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal_error(e: tasktrack_core::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /tasks - List all tasks
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.task_store().list_all().await.map_err(|e| {
        tracing::error!("Failed to list tasks: {}", e);
        internal_error(e)
    })?;

    Ok(Json(tasks))
}

/// Insert a pending task and hand it to the worker
async fn store_and_queue(state: AppState, draft: NewTask) -> Result<(), ApiError> {
    let id = state.task_store().insert(&draft).await.map_err(|e| {
        tracing::error!("Failed to add task: {}", e);
        internal_error(e)
    })?;
    let task = draft.into_task(id);
    tracing::debug!("Task {} stored, queueing for processing", id);

    // The row is already stored; if the worker is gone it stays PENDING.
    state
        .dispatcher()
        .send(task)
        .await
        .map_err(internal_error)?;

    Ok(())
}

/// POST /tasks - Store a task and queue it for processing
async fn create_task(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
    let req: CreateTaskRequest =
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("Invalid task body: {e}")))?;

    if req.title.trim().is_empty() {
        return Err(bad_request("Title cannot be empty"));
    }

    let mut draft = NewTask::new(req.title);
    if let Some(desc) = req.description {
        draft = draft.with_description(desc);
    }

    // Detached so a dropped request cannot leave a stored row that was never queued.
    tokio::spawn(store_and_queue(state, draft))
        .await
        .map_err(|e| {
            tracing::error!("Task handoff did not finish: {}", e);
            internal_error(tasktrack_core::Error::Storage(format!(
                "task handoff did not finish: {e}"
            )))
        })??;

    Ok(StatusCode::CREATED)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new().route("/tasks", get(list_tasks).post(create_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use tasktrack_core::pipeline::{channel, PipelineStats, Worker};
    use tasktrack_core::task::{SqliteTaskStore, TaskRepository, TaskStatus};
    use tasktrack_core::{Error, Result};

    fn build_state(delay: Duration) -> (AppState, Arc<SqliteTaskStore>, Arc<PipelineStats>) {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let stats = Arc::new(PipelineStats::new());
        let (tx, rx) = channel(None, Arc::clone(&stats));
        Worker::new(store.clone(), rx, Arc::clone(&stats))
            .with_delay(delay)
            .spawn();
        let state = AppState::new(store.clone(), tx, Arc::clone(&stats));
        (state, store, stats)
    }

    async fn post_tasks(app: &Router, body: impl Into<Body>) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("Content-Type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get_tasks(app: &Router) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn wait_for_completed(stats: &PipelineStats, count: u64) {
        for _ in 0..300 {
            if stats.snapshot().completed >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker did not finish: {:?}", stats.snapshot());
    }

    /// Store where every operation fails
    struct FailingStore;

    #[async_trait]
    impl TaskRepository for FailingStore {
        async fn insert(&self, _task: &NewTask) -> Result<i64> {
            Err(Error::Storage("database is locked".to_string()))
        }

        async fn update_status(&self, _id: i64, _status: TaskStatus) -> Result<()> {
            Err(Error::Storage("database is locked".to_string()))
        }

        async fn list_all(&self) -> Result<Vec<Task>> {
            Err(Error::Storage("database is locked".to_string()))
        }
    }

    /// Store whose insert returns only after a pause
    struct SlowInsertStore {
        inner: SqliteTaskStore,
        pause: Duration,
    }

    #[async_trait]
    impl TaskRepository for SlowInsertStore {
        async fn insert(&self, task: &NewTask) -> Result<i64> {
            let id = self.inner.insert(task).await?;
            tokio::time::sleep(self.pause).await;
            Ok(id)
        }

        async fn update_status(&self, id: i64, status: TaskStatus) -> Result<()> {
            self.inner.update_status(id, status).await
        }

        async fn list_all(&self) -> Result<Vec<Task>> {
            self.inner.list_all().await
        }
    }

    #[tokio::test]
    async fn dropped_create_request_still_queues_stored_task() {
        let store = Arc::new(SlowInsertStore {
            inner: SqliteTaskStore::open_in_memory().unwrap(),
            pause: Duration::from_millis(200),
        });
        let stats = Arc::new(PipelineStats::new());
        let (tx, rx) = channel(None, Arc::clone(&stats));
        Worker::new(store.clone(), rx, Arc::clone(&stats))
            .with_delay(Duration::from_millis(20))
            .spawn();
        let app = router().with_state(AppState::new(store.clone(), tx, Arc::clone(&stats)));

        let request = tokio::spawn(async move {
            post_tasks(&app, json!({"title": "A"}).to_string()).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        request.abort();

        wait_for_completed(&stats, 1).await;

        let tasks = store.list_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(stats.snapshot().enqueued, 1);
    }

    #[tokio::test]
    async fn created_task_is_pending_then_completed() {
        let (state, _store, stats) = build_state(Duration::from_millis(300));
        let app = router().with_state(state);

        let response = post_tasks(&app, json!({"title": "A", "description": "d"}).to_string()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let (status, pending) = get_tasks(&app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["id"], 1);
        assert_eq!(pending[0]["title"], "A");
        assert_eq!(pending[0]["description"], "d");
        assert_eq!(pending[0]["status"], "PENDING");

        wait_for_completed(&stats, 1).await;

        let (_, completed) = get_tasks(&app).await;
        assert_eq!(completed[0]["id"], 1);
        assert_eq!(completed[0]["title"], "A");
        assert_eq!(completed[0]["description"], "d");
        assert_eq!(completed[0]["status"], "COMPLETED");
        assert_eq!(completed[0]["created_at"], pending[0]["created_at"]);
    }

    #[tokio::test]
    async fn client_supplied_server_fields_are_ignored() {
        let (state, store, _stats) = build_state(Duration::from_secs(60));
        let app = router().with_state(state);

        let response = post_tasks(
            &app,
            json!({
                "id": 99,
                "title": "B",
                "status": "COMPLETED",
                "created_at": "2000-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let tasks = store.list_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert!(tasks[0].description.is_none());
        assert!(tasks[0].created_at.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_storing() {
        let (state, store, stats) = build_state(Duration::from_millis(10));
        let app = router().with_state(state);

        for body in [
            "{\"title\": ".to_string(),
            "not json".to_string(),
            json!({"description": "no title"}).to_string(),
            json!({"title": 5}).to_string(),
            json!({"title": "   "}).to_string(),
        ] {
            let response = post_tasks(&app, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(stats.snapshot().enqueued, 0);
    }

    #[tokio::test]
    async fn concurrent_creates_get_unique_ids() {
        let (state, store, _stats) = build_state(Duration::from_secs(60));
        let app = router().with_state(state);

        let mut handles = Vec::new();
        for i in 0..20 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                post_tasks(&app, json!({ "title": format!("task {i}") }).to_string())
                    .await
                    .status()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
        }

        let mut ids: Vec<i64> = store.list_all().await.unwrap().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn list_storage_failure_returns_500() {
        let stats = Arc::new(PipelineStats::new());
        let (tx, _rx) = channel(None, Arc::clone(&stats));
        let app = router().with_state(AppState::new(Arc::new(FailingStore), tx, stats));

        let (status, body) = get_tasks(&app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_object());
        assert!(body["error"].as_str().unwrap().contains("database is locked"));
    }

    #[tokio::test]
    async fn create_storage_failure_returns_500_and_queues_nothing() {
        let stats = Arc::new(PipelineStats::new());
        let (tx, _rx) = channel(None, Arc::clone(&stats));
        let app = router().with_state(AppState::new(Arc::new(FailingStore), tx, Arc::clone(&stats)));

        let response = post_tasks(&app, json!({"title": "A"}).to_string()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(stats.snapshot().enqueued, 0);
    }

    #[tokio::test]
    async fn create_without_worker_returns_500_and_keeps_row() {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let stats = Arc::new(PipelineStats::new());
        let (tx, rx) = channel(None, Arc::clone(&stats));
        drop(rx);
        let app = router().with_state(AppState::new(store.clone(), tx, stats));

        let response = post_tasks(&app, json!({"title": "orphan"}).to_string()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let tasks = store.list_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn unsupported_method_returns_405() {
        let (state, _store, _stats) = build_state(Duration::from_millis(10));
        let app = router().with_state(state);

        for method in ["PUT", "DELETE", "PATCH"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/tasks")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }
}

use crate::models::{Task, TaskResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Bounded in-memory storage for tasks and their results. Evicts the oldest
/// entry (insertion order, not priority) once a cap is hit rather than
/// growing without bound — sessions are not persisted across restarts
/// (explicit non-goal), so this only needs to survive the process lifetime.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
    task_order: Arc<Mutex<Vec<String>>>,
    results: Arc<Mutex<HashMap<String, TaskResult>>>,
    result_order: Arc<Mutex<Vec<String>>>,
    max_tasks: usize,
    max_results: usize,
}

impl TaskStore {
    pub fn new(max_tasks: usize, max_results: usize) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            task_order: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(HashMap::new())),
            result_order: Arc::new(Mutex::new(Vec::new())),
            max_tasks,
            max_results,
        }
    }

    pub async fn put_task(&self, task: Task) {
        let mut tasks = self.tasks.lock().await;
        let mut order = self.task_order.lock().await;
        if !tasks.contains_key(&task.id) {
            if tasks.len() >= self.max_tasks {
                if let Some(oldest) = order.first().cloned() {
                    order.remove(0);
                    tasks.remove(&oldest);
                    debug!(task_id = oldest, "evicted oldest task to respect retention cap");
                }
            }
            order.push(task.id.clone());
        }
        tasks.insert(task.id.clone(), task);
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().await.get(task_id).cloned()
    }

    pub async fn put_result(&self, result: TaskResult) {
        let mut results = self.results.lock().await;
        let mut order = self.result_order.lock().await;
        if !results.contains_key(&result.task_id) {
            if results.len() >= self.max_results {
                if let Some(oldest) = order.first().cloned() {
                    order.remove(0);
                    results.remove(&oldest);
                    info!(task_id = oldest, "evicted oldest result to respect retention cap");
                }
            }
            order.push(result.task_id.clone());
        }
        results.insert(result.task_id.clone(), result);
    }

    pub async fn get_result(&self, task_id: &str) -> Option<TaskResult> {
        self.results.lock().await.get(task_id).cloned()
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn result_count(&self) -> usize {
        self.results.lock().await.len()
    }
}

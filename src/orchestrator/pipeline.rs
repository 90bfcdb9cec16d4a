use super::analysis;
use super::selection::select_agent_and_build_task;
use super::store::TaskStore;
use crate::agents::Agent;
use crate::error::OrchestratorError;
use crate::events::{Event, EventBus};
use crate::models::{Intent, TaskError, TaskResult, TaskStatus};
use crate::registry::AgentRegistry;
use crate::router::MessageRouter;
use crate::validation::Validator;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs one intent end to end: analyse, select an agent, dispatch, persist
/// the result. Used by both the single-intent and parallel entry points so
/// they share identical semantics.
pub async fn process_one(
    intent: Intent,
    agents: &AgentRegistry,
    router: &MessageRouter,
    store: &TaskStore,
    events: &EventBus,
    resolve_agent: impl Fn(&str) -> Option<Arc<dyn Agent>>,
) -> TaskResult {
    events.emit(Event::IntentReceived {
        intent_id: intent.id.clone(),
        priority: intent.priority,
    });

    let intent_id = intent.id.clone();
    let validator = Validator::default();
    if let Err(error) = validator.validate_action(&intent.action) {
        return TaskResult::failure(intent_id, TaskError::from(&error), 0);
    }
    if let Some(wallet) = &intent.context.wallet_address {
        if let Err(error) = validator.validate_wallet_address(wallet) {
            return TaskResult::failure(intent_id.clone(), TaskError::from(&error), 0);
        }
    }

    let analyzed = match analysis::analyze(intent) {
        Ok(analyzed) => analyzed,
        Err(error) => {
            return TaskResult::failure(intent_id, TaskError::from(&error), 0);
        }
    };

    let selection = select_agent_and_build_task(agents, &analyzed).await;
    let (selected, mut task) = match selection {
        Ok(pair) => pair,
        Err(error) => {
            return TaskResult::failure(intent_id, TaskError::from(&error), 0);
        }
    };
    let agent_record = selected.agent;

    store.put_task(task.clone()).await;
    events.emit(Event::TaskCreated {
        task_id: task.id.clone(),
        intent_id: task.intent_id.clone(),
        agent_id: task.agent_id.clone(),
    });

    task.transition(TaskStatus::Running)
        .expect("a freshly created task is always pending");
    store.put_task(task.clone()).await;

    let Some(agent) = resolve_agent(&agent_record.id) else {
        let error = OrchestratorError::NoHandler(agent_record.id.clone());
        let result = TaskResult::failure(task.id.clone(), TaskError::from(&error), 0);
        task.transition(TaskStatus::Failed)
            .expect("a running task can always fail");
        store.put_task(task).await;
        store.put_result(result.clone()).await;
        return result;
    };

    let result = match router.dispatch(task.clone(), agent).await {
        Ok(result) => result,
        Err(error) => TaskResult::failure(task.id.clone(), TaskError::from(&error), 0),
    };
    let terminal = if result.is_success() { TaskStatus::Completed } else { TaskStatus::Failed };
    task.transition(terminal)
        .expect("a running task can always reach a terminal state");
    store.put_task(task).await;
    store.put_result(result.clone()).await;
    result
}

/// Processes a batch of intents concurrently, bounded to `max_concurrent`
/// simultaneous pipelines (spec section 4.3's `maxConcurrentTasks`), while
/// preserving input order in the returned vector — the ordering is a hard
/// contract, not an incidental effect of using indices instead of
/// completion order. Each intent still runs independently: one failing
/// does not cancel the rest.
pub async fn process_many(
    intents: Vec<Intent>,
    agents: Arc<AgentRegistry>,
    router: Arc<MessageRouter>,
    store: Arc<TaskStore>,
    events: EventBus,
    max_concurrent: usize,
    resolve_agent: impl Fn(&str) -> Option<Arc<dyn Agent>> + Send + Sync + 'static,
) -> Vec<TaskResult> {
    let resolve_agent = Arc::new(resolve_agent);
    let gate = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(intents.len());

    for (index, intent) in intents.into_iter().enumerate() {
        let agents = Arc::clone(&agents);
        let router = Arc::clone(&router);
        let store = Arc::clone(&store);
        let events = events.clone();
        let resolve_agent = Arc::clone(&resolve_agent);
        let gate = Arc::clone(&gate);

        handles.push(tokio::spawn(async move {
            let _permit = gate.acquire_owned().await.expect("semaphore never closed");
            let result = process_one(intent, &agents, &router, &store, &events, |id| {
                resolve_agent(id)
            })
            .await;
            (index, result)
        }));
    }

    let len = handles.len();
    let mut ordered: Vec<Option<TaskResult>> = (0..len).map(|_| None).collect();
    for handle in handles {
        match handle.await {
            Ok((index, result)) => ordered[index] = Some(result),
            Err(join_error) => {
                tracing::warn!(error = %join_error, "intent processing task panicked");
            }
        }
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            result.unwrap_or_else(|| {
                TaskResult::failure(
                    format!("unknown-{index}"),
                    TaskError::from(&OrchestratorError::Internal(
                        "intent processing task panicked".to_string(),
                    )),
                    0,
                )
            })
        })
        .collect()
}

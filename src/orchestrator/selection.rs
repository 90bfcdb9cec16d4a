use crate::error::Result;
use crate::models::{AgentRecord, AnalyzedIntent, Task};
use crate::registry::AgentRegistry;
use crate::router::{actions_match, agent_type_for};

/// Outcome of matching an analysed intent to a registered agent (spec
/// section 4.3's `SelectedAgent`). `match_score` is the fraction of the
/// intent's required actions the chosen agent actually advertises a
/// capability for, used by callers that want to reason about fit beyond
/// the registry's own scoring.
#[derive(Debug, Clone)]
pub struct SelectedAgent {
    pub agent: AgentRecord,
    pub match_score: f64,
    pub available_capabilities: Vec<String>,
    pub estimated_execution_time_ms: u64,
}

/// Delegates to `AgentRegistry::find_best` via the fixed intent-type ->
/// agent-type table, then shapes the result into the `SelectedAgent`
/// structure the rest of the pipeline consumes.
pub async fn select_agent(registry: &AgentRegistry, analyzed: &AnalyzedIntent) -> Result<SelectedAgent> {
    let agent_type = agent_type_for(analyzed.intent.intent_type);
    let agent = registry
        .find_best(agent_type, &analyzed.intent.action, &analyzed.intent.parameters)
        .await?;

    let available_capabilities: Vec<String> = agent.capabilities.iter().map(|c| c.action.clone()).collect();

    let match_score = if analyzed.required_actions.is_empty() {
        1.0
    } else {
        let matched = analyzed
            .required_actions
            .iter()
            .filter(|required| agent.capabilities.iter().any(|c| actions_match(required, &c.action)))
            .count();
        matched as f64 / analyzed.required_actions.len() as f64
    };

    let estimated_execution_time_ms = agent
        .capabilities
        .iter()
        .find(|c| actions_match(&analyzed.intent.action, &c.action))
        .map(|c| c.estimated_execution_time_ms)
        .unwrap_or(0);

    Ok(SelectedAgent {
        agent,
        match_score,
        available_capabilities,
        estimated_execution_time_ms,
    })
}

/// Builds the `Task` the router will dispatch to `selected.agent`. Kept
/// separate from `select_agent` so the orchestrator's task-shaping concerns
/// (priority, parameters) stay out of the registry.
pub fn create_task(analyzed: &AnalyzedIntent, selected: &SelectedAgent) -> Task {
    Task::new(
        analyzed.intent.id.clone(),
        selected.agent.id.clone(),
        analyzed.intent.action.clone(),
        analyzed.intent.parameters.clone(),
        analyzed.intent.priority.as_i32(),
    )
}

pub async fn select_agent_and_build_task(
    registry: &AgentRegistry,
    analyzed: &AnalyzedIntent,
) -> Result<(SelectedAgent, Task)> {
    let selected = select_agent(registry, analyzed).await?;
    let task = create_task(analyzed, &selected);
    Ok((selected, task))
}

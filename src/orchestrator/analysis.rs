use crate::error::{OrchestratorError, Result};
use crate::models::{AnalyzedIntent, Complexity, Intent, IntentType};
use crate::router::{closed_actions_for, enrich_with_adapter_operations, match_action};

/// Produces a structural analysis of an already-classified `Intent`.
/// Intent *detection* quality (turning free text into an `IntentType`) is
/// explicitly out of scope here; this only reasons about an intent the
/// caller has already classified against the closed action vocabulary for
/// its type — required follow-up actions (including adapter-family
/// operations it implies), a rough complexity estimate, and any risk flags
/// worth surfacing before routing. `UNSUPPORTED_INTENT` if the action
/// matches nothing in that vocabulary.
pub fn analyze(intent: Intent) -> Result<AnalyzedIntent> {
    let matched_action = match_action(intent.intent_type, &intent.action).ok_or_else(|| {
        OrchestratorError::UnsupportedIntent {
            action: intent.action.clone(),
            supported: closed_actions_for(intent.intent_type)
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    })?;

    let required_actions = required_actions_for(&intent, matched_action);
    let estimated_complexity = complexity_for(&intent, &required_actions);
    let risks = risks_for(&intent);
    let confidence = confidence_for(&intent, matched_action);

    Ok(AnalyzedIntent {
        intent,
        confidence,
        required_actions,
        estimated_complexity,
        risks,
    })
}

fn required_actions_for(intent: &Intent, matched_action: &str) -> Vec<String> {
    let mut actions = vec![intent.action.clone()];
    match intent.intent_type {
        IntentType::Lending | IntentType::Liquidity => {
            actions.push("check_balance".to_string());
            actions.push("estimate_gas".to_string());
        }
        IntentType::Trading => {
            actions.push("fetch_quote".to_string());
            actions.push("check_slippage".to_string());
        }
        IntentType::Portfolio | IntentType::Analysis | IntentType::Info | IntentType::Risk => {}
    }
    enrich_with_adapter_operations(intent.intent_type, matched_action, &intent.action, &mut actions);
    actions
}

fn complexity_for(intent: &Intent, required_actions: &[String]) -> Complexity {
    let has_wallet = intent.context.wallet_address.is_some();
    match (required_actions.len(), has_wallet) {
        (n, _) if n >= 3 => Complexity::High,
        (_, false) if matches!(intent.intent_type, IntentType::Lending | IntentType::Trading) => {
            Complexity::High
        }
        (n, _) if n >= 2 => Complexity::Medium,
        _ => Complexity::Low,
    }
}

fn risks_for(intent: &Intent) -> Vec<String> {
    let mut risks = Vec::new();
    if intent.context.wallet_address.is_none()
        && matches!(
            intent.intent_type,
            IntentType::Lending | IntentType::Liquidity | IntentType::Trading
        )
    {
        risks.push("no wallet address bound to this session".to_string());
    }
    if matches!(intent.intent_type, IntentType::Trading) {
        risks.push("price slippage between quote and execution".to_string());
        risks.push("slippage_risk".to_string());
    }
    if matches!(intent.intent_type, IntentType::Lending | IntentType::Liquidity) {
        risks.push("liquidation_risk".to_string());
    }
    if let Some(amount) = intent
        .parameters
        .get("amount")
        .and_then(serde_json::Value::as_f64)
    {
        if amount >= crate::constants::HIGH_VALUE_THRESHOLD {
            risks.push("high_value_transaction".to_string());
        }
    }
    risks
}

/// 0.9 when `intent.action` matches the closed vocabulary's canonical name
/// case-insensitively, else 0.7 for a substring match that still resolved
/// to a supported action (`analyze` only reaches here once matched).
fn confidence_for(intent: &Intent, matched_action: &str) -> f64 {
    if intent.action.trim().to_lowercase() == matched_action {
        0.9
    } else {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntentContext, Priority};
    use std::collections::HashMap;

    #[test]
    fn lending_without_wallet_flags_risk_and_high_complexity() {
        let intent = Intent::new(
            IntentType::Lending,
            "supply",
            HashMap::new(),
            IntentContext::new("s1"),
            Priority::Medium,
        );
        let analyzed = analyze(intent).unwrap();
        assert_eq!(analyzed.estimated_complexity, Complexity::High);
        assert!(analyzed.risks.iter().any(|r| r.contains("wallet")));
        assert!(analyzed.risks.iter().any(|r| r == "liquidation_risk"));
        assert_eq!(analyzed.confidence, 0.9);
    }

    #[test]
    fn info_intent_is_low_complexity_with_no_risks() {
        let intent = Intent::new(
            IntentType::Info,
            "explain",
            HashMap::new(),
            IntentContext::new("s1"),
            Priority::Low,
        );
        let analyzed = analyze(intent).unwrap();
        assert_eq!(analyzed.estimated_complexity, Complexity::Low);
        assert!(analyzed.risks.is_empty());
    }

    #[test]
    fn unknown_action_is_rejected_with_the_portfolio_action_vocabulary() {
        let intent = Intent::new(
            IntentType::Portfolio,
            "unknown_action",
            HashMap::new(),
            IntentContext::new("s1"),
            Priority::Medium,
        );
        let err = analyze(intent).unwrap_err();
        match err {
            OrchestratorError::UnsupportedIntent { supported, .. } => {
                assert_eq!(supported, vec!["show_positions", "rebalance", "analyze"]);
            }
            other => panic!("expected UnsupportedIntent, got {other:?}"),
        }
    }

    #[test]
    fn lower_confidence_substring_match_is_still_supported() {
        let intent = Intent::new(
            IntentType::Lending,
            "Supply USDC",
            HashMap::new(),
            IntentContext::new("s1"),
            Priority::Medium,
        );
        let analyzed = analyze(intent).unwrap();
        assert_eq!(analyzed.confidence, 0.7);
    }

    #[test]
    fn analysis_is_blockchain_intent_enriches_with_realtime_state() {
        let intent = Intent::new(
            IntentType::Risk,
            "monitor_risk",
            HashMap::new(),
            IntentContext::new("s1"),
            Priority::Medium,
        );
        let analyzed = analyze(intent).unwrap();
        assert!(analyzed
            .required_actions
            .iter()
            .any(|a| a == "realtime:get_blockchain_state"));
        assert!(analyzed
            .required_actions
            .iter()
            .any(|a| a == "analytics:get_credit_analysis"));
    }
}

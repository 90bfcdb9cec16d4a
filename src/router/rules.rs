use crate::models::{AdapterFamily, AgentType, IntentType};

/// Maps an intent family to the agent type responsible for it. A static
/// table rather than a trait object: the mapping is closed over the seven
/// intent types and never grows at runtime.
pub fn agent_type_for(intent_type: IntentType) -> AgentType {
    match intent_type {
        IntentType::Lending => AgentType::LendingAgent,
        IntentType::Liquidity => AgentType::LiquidityAgent,
        IntentType::Portfolio => AgentType::PortfolioAgent,
        IntentType::Risk => AgentType::RiskAgent,
        IntentType::Trading => AgentType::PortfolioAgent,
        IntentType::Analysis | IntentType::Info => AgentType::AnalysisAgent,
    }
}

/// Canonicalises an action name for matching: lowercased and trimmed,
/// compared as a substring rather than exact equality so `"Supply USDC"`
/// still matches a capability registered as `"supply"`. No synonym table —
/// callers needing synonyms normalise before this point.
pub fn canonicalize(action: &str) -> String {
    action.trim().to_lowercase()
}

pub fn actions_match(requested: &str, capability_action: &str) -> bool {
    let requested = canonicalize(requested);
    let capability = canonicalize(capability_action);
    requested.contains(&capability) || capability.contains(&requested)
}

/// The closed action vocabulary per intent type (spec section 4.3). An
/// intent whose action matches none of these, case-insensitively and in
/// either substring direction, is `UNSUPPORTED_INTENT`.
pub const LENDING_ACTIONS: &[&str] = &["supply", "borrow", "withdraw", "repay"];
pub const LIQUIDITY_ACTIONS: &[&str] = &["add_liquidity", "remove_liquidity", "stake", "unstake"];
pub const PORTFOLIO_ACTIONS: &[&str] = &["show_positions", "rebalance", "analyze"];
pub const TRADING_ACTIONS: &[&str] = &["swap", "fetch_quote", "check_slippage"];
pub const ANALYSIS_ACTIONS: &[&str] = &["get_analytics", "get_market_insights", "search"];
pub const INFO_ACTIONS: &[&str] = &["explain", "get_info", "faq"];
pub const RISK_ACTIONS: &[&str] = &["assess_risk", "get_credit_analysis", "monitor_risk"];

pub fn closed_actions_for(intent_type: IntentType) -> &'static [&'static str] {
    match intent_type {
        IntentType::Lending => LENDING_ACTIONS,
        IntentType::Liquidity => LIQUIDITY_ACTIONS,
        IntentType::Portfolio => PORTFOLIO_ACTIONS,
        IntentType::Trading => TRADING_ACTIONS,
        IntentType::Analysis => ANALYSIS_ACTIONS,
        IntentType::Info => INFO_ACTIONS,
        IntentType::Risk => RISK_ACTIONS,
    }
}

/// Finds the closed-set action `action` resolves to for `intent_type`, via
/// case-insensitive substring match in either direction. `None` means the
/// action is outside the type's vocabulary entirely.
pub fn match_action(intent_type: IntentType, action: &str) -> Option<&'static str> {
    closed_actions_for(intent_type)
        .iter()
        .find(|candidate| actions_match(action, candidate))
        .copied()
}

/// Per-family adapter operation vocabularies (spec section 4.2).
pub const ACTION_KIT_OPERATIONS: &[&str] = &[
    "token_balance",
    "token_transfer",
    "token_approve",
    "lend",
    "withdraw",
    "borrow",
    "repay",
    "swap",
    "add_liquidity",
    "remove_liquidity",
    "stake",
];
pub const ANALYTICS_OPERATIONS: &[&str] = &[
    "search",
    "get_analytics",
    "get_portfolio_analysis",
    "get_market_insights",
    "get_credit_analysis",
];
pub const REALTIME_OPERATIONS: &[&str] = &[
    "get_blockchain_state",
    "get_wallet_balance",
    "query_contract",
    "execute_contract",
    "send_transaction",
    "subscribe_events",
];

pub fn operations_for(family: AdapterFamily) -> &'static [&'static str] {
    match family {
        AdapterFamily::ActionKit => ACTION_KIT_OPERATIONS,
        AdapterFamily::Analytics => ANALYTICS_OPERATIONS,
        AdapterFamily::Realtime => REALTIME_OPERATIONS,
    }
}

/// Whether `operation` belongs to `family`'s declared vocabulary — the
/// Adapter Facade rejects anything outside it (spec section 4.4 step 2).
pub fn adapter_operation_allowed(family: AdapterFamily, operation: &str) -> bool {
    operations_for(family)
        .iter()
        .any(|candidate| canonicalize(operation) == canonicalize(candidate))
}

/// Maps a matched lending/liquidity/trading action onto the actionKit
/// operation it actually transacts through. `supply` has no literal
/// `actionKit` counterpart of the same name — it settles through `lend`.
fn action_kit_operation_for(matched_action: &str) -> Option<&'static str> {
    match matched_action {
        "supply" => Some("lend"),
        "borrow" => Some("borrow"),
        "withdraw" => Some("withdraw"),
        "repay" => Some("repay"),
        "add_liquidity" => Some("add_liquidity"),
        "remove_liquidity" => Some("remove_liquidity"),
        "stake" => Some("stake"),
        "swap" => Some("swap"),
        _ => None,
    }
}

/// Appends adapter-family operations a matched intent action implies
/// (spec section 4.3's adapter capability enrichment) to `actions`.
pub fn enrich_with_adapter_operations(
    intent_type: IntentType,
    matched_action: &str,
    raw_action: &str,
    actions: &mut Vec<String>,
) {
    if let Some(op) = action_kit_operation_for(matched_action) {
        actions.push(format!("actionKit:{op}"));
    }

    match intent_type {
        IntentType::Analysis => actions.push("analytics:get_market_insights".to_string()),
        IntentType::Risk => actions.push("analytics:get_credit_analysis".to_string()),
        IntentType::Portfolio => actions.push("analytics:get_portfolio_analysis".to_string()),
        _ => {}
    }

    let lowered = raw_action.to_lowercase();
    if ["current", "live", "monitor"]
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        actions.push("realtime:get_blockchain_state".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_trims_and_lowercases() {
        assert_eq!(canonicalize("  Supply USDC  "), "supply usdc");
    }

    #[test]
    fn actions_match_is_substring_based() {
        assert!(actions_match("Supply USDC", "supply"));
        assert!(actions_match("supply", "supply usdc"));
        assert!(!actions_match("withdraw", "supply"));
    }

    #[test]
    fn agent_type_mapping_covers_every_intent() {
        for intent_type in [
            IntentType::Lending,
            IntentType::Liquidity,
            IntentType::Portfolio,
            IntentType::Trading,
            IntentType::Analysis,
            IntentType::Info,
            IntentType::Risk,
        ] {
            let _ = agent_type_for(intent_type);
        }
    }

    #[test]
    fn match_action_is_case_insensitive_substring_in_either_direction() {
        assert_eq!(match_action(IntentType::Lending, "Supply USDC"), Some("supply"));
        assert_eq!(match_action(IntentType::Portfolio, "unknown_action"), None);
    }

    #[test]
    fn adapter_operation_allowed_checks_the_family_vocabulary() {
        assert!(adapter_operation_allowed(AdapterFamily::ActionKit, "swap"));
        assert!(!adapter_operation_allowed(AdapterFamily::ActionKit, "get_analytics"));
        assert!(adapter_operation_allowed(AdapterFamily::Analytics, "get_analytics"));
    }
}

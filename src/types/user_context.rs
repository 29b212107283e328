//! `UserContext` (SUPPLEMENT, SPEC_FULL.md §3) — per-tenant running profile
//! that accumulates session stats, facts, and goals, rendered back into a
//! LOOKUP-style system message for LLM context injection. Grounded in
//! `original_source`'s `test_session_reload_integration.py`
//! (`UserContext.load_or_create` / `update_session_stats` /
//! `to_context_message`), which the distilled spec.md dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    /// Always `"user-{tenant_id}"` — one context per tenant, not per session.
    pub id: String,
    pub tenant_id: String,
    pub total_sessions: u64,
    pub total_tokens_used: u64,
    pub last_session_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserContext {
    pub fn id_for_tenant(tenant_id: &str) -> String {
        format!("user-{tenant_id}")
    }

    /// Constructs a fresh context; the repository's `load_or_create` calls
    /// this only on a LOOKUP miss.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        let now = Utc::now();
        Self {
            id: Self::id_for_tenant(&tenant_id),
            tenant_id,
            total_sessions: 0,
            total_tokens_used: 0,
            last_session_at: None,
            facts: Vec::new(),
            goals: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_session_stats(&mut self, tokens_used: u64) {
        self.total_sessions += 1;
        self.total_tokens_used += tokens_used;
        self.last_session_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn add_fact(&mut self, fact: impl Into<String>) {
        let fact = fact.into();
        if !self.facts.contains(&fact) {
            self.facts.push(fact);
        }
        self.updated_at = Utc::now();
    }

    pub fn add_goal(&mut self, goal: impl Into<String>) {
        let goal = goal.into();
        if !self.goals.contains(&goal) {
            self.goals.push(goal);
        }
        self.updated_at = Utc::now();
    }

    /// Renders this context as a `REM LOOKUP user-{tenant_id}` system
    /// message body, the form injected at the start of a new session.
    pub fn to_context_message(&self) -> String {
        let mut out = format!(
            "REM LOOKUP {}\nsessions: {}\ntokens_used: {}",
            self.id, self.total_sessions, self.total_tokens_used
        );
        if !self.facts.is_empty() {
            out.push_str("\nfacts:\n");
            out.push_str(&self.facts.iter().map(|f| format!("- {f}")).collect::<Vec<_>>().join("\n"));
        }
        if !self.goals.is_empty() {
            out.push_str("\ngoals:\n");
            out.push_str(&self.goals.iter().map(|g| format!("- {g}")).collect::<Vec<_>>().join("\n"));
        }
        out
    }
}

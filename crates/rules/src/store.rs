//! Read access to the current rule set.
//!
//! The engine only ever reads rules through [`RuleStore`]; authoring happens
//! elsewhere (the dashboard, or YAML files picked up by
//! [`RuleLoader`](crate::loader::RuleLoader)).

use std::sync::RwLock;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::loader::Result;
use crate::schema::Rule;

/// Source of rule definitions.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every rule, enabled or not.
    async fn all(&self) -> Result<Vec<Rule>>;

    /// Look up a single rule by id.
    async fn get(&self, id: &str) -> Result<Option<Rule>>;

    /// Rules that take part in live matching.
    async fn enabled_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.all().await?.into_iter().filter(|r| r.enabled).collect())
    }
}

/// Rule store held entirely in memory, in insertion order.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<IndexMap<String, Rule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.upsert(rule);
        }
        store
    }

    /// Insert or replace a rule, returning the previous version.
    pub fn upsert(&self, rule: Rule) -> Option<Rule> {
        self.rules
            .write()
            .expect("rule store lock poisoned")
            .insert(rule.id.clone(), rule)
    }

    pub fn remove(&self, id: &str) -> Option<Rule> {
        self.rules
            .write()
            .expect("rule store lock poisoned")
            .shift_remove(id)
    }

    pub fn len(&self) -> usize {
        self.rules.read().expect("rule store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn all(&self) -> Result<Vec<Rule>> {
        Ok(self
            .rules
            .read()
            .expect("rule store lock poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Rule>> {
        Ok(self
            .rules
            .read()
            .expect("rule store lock poisoned")
            .get(id)
            .cloned())
    }
}

use std::sync::Arc;

use serde::Serialize;

use super::KnowledgeBase;
use crate::model::ResponseBundle;

/// How a query was matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum MatchKind {
    /// The query contained the topic's spaced key.
    Topic,
    /// The query contained a keyword from the keyword table.
    Keyword { keyword: String },
    Fallback,
}

/// A resolved query: the bundle plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub topic: Option<String>,
    pub matched: MatchKind,
    pub bundle: ResponseBundle,
}

/// Maps free text to a canned reply. Total: every query gets a bundle.
#[derive(Debug, Clone)]
pub struct IntentResolver {
    knowledge: Arc<KnowledgeBase>,
}

impl IntentResolver {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Topic keys in first-pass order.
    pub fn topics(&self) -> Vec<&str> {
        self.knowledge.topic_keys()
    }

    pub fn resolve(&self, query: &str) -> ResponseBundle {
        self.resolve_detailed(query).bundle
    }

    /// Two passes over the case-folded query. Topic phrases are tried in
    /// knowledge-base order, then keywords in table order. Ties go to
    /// whichever entry comes first in the table, never to whichever word
    /// comes first in the query.
    pub fn resolve_detailed(&self, query: &str) -> Resolution {
        let normalized = query.to_lowercase();

        for (key, topic) in self.knowledge.topics_in_order() {
            if normalized.contains(&topic.phrase) {
                tracing::debug!(topic = %key, "Resolved query by topic phrase");
                return Resolution {
                    topic: Some(key.clone()),
                    matched: MatchKind::Topic,
                    bundle: topic.bundle.clone(),
                };
            }
        }

        for rule in self.knowledge.keywords() {
            if normalized.contains(&rule.keyword) {
                if let Some(bundle) = self.knowledge.topic(&rule.topic) {
                    tracing::debug!(topic = %rule.topic, keyword = %rule.keyword, "Resolved query by keyword");
                    return Resolution {
                        topic: Some(rule.topic.clone()),
                        matched: MatchKind::Keyword {
                            keyword: rule.keyword.clone(),
                        },
                        bundle: bundle.clone(),
                    };
                }
            }
        }

        tracing::debug!(query = %query, "No topic matched; using fallback");
        Resolution {
            topic: None,
            matched: MatchKind::Fallback,
            bundle: self.knowledge.fallback().clone(),
        }
    }
}

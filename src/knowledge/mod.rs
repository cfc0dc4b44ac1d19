//! Canned knowledge: topics, the keyword table, and the fallback reply.
//!
//! The table is built once at startup, validated, and shared immutably
//! (`Arc<KnowledgeBase>`) with the resolver. Substitute tables can be loaded
//! from any JSON document of the same shape.

pub mod resolver;

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::ResponseBundle;

pub use resolver::{IntentResolver, MatchKind, Resolution};

const BUILTIN_KNOWLEDGE: &str = include_str!("builtin.json");

// ── Document shape ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KnowledgeDocument {
    topics: Vec<TopicEntry>,
    #[serde(default)]
    keywords: Vec<KeywordRule>,
    fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TopicEntry {
    key: String,
    #[serde(flatten)]
    bundle: ResponseBundle,
}

/// One row of the keyword table: if the query contains `keyword`, answer
/// with `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub topic: String,
}

// ── Knowledge base ───────────────────────────────────────────────

/// A topic together with the phrase the first resolver pass looks for.
#[derive(Debug, Clone)]
pub(crate) struct Topic {
    pub(crate) phrase: String,
    pub(crate) bundle: ResponseBundle,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    topics: IndexMap<String, Topic>,
    keywords: Vec<KeywordRule>,
    fallback: ResponseBundle,
}

impl KnowledgeBase {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_json_str(BUILTIN_KNOWLEDGE)
    }

    /// Load a substitute table from disk.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| AppError::KnowledgeError {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    /// Load from `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let doc: KnowledgeDocument =
            serde_json::from_str(text).map_err(|e| AppError::KnowledgeError {
                message: e.to_string(),
            })?;
        Self::from_document(doc)
    }

    fn from_document(doc: KnowledgeDocument) -> Result<Self, AppError> {
        let mut topics = IndexMap::with_capacity(doc.topics.len());
        for entry in doc.topics {
            let key = entry.key.trim().to_string();
            if key.is_empty() {
                return Err(AppError::KnowledgeError {
                    message: "topic key must not be empty".to_string(),
                });
            }
            let phrase = key.replace('_', " ").to_lowercase();
            if topics
                .insert(
                    key.clone(),
                    Topic {
                        phrase,
                        bundle: entry.bundle,
                    },
                )
                .is_some()
            {
                return Err(AppError::KnowledgeError {
                    message: format!("duplicate topic key '{key}'"),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut keywords = Vec::with_capacity(doc.keywords.len());
        for rule in doc.keywords {
            let keyword = rule.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(AppError::KnowledgeError {
                    message: format!("empty keyword for topic '{}'", rule.topic),
                });
            }
            if !topics.contains_key(&rule.topic) {
                return Err(AppError::KnowledgeError {
                    message: format!("keyword '{keyword}' points at unknown topic '{}'", rule.topic),
                });
            }
            // A repeated keyword could never win; later rows are dead.
            if !seen.insert(keyword.clone()) {
                return Err(AppError::KnowledgeError {
                    message: format!("duplicate keyword '{keyword}'"),
                });
            }
            keywords.push(KeywordRule {
                keyword,
                topic: rule.topic,
            });
        }

        Ok(Self {
            topics,
            keywords,
            fallback: ResponseBundle::answer_only(doc.fallback),
        })
    }

    /// Topic keys in iteration (first-pass) order.
    pub fn topic_keys(&self) -> Vec<&str> {
        self.topics.keys().map(String::as_str).collect()
    }

    pub fn topic(&self, key: &str) -> Option<&ResponseBundle> {
        self.topics.get(key).map(|t| &t.bundle)
    }

    pub fn keywords(&self) -> &[KeywordRule] {
        &self.keywords
    }

    pub fn fallback(&self) -> &ResponseBundle {
        &self.fallback
    }

    pub(crate) fn topics_in_order(&self) -> impl Iterator<Item = (&String, &Topic)> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::ActionKind;

    #[test]
    fn builtin_table_loads_in_authoring_order() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert_eq!(
            kb.topic_keys(),
            vec![
                "create_project",
                "record_audio",
                "record_midi",
                "mixing",
                "effects_devices",
                "automation",
                "arrangement",
                "clip_launcher",
                "troubleshooting",
            ]
        );
        assert_eq!(kb.keywords().len(), 27);
        assert!(!kb.fallback().can_execute);
        assert!(kb.fallback().actions.is_empty());
    }

    #[test]
    fn every_builtin_topic_is_executable_with_linked_steps() {
        let kb = KnowledgeBase::builtin().unwrap();
        for key in kb.topic_keys() {
            let bundle = kb.topic(key).unwrap();
            assert!(bundle.is_executable(), "{key} should be executable");
            assert!(!bundle.steps.is_empty(), "{key} should have steps");
        }
        let mixing = kb.topic("mixing").unwrap();
        assert_eq!(mixing.actions[1].kind, ActionKind::Parameter);
        assert_eq!(mixing.actions[1].target, "track_volume");
    }

    #[test]
    fn rejects_keyword_for_unknown_topic() {
        let doc = r#"{
            "topics": [{ "key": "mixing", "answer": "a" }],
            "keywords": [{ "keyword": "mix", "topic": "mastering" }],
            "fallback": "f"
        }"#;
        let err = KnowledgeBase::from_json_str(doc).unwrap_err();
        assert!(matches!(err, AppError::KnowledgeError { .. }));
        assert!(err.to_string().contains("mastering"));
    }

    #[test]
    fn rejects_duplicate_topics_and_keywords() {
        let dup_topic = r#"{
            "topics": [{ "key": "a", "answer": "1" }, { "key": "a", "answer": "2" }],
            "fallback": "f"
        }"#;
        assert!(KnowledgeBase::from_json_str(dup_topic).is_err());

        let dup_keyword = r#"{
            "topics": [{ "key": "a", "answer": "1" }],
            "keywords": [{ "keyword": "x", "topic": "a" }, { "keyword": "X", "topic": "a" }],
            "fallback": "f"
        }"#;
        assert!(KnowledgeBase::from_json_str(dup_keyword).is_err());
    }

    #[test]
    fn load_reads_substitute_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"{ "topics": [{ "key": "sound_design", "answer": "Try the Polymer synth." }], "fallback": "?" }"#,
        )
        .unwrap();

        let kb = KnowledgeBase::load(Some(&path)).unwrap();
        assert_eq!(kb.topic_keys(), vec!["sound_design"]);
        assert!(!kb.topic("sound_design").unwrap().can_execute);

        let missing = KnowledgeBase::load(Some(&dir.path().join("nope.json")));
        assert!(missing.is_err());
    }
}

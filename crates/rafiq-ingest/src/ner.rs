// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arabic NER over an HTTP token-classification endpoint.
//!
//! Lazy: the first extraction builds the client. Entities below the
//! confidence floor are dropped; groups are mapped onto graph labels and
//! hints are formatted for prepending to extraction prompts.

use rafiq_core::RafiqError;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    entity_group: String,
    #[serde(default)]
    word: String,
    #[serde(default)]
    score: f32,
}

/// One recognised named entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NerEntity {
    pub entity_group: String,
    pub word: String,
    pub score: f32,
}

fn map_group(group: &str) -> &str {
    match group {
        "PER" => "Person",
        "LOC" => "Location",
        "ORG" => "Organization",
        "MISC" => "Misc",
        other => other,
    }
}

/// Lazy HTTP client for the NER inference endpoint.
pub struct NerService {
    enabled: bool,
    base_url: String,
    min_confidence: f32,
    client: OnceLock<reqwest::Client>,
}

impl NerService {
    pub fn new(enabled: bool, base_url: String, min_confidence: f32) -> Self {
        Self {
            enabled,
            base_url,
            min_confidence,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(|| {
            info!("NER client initialised");
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default()
        })
    }

    /// Extracts Person/Location/Organization entities from Arabic text.
    /// Failures degrade to an empty list; NER is advisory only.
    pub async fn extract_entities(&self, text: &str) -> Vec<NerEntity> {
        if !self.enabled || text.is_empty() {
            return Vec::new();
        }
        let response = match self
            .client()
            .post(&self.base_url)
            .json(&serde_json::json!({"inputs": text}))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "NER request failed");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "NER endpoint error");
            return Vec::new();
        }
        let raw: Vec<RawEntity> = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "NER response parse failed");
                return Vec::new();
            }
        };

        let mut seen = std::collections::HashSet::new();
        let mut entities = Vec::new();
        for ent in raw {
            if ent.score < self.min_confidence {
                continue;
            }
            let word = ent.word.replace("##", "").trim().to_string();
            if word.chars().count() < 2 {
                continue;
            }
            let group = map_group(&ent.entity_group).to_string();
            if seen.insert((group.clone(), word.clone())) {
                entities.push(NerEntity {
                    entity_group: group,
                    word,
                    score: (ent.score * 1000.0).round() / 1000.0,
                });
            }
        }
        entities
    }

    /// `"Detected entities: Person: محمد, أحمد; Location: الرياض"` or empty.
    pub fn format_hints(entities: &[NerEntity]) -> String {
        if entities.is_empty() {
            return String::new();
        }
        let mut by_group: Vec<(String, Vec<String>)> = Vec::new();
        for e in entities {
            match by_group.iter_mut().find(|(g, _)| g == &e.entity_group) {
                Some((_, words)) => words.push(e.word.clone()),
                None => by_group.push((e.entity_group.clone(), vec![e.word.clone()])),
            }
        }
        let parts: Vec<String> = by_group
            .into_iter()
            .map(|(group, words)| format!("{group}: {}", words.join(", ")))
            .collect();
        format!("Detected entities: {}", parts.join("; "))
    }

    /// Extracts and formats in one step.
    pub async fn hints_for(&self, text: &str) -> String {
        let entities = self.extract_entities(text).await;
        let hints = Self::format_hints(&entities);
        if !hints.is_empty() {
            info!(hints = %hints, "NER hints");
        }
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extraction_filters_and_maps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"entity_group": "PER", "word": "محمد", "score": 0.98},
                {"entity_group": "LOC", "word": "الرياض", "score": 0.91},
                {"entity_group": "PER", "word": "غامض", "score": 0.4},
                {"entity_group": "PER", "word": "محمد", "score": 0.95}
            ])))
            .mount(&server)
            .await;

        let ner = NerService::new(true, server.uri(), 0.7);
        let entities = ner.extract_entities("قابلت محمد في الرياض").await;
        assert_eq!(entities.len(), 2, "low-confidence and duplicates dropped");
        assert_eq!(entities[0].entity_group, "Person");
        assert_eq!(entities[0].word, "محمد");
        assert_eq!(entities[1].entity_group, "Location");
    }

    #[tokio::test]
    async fn disabled_service_returns_nothing() {
        let ner = NerService::new(false, "http://unused".into(), 0.7);
        assert!(ner.extract_entities("نص").await.is_empty());
    }

    #[tokio::test]
    async fn endpoint_failure_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let ner = NerService::new(true, server.uri(), 0.7);
        assert!(ner.extract_entities("نص").await.is_empty());
    }

    #[test]
    fn hint_formatting_groups_entities() {
        let entities = vec![
            NerEntity { entity_group: "Person".into(), word: "محمد".into(), score: 0.98 },
            NerEntity { entity_group: "Person".into(), word: "أحمد".into(), score: 0.92 },
            NerEntity { entity_group: "Location".into(), word: "الرياض".into(), score: 0.91 },
        ];
        assert_eq!(
            NerService::format_hints(&entities),
            "Detected entities: Person: محمد, أحمد; Location: الرياض"
        );
        assert_eq!(NerService::format_hints(&[]), "");
    }
}

//! Sector classification: an ordered rule layer with an optional per-user
//! learned override (`spec.md` §4.5).

mod learned;
mod rules;

pub use learned::{LogisticHead, TrainingExample};
pub use rules::RuleClassifier;

use openmemory_core::models::Sector;

/// Result of classifying a piece of content.
#[derive(Debug, Clone)]
pub struct Classification {
    pub primary: Sector,
    pub additional: Vec<Sector>,
    pub confidence: f64,
}

/// Combines the rule layer with an optional trained head. The learned
/// prediction only overrides the rule result when its own confidence
/// exceeds `classifier_override_threshold`.
pub struct Classifier {
    rules: RuleClassifier,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            rules: RuleClassifier::default(),
        }
    }

    pub fn classify(&self, content: &str) -> Classification {
        self.rules.classify(content)
    }

    pub fn classify_with_head(
        &self,
        content: &str,
        mean_vec: &[f32],
        head: Option<&LogisticHead>,
        override_threshold: f64,
    ) -> Classification {
        let rule_result = self.rules.classify(content);
        if let Some(head) = head {
            let (sector, confidence) = head.predict(mean_vec);
            if confidence > override_threshold {
                return Classification {
                    primary: sector,
                    additional: rule_result.additional,
                    confidence,
                };
            }
        }
        rule_result
    }
}

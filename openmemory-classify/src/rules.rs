use regex::RegexSet;

use openmemory_core::models::Sector;

use crate::Classification;

/// Ordered substring/regex patterns per sector. The first matching
/// pattern set wins; unmatched content falls back to `semantic` with low
/// confidence (`spec.md` §4.5).
pub struct RuleClassifier {
    episodic: RegexSet,
    procedural: RegexSet,
    emotional: RegexSet,
    reflective: RegexSet,
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self {
            episodic: RegexSet::new([
                r"(?i)\byesterday\b",
                r"(?i)\blast (week|month|year|spring|summer|fall|winter)\b",
                r"(?i)\bi (remember|visited|went|saw|met)\b",
                r"(?i)\bwhen i\b",
            ])
            .unwrap(),
            procedural: RegexSet::new([
                r"(?i)\bstep \d+\b",
                r"(?i)\bhow to\b",
                r"(?i)\bfirst,? .* then\b",
                r"(?i)\b(npm|cargo|pip|git) (install|run|build|commit)\b",
            ])
            .unwrap(),
            emotional: RegexSet::new([
                r"(?i)\bi (feel|felt|am feeling)\b",
                r"(?i)\b(happy|sad|angry|anxious|excited|frustrated|grateful)\b",
            ])
            .unwrap(),
            reflective: RegexSet::new([
                r"(?i)\bin retrospect\b",
                r"(?i)\bi (realized|learned|reflect)\b",
                r"(?i)\blooking back\b",
            ])
            .unwrap(),
        }
    }
}

impl RuleClassifier {
    pub fn classify(&self, content: &str) -> Classification {
        if self.episodic.is_match(content) {
            return Classification {
                primary: Sector::Episodic,
                additional: vec![],
                confidence: 0.9,
            };
        }
        if self.procedural.is_match(content) {
            return Classification {
                primary: Sector::Procedural,
                additional: vec![],
                confidence: 0.9,
            };
        }
        if self.emotional.is_match(content) {
            return Classification {
                primary: Sector::Emotional,
                additional: vec![],
                confidence: 0.85,
            };
        }
        if self.reflective.is_match(content) {
            return Classification {
                primary: Sector::Reflective,
                additional: vec![],
                confidence: 0.85,
            };
        }
        Classification {
            primary: Sector::Semantic,
            additional: vec![],
            confidence: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_episodic() {
        let c = RuleClassifier::default();
        let r = c.classify("I remember visiting Tokyo last spring");
        assert_eq!(r.primary, Sector::Episodic);
    }

    #[test]
    fn routes_semantic_fact() {
        let c = RuleClassifier::default();
        let r = c.classify("The speed of light is constant");
        assert_eq!(r.primary, Sector::Semantic);
        assert_eq!(r.confidence, 0.2);
    }

    #[test]
    fn routes_procedural() {
        let c = RuleClassifier::default();
        let r = c.classify("Step 1: npm install. Step 2: npm start");
        assert_eq!(r.primary, Sector::Procedural);
    }
}

//! Sensitivity classification.
//!
//! The engine consumes classifiers through the [`Classifier`] trait. A trained
//! model lives behind that trait in production; [`PatternClassifier`] is the
//! rule-based reference implementation.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use acpe_core::{ClassificationResult, DetectedPattern, SensitivityLevel, Severity};

/// The classifier could not produce a result.
#[derive(Debug, Error)]
#[error("classifier unavailable: {0}")]
pub struct ClassifierUnavailable(pub String);

/// Text in, sensitivity out.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierUnavailable>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

/// One detection rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    pub pattern: String,
    pub level: SensitivityLevel,
    pub severity: Severity,
    /// Confidence added when this rule matches at the winning level.
    pub weight: f64,
    pub description: String,
}

impl ClassificationRule {
    fn new(
        name: &str,
        pattern: &str,
        level: SensitivityLevel,
        severity: Severity,
        weight: f64,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            level,
            severity,
            weight,
            description: description.to_string(),
        }
    }
}

/// Default rules: structured identifiers plus keyword families.
#[rustfmt::skip]
pub fn default_rules() -> Vec<ClassificationRule> {
    use SensitivityLevel::*;
    use Severity::*;

    vec![
        // Structured identifiers
        ClassificationRule::new("ssn", r"\b\d{3}-\d{2}-\d{4}\b", HighlySensitive, High, 0.15, "Social Security Number"),
        ClassificationRule::new("credit_card", r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b", HighlySensitive, High, 0.15, "Credit card number"),
        ClassificationRule::new("date_of_birth", r"\b(?:0[1-9]|1[0-2])[/-](?:0[1-9]|[12]\d|3[01])[/-](?:19|20)\d{2}\b", HighlySensitive, High, 0.10, "Date of birth"),
        ClassificationRule::new("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", Confidential, Medium, 0.05, "Email address"),
        ClassificationRule::new("phone", r"\b(?:\+1[-.]?)?\(?\d{3}\)?[-.]?\d{3}[-.]?\d{4}\b", Confidential, Medium, 0.05, "Phone number"),
        ClassificationRule::new("ip_address", r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b", Confidential, Medium, 0.05, "IP address"),
        // Keyword families
        ClassificationRule::new("credentials", r"(?i)\b(?:password|passwd|secret(?:_key)?|api[_-]?key|private[_-]?key|token|credentials?)\b", HighlySensitive, High, 0.05, "Credential terms"),
        ClassificationRule::new("financial_identifiers", r"(?i)\b(?:credit[_-]?card|card[_-]?number|cvv|pin|bank[_-]?account|routing[_-]?number)\b", HighlySensitive, High, 0.05, "Financial identifier terms"),
        ClassificationRule::new("personal_identifiers", r"(?i)\b(?:ssn|social[_ -]?security|passport|driver'?s?[_ -]?license|national[_-]?id)\b", HighlySensitive, High, 0.05, "Personal identifier terms"),
        ClassificationRule::new("medical", r"(?i)\b(?:medical[_-]?record|health[_-]?record|patient[_-]?data|diagnosis|prescription)\b", HighlySensitive, High, 0.05, "Medical terms"),
        ClassificationRule::new("business", r"(?i)\b(?:confidential|proprietary|trade[_-]?secret|financial[_-]?report|budget|profit|revenue|strateg(?:y|ic)|merger|acquisition)\b", Confidential, Medium, 0.05, "Business-confidential terms"),
        ClassificationRule::new("hr", r"(?i)\b(?:salary|compensation|employee[_-]?record|performance[_-]?review|termination)\b", Confidential, Medium, 0.05, "HR terms"),
        ClassificationRule::new("legal", r"(?i)\b(?:legal[_-]?document|contract|nda|non[_-]?disclosure|litigation)\b", Confidential, Medium, 0.05, "Legal terms"),
        ClassificationRule::new("internal_comms", r"(?i)\b(?:internal|memo|draft|work[_-]?in[_-]?progress)\b", Internal, Low, 0.05, "Internal communication markers"),
        ClassificationRule::new("operations", r"(?i)\b(?:project[_-]?plan|meeting[_-]?notes|team|department|operations|employee[_-]?directory|office[_-]?location)\b", Internal, Low, 0.05, "Business operations terms"),
    ]
}

/// Confidence when nothing matches.
const BASE_CONFIDENCE: f64 = 0.7;
const MAX_CONFIDENCE: f64 = 0.95;
const MAX_EXAMPLES: usize = 3;

/// Mask a matched value for display.
fn mask(rule: &str, text: &str) -> String {
    match rule {
        "ssn" => "XXX-XX-XXXX".to_string(),
        "credit_card" => {
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            match digits.len().checked_sub(4) {
                Some(start) => format!("XXXX-XXXX-XXXX-{}", &digits[start..]),
                None => "XXXX-XXXX-XXXX-XXXX".to_string(),
            }
        }
        "phone" => "XXX-XXX-XXXX".to_string(),
        "email" => match text.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        },
        // Keyword hits are not secrets themselves.
        _ if rule_is_keyword(rule) => text.to_lowercase(),
        _ => "***".to_string(),
    }
}

fn rule_is_keyword(rule: &str) -> bool {
    !matches!(
        rule,
        "ssn" | "credit_card" | "date_of_birth" | "email" | "phone" | "ip_address"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// PatternClassifier
// ─────────────────────────────────────────────────────────────────────────────

struct CompiledRule {
    rule: ClassificationRule,
    regex: Regex,
}

/// Regex-based classifier.
///
/// The level is the highest level with any matching rule. Confidence starts
/// at 0.7 and grows with each distinct rule matched at that level, capped at
/// 0.95. No match at all is `public` at 0.7.
pub struct PatternClassifier {
    rules: Vec<CompiledRule>,
}

impl PatternClassifier {
    /// Create a new classifier with the given rules.
    pub fn new(rules: &[ClassificationRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    regex: Regex::new(&rule.pattern)?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Create a classifier with [`default_rules`].
    pub fn with_default_rules() -> Result<Self, regex::Error> {
        Self::new(&default_rules())
    }

    /// Classify synchronously.
    pub fn classify_text(&self, text: &str) -> ClassificationResult {
        let mut hits: Vec<(&ClassificationRule, DetectedPattern)> = Vec::new();

        for CompiledRule { rule, regex } in &self.rules {
            let matches: Vec<&str> = regex.find_iter(text).map(|m| m.as_str()).collect();
            if matches.is_empty() {
                continue;
            }
            let mut examples: Vec<String> = Vec::new();
            for m in &matches {
                let masked = mask(&rule.name, m);
                if !examples.contains(&masked) && examples.len() < MAX_EXAMPLES {
                    examples.push(masked);
                }
            }
            hits.push((
                rule,
                DetectedPattern {
                    pattern_type: rule.name.clone(),
                    count: matches.len(),
                    severity: rule.severity,
                    examples,
                },
            ));
        }

        let Some(level) = hits.iter().map(|(rule, _)| rule.level).max() else {
            return ClassificationResult {
                level: SensitivityLevel::Public,
                confidence: BASE_CONFIDENCE,
                detected_patterns: Vec::new(),
                explanation: "No sensitive patterns detected".to_string(),
            };
        };

        let boost: f64 = hits
            .iter()
            .filter(|(rule, _)| rule.level == level)
            .map(|(rule, _)| rule.weight)
            .sum();
        let confidence = (BASE_CONFIDENCE + boost).min(MAX_CONFIDENCE);

        // Strongest evidence first.
        hits.sort_by(|(a, _), (b, _)| {
            b.level
                .cmp(&a.level)
                .then(b.severity.cmp(&a.severity))
                .then(a.name.cmp(&b.name))
        });

        let leading: Vec<&str> = hits
            .iter()
            .filter(|(rule, _)| rule.level == level)
            .take(2)
            .map(|(rule, _)| rule.description.as_str())
            .collect();
        let explanation = format!("Detected {}; classified {}", leading.join(" and "), level);

        debug!(%level, confidence, rules = hits.len(), "text classified");

        ClassificationResult {
            level,
            confidence,
            detected_patterns: hits.into_iter().map(|(_, p)| p).collect(),
            explanation,
        }
    }
}

#[async_trait]
impl Classifier for PatternClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierUnavailable> {
        Ok(self.classify_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternClassifier {
        PatternClassifier::with_default_rules().unwrap()
    }

    #[test]
    fn test_ssn_is_highly_sensitive() {
        let result = classifier().classify_text("SSN: 123-45-6789");
        assert_eq!(result.level, SensitivityLevel::HighlySensitive);
        assert!(result.confidence > 0.8, "confidence {}", result.confidence);

        let ssn = result
            .detected_patterns
            .iter()
            .find(|p| p.pattern_type == "ssn")
            .unwrap();
        assert_eq!(ssn.severity, Severity::High);
        assert_eq!(ssn.examples, vec!["XXX-XX-XXXX".to_string()]);
        assert!(!result.explanation.is_empty());
    }

    #[test]
    fn test_plain_text_is_public() {
        let result = classifier().classify_text("The weather is nice today.");
        assert_eq!(result.level, SensitivityLevel::Public);
        assert_eq!(result.confidence, 0.7);
        assert!(result.detected_patterns.is_empty());
    }

    #[test]
    fn test_keyword_levels() {
        let c = classifier();
        assert_eq!(
            c.classify_text("Draft memo for the team").level,
            SensitivityLevel::Internal
        );
        assert_eq!(
            c.classify_text("Q3 revenue and budget forecast").level,
            SensitivityLevel::Confidential
        );
    }

    #[test]
    fn test_highest_level_wins() {
        let result = classifier().classify_text("Internal memo: the admin password is hunter2");
        assert_eq!(result.level, SensitivityLevel::HighlySensitive);
        // Lower-level hits are still reported.
        assert!(result
            .detected_patterns
            .iter()
            .any(|p| p.pattern_type == "internal_comms"));
        assert_eq!(result.detected_patterns[0].pattern_type, "credentials");
    }

    #[test]
    fn test_confidence_is_capped() {
        let text = "password api_key ssn passport diagnosis cvv 123-45-6789 \
                    4111 1111 1111 1111 01/02/1990";
        let result = classifier().classify_text(text);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_masking_never_leaks_values() {
        let result =
            classifier().classify_text("card 4111-1111-1111-1234, mail alice@example.com");
        let examples: Vec<&String> = result
            .detected_patterns
            .iter()
            .flat_map(|p| &p.examples)
            .collect();
        assert!(examples.iter().any(|e| *e == "XXXX-XXXX-XXXX-1234"));
        assert!(examples.iter().any(|e| *e == "a***@example.com"));
        assert!(!examples.iter().any(|e| e.contains("4111")));
    }

    #[test]
    fn test_bad_rule_rejected() {
        let rule = ClassificationRule::new(
            "broken",
            "(unclosed",
            SensitivityLevel::Internal,
            Severity::Low,
            0.05,
            "Broken",
        );
        assert!(PatternClassifier::new(&[rule]).is_err());
    }
}

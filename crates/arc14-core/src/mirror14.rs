//! Mirror-14: a fixed, additive rule set that scores ARC cycle text.

use serde::Serialize;

const BASE_SCORE: i32 = 5;
const DETAILED_ACTION_CHARS: usize = 50;
const SHORT_TEXT_CHARS: usize = 30;

const REFLECTION_KEYWORDS: &[&str] = &["learned", "realized", "discovered", "understood", "insight"];
const ACTION_KEYWORDS: &[&str] = &["will", "plan", "next", "improve", "change", "implement"];
const NEGATIVE_KEYWORDS: &[&str] = &["failed", "impossible", "can't", "unable", "never"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Completeness,
    DetailQuality,
    ReflectiveKeywords,
    ActionOriented,
    LanguagePatterns,
}

impl Rule {
    pub fn all() -> &'static [Rule] {
        &[
            Self::Completeness,
            Self::DetailQuality,
            Self::ReflectiveKeywords,
            Self::ActionOriented,
            Self::LanguagePatterns,
        ]
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Completeness => 1,
            Self::DetailQuality => 2,
            Self::ReflectiveKeywords => 3,
            Self::ActionOriented => 4,
            Self::LanguagePatterns => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Completeness => "Completeness",
            Self::DetailQuality => "Detail Quality",
            Self::ReflectiveKeywords => "Reflective Keywords",
            Self::ActionOriented => "Action-Oriented",
            Self::LanguagePatterns => "Language Patterns",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Completeness => "Rewards complete ARC cycles with all three components",
            Self::DetailQuality => "Evaluates the depth and detail in action descriptions",
            Self::ReflectiveKeywords => "Detects meaningful reflection indicators",
            Self::ActionOriented => "Identifies forward-looking, actionable corrections",
            Self::LanguagePatterns => "Analyzes language for growth-oriented mindset",
        }
    }

    pub fn weight(&self) -> i32 {
        match self {
            Self::Completeness => 2,
            Self::LanguagePatterns => -1,
            _ => 1,
        }
    }

    /// Text reported when the rule fires.
    pub fn matched_label(&self) -> &'static str {
        match self {
            Self::Completeness => "Complete ARC cycle",
            Self::DetailQuality => "Detailed action description",
            Self::ReflectiveKeywords => "Meaningful reflection detected",
            Self::ActionOriented => "Action-oriented correction",
            Self::LanguagePatterns => "Negative language detected - consider reframing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub score: u8,
    pub insight: &'static str,
    pub matched_rules: Vec<&'static str>,
    pub recommendations: Vec<&'static str>,
    #[serde(skip)]
    pub fired: Vec<Rule>,
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

fn fired_rules(action: &str, reflection: &str, correction: &str) -> Vec<Rule> {
    let mut fired = Vec::new();
    if !action.is_empty() && !reflection.is_empty() && !correction.is_empty() {
        fired.push(Rule::Completeness);
    }
    if action.chars().count() > DETAILED_ACTION_CHARS {
        fired.push(Rule::DetailQuality);
    }
    if contains_any(reflection, REFLECTION_KEYWORDS) {
        fired.push(Rule::ReflectiveKeywords);
    }
    if contains_any(correction, ACTION_KEYWORDS) {
        fired.push(Rule::ActionOriented);
    }
    if contains_any(reflection, NEGATIVE_KEYWORDS) {
        fired.push(Rule::LanguagePatterns);
    }
    fired
}

pub fn score(fired: &[Rule]) -> u8 {
    let raw = BASE_SCORE + fired.iter().map(Rule::weight).sum::<i32>();
    raw.clamp(1, 10) as u8
}

pub fn insight(score: u8) -> &'static str {
    match score {
        8.. => {
            "Your ARC cycle demonstrates strong self-awareness and actionable planning. You're on track for meaningful growth."
        }
        6..=7 => {
            "Good progress on your ARC cycle. Focus on making your reflections and corrections more specific to maximize learning."
        }
        4..=5 => {
            "Your ARC cycle has a solid foundation. Consider adding more depth to your reflection and correction phases."
        }
        _ => {
            "This ARC cycle needs more development. Take time to reflect deeply and plan specific corrective actions."
        }
    }
}

fn recommendations(
    score: u8,
    fired: &[Rule],
    reflection: &str,
    correction: &str,
) -> Vec<&'static str> {
    let mut out = Vec::new();
    if score < 5 {
        out.push("Consider providing more detail in your ARC cycle");
    }
    if reflection.chars().count() < SHORT_TEXT_CHARS {
        out.push("Expand your reflection with deeper insights");
    }
    if correction.chars().count() < SHORT_TEXT_CHARS {
        out.push("Be more specific about your corrections and improvements");
    }
    if fired.contains(&Rule::LanguagePatterns) {
        out.push("Try to reframe challenges as opportunities for growth");
    }
    if score >= 8 {
        out.push("Excellent ARC cycle! Consider implementing these learnings");
    }
    if !fired.contains(&Rule::ActionOriented) {
        out.push("Make your correction more actionable with specific steps");
    }
    out
}

/// Scores an ARC cycle's three parts. Empty strings stand for missing parts.
pub fn evaluate(action: &str, reflection: &str, correction: &str) -> Evaluation {
    let fired = fired_rules(action, reflection, correction);
    let score = score(&fired);
    Evaluation {
        score,
        insight: insight(score),
        matched_rules: fired.iter().map(Rule::matched_label).collect(),
        recommendations: recommendations(score, &fired, reflection, correction),
        fired,
    }
}

#[cfg(test)]
mod tests {
    use super::{Rule, evaluate, score};

    #[test]
    fn complete_reflective_cycle_beats_bare_action() {
        let full = evaluate(
            "Shipped the release",
            "I learned that smaller batches are easier",
            "I will split the next release",
        );
        let bare = evaluate("Shipped the release", "", "");
        assert!(full.score > bare.score);
        assert_eq!(full.score, 9);
        assert_eq!(bare.score, 5);
        assert!(full.matched_rules.contains(&"Complete ARC cycle"));
    }

    #[test]
    fn negative_language_costs_a_point() {
        let eval = evaluate("Ran", "I failed and it felt impossible", "");
        assert_eq!(eval.score, 4);
        assert!(eval.fired.contains(&Rule::LanguagePatterns));
        assert!(
            eval.recommendations
                .contains(&"Try to reframe challenges as opportunities for growth")
        );
        assert!(
            eval.recommendations
                .contains(&"Consider providing more detail in your ARC cycle")
        );
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(score(&[Rule::LanguagePatterns; 10]), 1);
        assert_eq!(score(&[Rule::Completeness; 10]), 10);
    }

    #[test]
    fn keyword_matching_ignores_case() {
        let eval = evaluate("a", "We DISCOVERED a gap", "PLAN a fix");
        assert!(eval.fired.contains(&Rule::ReflectiveKeywords));
        assert!(eval.fired.contains(&Rule::ActionOriented));
        assert!(
            !eval
                .recommendations
                .contains(&"Make your correction more actionable with specific steps")
        );
    }

    #[test]
    fn insight_bands() {
        assert!(super::insight(9).starts_with("Your ARC cycle demonstrates"));
        assert!(super::insight(6).starts_with("Good progress"));
        assert!(super::insight(4).starts_with("Your ARC cycle has a solid foundation"));
        assert!(super::insight(3).starts_with("This ARC cycle needs more"));
    }
}

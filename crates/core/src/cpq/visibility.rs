//! `visibleWhen` predicates attached to wizard parameters.
//!
//! Grammar: `<field> == <literal>` or `<field> != <literal>`, where the literal
//! may be wrapped in single or double quotes. Anything else cannot be parsed
//! and the parameter stays visible.

use serde::{Deserialize, Serialize};

use crate::domain::selection::Selections;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Equals,
    NotEquals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPredicate {
    pub field: String,
    pub comparison: Comparison,
    pub literal: String,
}

impl VisibilityPredicate {
    pub fn parse(expression: &str) -> Option<Self> {
        let expression = expression.trim();
        let (operator_at, comparison) = match (expression.find("=="), expression.find("!=")) {
            (Some(eq), Some(ne)) if ne < eq => (ne, Comparison::NotEquals),
            (Some(eq), _) => (eq, Comparison::Equals),
            (None, Some(ne)) => (ne, Comparison::NotEquals),
            (None, None) => return None,
        };

        let field = expression[..operator_at].trim();
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        let raw_literal = expression[operator_at + 2..].trim();
        let literal = raw_literal
            .strip_prefix(['\'', '"'])
            .unwrap_or(raw_literal);
        let literal = literal.strip_suffix(['\'', '"']).unwrap_or(literal).trim();
        if literal.is_empty() || literal.contains(['\'', '"']) {
            return None;
        }

        Some(Self { field: field.to_owned(), comparison, literal: literal.to_owned() })
    }

    /// Missing and null selections compare as the empty string.
    pub fn evaluate(&self, selections: &Selections) -> bool {
        let current = selections
            .get(&self.field)
            .and_then(|value| value.display_text())
            .unwrap_or_default();
        match self.comparison {
            Comparison::Equals => current == self.literal,
            Comparison::NotEquals => current != self.literal,
        }
    }
}

pub fn is_visible(visible_when: Option<&str>, selections: &Selections) -> bool {
    match visible_when.and_then(VisibilityPredicate::parse) {
        Some(predicate) => predicate.evaluate(selections),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{is_visible, Comparison, VisibilityPredicate};
    use crate::domain::selection::Selections;

    fn selections(value: serde_json::Value) -> Selections {
        serde_json::from_value(value).expect("selections fixture")
    }

    #[test]
    fn parses_equality_and_inequality() {
        assert_eq!(
            VisibilityPredicate::parse("driveType == 'motor'"),
            Some(VisibilityPredicate {
                field: "driveType".to_owned(),
                comparison: Comparison::Equals,
                literal: "motor".to_owned(),
            })
        );
        let predicate = VisibilityPredicate::parse("material!=\"PVC\"").expect("inequality parses");
        assert_eq!(predicate.comparison, Comparison::NotEquals);
        assert_eq!(predicate.literal, "PVC");
    }

    #[test]
    fn unparseable_expressions_leave_parameter_visible() {
        let current = selections(json!({"driveType": "manual"}));
        assert!(VisibilityPredicate::parse("driveType > 2").is_none());
        assert!(VisibilityPredicate::parse("drive type == 'motor'").is_none());
        assert!(is_visible(Some("driveType in ('motor')"), &current));
        assert!(is_visible(None, &current));
    }

    #[test]
    fn evaluates_against_current_selections() {
        let manual = selections(json!({"driveType": "manual"}));
        let motor = selections(json!({"driveType": "motor", "widthMm": 1200}));

        assert!(!is_visible(Some("driveType == 'motor'"), &manual));
        assert!(is_visible(Some("driveType == 'motor'"), &motor));
        assert!(is_visible(Some("widthMm == 1200"), &motor));
        assert!(is_visible(Some("motorType != 'SOMFY-10'"), &manual), "missing compares as empty");
    }
}

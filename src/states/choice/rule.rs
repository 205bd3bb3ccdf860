//! Choice rule conditions.
//!
//! Conditions are parsed once at load time. Evaluation never fails: a
//! missing variable or a value of the wrong type makes a comparison false.

use crate::core::ReferencePath;
use crate::definition::DefinitionError;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Value family a comparison operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    Numeric,
    Boolean,
    Timestamp,
}

/// Ordering relation a comparison tests for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Equals,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
}

impl Relation {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Equals => ordering == Ordering::Equal,
            Self::LessThan => ordering == Ordering::Less,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::LessThanEquals => ordering != Ordering::Greater,
            Self::GreaterThanEquals => ordering != Ordering::Less,
        }
    }
}

/// A comparison or type test applied to the rule's `Variable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Compare(Kind, Relation),
    StringMatches,
    IsPresent,
    IsNull,
    IsString,
    IsNumeric,
    IsBoolean,
    IsTimestamp,
}

impl Operator {
    /// Look up an operator by its definition key, without any `Path` suffix.
    pub fn from_name(name: &str) -> Option<Self> {
        use Kind::*;
        use Relation::*;

        let operator = match name {
            "StringEquals" => Self::Compare(String, Equals),
            "StringLessThan" => Self::Compare(String, LessThan),
            "StringGreaterThan" => Self::Compare(String, GreaterThan),
            "StringLessThanEquals" => Self::Compare(String, LessThanEquals),
            "StringGreaterThanEquals" => Self::Compare(String, GreaterThanEquals),
            "StringMatches" => Self::StringMatches,
            "NumericEquals" => Self::Compare(Numeric, Equals),
            "NumericLessThan" => Self::Compare(Numeric, LessThan),
            "NumericGreaterThan" => Self::Compare(Numeric, GreaterThan),
            "NumericLessThanEquals" => Self::Compare(Numeric, LessThanEquals),
            "NumericGreaterThanEquals" => Self::Compare(Numeric, GreaterThanEquals),
            "BooleanEquals" => Self::Compare(Boolean, Equals),
            "TimestampEquals" => Self::Compare(Timestamp, Equals),
            "TimestampLessThan" => Self::Compare(Timestamp, LessThan),
            "TimestampGreaterThan" => Self::Compare(Timestamp, GreaterThan),
            "TimestampLessThanEquals" => Self::Compare(Timestamp, LessThanEquals),
            "TimestampGreaterThanEquals" => Self::Compare(Timestamp, GreaterThanEquals),
            "IsPresent" => Self::IsPresent,
            "IsNull" => Self::IsNull,
            "IsString" => Self::IsString,
            "IsNumeric" => Self::IsNumeric,
            "IsBoolean" => Self::IsBoolean,
            "IsTimestamp" => Self::IsTimestamp,
            _ => return None,
        };
        Some(operator)
    }

    /// Whether `literal` is an acceptable right-hand side.
    fn accepts(self, literal: &Value) -> bool {
        match self {
            Self::Compare(Kind::String, _) | Self::StringMatches => literal.is_string(),
            Self::Compare(Kind::Numeric, _) => literal.is_number(),
            Self::Compare(Kind::Boolean, _) => literal.is_boolean(),
            Self::Compare(Kind::Timestamp, _) => literal.as_str().and_then(timestamp).is_some(),
            _ => literal.is_boolean(),
        }
    }

    /// Whether a `<Operator>Path` form exists.
    fn has_path_form(self) -> bool {
        matches!(self, Self::Compare(..))
    }

    fn evaluate(self, actual: Option<&Value>, expected: &Value) -> bool {
        match self {
            Self::IsPresent => expected.as_bool() == Some(actual.is_some()),
            Self::Compare(kind, relation) => actual
                .and_then(|actual| order(kind, actual, expected))
                .is_some_and(|ordering| relation.holds(ordering)),
            Self::StringMatches => match (actual.and_then(Value::as_str), expected.as_str()) {
                (Some(actual), Some(pattern)) => wildcard_match(pattern, actual),
                _ => false,
            },
            test => {
                let Some(actual) = actual else {
                    return false;
                };
                let observed = match test {
                    Self::IsNull => actual.is_null(),
                    Self::IsString => actual.is_string(),
                    Self::IsNumeric => actual.is_number(),
                    Self::IsBoolean => actual.is_boolean(),
                    _ => actual.as_str().and_then(timestamp).is_some(),
                };
                expected.as_bool() == Some(observed)
            }
        }
    }
}

fn timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

fn order(kind: Kind, left: &Value, right: &Value) -> Option<Ordering> {
    match kind {
        Kind::String => Some(left.as_str()?.cmp(right.as_str()?)),
        Kind::Numeric => numeric_order(left, right),
        Kind::Boolean => Some(left.as_bool()?.cmp(&right.as_bool()?)),
        Kind::Timestamp => Some(timestamp(left.as_str()?)?.cmp(&timestamp(right.as_str()?)?)),
    }
}

/// Integers compare exactly; anything else falls back to `f64`.
fn numeric_order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return Some(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (left.as_u64(), right.as_u64()) {
        return Some(l.cmp(&r));
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

/// Match `text` against a pattern where `*` matches any run of characters
/// and `\*` a literal asterisk.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    #[derive(PartialEq)]
    enum Token {
        Char(char),
        Any,
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => tokens.push(Token::Char(escaped)),
                None => tokens.push(Token::Char('\\')),
            },
            '*' => tokens.push(Token::Any),
            other => tokens.push(Token::Char(other)),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Char(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == Token::Any)
}

/// Right-hand side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Literal(Value),
    Path(ReferencePath),
}

/// A boolean expression over the input.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Test {
        variable: ReferencePath,
        operator: Operator,
        operand: Operand,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub(crate) fn parse(state: &str, raw: &Value) -> Result<Self, DefinitionError> {
        let rule = raw
            .as_object()
            .ok_or_else(|| DefinitionError::invalid(state, "choice rule must be an object"))?;

        if let Some(operands) = rule.get("And") {
            return Ok(Self::And(Self::parse_all(state, "And", operands)?));
        }
        if let Some(operands) = rule.get("Or") {
            return Ok(Self::Or(Self::parse_all(state, "Or", operands)?));
        }
        if let Some(operand) = rule.get("Not") {
            return Ok(Self::Not(Box::new(Self::parse_nested(state, operand)?)));
        }

        Self::parse_test(state, rule)
    }

    fn parse_nested(state: &str, raw: &Value) -> Result<Self, DefinitionError> {
        if raw.get("Next").is_some() {
            return Err(DefinitionError::invalid(
                state,
                "Next is only allowed on top-level choice rules",
            ));
        }
        Self::parse(state, raw)
    }

    fn parse_all(state: &str, key: &str, raw: &Value) -> Result<Vec<Self>, DefinitionError> {
        match raw.as_array() {
            Some(operands) if !operands.is_empty() => operands
                .iter()
                .map(|operand| Self::parse_nested(state, operand))
                .collect(),
            _ => Err(DefinitionError::invalid(
                state,
                format!("{key} must be a non-empty array of rules"),
            )),
        }
    }

    fn parse_test(state: &str, rule: &Map<String, Value>) -> Result<Self, DefinitionError> {
        let variable = match rule.get("Variable") {
            Some(Value::String(path)) => ReferencePath::parse(path)
                .map_err(|e| DefinitionError::invalid(state, format!("Variable: {e}")))?,
            _ => {
                return Err(DefinitionError::invalid(
                    state,
                    "choice rule needs a string Variable or And/Or/Not",
                ))
            }
        };

        let mut operators = rule
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "Variable" | "Next" | "Comment"));
        let (key, value) = match (operators.next(), operators.next()) {
            (Some(found), None) => found,
            (None, _) => {
                return Err(DefinitionError::invalid(
                    state,
                    "choice rule has no comparison operator",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(DefinitionError::invalid(
                    state,
                    "choice rule has more than one comparison operator",
                ))
            }
        };

        let (operator, operand) = match Operator::from_name(key) {
            Some(operator) if operator.accepts(value) => (operator, Operand::Literal(value.clone())),
            Some(_) => {
                return Err(DefinitionError::invalid(
                    state,
                    format!("{key} has an operand of the wrong type"),
                ))
            }
            None => {
                let operator = key
                    .strip_suffix("Path")
                    .and_then(Operator::from_name)
                    .filter(|operator| operator.has_path_form())
                    .ok_or_else(|| {
                        DefinitionError::invalid(state, format!("unknown comparison operator {key}"))
                    })?;
                let path = value
                    .as_str()
                    .ok_or_else(|| DefinitionError::invalid(state, format!("{key} must be a path")))
                    .and_then(|path| {
                        ReferencePath::parse(path)
                            .map_err(|e| DefinitionError::invalid(state, format!("{key}: {e}")))
                    })?;
                (operator, Operand::Path(path))
            }
        };

        Ok(Self::Test {
            variable,
            operator,
            operand,
        })
    }

    /// Evaluate against the state's effective input.
    pub fn evaluate(&self, input: &Value) -> bool {
        match self {
            Self::And(conditions) => conditions.iter().all(|c| c.evaluate(input)),
            Self::Or(conditions) => conditions.iter().any(|c| c.evaluate(input)),
            Self::Not(condition) => !condition.evaluate(input),
            Self::Test {
                variable,
                operator,
                operand,
            } => {
                let expected = match operand {
                    Operand::Literal(literal) => literal,
                    Operand::Path(path) => match path.select(input) {
                        Some(value) => value,
                        None => return false,
                    },
                };
                operator.evaluate(variable.select(input), expected)
            }
        }
    }
}

/// A top-level rule: a condition and the state it selects.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceRule {
    pub condition: Condition,
    pub next: String,
}

impl ChoiceRule {
    pub(crate) fn parse(state: &str, raw: &Value) -> Result<Self, DefinitionError> {
        let next = match raw.get("Next") {
            Some(Value::String(next)) => next.clone(),
            _ => {
                return Err(DefinitionError::invalid(
                    state,
                    "each choice rule needs a string Next",
                ))
            }
        };
        Ok(Self {
            condition: Condition::parse(state, raw)?,
            next,
        })
    }
}

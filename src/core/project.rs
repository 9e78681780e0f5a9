//! Maps invocation results onto declared output fields.
//!
//! A single output field receives the whole result. With several output fields
//! each one is looked up in the result: through its binding [`Expression`] when
//! one is registered, by key when the result is a JSON object, and otherwise the
//! field is not readable and becomes `null`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::FieldValue;
use crate::error::{Result, WireError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Property(String),
    Index(usize),
    Key(String),
}

/// A path expression evaluated against an invocation result.
///
/// Grammar: `#root`, `#this`, or a property name followed by any number of
/// `.name`, `[n]` and `['key']` steps. A leading subscript is allowed too,
/// e.g. `[0].id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    steps: Vec<Step>,
}

impl Expression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates against `root`. `Ok(None)` means a property along the path
    /// was not readable.
    pub fn evaluate(&self, root: &FieldValue) -> Result<Option<FieldValue>> {
        let mut current = root;
        for step in &self.steps {
            let next = match (step, current) {
                (Step::Property(name) | Step::Key(name), FieldValue::Object(map)) => map.get(name),
                (Step::Property(_) | Step::Key(_), _) => None,
                (Step::Index(i), FieldValue::Array(items)) => match items.get(*i) {
                    Some(item) => Some(item),
                    None => {
                        return Err(WireError::Projection(format!(
                            "index {} out of bounds for length {} in '{}'",
                            i,
                            items.len(),
                            self.source
                        )));
                    }
                },
                (Step::Index(_), FieldValue::Null) => None,
                (Step::Index(i), other) => {
                    return Err(WireError::Projection(format!(
                        "cannot index {} with [{}] in '{}'",
                        kind_of(other),
                        i,
                        self.source
                    )));
                }
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }
}

fn kind_of(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Bool(_) => "boolean",
        FieldValue::Number(_) => "number",
        FieldValue::String(_) => "string",
        FieldValue::Array(_) => "array",
        FieldValue::Object(_) => "object",
    }
}

impl FromStr for Expression {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| WireError::Projection(format!("invalid expression '{}': {}", s, reason));

        let text = s.trim();
        if text == "#root" || text == "#this" {
            return Ok(Expression {
                source: s.to_string(),
                steps: Vec::new(),
            });
        }
        if text.is_empty() {
            return Err(invalid("empty"));
        }

        let chars: Vec<char> = text.chars().collect();
        let mut steps = Vec::new();
        let mut i = 0;
        let mut expect_name = chars[0] != '[';

        while i < chars.len() {
            if expect_name {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                if start == i {
                    return Err(invalid("expected property name"));
                }
                steps.push(Step::Property(chars[start..i].iter().collect()));
                expect_name = false;
                continue;
            }

            match chars[i] {
                '.' => {
                    i += 1;
                    expect_name = true;
                    if i == chars.len() {
                        return Err(invalid("trailing '.'"));
                    }
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid("unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();
                    let quoted = inner.len() >= 2
                        && ((inner.starts_with('\'') && inner.ends_with('\''))
                            || (inner.starts_with('"') && inner.ends_with('"')));
                    if quoted {
                        steps.push(Step::Key(inner[1..inner.len() - 1].to_string()));
                    } else {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| invalid("subscript must be an index or a quoted key"))?;
                        steps.push(Step::Index(index));
                    }
                    i = close + 1;
                }
                c => return Err(invalid(&format!("unexpected '{}'", c))),
            }
        }

        Ok(Expression {
            source: s.to_string(),
            steps,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expands a collection result into its elements. `null` yields nothing and
/// any other value yields itself.
pub fn scatter(value: FieldValue) -> Vec<FieldValue> {
    match value {
        FieldValue::Null => Vec::new(),
        FieldValue::Array(items) => items,
        other => vec![other],
    }
}

/// Projects results onto an ordered list of output fields.
#[derive(Debug, Clone, Default)]
pub struct FieldProjector {
    fields: Vec<String>,
    bindings: HashMap<String, Expression>,
}

impl FieldProjector {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            bindings: HashMap::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Registers a binding expression for one output field.
    pub fn bind(&mut self, field: &str, expression: &str) -> Result<()> {
        if !self.fields.iter().any(|f| f == field) {
            return Err(WireError::Config(format!(
                "binding for '{}' which is not an output field",
                field
            )));
        }
        if self.fields.len() == 1 {
            log::warn!(
                "Binding '{}' for '{}' is unused: a single output field receives the whole result",
                expression,
                field
            );
        }
        self.bindings.insert(field.to_string(), expression.parse()?);
        Ok(())
    }

    pub fn binding(&self, field: &str) -> Option<&Expression> {
        self.bindings.get(field)
    }

    /// Maps `value` onto the output fields, in declaration order.
    pub fn project(&self, value: &FieldValue) -> Result<Vec<FieldValue>> {
        if self.fields.len() == 1 {
            return Ok(vec![value.clone()]);
        }

        self.fields
            .iter()
            .map(|field| {
                Ok(self.read(field, value)?.unwrap_or_else(|| {
                    log::debug!("Property '{}' not readable on {}", field, kind_of(value));
                    FieldValue::Null
                }))
            })
            .collect()
    }

    /// Reads one field out of `value`. `Ok(None)` means not readable.
    fn read(&self, field: &str, value: &FieldValue) -> Result<Option<FieldValue>> {
        match (self.bindings.get(field), value) {
            (Some(expression), _) => expression.evaluate(value),
            (None, FieldValue::Object(map)) => Ok(map.get(field).cloned()),
            (None, _) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_field_takes_whole_value() {
        let projector = FieldProjector::new(["out"]);
        let value = json!({"out": 1, "other": 2});
        assert_eq!(projector.project(&value).unwrap(), vec![value.clone()]);
    }

    #[test]
    fn test_map_lookup() {
        let projector = FieldProjector::new(["x", "y"]);
        let out = projector.project(&json!({"y": "b", "x": "a", "z": "c"})).unwrap();
        assert_eq!(out, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_unreadable_properties_are_null() {
        let projector = FieldProjector::new(["x", "y", "z"]);
        assert_eq!(projector.project(&FieldValue::Null).unwrap(), vec![FieldValue::Null; 3]);
        assert_eq!(projector.project(&json!("text")).unwrap(), vec![FieldValue::Null; 3]);
        assert_eq!(
            projector.project(&json!({"x": 1})).unwrap(),
            vec![json!(1), FieldValue::Null, FieldValue::Null]
        );
    }

    #[test]
    fn test_missing_key_is_not_readable() {
        let projector = FieldProjector::new(["x", "y"]);
        let value = json!({"x": null});
        assert_eq!(projector.read("x", &value).unwrap(), Some(FieldValue::Null));
        assert_eq!(projector.read("y", &value).unwrap(), None);
        assert_eq!(projector.read("x", &json!([1])).unwrap(), None);
    }

    #[test]
    fn test_binding_expressions() {
        let mut projector = FieldProjector::new(["id", "first", "label"]);
        projector.bind("id", "meta.id").unwrap();
        projector.bind("first", "items[0]").unwrap();
        projector.bind("label", "meta['display name']").unwrap();

        let value = json!({
            "meta": {"id": 7, "display name": "seven"},
            "items": ["a", "b"]
        });
        assert_eq!(
            projector.project(&value).unwrap(),
            vec![json!(7), json!("a"), json!("seven")]
        );
    }

    #[test]
    fn test_binding_to_unknown_field() {
        let mut projector = FieldProjector::new(["a", "b"]);
        assert!(matches!(projector.bind("c", "x"), Err(WireError::Config(_))));
    }

    #[test]
    fn test_expression_root() {
        let expr: Expression = "#root".parse().unwrap();
        assert_eq!(expr.evaluate(&json!([1, 2])).unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn test_expression_leading_subscript() {
        let expr: Expression = "[1].name".parse().unwrap();
        let value = json!([{"name": "a"}, {"name": "b"}]);
        assert_eq!(expr.evaluate(&value).unwrap(), Some(json!("b")));
    }

    #[test]
    fn test_expression_unreadable_path() {
        let expr: Expression = "a.b.c".parse().unwrap();
        assert_eq!(expr.evaluate(&json!({"a": null})).unwrap(), None);
        assert_eq!(expr.evaluate(&json!({"a": {"b": 3}})).unwrap(), None);
    }

    #[test]
    fn test_expression_evaluation_failures() {
        let out_of_bounds: Expression = "items[5]".parse().unwrap();
        assert!(matches!(
            out_of_bounds.evaluate(&json!({"items": [1]})),
            Err(WireError::Projection(_))
        ));

        let scalar_index: Expression = "count[0]".parse().unwrap();
        assert!(matches!(
            scalar_index.evaluate(&json!({"count": 3})),
            Err(WireError::Projection(_))
        ));
    }

    #[test]
    fn test_projection_failure_propagates() {
        let mut projector = FieldProjector::new(["a", "b"]);
        projector.bind("b", "list[3]").unwrap();
        assert!(projector.project(&json!({"a": 1, "list": []})).is_err());
    }

    #[test]
    fn test_malformed_expressions() {
        for text in ["", "a.", "a..b", "a[", "a[x]", "a b", ".a"] {
            assert!(text.parse::<Expression>().is_err(), "{:?} should not parse", text);
        }
    }

    #[test]
    fn test_scatter() {
        assert!(scatter(FieldValue::Null).is_empty());
        assert_eq!(scatter(json!(["a", "b"])), vec![json!("a"), json!("b")]);
        assert_eq!(scatter(json!("ping")), vec![json!("ping")]);
        assert_eq!(scatter(json!({"k": 1})), vec![json!({"k": 1})]);
    }
}

//! Record, lookup and predicate definitions.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use strum_macros::EnumString;

/// Field name to value mapping written to or read from a table.
///
/// Key order is preserved, so generated column lists follow the order the
/// caller supplied.
pub type Payload = Map<String, Value>;

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key; `None` for projections such as distinct-value rows.
    pub id: Option<i64>,
    pub fields: Payload,
}

impl Record {
    pub fn new(id: Option<i64>, fields: Payload) -> Self {
        Record { id, fields }
    }

    /// Overwrites this record's fields with `data`, keeping keys absent from
    /// `data` untouched.
    pub fn merge(&mut self, data: &Payload) {
        for (key, value) in data {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Comparison operators usable in a native lookup.
///
/// Parses case-insensitively from a name (`eq`, `like`, `is_null`) or a
/// symbol (`=`, `>=`, `<>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Operator {
    #[strum(serialize = "eq", serialize = "=", serialize = "==")]
    Eq,
    #[strum(serialize = "ne", serialize = "!=", serialize = "<>")]
    Ne,
    #[strum(serialize = "lt", serialize = "<")]
    Lt,
    #[strum(serialize = "le", serialize = "<=")]
    Le,
    #[strum(serialize = "gt", serialize = ">")]
    Gt,
    #[strum(serialize = "ge", serialize = ">=")]
    Ge,
    /// SQL `LIKE` with `%` and `_` wildcards.
    #[strum(serialize = "like")]
    Like,
    #[strum(serialize = "is_null", serialize = "isnull")]
    IsNull,
    #[strum(serialize = "not_null", serialize = "notnull")]
    NotNull,
}

impl Operator {
    /// SQL spelling, without operands.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::IsNull => "IS NULL",
            Operator::NotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes a right-hand operand.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::NotNull)
    }
}

/// `field <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Predicate {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluates the predicate against an in-memory field value.
    ///
    /// Follows SQL semantics for `NULL`: any comparison against a missing or
    /// null value is false.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let actual = actual.filter(|v| !v.is_null());
        match self.op {
            Operator::IsNull => actual.is_none(),
            Operator::NotNull => actual.is_some(),
            _ => {
                let Some(actual) = actual else {
                    return false;
                };
                if self.value.is_null() {
                    return false;
                }
                match self.op {
                    Operator::Like => match (actual.as_str(), self.value.as_str()) {
                        (Some(text), Some(pattern)) => like_matches(text, pattern),
                        _ => false,
                    },
                    op => match compare_values(actual, &self.value) {
                        Some(ord) => match op {
                            Operator::Eq => ord == Ordering::Equal,
                            Operator::Ne => ord != Ordering::Equal,
                            Operator::Lt => ord == Ordering::Less,
                            Operator::Le => ord != Ordering::Greater,
                            Operator::Gt => ord == Ordering::Greater,
                            Operator::Ge => ord != Ordering::Less,
                            _ => false,
                        },
                        None => op == Operator::Ne,
                    },
                }
            }
        }
    }
}

/// Orders two JSON scalars the way a database column would: numerically for
/// numbers, lexically for strings. Mixed or composite values only compare
/// for equality.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(y)) | (Value::String(y), Value::Number(x)) => {
            let parsed = y.trim().parse::<f64>().ok()?;
            let ord = x.as_f64()?.partial_cmp(&parsed)?;
            // Compare in (a, b) order.
            if matches!(a, Value::Number(_)) {
                Some(ord)
            } else {
                Some(ord.reverse())
            }
        }
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// How the update path finds the record to update.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Equality on every listed field; a `null` value means `IS NULL`.
    Fields(Payload),
    /// Native query: every predicate must hold.
    Predicates(Vec<Predicate>),
}

impl Lookup {
    pub fn is_empty(&self) -> bool {
        match self {
            Lookup::Fields(fields) => fields.is_empty(),
            Lookup::Predicates(predicates) => predicates.is_empty(),
        }
    }

    /// The lookup expressed as a conjunction of predicates.
    pub fn predicates(&self) -> Vec<Predicate> {
        match self {
            Lookup::Fields(fields) => fields
                .iter()
                .map(|(field, value)| {
                    if value.is_null() {
                        Predicate::new(field.clone(), Operator::IsNull, Value::Null)
                    } else {
                        Predicate::new(field.clone(), Operator::Eq, value.clone())
                    }
                })
                .collect(),
            Lookup::Predicates(predicates) => predicates.clone(),
        }
    }

    /// Whether every predicate holds for `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates().iter().all(|p| {
            if p.field == crate::config::PRIMARY_KEY_COLUMN {
                p.matches(record.id.map(Value::from).as_ref())
            } else {
                p.matches(record.get(&p.field))
            }
        })
    }
}

impl From<Payload> for Lookup {
    fn from(fields: Payload) -> Self {
        Lookup::Fields(fields)
    }
}

impl From<Vec<Predicate>> for Lookup {
    fn from(predicates: Vec<Predicate>) -> Self {
        Lookup::Predicates(predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let mut record = Record::new(
            Some(7),
            payload(json!({"title": "A", "url": "http://x", "rank": 3})),
        );
        record.merge(&payload(json!({"url": "http://y"})));
        assert_eq!(record.get("url"), Some(&json!("http://y")));
        assert_eq!(record.get("title"), Some(&json!("A")));
        assert_eq!(record.get("rank"), Some(&json!(3)));
    }

    #[test]
    fn test_field_lookup_matches() {
        let record = Record::new(Some(1), payload(json!({"title": "A", "note": null})));
        assert!(Lookup::Fields(payload(json!({"title": "A"}))).matches(&record));
        assert!(Lookup::Fields(payload(json!({"note": null}))).matches(&record));
        assert!(!Lookup::Fields(payload(json!({"title": "B"}))).matches(&record));
        assert!(Lookup::Fields(payload(json!({"id": 1}))).matches(&record));
    }

    #[test]
    fn test_predicate_comparisons() {
        let rank = json!(5);
        assert!(Predicate::new("rank", Operator::Gt, json!(3)).matches(Some(&rank)));
        assert!(Predicate::new("rank", Operator::Le, json!(5)).matches(Some(&rank)));
        assert!(!Predicate::new("rank", Operator::Lt, json!(5)).matches(Some(&rank)));
        assert!(Predicate::new("rank", Operator::Ne, json!(4)).matches(Some(&rank)));
        assert!(Predicate::new("rank", Operator::Eq, json!("5")).matches(Some(&rank)));
        assert!(!Predicate::new("rank", Operator::Eq, json!(5)).matches(None));
        assert!(Predicate::new("rank", Operator::IsNull, Value::Null).matches(None));
        assert!(Predicate::new("rank", Operator::NotNull, Value::Null).matches(Some(&rank)));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like_matches("http://x.com/a", "http://%"));
        assert!(like_matches("abc", "a_c"));
        assert!(like_matches("abc", "%"));
        assert!(like_matches("abcabc", "%bc"));
        assert!(!like_matches("abc", "a_"));
        assert!(!like_matches("abc", "b%"));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("eq".parse(), Ok(Operator::Eq));
        assert_eq!(">=".parse(), Ok(Operator::Ge));
        assert_eq!("LIKE".parse(), Ok(Operator::Like));
        assert_eq!("IsNull".parse(), Ok(Operator::IsNull));
        assert!("between".parse::<Operator>().is_err());
        assert!(!Operator::IsNull.takes_value());
    }

    #[test]
    fn test_lookup_predicates_from_fields() {
        let lookup = Lookup::Fields(payload(json!({"title": "A", "note": null})));
        let predicates = lookup.predicates();
        assert_eq!(predicates[0], Predicate::new("title", Operator::Eq, json!("A")));
        assert_eq!(predicates[1].op, Operator::IsNull);
        assert!(!lookup.is_empty());
        assert!(Lookup::Predicates(vec![]).is_empty());
    }
}

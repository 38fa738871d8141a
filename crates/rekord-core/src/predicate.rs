//! Compiled boolean predicates over record properties
//!
//! A [`Predicate`] is what every condition shape normalizes to before a
//! fetch. Free-form format strings stay as [`Predicate::Template`] until the
//! store binds them at execution time, so placeholder mistakes surface there
//! rather than during normalization.

use crate::parser;
use crate::{Error, Record, RecordLookup, Result, Value};
use serde::{Deserialize, Serialize};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    BeginsWith,
    EndsWith,
    Like,
    In,
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Dotted key path, followed through to-one relationships
    Key(String),
    /// Constant value
    Literal(Value),
}

/// A boolean condition over one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every record
    True,
    /// Matches no record
    False,
    /// Binary comparison
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
        /// `[c]` modifier: string comparisons ignore case
        case_insensitive: bool,
    },
    /// All must match
    And(Vec<Predicate>),
    /// At least one must match
    Or(Vec<Predicate>),
    /// Negation
    Not(Box<Predicate>),
    /// Unparsed format string with positional arguments
    Template { format: String, args: Vec<Value> },
}

/// Context for evaluating predicates
pub struct EvalContext<'a> {
    /// The record under test
    pub record: &'a Record,
    /// Resolves relationship targets for dotted key paths
    pub lookup: &'a dyn RecordLookup,
}

impl<'a> EvalContext<'a> {
    /// Create a new evaluation context
    pub fn new(record: &'a Record, lookup: &'a dyn RecordLookup) -> Self {
        Self { record, lookup }
    }

    /// Resolve a dotted key path to a value
    ///
    /// Each intermediate segment must hold a record reference (or a list of
    /// them, which fans out into a list of values). Anything unresolvable is
    /// null.
    pub fn resolve_key(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let first = match segments.next() {
            Some(s) => s,
            None => return Value::Null,
        };
        let mut current = self.record.get_or_null(first);
        for segment in segments {
            current = self.step(&current, segment);
        }
        current
    }

    fn step(&self, value: &Value, segment: &str) -> Value {
        match value {
            Value::Record(id) => self
                .lookup
                .lookup(*id)
                .map(|r| r.get_or_null(segment))
                .unwrap_or(Value::Null),
            Value::List(items) => Value::List(items.iter().map(|v| self.step(v, segment)).collect()),
            _ => Value::Null,
        }
    }
}

impl Predicate {
    /// Parse a format string, substituting positional arguments
    ///
    /// `%@` takes a value argument, `%K` takes a key path argument (which
    /// must be a string).
    pub fn parse(format: &str, args: &[Value]) -> Result<Predicate> {
        parser::parse(format, args)
    }

    /// Create an unbound template predicate
    pub fn template(format: impl Into<String>, args: Vec<Value>) -> Self {
        Predicate::Template {
            format: format.into(),
            args,
        }
    }

    /// `key == value`
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::compare(key, CompareOp::Eq, value)
    }

    /// `key <op> value`
    pub fn compare(key: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            left: Operand::Key(key.into()),
            op,
            right: Operand::Literal(value.into()),
            case_insensitive: false,
        }
    }

    /// Conjunction; an empty list matches everything
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    /// Disjunction; an empty list matches nothing
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }

    /// Negation
    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Check whether this predicate still contains unparsed templates
    pub fn is_bound(&self) -> bool {
        match self {
            Predicate::Template { .. } => false,
            Predicate::And(ps) | Predicate::Or(ps) => ps.iter().all(Predicate::is_bound),
            Predicate::Not(p) => p.is_bound(),
            _ => true,
        }
    }

    /// Parse every template inside this predicate
    pub fn bind(&self) -> Result<Predicate> {
        Ok(match self {
            Predicate::Template { format, args } => Predicate::parse(format, args)?,
            Predicate::And(ps) => Predicate::And(ps.iter().map(Predicate::bind).collect::<Result<_>>()?),
            Predicate::Or(ps) => Predicate::Or(ps.iter().map(Predicate::bind).collect::<Result<_>>()?),
            Predicate::Not(p) => Predicate::Not(Box::new(p.bind()?)),
            other => other.clone(),
        })
    }

    /// Evaluate this predicate against one record
    pub fn eval(&self, ctx: &EvalContext) -> Result<bool> {
        match self {
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
            Predicate::Compare {
                left,
                op,
                right,
                case_insensitive,
            } => {
                let l = operand_value(left, ctx);
                let r = operand_value(right, ctx);
                Ok(compare(&l, *op, &r, *case_insensitive))
            }
            Predicate::And(ps) => {
                for p in ps {
                    if !p.eval(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(ps) => {
                for p in ps {
                    if p.eval(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(p) => Ok(!p.eval(ctx)?),
            Predicate::Template { format, .. } => Err(Error::UnboundTemplate(format.clone())),
        }
    }
}

fn operand_value(operand: &Operand, ctx: &EvalContext) -> Value {
    match operand {
        Operand::Key(path) => ctx.resolve_key(path),
        Operand::Literal(v) => v.clone(),
    }
}

fn fold(s: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

fn equals(a: &Value, b: &Value, ci: bool) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) if ci => x.to_lowercase() == y.to_lowercase(),
        _ => a.loosely_equals(b),
    }
}

fn compare(l: &Value, op: CompareOp, r: &Value, ci: bool) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CompareOp::Eq => equals(l, r, ci),
        CompareOp::Ne => !equals(l, r, ci),
        CompareOp::Lt => l.compare(r) == Some(Less),
        CompareOp::Le => matches!(l.compare(r), Some(Less | Equal)),
        CompareOp::Gt => l.compare(r) == Some(Greater),
        CompareOp::Ge => matches!(l.compare(r), Some(Greater | Equal)),
        CompareOp::Contains => match (l, r) {
            (Value::String(x), Value::String(y)) => fold(x, ci).contains(&fold(y, ci)),
            (Value::List(items), needle) => items.iter().any(|v| equals(v, needle, ci)),
            _ => false,
        },
        CompareOp::BeginsWith => match (l, r) {
            (Value::String(x), Value::String(y)) => fold(x, ci).starts_with(&fold(y, ci)),
            _ => false,
        },
        CompareOp::EndsWith => match (l, r) {
            (Value::String(x), Value::String(y)) => fold(x, ci).ends_with(&fold(y, ci)),
            _ => false,
        },
        CompareOp::Like => match (l, r) {
            (Value::String(x), Value::String(pattern)) => {
                wildcard_match(&fold(x, ci), &fold(pattern, ci))
            }
            _ => false,
        },
        CompareOp::In => match (l, r) {
            (needle, Value::List(items)) => items.iter().any(|v| equals(needle, v, ci)),
            (Value::String(x), Value::String(hay)) => fold(hay, ci).contains(&fold(x, ci)),
            _ => false,
        },
    }
}

/// `*` matches any run of characters, `?` exactly one
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoLookup, RecordId};
    use std::collections::HashMap;

    struct MapLookup(HashMap<RecordId, Record>);

    impl RecordLookup for MapLookup {
        fn lookup(&self, id: RecordId) -> Option<Record> {
            self.0.get(&id).cloned()
        }
    }

    fn ada() -> Record {
        let mut r = Record::new(RecordId(1), "Person");
        r.set("name", "Ada Lovelace");
        r.set("age", 36i64);
        r.set("employer", RecordId(10));
        r
    }

    #[test]
    fn test_compare_ops() {
        let record = ada();
        let ctx = EvalContext::new(&record, &NoLookup);

        assert!(Predicate::eq("age", 36).eval(&ctx).unwrap());
        assert!(Predicate::eq("age", 36.0).eval(&ctx).unwrap());
        assert!(!Predicate::eq("name", "ada lovelace").eval(&ctx).unwrap());
        assert!(Predicate::compare("age", CompareOp::Gt, 30).eval(&ctx).unwrap());
        assert!(Predicate::compare("name", CompareOp::BeginsWith, "Ada").eval(&ctx).unwrap());
        assert!(Predicate::compare("name", CompareOp::Like, "A*e").eval(&ctx).unwrap());
        assert!(
            Predicate::compare("age", CompareOp::In, vec![1i64, 36])
                .eval(&ctx)
                .unwrap()
        );
        // missing property compares as null
        assert!(Predicate::eq("nickname", Value::Null).eval(&ctx).unwrap());
        // incomparable types never order
        assert!(!Predicate::compare("name", CompareOp::Lt, 5).eval(&ctx).unwrap());
    }

    #[test]
    fn test_logical() {
        let record = ada();
        let ctx = EvalContext::new(&record, &NoLookup);

        let both = Predicate::and(vec![Predicate::eq("age", 36), Predicate::eq("name", "Ada Lovelace")]);
        assert!(both.eval(&ctx).unwrap());

        let either = Predicate::or(vec![Predicate::eq("age", 1), Predicate::False]);
        assert!(!either.eval(&ctx).unwrap());

        assert!(Predicate::negate(either).eval(&ctx).unwrap());
        assert!(Predicate::and(vec![]).eval(&ctx).unwrap());
    }

    #[test]
    fn test_key_path_through_relationship() {
        let mut company = Record::new(RecordId(10), "Company");
        company.set("name", "Analytical Engines");
        let lookup = MapLookup(HashMap::from([(RecordId(10), company)]));

        let record = ada();
        let ctx = EvalContext::new(&record, &lookup);
        assert_eq!(ctx.resolve_key("employer.name"), Value::from("Analytical Engines"));
        assert!(Predicate::eq("employer.name", "Analytical Engines").eval(&ctx).unwrap());

        let no_lookup = EvalContext::new(&record, &NoLookup);
        assert_eq!(no_lookup.resolve_key("employer.name"), Value::Null);
    }

    #[test]
    fn test_template_requires_binding() {
        let record = ada();
        let ctx = EvalContext::new(&record, &NoLookup);

        let template = Predicate::template("age > %@", vec![Value::Int(30)]);
        assert!(!template.is_bound());
        assert!(matches!(template.eval(&ctx), Err(Error::UnboundTemplate(_))));

        let bound = template.bind().unwrap();
        assert!(bound.is_bound());
        assert!(bound.eval(&ctx).unwrap());
    }

    #[test]
    fn test_wildcards() {
        assert!(wildcard_match("hello", "h?llo"));
        assert!(wildcard_match("hello", "*"));
        assert!(wildcard_match("hello", "he*o"));
        assert!(!wildcard_match("hello", "he*x"));
        assert!(wildcard_match("", "*"));
    }
}

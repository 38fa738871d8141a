//! Loosely-shaped query conditions and their normalization

use crate::{Predicate, Value, ValueMap};

/// A query condition in one of the three accepted shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Free-form format string with positional arguments, not schema-checked
    Raw { format: String, args: Vec<Value> },
    /// Field -> value equalities, all ANDed
    Equal(ValueMap),
    /// Already-built predicate
    Compiled(Predicate),
}

impl Condition {
    /// Raw format string condition
    pub fn raw(format: impl Into<String>, args: Vec<Value>) -> Self {
        Condition::Raw {
            format: format.into(),
            args,
        }
    }

    /// Unconditional: matches every record
    pub fn all() -> Self {
        Condition::Equal(ValueMap::new())
    }

    /// Normalize to a predicate, or `None` for an unconditional fetch
    ///
    /// Never fails. Raw strings become deferred templates; an empty
    /// equality map matches everything and so compiles to `None`.
    pub fn compile(&self) -> Option<Predicate> {
        match self {
            Condition::Raw { format, args } => Some(Predicate::template(format.clone(), args.clone())),
            Condition::Equal(map) if map.is_empty() => None,
            Condition::Equal(map) => Some(Predicate::And(
                map.iter()
                    .map(|(field, value)| Predicate::eq(field.clone(), value.clone()))
                    .collect(),
            )),
            Condition::Compiled(p) => Some(p.clone()),
        }
    }
}

impl From<&str> for Condition {
    fn from(format: &str) -> Self {
        Condition::raw(format, Vec::new())
    }
}

impl From<String> for Condition {
    fn from(format: String) -> Self {
        Condition::raw(format, Vec::new())
    }
}

impl From<ValueMap> for Condition {
    fn from(map: ValueMap) -> Self {
        Condition::Equal(map)
    }
}

impl From<Predicate> for Condition {
    fn from(predicate: Predicate) -> Self {
        Condition::Compiled(predicate)
    }
}

impl<T: Into<Condition>> From<Option<T>> for Condition {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_else(Condition::all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{props, EvalContext, NoLookup, Record, RecordId};

    fn record(name: &str, age: i64) -> Record {
        let mut r = Record::new(RecordId(1), "Person");
        r.set("name", name);
        r.set("age", age);
        r
    }

    fn matches(condition: &Condition, record: &Record) -> bool {
        match condition.compile() {
            None => true,
            Some(p) => p
                .bind()
                .unwrap()
                .eval(&EvalContext::new(record, &NoLookup))
                .unwrap(),
        }
    }

    #[test]
    fn test_equality_map_is_conjunction() {
        let condition = Condition::from(props! { "name" => "Ada", "age" => 36 });
        assert!(matches(&condition, &record("Ada", 36)));
        assert!(!matches(&condition, &record("Ada", 37)));
        assert!(!matches(&condition, &record("Bob", 36)));
    }

    #[test]
    fn test_empty_map_matches_all() {
        let condition = Condition::from(ValueMap::new());
        assert_eq!(condition.compile(), None);
        assert_eq!(Condition::from(Option::<&str>::None).compile(), None);
        assert!(matches(&condition, &record("anyone", 0)));
    }

    #[test]
    fn test_raw_defers_parsing() {
        // A mismatched template still normalizes; the error comes at bind time.
        let condition = Condition::raw("age > %@ AND name == %@", vec![Value::Int(1)]);
        let predicate = condition.compile().unwrap();
        assert!(!predicate.is_bound());
        assert!(predicate.bind().is_err());

        let condition = Condition::raw("age > %@", vec![Value::Int(30)]);
        assert!(matches(&condition, &record("Ada", 36)));
    }

    #[test]
    fn test_compiled_passes_through() {
        let p = Predicate::eq("age", 36);
        assert_eq!(Condition::from(p.clone()).compile(), Some(p));
    }
}

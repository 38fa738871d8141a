//! Fetch requests and the in-process filter/sort/limit pipeline.

use crate::error::Result;
use rekord_core::{EvalContext, Predicate, Record, RecordLookup, SortKey, SortSpec, Value};

/// A request for records of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Entity to fetch.
    pub entity: String,
    /// Filter, `None` for every record.
    pub predicate: Option<Predicate>,
    /// Sort keys, primary first.
    pub sort: SortSpec,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl FetchRequest {
    /// Fetch every record of an entity, unordered.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: None,
            sort: Vec::new(),
            limit: None,
        }
    }

    /// Set the filter.
    pub fn with_predicate(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Set the sort keys.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Bind a predicate's templates, if there is one.
///
/// Placeholder and syntax errors in raw conditions surface here.
pub fn bind(predicate: Option<&Predicate>) -> Result<Option<Predicate>> {
    Ok(predicate.map(Predicate::bind).transpose()?)
}

/// Run a request over candidate records of its entity.
pub fn apply(
    request: &FetchRequest,
    candidates: impl IntoIterator<Item = Record>,
    lookup: &dyn RecordLookup,
) -> Result<Vec<Record>> {
    let predicate = bind(request.predicate.as_ref())?;
    let mut matched = filter(predicate.as_ref(), candidates, lookup)?;

    if !request.sort.is_empty() {
        sort(&mut matched, &request.sort, lookup);
    }
    if let Some(limit) = request.limit {
        matched.truncate(limit);
    }
    Ok(matched)
}

/// Count candidates matching a predicate.
pub fn count(
    predicate: Option<&Predicate>,
    candidates: impl IntoIterator<Item = Record>,
    lookup: &dyn RecordLookup,
) -> Result<usize> {
    let predicate = bind(predicate)?;
    Ok(filter(predicate.as_ref(), candidates, lookup)?.len())
}

fn filter(
    predicate: Option<&Predicate>,
    candidates: impl IntoIterator<Item = Record>,
    lookup: &dyn RecordLookup,
) -> Result<Vec<Record>> {
    let mut matched = Vec::new();
    for record in candidates {
        let keep = match predicate {
            Some(p) => p.eval(&EvalContext::new(&record, lookup))?,
            None => true,
        };
        if keep {
            matched.push(record);
        }
    }
    Ok(matched)
}

/// Stable sort by key paths.
fn sort(records: &mut Vec<Record>, keys: &[SortKey], lookup: &dyn RecordLookup) {
    let mut keyed: Vec<(Vec<Value>, Record)> = records
        .drain(..)
        .map(|record| {
            let ctx = EvalContext::new(&record, lookup);
            let values = keys.iter().map(|k| ctx.resolve_key(&k.field)).collect();
            (values, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|(key, (x, y))| {
                let ord = x.sort_cmp(y);
                if key.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    records.extend(keyed.into_iter().map(|(_, record)| record));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rekord_core::{NoLookup, RecordId};

    fn people() -> Vec<Record> {
        [("Ada", 36), ("Bob", 25), ("Cy", 36), ("Di", 41)]
            .into_iter()
            .enumerate()
            .map(|(i, (name, age))| {
                let mut r = Record::new(RecordId(i as u64 + 1), "Person");
                r.set("name", name);
                r.set("age", age);
                r
            })
            .collect()
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().filter_map(|r| r.get_str("name")).collect()
    }

    #[test]
    fn test_filter_sort_limit() {
        let request = FetchRequest::new("Person")
            .with_predicate(Some(Predicate::template("age >= %@", vec![Value::Int(30)])))
            .with_sort(vec![SortKey::desc("age"), SortKey::asc("name")])
            .with_limit(Some(2));

        let result = apply(&request, people(), &NoLookup).unwrap();
        assert_eq!(names(&result), vec!["Di", "Ada"]);
    }

    #[test]
    fn test_unsorted_keeps_candidate_order() {
        let result = apply(&FetchRequest::new("Person"), people(), &NoLookup).unwrap();
        assert_eq!(names(&result), vec!["Ada", "Bob", "Cy", "Di"]);
    }

    #[test]
    fn test_count() {
        let p = Predicate::eq("age", 36);
        assert_eq!(count(Some(&p), people(), &NoLookup).unwrap(), 2);
        assert_eq!(count(None, people(), &NoLookup).unwrap(), 4);
    }

    #[test]
    fn test_template_mismatch_fails_at_execution() {
        let request = FetchRequest::new("Person")
            .with_predicate(Some(Predicate::template("age == %@ AND name == %@", vec![Value::Int(1)])));
        let err = apply(&request, people(), &NoLookup).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Core(rekord_core::Error::ArgumentCountMismatch { expected: 2, got: 1 })
        ));
    }
}

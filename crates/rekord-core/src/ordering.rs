//! Sort specifications and their compilation into sort keys

use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// One sort descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    /// Ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    /// Descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Ordered sort keys: primary first, then secondary, ...
pub type SortSpec = Vec<SortKey>;

/// How direction tokens are read
///
/// The two input paths historically disagreed: string tokens were ascending
/// only for an exact `ASC`, while map entries were descending only for a
/// case-insensitive `DESC`. `Legacy` reproduces that; `Normalized` applies
/// the map rule to both paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionParsing {
    Legacy,
    #[default]
    Normalized,
}

impl DirectionParsing {
    fn token_ascending(self, token: &str) -> bool {
        match self {
            DirectionParsing::Legacy => token == "ASC",
            DirectionParsing::Normalized => !token.eq_ignore_ascii_case("DESC"),
        }
    }

    fn entry_ascending(self, direction: &Value) -> bool {
        match direction.as_str() {
            Some(token) => !token.eq_ignore_ascii_case("DESC"),
            None => true,
        }
    }
}

/// A sort request in any of the accepted shapes
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Sort {
    /// No ordering
    #[default]
    Unsorted,
    /// `"name, age DESC"`
    Text(String),
    /// `{"age": "DESC"}`
    Entry(ValueMap),
    /// `[{"age": "DESC"}, {"name": "ASC"}]`
    Entries(Vec<ValueMap>),
    /// Already-built keys
    Keys(SortSpec),
}

impl Sort {
    /// Compile into sort keys, preserving input order
    pub fn compile(&self, parsing: DirectionParsing) -> SortSpec {
        match self {
            Sort::Unsorted => Vec::new(),
            Sort::Text(text) => text
                .split(',')
                .filter_map(|token| {
                    let mut parts = token.split_whitespace();
                    let field = parts.next()?;
                    let ascending = parts
                        .next()
                        .map(|dir| parsing.token_ascending(dir))
                        .unwrap_or(true);
                    Some(SortKey {
                        field: field.to_string(),
                        ascending,
                    })
                })
                .collect(),
            Sort::Entry(map) => entry_keys(map, parsing).collect(),
            Sort::Entries(maps) => maps.iter().flat_map(|m| entry_keys(m, parsing)).collect(),
            Sort::Keys(keys) => keys.clone(),
        }
    }
}

fn entry_keys(map: &ValueMap, parsing: DirectionParsing) -> impl Iterator<Item = SortKey> + '_ {
    map.iter().map(move |(field, direction)| SortKey {
        field: field.clone(),
        ascending: parsing.entry_ascending(direction),
    })
}

impl From<&str> for Sort {
    fn from(text: &str) -> Self {
        Sort::Text(text.to_string())
    }
}

impl From<String> for Sort {
    fn from(text: String) -> Self {
        Sort::Text(text)
    }
}

impl From<ValueMap> for Sort {
    fn from(map: ValueMap) -> Self {
        Sort::Entry(map)
    }
}

impl From<Vec<ValueMap>> for Sort {
    fn from(maps: Vec<ValueMap>) -> Self {
        Sort::Entries(maps)
    }
}

impl From<SortSpec> for Sort {
    fn from(keys: SortSpec) -> Self {
        Sort::Keys(keys)
    }
}

impl<T: Into<Sort>> From<Option<T>> for Sort {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_default()
    }
}

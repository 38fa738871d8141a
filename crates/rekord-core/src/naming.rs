//! Entity-name derivation and remote-key casing helpers

use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::LazyLock;

static TYPE_NAMES: LazyLock<Mutex<HashMap<TypeId, String>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Derive a canonical entity name from a qualified type name
///
/// Module qualification (`a::b::` or `Module.`) and generic arguments are
/// stripped, then a duplicated `_` component left behind by code generators
/// is collapsed: `Module.Foo_Foo` becomes `Foo`.
pub fn entity_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let last = base
        .rsplit(|c: char| c == ':' || c == '.')
        .find(|s| !s.is_empty())
        .unwrap_or(base);

    let mut parts: Vec<&str> = last.split('_').collect();
    if parts.len() > 1 {
        if let Some(i) = (1..parts.len()).rev().find(|&i| parts[i] == parts[i - 1]) {
            parts.remove(i);
            return parts.join("_");
        }
    }
    last.to_string()
}

/// Entity name for a Rust type, computed once per type
pub fn entity_name_of<T: ?Sized + 'static>() -> String {
    let id = TypeId::of::<T>();
    TYPE_NAMES
        .lock()
        .entry(id)
        .or_insert_with(|| entity_name(std::any::type_name::<T>()))
        .clone()
}

/// Camel-case a remote key: `first_name` -> `firstName`, `USER_ID` -> `userId`
///
/// Words are split on `_` and whitespace, each word is capitalized with the
/// rest lowercased, and the first character of the result is lowercased.
pub fn camel_case(remote: &str) -> String {
    let mut out = String::with_capacity(remote.len());
    for word in remote.split(|c: char| c == '_' || c.is_whitespace()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => out,
    }
}

//! Context Configuration - store location and façade behaviour
//!
//! A [`RekordConfig`] decides which store a [`Context`](crate::Context)
//! opens, where auto-increment counters live, and a few behaviour switches.
//! It can be built in code or loaded from a RON file.

use crate::error::Result;
use rekord_core::DirectionParsing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for a record context
///
/// # Example
///
/// ```
/// use rekord_db::RekordConfig;
///
/// // In-memory store, counters in process memory (default)
/// let config = RekordConfig::default();
/// assert!(config.store_path().is_none());
/// assert!(!config.generate_relationships());
///
/// let config = RekordConfig::default()
///     .with_store_path("contacts.db")
///     .with_generate_relationships(true);
/// assert!(config.store_path().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RekordConfig {
    /// On-disk store file, `None` for an in-memory store
    store_path: Option<PathBuf>,
    /// RON file holding auto-increment counters, `None` for process memory
    counter_path: Option<PathBuf>,
    /// Resolve nested relationship maps into records on update
    generate_relationships: bool,
    /// How sort direction tokens are read
    direction_parsing: DirectionParsing,
    /// Save staged changes when the context is dropped
    save_on_drop: bool,
}

impl RekordConfig {
    /// Load a configuration from a RON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Example
    ///
    /// ```
    /// use rekord_db::RekordConfig;
    ///
    /// let config = RekordConfig::from_ron("(generate_relationships: true)").unwrap();
    /// assert!(config.generate_relationships());
    /// assert!(config.save_on_drop());
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Parse a configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Set the store file
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Set the counter file
    pub fn with_counter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.counter_path = Some(path.into());
        self
    }

    /// Enable or disable relationship generation
    pub fn with_generate_relationships(mut self, enabled: bool) -> Self {
        self.generate_relationships = enabled;
        self
    }

    /// Choose how sort directions are parsed
    pub fn with_direction_parsing(mut self, parsing: DirectionParsing) -> Self {
        self.direction_parsing = parsing;
        self
    }

    /// Enable or disable the final save on drop
    pub fn with_save_on_drop(mut self, enabled: bool) -> Self {
        self.save_on_drop = enabled;
        self
    }

    /// Store file, if any
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Counter file, if any
    pub fn counter_path(&self) -> Option<&Path> {
        self.counter_path.as_deref()
    }

    /// Whether nested relationship values are resolved into records
    pub fn generate_relationships(&self) -> bool {
        self.generate_relationships
    }

    /// Sort direction parsing mode
    pub fn direction_parsing(&self) -> DirectionParsing {
        self.direction_parsing
    }

    /// Whether dropping the context saves
    pub fn save_on_drop(&self) -> bool {
        self.save_on_drop
    }
}

impl Default for RekordConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            counter_path: None,
            generate_relationships: false,
            direction_parsing: DirectionParsing::Normalized,
            save_on_drop: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RekordConfig::default();
        assert_eq!(config.store_path(), None);
        assert_eq!(config.counter_path(), None);
        assert!(!config.generate_relationships());
        assert_eq!(config.direction_parsing(), DirectionParsing::Normalized);
        assert!(config.save_on_drop());
    }

    #[test]
    fn test_builder() {
        let config = RekordConfig::default()
            .with_store_path("/tmp/a.db")
            .with_counter_path("/tmp/counters.ron")
            .with_direction_parsing(DirectionParsing::Legacy)
            .with_save_on_drop(false);
        assert_eq!(config.store_path(), Some(Path::new("/tmp/a.db")));
        assert_eq!(config.counter_path(), Some(Path::new("/tmp/counters.ron")));
        assert_eq!(config.direction_parsing(), DirectionParsing::Legacy);
        assert!(!config.save_on_drop());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rekord.ron");
        fs::write(
            &path,
            r#"(
                store_path: Some("contacts.db"),
                direction_parsing: Legacy,
                save_on_drop: false,
            )"#,
        )
        .unwrap();

        let config = RekordConfig::load(&path).unwrap();
        assert_eq!(
            config,
            RekordConfig::default()
                .with_store_path("contacts.db")
                .with_direction_parsing(DirectionParsing::Legacy)
                .with_save_on_drop(false)
        );
    }

    #[test]
    fn test_bad_ron() {
        assert!(matches!(
            RekordConfig::from_ron("(store_path: 12"),
            Err(crate::Error::Ron(_))
        ));
    }
}

//! RON model loader

use crate::error::{Error, Result};
use rekord_core::{EntitySchema, SchemaSet};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize)]
struct ModelFile {
    entities: Vec<EntitySchema>,
}

/// Accumulates entity schemas from one or more model files
#[derive(Debug, Default)]
pub struct ModelLoader {
    schemas: SchemaSet,
}

impl ModelLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let added = self.load_str(&content)?;
        debug!(path = %path.display(), entities = added, "Loaded model file");
        Ok(())
    }

    /// Load entities from a RON string, returning how many were added
    ///
    /// Accepts either `(entities: [...])` or one bare entity.
    pub fn load_str(&mut self, content: &str) -> Result<usize> {
        let entities = match ron::from_str::<ModelFile>(content) {
            Ok(file) => file.entities,
            Err(list_err) => match ron::from_str::<EntitySchema>(content) {
                Ok(single) => vec![single],
                Err(_) => return Err(list_err.into()),
            },
        };

        let count = entities.len();
        for schema in entities {
            self.add(schema)?;
        }
        Ok(count)
    }

    /// Add one schema after checking it
    pub fn add(&mut self, schema: EntitySchema) -> Result<()> {
        if schema.name.is_empty() {
            return Err(Error::InvalidSchema("entity with an empty name".to_string()));
        }
        if self.schemas.contains(&schema.name) {
            return Err(Error::DuplicateDefinition(schema.name));
        }
        schema.validate().map_err(|source| Error::Entity {
            entity: schema.name.clone(),
            source,
        })?;
        self.schemas.insert(schema);
        Ok(())
    }

    /// Load every `.ron` file under a directory, recursively
    ///
    /// Files are visited in name order so duplicate reports are stable.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.is_dir() {
                self.load_directory(&file_path)?;
            } else if file_path.extension().is_some_and(|e| e == "ron") {
                self.load_file(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading, checking that every relationship target exists
    pub fn finish(self) -> Result<SchemaSet> {
        for schema in self.schemas.iter() {
            for (name, rel) in &schema.relationships {
                if !self.schemas.contains(&rel.destination) {
                    return Err(Error::InvalidSchema(format!(
                        "{}.{} points at unknown entity {}",
                        schema.name, name, rel.destination
                    )));
                }
            }
        }
        Ok(self.schemas)
    }

    /// Schemas loaded so far
    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }
}

/// Load a model file or directory in one step
pub fn load_model(path: impl AsRef<Path>) -> Result<SchemaSet> {
    let path = path.as_ref();
    let mut loader = ModelLoader::new();
    if path.is_dir() {
        loader.load_directory(path)?;
    } else {
        loader.load_file(path)?;
    }
    loader.finish()
}

//! The hierarchical configuration store consumed by the binding engine.

use std::path::Path;

use toml::Table;

use super::LoadError;

/// An in-memory hierarchical key/value configuration tree.
///
/// `Configuration` owns the root table of a parsed TOML document. It is the
/// source a binding pass reads from; the binder never mutates it. Nesting is
/// expressed with TOML tables and addressed with dotted paths (`db.pool.size`).
///
/// ## Example
///
/// ```
/// use confbind::Configuration;
///
/// let config = Configuration::parse(
///     r#"
///     name = "svc"
///
///     [db]
///     host = "localhost"
///     "#,
/// )?;
/// assert!(!config.is_empty());
/// # Ok::<(), confbind::LoadError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    root: Table,
}

impl Configuration {
    /// Wraps an already-built table.
    pub fn from_table(root: Table) -> Self {
        Self { root }
    }

    /// Parses a TOML document into a configuration tree.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let root = toml::from_str(text)?;
        Ok(Self { root })
    }

    /// Loads and parses a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let root = toml::from_str(&contents).map_err(|e| LoadError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                Ok(Self { root })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(LoadError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Whether the tree holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub(crate) fn table(&self) -> &Table {
        &self.root
    }
}

impl From<Table> for Configuration {
    fn from(root: Table) -> Self {
        Self { root }
    }
}

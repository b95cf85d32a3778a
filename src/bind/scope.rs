//! Path-scoped views over the configuration tree.

use num_bigint::BigInt;
use rust_decimal::Decimal;
use toml::{Table, Value};

use crate::config::value::{self, ValueError};
use crate::config::Configuration;

/// A configuration sub-tree paired with the dotted path that addresses it.
///
/// A scope is immutable; [`descend`](Self::descend) produces a fresh child
/// view and never mutates the parent. The path is `None` at the root and
/// composes with `.` as keys are descended, so the scope for `[db.pool]`
/// reports the path `db.pool`. The typed accessors expose the store's native
/// value reads: they yield `Ok(None)` when the key is absent and a
/// [`ValueError`] when a present value cannot be coerced.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    table: Option<&'a Table>,
    path: Option<String>,
}

impl<'a> Scope<'a> {
    /// The root scope of a configuration tree, with an empty path.
    pub fn root(config: &'a Configuration) -> Self {
        Self {
            table: Some(config.table()),
            path: None,
        }
    }

    /// The dotted path addressing this scope, `None` at the root.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Whether no keys exist under this scope.
    pub fn is_empty(&self) -> bool {
        self.table.is_none_or(Table::is_empty)
    }

    /// Descends by one key, yielding the child scope.
    ///
    /// A missing or non-table entry yields an empty scope. The child path is
    /// `parent.key` when the parent path is non-empty, else just `key`.
    pub fn descend(&self, key: &str) -> Scope<'a> {
        let path = match &self.path {
            Some(parent) => format!("{parent}.{key}"),
            None => key.to_string(),
        };
        let table = self
            .table
            .and_then(|t| t.get(key))
            .and_then(Value::as_table);
        Scope {
            table,
            path: Some(path),
        }
    }

    /// Fully-qualified dotted path of a key within this scope.
    pub fn full_path(&self, name: &str) -> String {
        match &self.path {
            Some(parent) if !parent.is_empty() => format!("{parent}.{name}"),
            _ => name.to_string(),
        }
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        self.table.and_then(|t| t.get(key))
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, ValueError> {
        self.raw(key).map(value::coerce_string).transpose()
    }

    pub fn get_i16(&self, key: &str) -> Result<Option<i16>, ValueError> {
        self.raw(key).map(value::coerce_i16).transpose()
    }

    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, ValueError> {
        self.raw(key).map(value::coerce_i32).transpose()
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ValueError> {
        self.raw(key).map(value::coerce_i64).transpose()
    }

    pub fn get_byte(&self, key: &str) -> Result<Option<u8>, ValueError> {
        self.raw(key).map(value::coerce_byte).transpose()
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ValueError> {
        self.raw(key).map(value::coerce_bool).transpose()
    }

    pub fn get_f32(&self, key: &str) -> Result<Option<f32>, ValueError> {
        self.raw(key).map(value::coerce_f32).transpose()
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ValueError> {
        self.raw(key).map(value::coerce_f64).transpose()
    }

    pub fn get_big_integer(&self, key: &str) -> Result<Option<BigInt>, ValueError> {
        self.raw(key).map(value::coerce_big_integer).transpose()
    }

    pub fn get_decimal(&self, key: &str) -> Result<Option<Decimal>, ValueError> {
        self.raw(key).map(value::coerce_decimal).transpose()
    }

    pub fn get_string_array(&self, key: &str) -> Result<Option<Vec<String>>, ValueError> {
        self.raw(key).map(value::coerce_string_array).transpose()
    }

    pub fn get_list(&self, key: &str) -> Result<Option<Vec<Value>>, ValueError> {
        self.raw(key).map(value::coerce_list).transpose()
    }
}

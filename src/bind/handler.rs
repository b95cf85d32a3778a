//! Value conversion handlers.
//!
//! A [`PropertyHandler`] loads one configuration value and converts it to the
//! requested target type. [`DefaultHandler`] is the built-in registry used by
//! every simple binding that does not name its own handler.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use toml::Value;

use super::error::BindError;
use super::schema::TypeSpec;
use super::scope::Scope;
use crate::config::ValueError;

/// Loads and converts values from a configuration scope to target types.
///
/// Implementations are stateless. Within one binding pass a handler type is
/// instantiated at most once and reused; a handler named by several bindings
/// shares one instance for the whole pass.
pub trait PropertyHandler: 'static {
    /// Reads the value for `name` in `scope` and converts it to `ty`.
    ///
    /// Returns `Ok(None)` when the key is absent — absence is not an error at
    /// this layer. The returned box must hold exactly the type `ty` names.
    fn value(
        &self,
        scope: &Scope<'_>,
        name: &str,
        ty: &TypeSpec,
    ) -> Result<Option<Box<dyn Any>>, BindError>;
}

/// Names a handler type and knows how to construct it on first use.
#[derive(Debug, Clone, Copy)]
pub struct HandlerSpec {
    pub(crate) id: TypeId,
    pub(crate) create: fn() -> Box<dyn PropertyHandler>,
}

impl HandlerSpec {
    pub fn of<H: PropertyHandler + Default>() -> Self {
        fn build<H: PropertyHandler + Default>() -> Box<dyn PropertyHandler> {
            Box::new(H::default())
        }
        Self {
            id: TypeId::of::<H>(),
            create: build::<H>,
        }
    }
}

impl Default for HandlerSpec {
    fn default() -> Self {
        Self::of::<DefaultHandler>()
    }
}

type Getter<V> = fn(&Scope<'_>, &str) -> Result<Option<V>, ValueError>;
type Action = Box<dyn Fn(&Scope<'_>, &str, &TypeSpec) -> Result<Option<Box<dyn Any>>, BindError>>;

fn conversion_error(
    scope: &Scope<'_>,
    name: &str,
    ty: &TypeSpec,
    source: ValueError,
) -> BindError {
    BindError::Conversion {
        path: scope.full_path(name),
        type_name: ty.name(),
        source,
    }
}

/// Wraps a native accessor; the boxed value is the bare `V`.
fn leaf<V: 'static>(get: Getter<V>) -> Action {
    Box::new(move |scope: &Scope<'_>, name: &str, ty: &TypeSpec| match get(scope, name) {
        Ok(Some(v)) => Ok(Some(Box::new(v) as Box<dyn Any>)),
        Ok(None) => Ok(None),
        Err(source) => Err(conversion_error(scope, name, ty, source)),
    })
}

/// Wraps a native accessor for an `Option<V>` member; the boxed value is
/// `Some(v)` so the member's declared `Option` type receives it directly.
fn optional<V: 'static>(get: Getter<V>) -> Action {
    Box::new(move |scope: &Scope<'_>, name: &str, ty: &TypeSpec| match get(scope, name) {
        Ok(Some(v)) => Ok(Some(Box::new(Some(v)) as Box<dyn Any>)),
        Ok(None) => Ok(None),
        Err(source) => Err(conversion_error(scope, name, ty, source)),
    })
}

/// Decorates a base action: an absent value becomes a hard failure. Applied
/// to the bare scalar registrations, which have no way to express absence.
fn required(inner: Action) -> Action {
    Box::new(
        move |scope: &Scope<'_>, name: &str, ty: &TypeSpec| match inner(scope, name, ty)? {
            Some(v) => Ok(Some(v)),
            None => Err(BindError::MissingRequired {
                path: scope.full_path(name),
                type_name: ty.name(),
            }),
        },
    )
}

/// The built-in converter registry.
///
/// Maps target types to conversion actions by exact `TypeId` — no structural
/// or subtype matching. Bare scalars (`i16`, `i32`, `i64`, `u8`, `bool`,
/// `f32`, `f64`) are required; their `Option` duals, `String`, `BigInt`,
/// `Decimal`, `Vec<String>` and `Vec<toml::Value>` are optional and leave the
/// member's default in place when absent. An unregistered type fails with
/// [`BindError::UnsupportedType`].
pub struct DefaultHandler {
    actions: HashMap<TypeId, Action>,
}

impl Default for DefaultHandler {
    fn default() -> Self {
        let mut actions: HashMap<TypeId, Action> = HashMap::new();
        actions.insert(TypeId::of::<i32>(), required(leaf(|s, k| s.get_i32(k))));
        actions.insert(TypeId::of::<Option<i32>>(), optional(|s, k| s.get_i32(k)));
        actions.insert(TypeId::of::<i64>(), required(leaf(|s, k| s.get_i64(k))));
        actions.insert(TypeId::of::<Option<i64>>(), optional(|s, k| s.get_i64(k)));
        actions.insert(TypeId::of::<i16>(), required(leaf(|s, k| s.get_i16(k))));
        actions.insert(TypeId::of::<Option<i16>>(), optional(|s, k| s.get_i16(k)));
        actions.insert(TypeId::of::<u8>(), required(leaf(|s, k| s.get_byte(k))));
        actions.insert(TypeId::of::<Option<u8>>(), optional(|s, k| s.get_byte(k)));
        actions.insert(TypeId::of::<bool>(), required(leaf(|s, k| s.get_bool(k))));
        actions.insert(TypeId::of::<Option<bool>>(), optional(|s, k| s.get_bool(k)));
        actions.insert(TypeId::of::<f64>(), required(leaf(|s, k| s.get_f64(k))));
        actions.insert(TypeId::of::<Option<f64>>(), optional(|s, k| s.get_f64(k)));
        actions.insert(TypeId::of::<f32>(), required(leaf(|s, k| s.get_f32(k))));
        actions.insert(TypeId::of::<Option<f32>>(), optional(|s, k| s.get_f32(k)));
        actions.insert(TypeId::of::<String>(), leaf(|s, k| s.get_string(k)));
        actions.insert(
            TypeId::of::<Option<String>>(),
            optional(|s, k| s.get_string(k)),
        );
        actions.insert(TypeId::of::<BigInt>(), leaf(|s, k| s.get_big_integer(k)));
        actions.insert(
            TypeId::of::<Option<BigInt>>(),
            optional(|s, k| s.get_big_integer(k)),
        );
        actions.insert(TypeId::of::<Decimal>(), leaf(|s, k| s.get_decimal(k)));
        actions.insert(
            TypeId::of::<Option<Decimal>>(),
            optional(|s, k| s.get_decimal(k)),
        );
        actions.insert(
            TypeId::of::<Vec<String>>(),
            leaf(|s, k| s.get_string_array(k)),
        );
        actions.insert(TypeId::of::<Vec<Value>>(), leaf(|s, k| s.get_list(k)));
        Self { actions }
    }
}

impl PropertyHandler for DefaultHandler {
    fn value(
        &self,
        scope: &Scope<'_>,
        name: &str,
        ty: &TypeSpec,
    ) -> Result<Option<Box<dyn Any>>, BindError> {
        let action = self.actions.get(&ty.id).ok_or(BindError::UnsupportedType {
            type_name: ty.name(),
        })?;
        action(scope, name, ty)
    }
}

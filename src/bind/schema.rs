//! Declarative binding schemas.
//!
//! A target type opts into binding by implementing [`Bindable`] and listing
//! its bindable members in a [`Bindings`] table: [`Simple`] entries resolve a
//! single configuration value through the converter registry, [`Nested`]
//! entries descend into a child scope and bind a whole object recursively.

use std::any::{type_name, Any, TypeId};
use std::fmt;

use super::engine::Binder;
use super::error::BindError;
use super::handler::{HandlerSpec, PropertyHandler};
use super::scope::Scope;

/// A target type that can be populated from a configuration scope.
///
/// Implementors supply a default-constructed starting instance (the `Default`
/// bound) and a schema describing which members bind to which keys.
///
/// ## Example
///
/// ```
/// use confbind::{Bindable, Bindings, Simple};
///
/// #[derive(Debug, Default)]
/// struct Retry {
///     attempts: i32,
///     backoff_ms: Option<i64>,
/// }
///
/// impl Bindable for Retry {
///     fn bindings() -> Bindings<Self> {
///         Bindings::new()
///             .simple(Simple::field("attempts", |r: &mut Self, v: i32| {
///                 r.attempts = v
///             }))
///             .simple(Simple::field("backoff_ms", |r: &mut Self, v: Option<i64>| {
///                 r.backoff_ms = v
///             }))
///     }
/// }
/// ```
pub trait Bindable: Default + Sized + 'static {
    /// The binding schema of this type.
    fn bindings() -> Bindings<Self>;
}

/// A value type tag: `TypeId` plus the type's name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl TypeSpec {
    pub fn of<V: 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: type_name::<V>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The member a binding is attached to: a plain field or a setter method.
///
/// The two kinds differ only in how the default binding key is derived: a
/// field uses its literal name, a setter strips the `set` mutator prefix and
/// lower-cases the character that follows (a `_` after the prefix is consumed
/// instead). A setter whose name does not carry the prefix keeps its literal
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Field(&'static str),
    Setter(&'static str),
}

impl Member {
    pub(crate) fn literal(&self) -> &'static str {
        match *self {
            Member::Field(name) | Member::Setter(name) => name,
        }
    }

    /// The binding key derived from the member name.
    pub fn binding_name(&self) -> String {
        match self {
            Member::Field(name) => (*name).to_string(),
            Member::Setter(name) => derive_setter_name(name),
        }
    }
}

fn derive_setter_name(name: &str) -> String {
    let Some(rest) = name.strip_prefix("set") else {
        return name.to_string();
    };
    if rest.is_empty() {
        return name.to_string();
    }
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_lowercase(), chars.as_str()),
        None => name.to_string(),
    }
}

/// Identifies a member on its declaring type, for error messages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MemberId {
    pub(crate) declaring: &'static str,
    pub(crate) member: Member,
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member {
            Member::Field(name) => write!(f, "field `{}` of `{}`", name, self.declaring),
            Member::Setter(name) => write!(f, "setter `{}` of `{}`", name, self.declaring),
        }
    }
}

type ApplyFn<T> = Box<dyn Fn(&mut T, Box<dyn Any>) -> Result<(), BindError>>;
type NestedApplyFn<T> = Box<dyn Fn(&mut T, Option<Box<dyn Any>>) -> Result<(), BindError>>;
type BindFn = Box<dyn Fn(&mut Binder, &Scope<'_>) -> Result<Option<Box<dyn Any>>, BindError>>;

/// A simple-value binding: one configuration key converted to one member.
///
/// The key defaults to the member's derived name ([`Member::binding_name`])
/// and can be overridden with [`key`](Self::key); the converter defaults to
/// the built-in registry and can be overridden with
/// [`handler`](Self::handler).
pub struct Simple<T> {
    pub(crate) member: MemberId,
    pub(crate) key: Option<&'static str>,
    pub(crate) handler: HandlerSpec,
    pub(crate) ty: TypeSpec,
    pub(crate) apply: ApplyFn<T>,
}

impl<T: 'static> Simple<T> {
    /// Binds a field; the default key is the field's literal name.
    pub fn field<V: 'static>(name: &'static str, set: impl Fn(&mut T, V) + 'static) -> Self {
        Self::new(Member::Field(name), set)
    }

    /// Binds through a setter; the default key is the setter's derived name.
    pub fn setter<V: 'static>(name: &'static str, set: impl Fn(&mut T, V) + 'static) -> Self {
        Self::new(Member::Setter(name), set)
    }

    fn new<V: 'static>(member: Member, set: impl Fn(&mut T, V) + 'static) -> Self {
        let member = MemberId {
            declaring: type_name::<T>(),
            member,
        };
        let expected = type_name::<V>();
        Self {
            member,
            key: None,
            handler: HandlerSpec::default(),
            ty: TypeSpec::of::<V>(),
            apply: Box::new(move |target, value| match value.downcast::<V>() {
                Ok(v) => {
                    set(target, *v);
                    Ok(())
                }
                Err(_) => Err(BindError::HandlerMismatch {
                    member: member.to_string(),
                    expected,
                }),
            }),
        }
    }

    /// Overrides the configuration key.
    pub fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Overrides the converter handler for this binding.
    pub fn handler<H: PropertyHandler + Default>(mut self) -> Self {
        self.handler = HandlerSpec::of::<H>();
        self
    }

    pub(crate) fn resolved_name(&self) -> String {
        match self.key {
            Some(key) => key.to_string(),
            None => self.member.member.binding_name(),
        }
    }

    fn lensed<U: 'static>(self, lens: fn(&mut U) -> &mut T) -> Simple<U> {
        let apply = self.apply;
        Simple {
            member: self.member,
            key: self.key,
            handler: self.handler,
            ty: self.ty,
            apply: Box::new(move |target, value| apply(lens(target), value)),
        }
    }
}

/// A nested-object binding: a child scope bound recursively to one member.
///
/// The member always receives the recursive result, including `None` when the
/// child scope is entirely empty.
pub struct Nested<T> {
    pub(crate) member: MemberId,
    pub(crate) key: Option<&'static str>,
    pub(crate) declared: TypeSpec,
    pub(crate) implementation: Option<Implementation>,
    fallback: Option<Implementation>,
    pub(crate) apply: NestedApplyFn<T>,
}

impl<T: 'static> Nested<T> {
    /// Binds a field whose declared type is itself [`Bindable`].
    pub fn field<V: Bindable>(
        name: &'static str,
        set: impl Fn(&mut T, Option<V>) + 'static,
    ) -> Self {
        Self::new(Member::Field(name), Some(Implementation::of::<V>()), set)
    }

    /// Binds through a setter whose parameter type is itself [`Bindable`].
    pub fn setter<V: Bindable>(
        name: &'static str,
        set: impl Fn(&mut T, Option<V>) + 'static,
    ) -> Self {
        Self::new(Member::Setter(name), Some(Implementation::of::<V>()), set)
    }

    /// Binds a field whose declared type cannot be constructed directly, such
    /// as a boxed trait object. An [`implemented_by`](Self::implemented_by)
    /// override is required; binding without one fails.
    pub fn dyn_field<V: 'static>(
        name: &'static str,
        set: impl Fn(&mut T, Option<V>) + 'static,
    ) -> Self {
        Self::new(Member::Field(name), None, set)
    }

    /// Setter variant of [`dyn_field`](Self::dyn_field).
    pub fn dyn_setter<V: 'static>(
        name: &'static str,
        set: impl Fn(&mut T, Option<V>) + 'static,
    ) -> Self {
        Self::new(Member::Setter(name), None, set)
    }

    fn new<V: 'static>(
        member: Member,
        fallback: Option<Implementation>,
        set: impl Fn(&mut T, Option<V>) + 'static,
    ) -> Self {
        let member = MemberId {
            declaring: type_name::<T>(),
            member,
        };
        let expected = type_name::<V>();
        Self {
            member,
            key: None,
            declared: TypeSpec::of::<V>(),
            implementation: None,
            fallback,
            apply: Box::new(move |target, value| match value {
                None => {
                    set(target, None);
                    Ok(())
                }
                Some(boxed) => match boxed.downcast::<V>() {
                    Ok(v) => {
                        set(target, Some(*v));
                        Ok(())
                    }
                    Err(_) => Err(BindError::HandlerMismatch {
                        member: member.to_string(),
                        expected,
                    }),
                },
            }),
        }
    }

    /// Overrides the configuration key.
    pub fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Overrides the implementation type bound for this member. The override
    /// must produce the declared member type; anything else is rejected
    /// before construction.
    pub fn implemented_by(mut self, implementation: Implementation) -> Self {
        self.implementation = Some(implementation);
        self
    }

    pub(crate) fn resolved_name(&self) -> String {
        match self.key {
            Some(key) => key.to_string(),
            None => self.member.member.binding_name(),
        }
    }

    pub(crate) fn effective_implementation(&self) -> Result<&Implementation, BindError> {
        self.implementation
            .as_ref()
            .or(self.fallback.as_ref())
            .ok_or_else(|| BindError::Instantiation {
                type_name: self.declared.name,
                member: self.member.to_string(),
            })
    }

    fn lensed<U: 'static>(self, lens: fn(&mut U) -> &mut T) -> Nested<U> {
        let apply = self.apply;
        Nested {
            member: self.member,
            key: self.key,
            declared: self.declared,
            implementation: self.implementation,
            fallback: self.fallback,
            apply: Box::new(move |target, value| apply(lens(target), value)),
        }
    }
}

/// The concrete type bound for a nested member.
pub struct Implementation {
    pub(crate) produces: TypeSpec,
    pub(crate) source: TypeSpec,
    pub(crate) bind: BindFn,
}

impl Implementation {
    /// Binds `W` itself.
    pub fn of<W: Bindable>() -> Self {
        Self {
            produces: TypeSpec::of::<W>(),
            source: TypeSpec::of::<W>(),
            bind: Box::new(|binder: &mut Binder, scope: &Scope<'_>| {
                Ok(binder
                    .instantiate::<W>(scope)?
                    .map(|w| Box::new(w) as Box<dyn Any>))
            }),
        }
    }

    /// Binds `W` and converts it into the declared member type `V`, e.g.
    /// boxing a concrete type into a trait object.
    pub fn mapped<W: Bindable, V: 'static>(map: fn(W) -> V) -> Self {
        Self {
            produces: TypeSpec::of::<V>(),
            source: TypeSpec::of::<W>(),
            bind: Box::new(move |binder: &mut Binder, scope: &Scope<'_>| {
                Ok(binder
                    .instantiate::<W>(scope)?
                    .map(|w| Box::new(map(w)) as Box<dyn Any>))
            }),
        }
    }
}

type ParentScan<T> = Box<dyn Fn() -> Scan<T>>;

/// The binding schema of one target type.
///
/// Entries collect in registration order. [`extend`](Self::extend) composes
/// the schema of an embedded base type through a projection; extended entries
/// always collect after the type's own, regardless of where `extend` is
/// called in the chain.
#[must_use = "binding schemas do nothing until collected by a binder"]
pub struct Bindings<T> {
    simple: Vec<Simple<T>>,
    nested: Vec<Nested<T>>,
    parents: Vec<ParentScan<T>>,
}

impl<T: 'static> Bindings<T> {
    pub fn new() -> Self {
        Self {
            simple: Vec::new(),
            nested: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Adds a simple-value binding.
    pub fn simple(mut self, binding: Simple<T>) -> Self {
        self.simple.push(binding);
        self
    }

    /// Adds a nested-object binding.
    pub fn nested(mut self, binding: Nested<T>) -> Self {
        self.nested.push(binding);
        self
    }

    /// Composes the schema of an embedded base type, reached through `lens`.
    /// The base type's members bind against the same scope as this type's.
    pub fn extend<P: Bindable>(mut self, lens: fn(&mut T) -> &mut P) -> Self {
        self.parents
            .push(Box::new(move || P::bindings().collect().lensed(lens)));
        self
    }

    pub(crate) fn collect(self) -> Scan<T> {
        let mut simple = self.simple;
        let mut nested = self.nested;
        for parent in self.parents {
            let scan = parent();
            simple.extend(scan.simple);
            nested.extend(scan.nested);
        }
        Scan { simple, nested }
    }
}

impl<T: 'static> Default for Bindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One flattened scan of a type's schema: own entries first, then each
/// extended base type's, child before parent.
pub(crate) struct Scan<T> {
    pub(crate) simple: Vec<Simple<T>>,
    pub(crate) nested: Vec<Nested<T>>,
}

impl<T: 'static> Scan<T> {
    /// A member declared both as a simple value and as a nested object has no
    /// defined meaning; reject it before anything is constructed.
    pub(crate) fn check_conflicts(&self) -> Result<(), BindError> {
        for simple in &self.simple {
            for nested in &self.nested {
                if simple.member.declaring == nested.member.declaring
                    && simple.member.member.literal() == nested.member.member.literal()
                {
                    return Err(BindError::ConflictingBinding {
                        member: simple.member.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn lensed<U: 'static>(self, lens: fn(&mut U) -> &mut T) -> Scan<U> {
        Scan {
            simple: self.simple.into_iter().map(|b| b.lensed(lens)).collect(),
            nested: self.nested.into_iter().map(|b| b.lensed(lens)).collect(),
        }
    }
}

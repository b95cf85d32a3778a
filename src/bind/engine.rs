//! The recursive binding engine.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use tracing::{debug, trace};

use super::error::BindError;
use super::handler::{HandlerSpec, PropertyHandler};
use super::schema::{Bindable, Scan};
use super::scope::Scope;
use crate::config::Configuration;

/// Populates a target type from a configuration tree.
///
/// Returns `Ok(None)` when the tree is entirely empty; otherwise a fully
/// bound instance. A fresh engine (and therefore a fresh handler cache) is
/// allocated per call, so concurrent top-level calls share nothing.
///
/// Termination is bounded by the target type's declared shape: recursion
/// stops wherever a nested scope is empty. Mutually nested types are not
/// detected statically; they terminate the same way, since a finite tree
/// cannot supply non-empty scopes forever.
///
/// ## Example
///
/// ```
/// use confbind::{instantiate, Bindable, Bindings, Configuration, Nested, Simple};
///
/// #[derive(Debug, Default)]
/// struct ServiceConfig {
///     name: String,
///     retries: i32,
///     db: Option<DbConfig>,
/// }
///
/// #[derive(Debug, Default)]
/// struct DbConfig {
///     host: String,
///     port: i32,
/// }
///
/// impl Bindable for DbConfig {
///     fn bindings() -> Bindings<Self> {
///         Bindings::new()
///             .simple(Simple::field("host", |d: &mut Self, v: String| d.host = v))
///             .simple(Simple::field("port", |d: &mut Self, v: i32| d.port = v))
///     }
/// }
///
/// impl Bindable for ServiceConfig {
///     fn bindings() -> Bindings<Self> {
///         Bindings::new()
///             .simple(Simple::field("name", |c: &mut Self, v: String| c.name = v))
///             .simple(Simple::field("retries", |c: &mut Self, v: i32| c.retries = v))
///             .nested(Nested::field("db", |c: &mut Self, v: Option<DbConfig>| c.db = v))
///     }
/// }
///
/// let config = Configuration::parse(
///     r#"
///     name = "svc"
///     retries = 3
///
///     [db]
///     host = "localhost"
///     port = 5432
///     "#,
/// )?;
///
/// let service: ServiceConfig = instantiate(&config)?.expect("config is not empty");
/// assert_eq!(service.retries, 3);
/// assert_eq!(service.db.unwrap().port, 5432);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn instantiate<T: Bindable>(config: &Configuration) -> Result<Option<T>, BindError> {
    let mut binder = Binder::new();
    binder.instantiate(&Scope::root(config))
}

/// One binding pass over a target object graph.
///
/// Holds the per-pass handler cache, keyed by handler type so each handler
/// implementation is constructed at most once and reused across bindings.
pub struct Binder {
    handlers: HashMap<TypeId, Box<dyn PropertyHandler>>,
}

impl Binder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Binds `T` from `scope`, recursing into nested members.
    ///
    /// An entirely empty scope collapses to `Ok(None)`; an absent nested
    /// object is no object, not an empty shell.
    pub fn instantiate<T: Bindable>(&mut self, scope: &Scope<'_>) -> Result<Option<T>, BindError> {
        if scope.is_empty() {
            trace!(path = scope.path().unwrap_or(""), "empty scope, no object");
            return Ok(None);
        }

        debug!(
            ty = type_name::<T>(),
            path = scope.path().unwrap_or(""),
            "binding target"
        );

        let scan = T::bindings().collect();
        scan.check_conflicts().map_err(wrap_frame::<T>)?;

        let mut instance = T::default();
        self.apply(scope, &scan, &mut instance)
            .map_err(wrap_frame::<T>)?;

        Ok(Some(instance))
    }

    fn apply<T: 'static>(
        &mut self,
        scope: &Scope<'_>,
        scan: &Scan<T>,
        instance: &mut T,
    ) -> Result<(), BindError> {
        for binding in &scan.simple {
            let name = binding.resolved_name();
            let handler = self.handler(&binding.handler);
            if let Some(value) = handler.value(scope, &name, &binding.ty)? {
                trace!(path = %scope.full_path(&name), "applying simple binding");
                (binding.apply)(instance, value)?;
            }
        }

        for binding in &scan.nested {
            let name = binding.resolved_name();
            let implementation = binding.effective_implementation()?;
            if implementation.produces.id != binding.declared.id {
                return Err(BindError::TypeMismatch {
                    declared: binding.declared.name,
                    implementation: implementation.source.name,
                    member: binding.member.to_string(),
                });
            }
            let child = scope.descend(&name);
            trace!(path = child.path().unwrap_or(""), "binding nested object");
            let value = (implementation.bind)(self, &child)?;
            (binding.apply)(instance, value)?;
        }

        Ok(())
    }

    fn handler(&mut self, spec: &HandlerSpec) -> &dyn PropertyHandler {
        &**self
            .handlers
            .entry(spec.id)
            .or_insert_with(spec.create)
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a frame's failure once; an error already carrying a frame wrapper
/// propagates unchanged so the innermost failing type stays named.
fn wrap_frame<T>(error: BindError) -> BindError {
    match error {
        wrapped @ BindError::Binding { .. } => wrapped,
        other => BindError::Binding {
            type_name: type_name::<T>(),
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::handler::DefaultHandler;
    use crate::bind::schema::{Bindings, Implementation, Nested, Simple, TypeSpec};
    use std::any::Any;

    fn make_config(toml_str: &str) -> Configuration {
        Configuration::parse(toml_str).unwrap()
    }

    #[derive(Debug, Default, PartialEq)]
    struct Database {
        host: String,
        port: i32,
    }

    impl Bindable for Database {
        fn bindings() -> Bindings<Self> {
            Bindings::new()
                .simple(Simple::field("host", |d: &mut Self, v: String| d.host = v))
                .simple(Simple::field("port", |d: &mut Self, v: i32| d.port = v))
        }
    }

    #[derive(Debug, Default)]
    struct Service {
        name: String,
        retries: i32,
        timeout: Option<i64>,
        db: Option<Database>,
    }

    impl Bindable for Service {
        fn bindings() -> Bindings<Self> {
            Bindings::new()
                .simple(Simple::field("name", |s: &mut Self, v: String| s.name = v))
                .simple(Simple::field("retries", |s: &mut Self, v: i32| s.retries = v))
                .simple(Simple::field("timeout", |s: &mut Self, v: Option<i64>| {
                    s.timeout = v
                }))
                .nested(Nested::field("db", |s: &mut Self, v: Option<Database>| {
                    s.db = v
                }))
        }
    }

    #[test]
    fn test_round_trip() {
        let config = make_config(
            r#"
            name = "svc"
            retries = "3"

            [db]
            host = "localhost"
            port = "5432"
            "#,
        );

        let service: Service = instantiate(&config).unwrap().unwrap();

        assert_eq!(service.name, "svc");
        assert_eq!(service.retries, 3);
        assert_eq!(
            service.db,
            Some(Database {
                host: "localhost".to_string(),
                port: 5432,
            })
        );
    }

    #[test]
    fn test_empty_config_collapses_to_none() {
        let config = Configuration::from_table(toml::Table::new());
        let service: Option<Service> = instantiate(&config).unwrap();
        assert!(service.is_none());
    }

    #[test]
    fn test_missing_required_scalar_fails_with_path() {
        let config = make_config("name = \"svc\"");
        let err = instantiate::<Service>(&config).unwrap_err();
        let BindError::Binding { type_name, source } = err else {
            panic!("expected frame wrapper");
        };
        assert!(type_name.contains("Service"));
        let BindError::MissingRequired { path, .. } = *source else {
            panic!("expected MissingRequired");
        };
        assert_eq!(path, "retries");
    }

    #[test]
    fn test_nested_failure_names_inner_type_and_full_path() {
        let config = make_config(
            r#"
            name = "svc"
            retries = 3

            [db]
            host = "localhost"
            "#,
        );
        let err = instantiate::<Service>(&config).unwrap_err();
        // the wrapper is applied where the failure arose, not re-applied above
        let BindError::Binding { type_name, source } = err else {
            panic!("expected frame wrapper");
        };
        assert!(type_name.contains("Database"));
        let BindError::MissingRequired { path, .. } = *source else {
            panic!("expected MissingRequired");
        };
        assert_eq!(path, "db.port");
    }

    #[test]
    fn test_absent_optional_keeps_default() {
        let config = make_config("name = \"svc\"\nretries = 0");
        let service: Service = instantiate(&config).unwrap().unwrap();
        assert_eq!(service.timeout, None);
    }

    #[test]
    fn test_absent_string_keeps_default() {
        let config = make_config("retries = 0");
        let service: Service = instantiate(&config).unwrap().unwrap();
        assert_eq!(service.name, "");
    }

    #[test]
    fn test_absent_nested_subtree_binds_none() {
        let config = make_config("name = \"svc\"\nretries = 3");
        let service: Service = instantiate(&config).unwrap().unwrap();
        assert!(service.db.is_none());
    }

    #[test]
    fn test_absent_nested_overwrites_default() {
        #[derive(Debug)]
        struct Preset {
            db: Option<Database>,
        }

        impl Default for Preset {
            fn default() -> Self {
                Self {
                    db: Some(Database {
                        host: "preset".to_string(),
                        port: 1,
                    }),
                }
            }
        }

        impl Bindable for Preset {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(Nested::field("db", |p: &mut Self, v: Option<Database>| {
                    p.db = v
                }))
            }
        }

        let config = make_config("other = 1");
        let preset: Preset = instantiate(&config).unwrap().unwrap();
        assert!(preset.db.is_none());
    }

    #[test]
    fn test_extended_schema_binds_base_members() {
        #[derive(Debug, Default)]
        struct BaseOpts {
            verbose: Option<bool>,
        }

        impl Bindable for BaseOpts {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(Simple::field(
                    "verbose",
                    |b: &mut Self, v: Option<bool>| b.verbose = v,
                ))
            }
        }

        #[derive(Debug, Default)]
        struct AppOpts {
            level: i32,
            base: BaseOpts,
        }

        impl Bindable for AppOpts {
            fn bindings() -> Bindings<Self> {
                Bindings::new()
                    .simple(Simple::field("level", |a: &mut Self, v: i32| a.level = v))
                    .extend(|a: &mut Self| &mut a.base)
            }
        }

        let config = make_config("level = 2\nverbose = true");
        let opts: AppOpts = instantiate(&config).unwrap().unwrap();
        assert_eq!(opts.level, 2);
        assert_eq!(opts.base.verbose, Some(true));
    }

    #[test]
    fn test_setter_derived_key() {
        #[derive(Debug, Default)]
        struct Limits {
            max_retries: i32,
        }

        impl Limits {
            fn set_max_retries(&mut self, value: i32) {
                self.max_retries = value;
            }
        }

        impl Bindable for Limits {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(Simple::setter("set_max_retries", Limits::set_max_retries))
            }
        }

        let config = make_config("max_retries = 7");
        let limits: Limits = instantiate(&config).unwrap().unwrap();
        assert_eq!(limits.max_retries, 7);
    }

    #[test]
    fn test_key_override() {
        #[derive(Debug, Default)]
        struct Renamed {
            retries: i32,
        }

        impl Bindable for Renamed {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(
                    Simple::field("retries", |r: &mut Self, v: i32| r.retries = v)
                        .key("retry_count"),
                )
            }
        }

        let config = make_config("retry_count = 9");
        let renamed: Renamed = instantiate(&config).unwrap().unwrap();
        assert_eq!(renamed.retries, 9);
    }

    #[test]
    fn test_conflicting_binding_rejected_before_construction() {
        #[derive(Debug, Default)]
        struct Conflicted {
            db: Option<String>,
        }

        impl Bindable for Conflicted {
            fn bindings() -> Bindings<Self> {
                Bindings::new()
                    .simple(Simple::field("db", |c: &mut Self, v: Option<String>| {
                        c.db = v
                    }))
                    .nested(Nested::field("db", |_: &mut Self, _: Option<Database>| {}))
            }
        }

        let config = make_config("db = \"oops\"");
        let err = instantiate::<Conflicted>(&config).unwrap_err();
        let BindError::Binding { source, .. } = err else {
            panic!("expected frame wrapper");
        };
        assert!(matches!(*source, BindError::ConflictingBinding { .. }));
    }

    trait Animal {
        fn tag(&self) -> &str;
    }

    #[derive(Debug, Default)]
    struct Dog {
        tag: String,
    }

    impl Animal for Dog {
        fn tag(&self) -> &str {
            &self.tag
        }
    }

    impl Bindable for Dog {
        fn bindings() -> Bindings<Self> {
            Bindings::new().simple(Simple::field("tag", |d: &mut Self, v: String| d.tag = v))
        }
    }

    #[derive(Debug, Default)]
    struct Car {
        wheels: i32,
    }

    impl Bindable for Car {
        fn bindings() -> Bindings<Self> {
            Bindings::new().simple(Simple::field("wheels", |c: &mut Self, v: i32| c.wheels = v))
        }
    }

    #[derive(Default)]
    struct Zoo {
        pet: Option<Box<dyn Animal>>,
    }

    impl std::fmt::Debug for Zoo {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Zoo").finish()
        }
    }

    #[test]
    fn test_unrelated_implementation_rejected_before_construction() {
        impl Bindable for Zoo {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(
                    Nested::dyn_field("pet", |z: &mut Self, v: Option<Box<dyn Animal>>| {
                        z.pet = v
                    })
                    .implemented_by(Implementation::of::<Car>()),
                )
            }
        }

        let config = make_config("[pet]\nwheels = 4");
        let err = instantiate::<Zoo>(&config).unwrap_err();
        let BindError::Binding { source, .. } = err else {
            panic!("expected frame wrapper");
        };
        let BindError::TypeMismatch {
            declared,
            implementation,
            ..
        } = *source
        else {
            panic!("expected TypeMismatch");
        };
        assert!(declared.contains("Animal"));
        assert!(implementation.contains("Car"));
    }

    #[derive(Default)]
    struct Kennel {
        pet: Option<Box<dyn Animal>>,
    }

    #[test]
    fn test_mapped_implementation_binds_trait_object() {
        impl Bindable for Kennel {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(
                    Nested::dyn_field("pet", |k: &mut Self, v: Option<Box<dyn Animal>>| {
                        k.pet = v
                    })
                    .implemented_by(Implementation::mapped::<Dog, Box<dyn Animal>>(|d| {
                        Box::new(d)
                    })),
                )
            }
        }

        let config = make_config("[pet]\ntag = \"rex\"");
        let kennel: Kennel = instantiate(&config).unwrap().unwrap();
        assert_eq!(kennel.pet.unwrap().tag(), "rex");
    }

    #[derive(Default)]
    struct Shelter {
        pet: Option<Box<dyn Animal>>,
    }

    impl std::fmt::Debug for Shelter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Shelter").finish()
        }
    }

    #[test]
    fn test_unconstructible_declared_type_without_override() {
        impl Bindable for Shelter {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(Nested::dyn_field(
                    "pet",
                    |s: &mut Self, v: Option<Box<dyn Animal>>| s.pet = v,
                ))
            }
        }

        let config = make_config("[pet]\ntag = \"rex\"");
        let err = instantiate::<Shelter>(&config).unwrap_err();
        let BindError::Binding { source, .. } = err else {
            panic!("expected frame wrapper");
        };
        assert!(matches!(*source, BindError::Instantiation { .. }));
    }

    #[test]
    fn test_deeply_nested_error_path() {
        #[derive(Debug, Default)]
        struct Pool {
            size: i32,
        }

        impl Bindable for Pool {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(Simple::field("size", |p: &mut Self, v: i32| p.size = v))
            }
        }

        #[derive(Debug, Default)]
        struct Db {
            pool: Option<Pool>,
        }

        impl Bindable for Db {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(Nested::field("pool", |d: &mut Self, v: Option<Pool>| {
                    d.pool = v
                }))
            }
        }

        #[derive(Debug, Default)]
        struct App {
            db: Option<Db>,
        }

        impl Bindable for App {
            fn bindings() -> Bindings<Self> {
                Bindings::new().nested(Nested::field("db", |a: &mut Self, v: Option<Db>| {
                    a.db = v
                }))
            }
        }

        let config = make_config("[db.pool]\nsize = \"huge\"");
        let err = instantiate::<App>(&config).unwrap_err();
        let BindError::Binding { type_name, source } = err else {
            panic!("expected frame wrapper");
        };
        assert!(type_name.contains("Pool"));
        let BindError::Conversion { path, .. } = *source else {
            panic!("expected Conversion");
        };
        assert_eq!(path, "db.pool.size");
    }

    /// Parses `0x`-prefixed strings into an `i32`.
    #[derive(Default)]
    struct HexHandler;

    impl PropertyHandler for HexHandler {
        fn value(
            &self,
            scope: &Scope<'_>,
            name: &str,
            ty: &TypeSpec,
        ) -> Result<Option<Box<dyn Any>>, BindError> {
            match scope.get_string(name) {
                Ok(Some(text)) => {
                    let digits = text.trim_start_matches("0x");
                    let parsed = i32::from_str_radix(digits, 16).map_err(|_| {
                        BindError::Conversion {
                            path: scope.full_path(name),
                            type_name: ty.name(),
                            source: crate::config::ValueError::Invalid {
                                raw: text.clone(),
                                expected: "hex integer",
                            },
                        }
                    })?;
                    Ok(Some(Box::new(parsed)))
                }
                Ok(None) => Ok(None),
                Err(source) => Err(BindError::Conversion {
                    path: scope.full_path(name),
                    type_name: ty.name(),
                    source,
                }),
            }
        }
    }

    #[test]
    fn test_handler_override() {
        #[derive(Debug, Default)]
        struct Flags {
            mask: i32,
        }

        impl Bindable for Flags {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(
                    Simple::field("mask", |f: &mut Self, v: i32| f.mask = v)
                        .handler::<HexHandler>(),
                )
            }
        }

        let config = make_config("mask = \"0xff\"");
        let flags: Flags = instantiate(&config).unwrap().unwrap();
        assert_eq!(flags.mask, 255);
    }

    /// Always yields a `String`, regardless of the requested type.
    #[derive(Default)]
    struct WrongTypeHandler;

    impl PropertyHandler for WrongTypeHandler {
        fn value(
            &self,
            _scope: &Scope<'_>,
            _name: &str,
            _ty: &TypeSpec,
        ) -> Result<Option<Box<dyn Any>>, BindError> {
            Ok(Some(Box::new("not an integer".to_string())))
        }
    }

    #[test]
    fn test_mistyped_handler_output_rejected() {
        #[derive(Debug, Default)]
        struct Broken {
            n: i32,
        }

        impl Bindable for Broken {
            fn bindings() -> Bindings<Self> {
                Bindings::new().simple(
                    Simple::field("n", |b: &mut Self, v: i32| b.n = v)
                        .handler::<WrongTypeHandler>(),
                )
            }
        }

        let config = make_config("n = 1");
        let err = instantiate::<Broken>(&config).unwrap_err();
        let BindError::Binding { source, .. } = err else {
            panic!("expected frame wrapper");
        };
        assert!(matches!(*source, BindError::HandlerMismatch { .. }));
    }

    #[test]
    fn test_handler_instances_are_reused_per_pass() {
        let mut binder = Binder::new();
        let spec = HandlerSpec::of::<DefaultHandler>();
        let first = binder.handler(&spec) as *const dyn PropertyHandler;
        let second = binder.handler(&spec) as *const dyn PropertyHandler;
        assert_eq!(first as *const (), second as *const ());
    }
}

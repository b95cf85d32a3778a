//! Declarative binding of hierarchical TOML configuration onto typed structs.
//!
//! A target type describes its bindable members once, in a [`Bindings`]
//! schema, and [`instantiate`] populates an instance from a
//! [`Configuration`] tree: simple values are converted through a typed
//! registry, nested objects are bound recursively from child scopes, and
//! every failure names the dotted configuration path that caused it.
//!
//! Bare scalar members (`i32`, `bool`, ...) are implicitly required; their
//! `Option` counterparts, and all other registered types, are optional and
//! keep the instance's default when the key is absent. A nested member bound
//! from an entirely empty scope resolves to `None` rather than an empty
//! shell.
//!
//! ## Example
//!
//! ```
//! use confbind::{instantiate, Bindable, Bindings, Configuration, Simple};
//!
//! #[derive(Debug, Default)]
//! struct ServerConfig {
//!     host: String,
//!     port: i32,
//! }
//!
//! impl Bindable for ServerConfig {
//!     fn bindings() -> Bindings<Self> {
//!         Bindings::new()
//!             .simple(Simple::field("host", |c: &mut Self, v: String| c.host = v))
//!             .simple(Simple::field("port", |c: &mut Self, v: i32| c.port = v))
//!     }
//! }
//!
//! let config = Configuration::parse("host = \"0.0.0.0\"\nport = 8080")?;
//! let server: ServerConfig = instantiate(&config)?.expect("non-empty config");
//! assert_eq!(server.port, 8080);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bind;
pub mod config;
mod error;

pub use bind::{instantiate, Bindable, BindError, Bindings, Implementation, Nested, Simple};
pub use config::{Configuration, LoadError};
pub use error::Error;

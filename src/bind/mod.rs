//! Declarative binding of configuration scopes onto target types.

mod engine;
mod error;
mod handler;
mod schema;
mod scope;

pub use engine::{instantiate, Binder};
pub use error::BindError;
pub use handler::{DefaultHandler, HandlerSpec, PropertyHandler};
pub use schema::{Bindable, Bindings, Implementation, Member, Nested, Simple, TypeSpec};
pub use scope::Scope;

use thiserror::Error;

use crate::config::ValueError;

/// Errors raised while binding a configuration scope onto a target type.
///
/// Every failure is fatal to the whole binding pass and carries enough path
/// and type context to name the offending configuration key, however deeply
/// nested. There is no partial-result mode.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    /// No converter is registered for the requested target type. Matching is
    /// by exact type, never by coercibility.
    #[error("no value converter registered for type {type_name}")]
    UnsupportedType { type_name: &'static str },

    /// The raw value at `path` exists but cannot be coerced to the target
    /// type.
    #[error("error parsing property {path} as {type_name}")]
    Conversion {
        path: String,
        type_name: &'static str,
        #[source]
        source: ValueError,
    },

    /// A required scalar resolved to absent.
    #[error("missing required property {path} of type {type_name}")]
    MissingRequired {
        path: String,
        type_name: &'static str,
    },

    /// A nested binding's implementation override does not produce the
    /// member's declared type.
    #[error("{implementation} cannot be assigned to {declared} ({member})")]
    TypeMismatch {
        declared: &'static str,
        implementation: &'static str,
        member: String,
    },

    /// A member is bound both as a simple value and as a nested object.
    #[error("{member} is bound both as a simple value and as a nested object")]
    ConflictingBinding { member: String },

    /// A nested member's declared type has no constructible implementation
    /// and no override was given.
    #[error("no constructible implementation for {type_name} ({member})")]
    Instantiation {
        type_name: &'static str,
        member: String,
    },

    /// A handler produced a value of a type other than the one requested.
    #[error("handler for {member} produced a value that is not a {expected}")]
    HandlerMismatch {
        member: String,
        expected: &'static str,
    },

    /// Umbrella wrapper naming the target type whose binding failed. Applied
    /// once, at the frame where the failure originated; outer frames pass it
    /// through unchanged.
    #[error("error setting properties of {type_name}")]
    Binding {
        type_name: &'static str,
        #[source]
        source: Box<BindError>,
    },
}

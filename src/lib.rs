//! Config Weaver - self-referential configuration resolution
//!
//! A configuration is a nested value of string leaves, mappings, and
//! sequences. String leaves may hold `{{ ... }}` expressions referencing
//! other keys of the same configuration, including through multiple hops.
//! This library resolves such a configuration to its fixed point: rendering
//! passes repeat until the value stops changing, bounded so that reference
//! cycles fail instead of looping forever.
//!
//! # Example
//!
//! ```rust
//! use config_weaver::{resolve, Value};
//!
//! let initial = Value::from_yaml(r#"
//! name: db
//! host: "{{ name }}.internal"
//! url: "postgres://{{ host }}"
//! "#).unwrap();
//!
//! let resolved = resolve(&initial).unwrap();
//! assert_eq!(
//!     resolved.get_path(&["url"]).unwrap().as_str(),
//!     Some("postgres://db.internal"),
//! );
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod value;

pub use config::{ConfigContext, ConfigError, ConfigLoader};
pub use engine::{
    EngineError, HelperError, Helpers, ResolveError, Resolver, StdHelpers, TemplateEngine,
    MAX_ITERATIONS,
};
pub use error::ParseError;
pub use parser::parse_template;
pub use value::Value;

/// Resolve a configuration with the default engine and iteration bound
///
/// This is the main entry point for the library. Build a [`Resolver`]
/// directly to inject helpers or change the bound.
pub fn resolve(initial: &Value) -> Result<Value, ResolveError> {
    Resolver::new().resolve(initial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_reference() {
        let initial = Value::from_yaml("a: \"{{ b }}\"\nb: leaf\n").unwrap();
        let resolved = resolve(&initial).unwrap();
        assert_eq!(resolved.get_path(&["a"]).unwrap().as_str(), Some("leaf"));
    }

    #[test]
    fn test_resolve_literal_value_untouched() {
        let initial = Value::from_yaml("a: plain\n").unwrap();
        let resolved = resolve(&initial).unwrap();
        assert_eq!(resolved, initial);
    }

    #[test]
    fn test_resolve_undefined_reference_error() {
        let initial = Value::from_yaml("a: \"{{ missing }}\"\n").unwrap();
        let err = resolve(&initial).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Engine(EngineError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_resolve_cycle_error() {
        let initial = Value::from_yaml("a: \"{{ b }}\"\nb: \"{{ a }}\"\n").unwrap();
        let err = resolve(&initial).unwrap_err();
        assert!(matches!(err, ResolveError::Convergence { .. }));
    }
}

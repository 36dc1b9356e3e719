//! Template engine and fixed-point resolver
//!
//! The engine renders one pass of a configuration value: every string leaf
//! has its `{{ ... }}` expressions evaluated against the whole previous
//! snapshot. The resolver repeats passes until the value stops changing.
//!
//! # Example
//!
//! ```rust
//! use config_weaver::{Resolver, Value};
//!
//! let initial = Value::from_yaml("name: db\nurl: \"postgres://{{ name }}\"\n").unwrap();
//! let resolved = Resolver::new().resolve(&initial).unwrap();
//! assert_eq!(resolved.get_path(&["url"]).unwrap().as_str(), Some("postgres://db"));
//! ```

mod eval;
mod helpers;
mod resolver;

pub use eval::{EngineError, TemplateEngine};
pub use helpers::{gen_names, HelperError, Helpers, StdHelpers};
pub use resolver::{ResolveError, Resolver, MAX_ITERATIONS};

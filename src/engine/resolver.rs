//! Fixed-point resolution of self-referential configuration values
//!
//! A configuration may reference its own keys through any number of hops
//! (`n4` -> `n2` -> `n1.nn1`), so one rendering pass is not enough. The
//! resolver repeats whole-tree passes until a pass changes nothing, bounded
//! by a fixed iteration count so that true reference cycles fail instead of
//! looping forever.

use thiserror::Error;
use tracing::debug;

use crate::engine::eval::{EngineError, TemplateEngine};
use crate::value::Value;

/// Iteration bound: chains deeper than this fail with [`ResolveError::Convergence`]
pub const MAX_ITERATIONS: usize = 10;

/// Errors from [`Resolver::resolve`]
///
/// All variants are terminal for the call: no partial result is returned and
/// nothing is retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Error during a rendering pass
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Iteration bound exhausted without stabilization: a reference cycle
    /// or an expansion that grows on every pass
    #[error("unable to fully resolve configuration after {iterations} iterations")]
    Convergence {
        iterations: usize,
        /// Last rendered snapshot, for diagnostics
        last: Box<Value>,
    },
}

/// Resolves a configuration value to its rendering fixed point
pub struct Resolver {
    engine: TemplateEngine,
    max_iterations: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver with production helpers and the default iteration bound
    pub fn new() -> Self {
        Self::with_engine(TemplateEngine::new())
    }

    /// Resolver around a caller-built engine (e.g. with fake helpers)
    pub fn with_engine(engine: TemplateEngine) -> Self {
        Self {
            engine,
            max_iterations: MAX_ITERATIONS,
        }
    }

    /// Override the iteration bound
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Resolve all expressions in `initial`, returning the fixed point
    ///
    /// The input is never mutated; each pass renders the previous snapshot.
    /// Convergence is structural equality between consecutive snapshots with
    /// no expressions remaining, so a converged result is by construction a
    /// stable, fully substituted fixed point. A reference cycle reaches a
    /// snapshot that reproduces itself while still holding expressions
    /// (`a: "{{ a }}"`); that state is never accepted, so cycles exhaust the
    /// bound and fail.
    pub fn resolve(&self, initial: &Value) -> Result<Value, ResolveError> {
        let mut current = initial.clone();
        for iteration in 0..self.max_iterations {
            let next = self.engine.render_value(&current)?;
            if next == current {
                if !contains_expressions(&next) {
                    debug!(iteration, "configuration converged");
                    return Ok(next);
                }
                debug!(iteration, "snapshot stable but expressions remain");
            } else {
                debug!(iteration, "rendering pass changed the configuration");
            }
            current = next;
        }
        Err(ResolveError::Convergence {
            iterations: self.max_iterations,
            last: Box::new(current),
        })
    }
}

/// True when any string leaf still holds an opening expression delimiter
fn contains_expressions(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains("{{"),
        Value::Mapping(m) => m.values().any(contains_expressions),
        Value::Sequence(s) => s.iter().any(contains_expressions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn value(yaml: &str) -> Value {
        Value::from_yaml(yaml).expect("test value should parse")
    }

    #[test]
    fn test_multi_hop_reference_example() {
        let initial = value(
            r#"
"n1":
  "nn1": "n1_nn1_v"
  "nn2": "{{ n3.nn1 }}"
"n2": "{{ n1.nn1 }}"
"n3":
  "nn1": "n3_nn1_v"
  "nn2": "n3_nn2_v"
"n4": "{{ n2 }}"
"n5":
  "nn1": "n5_nn1_v"
"n6": "n6_v"
"#,
        );
        let expected = value(
            r#"
"n1":
  "nn1": "n1_nn1_v"
  "nn2": "n3_nn1_v"
"n2": "n1_nn1_v"
"n3":
  "nn1": "n3_nn1_v"
  "nn2": "n3_nn2_v"
"n4": "n1_nn1_v"
"n5":
  "nn1": "n5_nn1_v"
"n6": "n6_v"
"#,
        );

        let resolved = Resolver::new().resolve(&initial).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_deep_chain_converges_within_bound() {
        // Reference chain of depth 9, the deepest the bound supports
        let initial = value(
            r#"
v0: leaf
v1: "{{ v0 }}"
v2: "{{ v1 }}"
v3: "{{ v2 }}"
v4: "{{ v3 }}"
v5: "{{ v4 }}"
v6: "{{ v5 }}"
v7: "{{ v6 }}"
v8: "{{ v7 }}"
v9: "{{ v8 }}"
"#,
        );
        let resolved = Resolver::new().resolve(&initial).unwrap();
        for key in ["v1", "v5", "v9"] {
            assert_eq!(
                resolved.get_path(&[key]),
                Some(&Value::String("leaf".to_string())),
                "{} should be fully resolved",
                key
            );
        }
    }

    #[test]
    fn test_cycle_fails_with_convergence_error() {
        let initial = value("a: \"{{ b }}\"\nb: \"{{ a }}\"\n");
        let err = Resolver::new().resolve(&initial).unwrap_err();
        match err {
            ResolveError::Convergence { iterations, .. } => {
                assert_eq!(iterations, MAX_ITERATIONS)
            }
            other => panic!("Expected convergence error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_fails_with_convergence_error() {
        // Self-reproducing snapshots are stable but never accepted
        let initial = value("a: \"{{ a }}\"\n");
        let err = Resolver::new().resolve(&initial).unwrap_err();
        assert!(matches!(err, ResolveError::Convergence { .. }));
    }

    #[test]
    fn test_convergence_error_carries_last_snapshot() {
        let initial = value("a: \"{{ b }}\"\nb: \"{{ a }}\"\n");
        let err = Resolver::new().resolve(&initial).unwrap_err();
        match err {
            ResolveError::Convergence { last, .. } => {
                assert!(last.get_path(&["a"]).is_some());
            }
            other => panic!("Expected convergence error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolved_output_is_a_fixed_point() {
        let initial = value("a: \"{{ b }}\"\nb: leaf\n");
        let resolver = Resolver::new();
        let resolved = resolver.resolve(&initial).unwrap();
        let resolved_again = resolver.resolve(&resolved).unwrap();
        assert_eq!(resolved, resolved_again);
    }

    #[test]
    fn test_string_literals_keep_their_type() {
        let initial = value("flag: \"True\"\ncount: \"0\"\ncopy: \"{{ flag }}\"\n");
        let resolved = Resolver::new().resolve(&initial).unwrap();
        assert_eq!(
            resolved.get_path(&["flag"]),
            Some(&Value::String("True".to_string()))
        );
        assert_eq!(
            resolved.get_path(&["count"]),
            Some(&Value::String("0".to_string()))
        );
        assert_eq!(
            resolved.get_path(&["copy"]),
            Some(&Value::String("True".to_string()))
        );
    }

    #[test]
    fn test_undefined_reference_fails_on_first_pass() {
        let initial = value("a: \"{{ does_not_exist }}\"\n");
        let err = Resolver::new().resolve(&initial).unwrap_err();
        match err {
            ResolveError::Engine(EngineError::UndefinedVariable { path, .. }) => {
                assert_eq!(path, "does_not_exist")
            }
            other => panic!("Expected undefined variable, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_expanding_to_expression() {
        // n4 holds literal text that itself becomes an expression after one
        // hop; multi-pass rendering resolves it.
        let initial = value("n1:\n  nn1: deep\nn2: \"{{ n1.nn1 }}\"\nn4: \"{{ n2 }}\"\n");
        let resolved = Resolver::new().resolve(&initial).unwrap();
        assert_eq!(
            resolved.get_path(&["n4"]),
            Some(&Value::String("deep".to_string()))
        );
    }

    #[test]
    fn test_structural_substitution_then_reference() {
        // A whole-mapping alias is substituted structurally, and its inner
        // expressions resolve on later passes.
        let initial = value(
            "template:\n  host: \"{{ defaults.host }}\"\ndefaults:\n  host: localhost\nalias: \"{{ template }}\"\n",
        );
        let resolved = Resolver::new().resolve(&initial).unwrap();
        assert_eq!(
            resolved.get_path(&["alias", "host"]),
            Some(&Value::String("localhost".to_string()))
        );
    }

    #[test]
    fn test_custom_iteration_bound() {
        let initial = value("a: \"{{ b }}\"\nb: \"{{ a }}\"\n");
        let err = Resolver::new()
            .with_max_iterations(3)
            .resolve(&initial)
            .unwrap_err();
        match err {
            ResolveError::Convergence { iterations, .. } => assert_eq!(iterations, 3),
            other => panic!("Expected convergence error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_holds_no_state_across_calls() {
        let resolver = Resolver::new();
        let first = value("a: \"{{ b }}\"\nb: one\n");
        let second = value("a: \"{{ b }}\"\nb: two\n");
        assert_eq!(
            resolver.resolve(&first).unwrap().get_path(&["a"]),
            Some(&Value::String("one".to_string()))
        );
        assert_eq!(
            resolver.resolve(&second).unwrap().get_path(&["a"]),
            Some(&Value::String("two".to_string()))
        );
    }
}

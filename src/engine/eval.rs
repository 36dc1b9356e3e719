//! Tree-walking evaluation of template expressions
//!
//! One rendering pass is a pure function of the previous snapshot: every
//! expression in the tree resolves against the same context value, so no
//! expression observes partial results from its own pass.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::engine::helpers::{
    gen_names, HelperError, Helpers, StdHelpers, DEFAULT_CERT_COMMON_NAME, DEFAULT_PASSWORD_LENGTH,
};
use crate::error::ParseError;
use crate::parser::ast::{Arg, Expr, KeyPath, Segment, Span, Spanned};
use crate::parser::parse_template;
use crate::value::Value;

/// Errors from evaluating the expressions in a configuration value
#[derive(Debug, Error)]
pub enum EngineError {
    /// A lookup did not resolve against the current snapshot.
    /// Referencing a missing key is a hard failure, never an empty
    /// substitution, so typos cannot masquerade as resolved values.
    #[error("undefined variable '{path}'")]
    UndefinedVariable { path: String, span: Span },

    /// An expression embedded in literal text produced a non-scalar
    #[error("expression embedded in text must produce a string, got a {kind}")]
    NotAScalar { kind: &'static str, span: Span },

    #[error("unknown helper '{name}'")]
    UnknownHelper { name: String, span: Span },

    #[error("unknown filter '{name}'")]
    UnknownFilter { name: String, span: Span },

    #[error("filter {name}: {message}")]
    Filter {
        name: String,
        message: String,
        span: Span,
    },

    #[error("syntax errors: {}", format_parse_errors(.0))]
    Syntax(Vec<ParseError>),

    #[error(transparent)]
    Helper(#[from] HelperError),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Template engine rendering string values against a context snapshot
///
/// Helper calls go through an injected [`Helpers`] implementation;
/// [`StdHelpers`] is the production one.
pub struct TemplateEngine {
    helpers: Box<dyn Helpers>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Engine with production helpers
    pub fn new() -> Self {
        Self::with_helpers(Box::new(StdHelpers))
    }

    /// Engine with a caller-supplied helper implementation
    pub fn with_helpers(helpers: Box<dyn Helpers>) -> Self {
        Self { helpers }
    }

    /// One whole-tree rendering pass against `root` as the context
    pub fn render_value(&self, root: &Value) -> Result<Value, EngineError> {
        self.render_node(root, root)
    }

    fn render_node(&self, node: &Value, context: &Value) -> Result<Value, EngineError> {
        match node {
            Value::String(s) => self.render_str(s, context),
            Value::Mapping(m) => {
                let mut rendered = std::collections::BTreeMap::new();
                for (key, value) in m {
                    rendered.insert(key.clone(), self.render_node(value, context)?);
                }
                Ok(Value::Mapping(rendered))
            }
            Value::Sequence(s) => {
                let mut rendered = Vec::with_capacity(s.len());
                for value in s {
                    rendered.push(self.render_node(value, context)?);
                }
                Ok(Value::Sequence(rendered))
            }
        }
    }

    /// Render one string value against the context
    ///
    /// A string that is exactly one expression yields the evaluated value,
    /// whatever its shape. Expressions mixed with literal text must each
    /// evaluate to a string scalar.
    pub fn render_str(&self, text: &str, context: &Value) -> Result<Value, EngineError> {
        // Values without an opening delimiter are literal
        if !text.contains("{{") {
            return Ok(Value::String(text.to_string()));
        }

        let template = parse_template(text).map_err(EngineError::Syntax)?;

        if let Some(expr) = template.as_single_expr() {
            return self.eval_expr(expr, context);
        }

        let mut out = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Expr(expr) => match self.eval_expr(expr, context)? {
                    Value::String(s) => out.push_str(&s),
                    other => {
                        return Err(EngineError::NotAScalar {
                            kind: other.kind(),
                            span: expr.span.clone(),
                        })
                    }
                },
            }
        }
        Ok(Value::String(out))
    }

    fn eval_expr(&self, expr: &Spanned<Expr>, context: &Value) -> Result<Value, EngineError> {
        match &expr.node {
            Expr::Lookup(path) => self.lookup(path, &expr.span, context).cloned(),
            Expr::Call { name, args } => self.eval_call(name, args, context),
            Expr::Filtered { inner, filter } => {
                let value = self.eval_expr(inner, context)?;
                self.apply_filter(value, filter)
            }
        }
    }

    fn lookup<'c>(
        &self,
        path: &KeyPath,
        span: &Span,
        context: &'c Value,
    ) -> Result<&'c Value, EngineError> {
        let segments: Vec<&str> = path.segments.iter().map(|s| s.node.as_str()).collect();
        context
            .get_path(&segments)
            .ok_or_else(|| EngineError::UndefinedVariable {
                path: path.dotted(),
                span: span.clone(),
            })
    }

    fn eval_call(
        &self,
        name: &Spanned<String>,
        args: &[Spanned<Arg>],
        context: &Value,
    ) -> Result<Value, EngineError> {
        let bad_call = |message: &str| {
            EngineError::Helper(HelperError::BadCall {
                name: name.node.clone(),
                message: message.to_string(),
            })
        };

        match name.node.as_str() {
            "raise" => {
                let [message] = args else {
                    return Err(bad_call("expects exactly one message argument"));
                };
                let message = self.arg_scalar(message, context)?;
                Err(EngineError::Helper(HelperError::Directive { message }))
            }
            "gen_names" => {
                let (prefix, count) = match args {
                    [prefix] => (self.arg_scalar(prefix, context)?, None),
                    [prefix, count] => (
                        self.arg_scalar(prefix, context)?,
                        Some(self.arg_scalar(count, context)?),
                    ),
                    _ => return Err(bad_call("expects a prefix and an optional count")),
                };
                let names = gen_names(&prefix, count.as_deref())?;
                Ok(Value::Sequence(names.into_iter().map(Value::String).collect()))
            }
            "mkpass" => {
                let length = match args {
                    [] => DEFAULT_PASSWORD_LENGTH,
                    [length] => self
                        .arg_scalar(length, context)?
                        .parse::<usize>()
                        .map_err(|_| bad_call("length must be a non-negative integer"))?,
                    _ => return Err(bad_call("expects an optional length")),
                };
                Ok(Value::String(self.helpers.mkpass(length)?))
            }
            "keygen" => {
                if !args.is_empty() {
                    return Err(bad_call("takes no arguments"));
                }
                let (private_pem, public_pem) = self.helpers.keygen()?;
                Ok(Value::Sequence(vec![
                    Value::String(private_pem),
                    Value::String(public_pem),
                ]))
            }
            "self_signed_cert_gen" => {
                let common_name = match args {
                    [] => DEFAULT_CERT_COMMON_NAME.to_string(),
                    [cn] => self.arg_scalar(cn, context)?,
                    _ => return Err(bad_call("expects an optional common name")),
                };
                let (key_pem, cert_pem) = self.helpers.self_signed_cert_gen(&common_name)?;
                Ok(Value::Sequence(vec![
                    Value::String(key_pem),
                    Value::String(cert_pem),
                ]))
            }
            "uuid" => {
                if !args.is_empty() {
                    return Err(bad_call("takes no arguments"));
                }
                Ok(Value::String(self.helpers.uuid()?))
            }
            _ => Err(EngineError::UnknownHelper {
                name: name.node.clone(),
                span: name.span.clone(),
            }),
        }
    }

    /// Resolve an argument to a string scalar
    ///
    /// Path arguments resolve strictly against the context, like any other
    /// lookup.
    fn arg_scalar(&self, arg: &Spanned<Arg>, context: &Value) -> Result<String, EngineError> {
        match &arg.node {
            Arg::Str(s) => Ok(s.clone()),
            Arg::Number(n) => Ok(n.to_string()),
            Arg::Path(path) => match self.lookup(path, &arg.span, context)? {
                Value::String(s) => Ok(s.clone()),
                other => Err(EngineError::NotAScalar {
                    kind: other.kind(),
                    span: arg.span.clone(),
                }),
            },
        }
    }

    fn apply_filter(
        &self,
        value: Value,
        filter: &Spanned<String>,
    ) -> Result<Value, EngineError> {
        let scalar_input = |value: &Value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| EngineError::Filter {
                    name: filter.node.clone(),
                    message: format!("expects a string, got a {}", value.kind()),
                    span: filter.span.clone(),
                })
        };

        match filter.node.as_str() {
            "bool" => {
                let text = scalar_input(&value)?;
                let spelled = if str_to_bool(&text) { "True" } else { "False" };
                Ok(Value::String(spelled.to_string()))
            }
            "yaml" => {
                let text = value.to_yaml().map_err(|e| EngineError::Filter {
                    name: "yaml".to_string(),
                    message: e.to_string(),
                    span: filter.span.clone(),
                })?;
                Ok(Value::String(text))
            }
            "base64encode" => {
                let text = scalar_input(&value)?;
                Ok(Value::String(STANDARD.encode(text)))
            }
            _ => Err(EngineError::UnknownFilter {
                name: filter.node.clone(),
                span: filter.span.clone(),
            }),
        }
    }
}

/// Truthiness of configuration text: only "true" and "yes" (any case) are
/// true; everything else, including empty, is false
fn str_to_bool(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "true" | "yes")
}

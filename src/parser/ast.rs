//! AST types for template expressions embedded in configuration strings

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed string value: literal text interleaved with expressions
///
/// `"host-{{ region }}.example"` parses to three segments. A string with no
/// `{{` parses to a single literal segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// The sole expression, when the template is exactly one expression and
    /// nothing else
    ///
    /// Such templates substitute the whole evaluated value (which may be a
    /// mapping or sequence); expressions embedded in literal text must
    /// evaluate to string scalars.
    pub fn as_single_expr(&self) -> Option<&Spanned<Expr>> {
        match self.segments.as_slice() {
            [Segment::Expr(e)] => Some(e),
            _ => None,
        }
    }

    /// True when no segment is an expression
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

/// One piece of a parsed string value
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Raw text copied through unchanged
    Literal(String),
    /// A `{{ ... }}` expression
    Expr(Spanned<Expr>),
}

/// Dotted key path, e.g. `n1.nn1` or `servers.0.host`
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPath {
    pub segments: Vec<Spanned<String>>,
}

impl KeyPath {
    /// Render the path back to its dotted form for error messages
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.node.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// An expression inside `{{ ... }}` delimiters
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable lookup by dotted path against the current snapshot
    Lookup(KeyPath),
    /// Helper invocation, e.g. `gen_names('mariadb', replicas)`
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Arg>>,
    },
    /// Filter application, e.g. `flags.debug | bool`
    Filtered {
        inner: Box<Spanned<Expr>>,
        filter: Spanned<String>,
    },
}

/// A positional helper argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Quoted string literal
    Str(String),
    /// Integer literal
    Number(i64),
    /// Lookup resolved against the current snapshot at call time
    Path(KeyPath),
}

//! Error types for expression parsing and validation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// A `{{` with no matching `}}` before the end of the value
    #[error("unclosed expression at {span:?}")]
    UnclosedExpression { span: Span },
}

impl ParseError {
    /// Format the error with source context using ariadne
    ///
    /// `source` is the string value the expression was embedded in; `name`
    /// identifies it in the report (usually the dotted key of the value).
    pub fn format(&self, source: &str, name: &str) -> String {
        let mut buf = Vec::new();
        let (span, message, expected) = match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => (span, message.clone(), expected.clone()),
            ParseError::UnclosedExpression { span } => {
                (span, "unclosed expression".to_string(), vec!["'}}'".to_string()])
            }
        };

        let expected_str = if expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", expected.join(", "))
        };

        Report::build(ReportKind::Error, name, span.start)
            .with_message(&message)
            .with_label(
                Label::new((name, span.clone()))
                    .with_message(format!("{}{}", message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((name, Source::from(source)), &mut buf)
            .expect("report rendering to a Vec cannot fail");
        String::from_utf8(buf).expect("ariadne emits UTF-8")
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of expression".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of expression".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        // chumsky can emit a reversed range (start > end) for errors at end of
        // input; normalize so the span is a well-formed byte range.
        let range = err.span().into_range();
        let span = if range.start > range.end {
            range.end..range.start
        } else {
            range
        };

        ParseError::Syntax {
            span,
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Pipe => "'|'".to_string(),
    }
}

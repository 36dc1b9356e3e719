//! Expression parser using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::{self, RawToken, Token};

/// Parse a configuration string value into a template
///
/// Literal text passes through untouched (including lone braces and stray
/// `}}`); each `{{ ... }}` pair is parsed as one expression. All expression
/// errors in the value are collected, not just the first.
pub fn parse_template(input: &str) -> Result<Template, Vec<ParseError>> {
    let raw: Vec<(RawToken, lexer::Span)> = lexer::lex_raw(input).collect();

    let mut segments = Vec::new();
    let mut errors = Vec::new();
    let mut literal = String::new();

    let mut i = 0;
    while i < raw.len() {
        match &raw[i] {
            (RawToken::Open, open_span) => {
                let close = raw[i + 1..]
                    .iter()
                    .position(|(t, _)| matches!(t, RawToken::Close))
                    .map(|offset| i + 1 + offset);
                let Some(close_idx) = close else {
                    errors.push(ParseError::UnclosedExpression {
                        span: open_span.start..input.len(),
                    });
                    break;
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let body = open_span.end..raw[close_idx].1.start;
                match parse_expr(input, body) {
                    Ok(expr) => segments.push(Segment::Expr(expr)),
                    Err(errs) => errors.extend(errs),
                }
                i = close_idx + 1;
            }
            // Close without a preceding Open is literal text, as are lone braces
            (RawToken::Close, span) | (RawToken::Brace, span) | (RawToken::Text, span) => {
                literal.push_str(&input[span.clone()]);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    if errors.is_empty() {
        Ok(Template { segments })
    } else {
        Err(errors)
    }
}

/// Parse one expression body; spans land in the enclosing string value
fn parse_expr(
    source: &str,
    body: std::ops::Range<usize>,
) -> Result<Spanned<Expr>, Vec<ParseError>> {
    let base = body.start;
    let end = body.end;

    let token_iter = lexer::lex_expr(&source[body])
        .map(move |(tok, span)| (tok, SimpleSpan::from(span.start + base..span.end + base)));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((end..end).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let ident = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    // Path segments are identifiers, or numbers indexing into sequences
    let path_segment = choice((
        ident.clone(),
        select! { Token::Number(n) => n.to_string() }
            .map_with(|s, e| Spanned::new(s, span_range(&e.span()))),
    ));

    let key_path = path_segment
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|segments| KeyPath { segments });

    let arg = choice((
        select! {
            Token::Str(s) => Arg::Str(s),
            Token::Number(n) => Arg::Number(n),
        },
        key_path.clone().map(Arg::Path),
    ))
    .map_with(|a, e| Spanned::new(a, span_range(&e.span())));

    let call = ident
        .clone()
        .then(
            arg.separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        )
        .map(|(name, args)| Expr::Call { name, args });

    // Calls must come first: a bare path also starts with an identifier
    let base = choice((call, key_path.map(Expr::Lookup)))
        .map_with(|x, e| Spanned::new(x, span_range(&e.span())));

    let filter = just(Token::Pipe).ignore_then(ident);

    base.then(filter.repeated().collect::<Vec<_>>())
        .map(|(first, filters)| {
            filters.into_iter().fold(first, |inner, f| {
                let span = inner.span.start..f.span.end;
                Spanned::new(
                    Expr::Filtered {
                        inner: Box::new(inner),
                        filter: f,
                    },
                    span,
                )
            })
        })
        .then_ignore(end())
}

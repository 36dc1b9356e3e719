//! Lexers for configuration string values using logos
//!
//! Two layers: [`RawToken`] splits a string value into literal text and
//! `{{`/`}}` delimiters, [`Token`] tokenizes the expression between a
//! delimiter pair.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Surface tokens splitting literal text from expression delimiters
///
/// Longest-match makes `{{` win over two single braces, so lone braces in
/// literal text pass through untouched.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum RawToken {
    #[token("{{")]
    Open,

    #[token("}}")]
    Close,

    #[regex(r"[^{}]+")]
    Text,

    #[regex(r"[{}]")]
    Brace,
}

/// Tokens inside a `{{ ... }}` expression
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("|")]
    Pipe,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Single- and double-quoted literals; quotes stripped, escapes kept raw
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Str(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Number(i64),
}

/// Split a string value into raw tokens with spans
pub fn lex_raw(input: &str) -> impl Iterator<Item = (RawToken, Span)> + '_ {
    RawToken::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

/// Lex expression source into tokens with spans
pub fn lex_expr(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_split() {
        let tokens: Vec<_> = lex_raw("a-{{ n1.nn1 }}-b").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                RawToken::Text,
                RawToken::Open,
                RawToken::Text,
                RawToken::Close,
                RawToken::Text,
            ]
        );
    }

    #[test]
    fn test_raw_lone_braces_are_text() {
        let tokens: Vec<_> = lex_raw("a { b } c").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                RawToken::Text,
                RawToken::Brace,
                RawToken::Text,
                RawToken::Brace,
                RawToken::Text,
            ]
        );
    }

    #[test]
    fn test_raw_spans_slice_back() {
        let input = "x{{ y }}z";
        let spans: Vec<_> = lex_raw(input).collect();
        assert_eq!(&input[spans[1].1.clone()], "{{");
        assert_eq!(&input[spans[3].1.clone()], "}}");
    }

    #[test]
    fn test_expr_path_tokens() {
        let tokens: Vec<_> = lex_expr("n1.nn1").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("n1".to_string()),
                Token::Dot,
                Token::Ident("nn1".to_string()),
            ]
        );
    }

    #[test]
    fn test_expr_call_tokens() {
        let tokens: Vec<_> = lex_expr("gen_names('mariadb', 2)").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("gen_names".to_string()),
                Token::ParenOpen,
                Token::Str("mariadb".to_string()),
                Token::Comma,
                Token::Number(2),
                Token::ParenClose,
            ]
        );
    }

    #[test]
    fn test_expr_double_quoted_string() {
        let tokens: Vec<_> = lex_expr(r#"raise("bad config")"#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("raise".to_string()),
                Token::ParenOpen,
                Token::Str("bad config".to_string()),
                Token::ParenClose,
            ]
        );
    }

    #[test]
    fn test_expr_filter_tokens() {
        let tokens: Vec<_> = lex_expr("flags.debug | bool").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("flags".to_string()),
                Token::Dot,
                Token::Ident("debug".to_string()),
                Token::Pipe,
                Token::Ident("bool".to_string()),
            ]
        );
    }

    #[test]
    fn test_expr_numeric_segment() {
        let tokens: Vec<_> = lex_expr("servers.0.host").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("servers".to_string()),
                Token::Dot,
                Token::Number(0),
                Token::Dot,
                Token::Ident("host".to_string()),
            ]
        );
    }
}

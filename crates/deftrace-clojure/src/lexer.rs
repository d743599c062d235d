//! Lexical analysis for Clojure source.
//!
//! # Design
//!
//! - `Token`: delimiters, reader macros, literals, keywords and symbols
//! - Whitespace, commas, `;` comments and a leading `#!` line are skipped
//! - Literal tokens keep their source slice; the walker never needs the
//!   decoded value
//!
//! # Examples
//!
//! ```
//! # use deftrace_clojure::lexer::Token;
//! # use logos::Logos;
//! let tokens: Vec<_> = Token::lexer("(defn f [x] x)").filter_map(Result::ok).collect();
//! assert_eq!(tokens[1], Token::Symbol("defn".into()));
//! ```

use std::fmt;
use std::ops::Range;

use logos::Logos;

/// Clojure token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f,]+")] // Whitespace; commas are whitespace too
#[logos(skip r";[^\n]*")] // Line comments
#[logos(skip r"#![^\n]*")] // Shebang
pub enum Token {
    // === Delimiters ===
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// Set literal `#{`
    #[token("#{")]
    SetOpen,
    /// Anonymous function literal `#(`
    #[token("#(")]
    FnOpen,
    /// Reader conditional `#?(` or `#?@(`
    #[regex(r"#\?@?\(")]
    CondOpen,

    // === Reader macros ===
    /// `'`
    #[token("'")]
    Quote,
    /// `` ` ``
    #[token("`")]
    SyntaxQuote,
    /// `~`
    #[token("~")]
    Unquote,
    /// `~@`
    #[token("~@")]
    UnquoteSplice,
    /// `@`
    #[token("@")]
    Deref,
    /// `^` or the legacy `#^`
    #[token("^")]
    #[token("#^")]
    Meta,
    /// `#'`
    #[token("#'")]
    VarQuote,
    /// `#_` drops the next form
    #[token("#_")]
    Discard,
    /// Tagged literal prefix such as `#inst`
    #[regex(r#"#[a-zA-Z][^\s,()\[\]{}"]*"#, |lex| lex.slice()[1..].to_string())]
    Tag(String),

    // === Literals ===
    /// String literal, quotes included
    #[regex(r#""([^"\\]|\\[\s\S])*""#, |lex| lex.slice().to_string())]
    Str(String),
    /// Regex literal `#"..."`
    #[regex(r#"#"([^"\\]|\\[\s\S])*""#, |lex| lex.slice().to_string())]
    Regex(String),
    /// Character literal (`\a`, `\newline`, `\u0041`)
    #[regex(r"\\([a-zA-Z0-9]+|[\s\S])", |lex| lex.slice().to_string())]
    Char(String),
    /// Integer, ratio, decimal or symbolic value (`##Inf`)
    ///
    /// Wins over symbols for `-1` and `+2`.
    #[regex(r#"[+-]?[0-9][^\s,()\[\]{}"';@^`~\\]*"#, |lex| lex.slice().to_string(), priority = 5)]
    #[regex(r"##[a-zA-Z]+", |lex| lex.slice().to_string())]
    Number(String),
    /// Keyword without the leading colons (`:a` and `::a` both give `a`)
    #[regex(r#"::?[^\s,()\[\]{}"';@^`~\\:][^\s,()\[\]{}"';@^`~\\]*"#, |lex| lex.slice().trim_start_matches(':').to_string())]
    Keyword(String),

    // === Identifiers ===
    /// Symbol, possibly qualified (`ns/name`)
    #[regex(r#"[^\s,()\[\]{}"';@^`~\\#:0-9][^\s,()\[\]{}"@^`~\\;]*"#, |lex| lex.slice().to_string())]
    Symbol(String),
}

impl Token {
    /// Closing delimiter matching an opening one.
    pub fn closer(&self) -> Option<Token> {
        match self {
            Token::LParen | Token::FnOpen | Token::CondOpen => Some(Token::RParen),
            Token::LBracket => Some(Token::RBracket),
            Token::LBrace | Token::SetOpen => Some(Token::RBrace),
            _ => None,
        }
    }

    pub fn is_closer(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBracket => f.write_str("`[`"),
            Token::RBracket => f.write_str("`]`"),
            Token::LBrace => f.write_str("`{`"),
            Token::RBrace => f.write_str("`}`"),
            Token::SetOpen => f.write_str("`#{`"),
            Token::FnOpen => f.write_str("`#(`"),
            Token::CondOpen => f.write_str("`#?(`"),
            Token::Quote => f.write_str("`'`"),
            Token::SyntaxQuote => f.write_str("syntax quote"),
            Token::Unquote => f.write_str("`~`"),
            Token::UnquoteSplice => f.write_str("`~@`"),
            Token::Deref => f.write_str("`@`"),
            Token::Meta => f.write_str("`^`"),
            Token::VarQuote => f.write_str("`#'`"),
            Token::Discard => f.write_str("`#_`"),
            Token::Tag(tag) => write!(f, "tag `#{tag}`"),
            Token::Str(_) => f.write_str("string"),
            Token::Regex(_) => f.write_str("regex"),
            Token::Char(c) => write!(f, "character `{c}`"),
            Token::Number(n) => write!(f, "number `{n}`"),
            Token::Keyword(k) => write!(f, "keyword `:{k}`"),
            Token::Symbol(s) => write!(f, "symbol `{s}`"),
        }
    }
}

/// Tokenize `source`, splitting valid tokens from the byte ranges the
/// lexer could not match.
pub fn tokenize(source: &str) -> (Vec<(Token, Range<usize>)>, Vec<Range<usize>>) {
    let mut tokens = Vec::new();
    let mut invalid = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => invalid.push(span),
        }
    }
    (tokens, invalid)
}

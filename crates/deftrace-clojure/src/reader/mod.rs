//! Reader: tokens to forms
//!
//! Builds the form tree the walker indexes. Every form gets a [`NodeId`]
//! equal to its pre-order position in the unit, so reading the same text
//! twice yields the same identities.
//!
//! # Error recovery
//!
//! The reader never stops early. A closer that matches an enclosing
//! collection closes the inner ones (each reported); any other stray closer
//! is reported and skipped; end of input closes whatever is still open.
//! Forms read so far are kept.
//!
//! Forms nest at most [`MAX_DEPTH`] levels. A form past the limit is
//! reported and skipped together with the rest of its enclosing collection,
//! so the tree handed to the walker stays shallow.
//!
//! # Examples
//!
//! ```
//! # use deftrace_clojure::reader::{read_source, FormKind};
//! let (forms, errors) = read_source("(inc 1) [a");
//! assert_eq!(forms.len(), 2);
//! assert!(matches!(forms[1].kind, FormKind::Vector(ref items) if items.len() == 1));
//! assert_eq!(errors.len(), 1);
//! ```

mod error;
mod stream;

pub use error::{ReadError, ReadErrorKind};
pub use stream::TokenStream;

use deftrace_core::{Ident, LineIndex, NodeId, Span};

use crate::lexer::{tokenize, Token};

/// Deepest form nesting the reader builds. Collections and reader macros
/// each count as one level.
pub const MAX_DEPTH: usize = 128;

/// One form of source.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub id: NodeId,
    pub span: Span,
    pub kind: FormKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    List(Vec<Form>),
    Vector(Vec<Form>),
    /// Keys and values interleaved
    Map(Vec<Form>),
    Set(Vec<Form>),
    /// `#(...)`
    AnonFn(Vec<Form>),
    /// `#?(...)`, platform keys and branches interleaved
    ReaderCond(Vec<Form>),
    Symbol(String),
    /// Name without the leading colons
    Keyword(String),
    /// String, character, number or regex, as written
    Literal(String),
    Prefixed {
        prefix: Prefix,
        form: Box<Form>,
    },
    /// `^meta form`
    Meta {
        meta: Box<Form>,
        form: Box<Form>,
    },
}

/// Reader macro applied to the following form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    Quote,
    SyntaxQuote,
    Unquote,
    UnquoteSplice,
    Deref,
    VarQuote,
    Tag(String),
}

impl Form {
    pub fn symbol(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Keyword(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.keyword() == Some(name)
    }

    /// The symbol as an identifier occurrence.
    pub fn ident(&self) -> Option<Ident> {
        self.symbol().map(|name| Ident::new(self.id, name, self.span))
    }

    pub fn as_list(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Items of any collection.
    pub fn children(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::List(items)
            | FormKind::Vector(items)
            | FormKind::Map(items)
            | FormKind::Set(items)
            | FormKind::AnonFn(items)
            | FormKind::ReaderCond(items) => Some(items),
            _ => None,
        }
    }

    /// The form under any `^meta` wrappers.
    pub fn without_meta(&self) -> &Form {
        let mut form = self;
        while let FormKind::Meta { form: inner, .. } = &form.kind {
            form = inner;
        }
        form
    }

    /// The symbol under `'` or `^meta`, as in `(in-ns 'foo)` or `^:private name`.
    pub fn quoted_symbol(&self) -> Option<&str> {
        match &self.without_meta().kind {
            FormKind::Symbol(name) => Some(name),
            FormKind::Prefixed {
                prefix: Prefix::Quote,
                form,
            } => form.symbol(),
            _ => None,
        }
    }
}

/// Read every top-level form in `source`.
pub fn read_source(source: &str) -> (Vec<Form>, Vec<ReadError>) {
    let (tokens, invalid) = tokenize(source);
    let lines = LineIndex::new(source);

    let mut reader = Reader::new(TokenStream::new(&tokens, &lines));
    for range in invalid {
        let text = source.get(range.clone()).unwrap_or_default();
        let span = lines.span(range.start, range.end);
        reader.errors.push(ReadError::invalid_token(text, span));
    }

    let (forms, mut errors) = reader.read_all();
    errors.sort_by_key(|e| e.span.start);
    (forms, errors)
}

/// Recursive reader over a token stream.
pub struct Reader<'src> {
    stream: TokenStream<'src>,
    next_id: u32,
    /// Forms currently being read
    depth: usize,
    /// Closers of the collections currently open, outermost first
    open: Vec<Token>,
    errors: Vec<ReadError>,
}

impl<'src> Reader<'src> {
    pub fn new(stream: TokenStream<'src>) -> Self {
        Self {
            stream,
            next_id: 0,
            depth: 0,
            open: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Read to end of input, returning the forms and every error met.
    pub fn read_all(mut self) -> (Vec<Form>, Vec<ReadError>) {
        let mut forms = Vec::new();
        loop {
            self.skip_discards();
            match self.stream.peek() {
                None => break,
                Some(token) if token.is_closer() => {
                    let span = self.stream.current_span();
                    self.errors
                        .push(ReadError::unexpected_closer(token, None, span));
                    self.stream.advance();
                }
                Some(_) => forms.extend(self.read_form()),
            }
        }
        (forms, self.errors)
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drop `#_ form` pairs ahead of the cursor. Stacked markers
    /// (`#_ #_ a b`) each drop one of the forms that follow.
    fn skip_discards(&mut self) {
        let mut pending = 0usize;
        loop {
            match self.stream.peek() {
                Some(Token::Discard) => {
                    self.stream.advance();
                    pending += 1;
                }
                Some(token) if pending > 0 && !token.is_closer() => {
                    self.read_form();
                    pending -= 1;
                }
                _ => break,
            }
        }
        if pending > 0 {
            let span = self.stream.current_span();
            self.errors
                .push(ReadError::unexpected_eof("after `#_`", span));
        }
    }

    /// Read the form a prefix applies to. `None` when input ends or a
    /// closer follows; the error is recorded.
    fn read_operand(&mut self, context: &str) -> Option<Form> {
        self.skip_discards();
        match self.stream.peek() {
            Some(token) if !token.is_closer() => self.read_form(),
            _ => {
                let span = self.stream.current_span();
                self.errors.push(ReadError::unexpected_eof(context, span));
                None
            }
        }
    }

    /// Read one form starting at a non-closer token.
    fn read_form(&mut self) -> Option<Form> {
        if self.depth >= MAX_DEPTH {
            let span = self.stream.current_span();
            self.errors.push(ReadError::too_deep(MAX_DEPTH, span));
            self.skip_rest_of_collection();
            return None;
        }
        self.depth += 1;
        let form = self.read_nested_form();
        self.depth -= 1;
        form
    }

    /// Consume tokens up to, not including, the closer of the innermost
    /// open collection.
    fn skip_rest_of_collection(&mut self) {
        let mut nested = 0usize;
        while let Some(token) = self.stream.peek() {
            if token.is_closer() {
                if nested == 0 {
                    break;
                }
                nested -= 1;
            } else if token.closer().is_some() {
                nested += 1;
            }
            self.stream.advance();
        }
    }

    fn read_nested_form(&mut self) -> Option<Form> {
        let start = self.stream.current_pos();
        let id = self.alloc_id();
        let token = self.stream.advance()?;

        let kind = match token {
            Token::LParen => FormKind::List(self.read_items(Token::RParen, "inside list")),
            Token::LBracket => FormKind::Vector(self.read_items(Token::RBracket, "inside vector")),
            Token::LBrace => {
                let items = self.read_items(Token::RBrace, "inside map");
                if items.len() % 2 != 0 {
                    let span = self.stream.span_from(start);
                    self.errors.push(ReadError::invalid_syntax(
                        "map literal must contain an even number of forms",
                        span,
                    ));
                }
                FormKind::Map(items)
            }
            Token::SetOpen => FormKind::Set(self.read_items(Token::RBrace, "inside set")),
            Token::FnOpen => FormKind::AnonFn(self.read_items(Token::RParen, "inside `#(`")),
            Token::CondOpen => {
                FormKind::ReaderCond(self.read_items(Token::RParen, "inside reader conditional"))
            }
            Token::Quote => self.prefixed(Prefix::Quote, "after `'`")?,
            Token::SyntaxQuote => self.prefixed(Prefix::SyntaxQuote, "after syntax quote")?,
            Token::Unquote => self.prefixed(Prefix::Unquote, "after `~`")?,
            Token::UnquoteSplice => self.prefixed(Prefix::UnquoteSplice, "after `~@`")?,
            Token::Deref => self.prefixed(Prefix::Deref, "after `@`")?,
            Token::VarQuote => self.prefixed(Prefix::VarQuote, "after `#'`")?,
            Token::Tag(tag) => self.prefixed(Prefix::Tag(tag.clone()), "after tag")?,
            Token::Meta => {
                let meta = self.read_operand("after `^`")?;
                let form = self.read_operand("after metadata")?;
                FormKind::Meta {
                    meta: Box::new(meta),
                    form: Box::new(form),
                }
            }
            Token::Symbol(name) => FormKind::Symbol(name.clone()),
            Token::Keyword(name) => FormKind::Keyword(name.clone()),
            Token::Str(text) | Token::Char(text) | Token::Number(text) | Token::Regex(text) => {
                FormKind::Literal(text.clone())
            }
            Token::Discard | Token::RParen | Token::RBracket | Token::RBrace => {
                let span = self.stream.span_from(start);
                self.errors
                    .push(ReadError::unexpected_closer(token, None, span));
                return None;
            }
        };

        Some(Form {
            id,
            span: self.stream.span_from(start),
            kind,
        })
    }

    fn prefixed(&mut self, prefix: Prefix, context: &str) -> Option<FormKind> {
        let form = self.read_operand(context)?;
        Some(FormKind::Prefixed {
            prefix,
            form: Box::new(form),
        })
    }

    /// Read items up to `closer`, consuming it when present.
    fn read_items(&mut self, closer: Token, context: &str) -> Vec<Form> {
        self.open.push(closer.clone());
        let mut items = Vec::new();
        loop {
            self.skip_discards();
            match self.stream.peek() {
                None => {
                    let span = self.stream.current_span();
                    self.errors.push(ReadError::unexpected_eof(context, span));
                    break;
                }
                Some(token) if *token == closer => {
                    self.stream.advance();
                    break;
                }
                Some(token) if token.is_closer() => {
                    let span = self.stream.current_span();
                    self.errors
                        .push(ReadError::unexpected_closer(token, Some(&closer), span));
                    // Let the enclosing collection this closer belongs to take it.
                    if self.open[..self.open.len() - 1].contains(token) {
                        break;
                    }
                    self.stream.advance();
                }
                Some(_) => items.extend(self.read_form()),
            }
        }
        self.open.pop();
        items
    }
}

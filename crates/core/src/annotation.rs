//! Declared type annotations.
//!
//! Functions are registered with the *text* of their parameter and return
//! types, e.g. `Vec<String>` or `impl Iterator<Item = u32>`. The text is
//! parsed once, at registration, into a small tree that the schema
//! synthesizer and the mode classifier inspect. Parsing never fails: text
//! the parser does not understand becomes an [`AnnotationKind::Opaque`] node.

use std::fmt;

/// Traits whose `impl`/`dyn` forms describe a lazy sequence.
const SEQUENCE_TRAITS: &[&str] = &[
    "Iterator",
    "IntoIterator",
    "DoubleEndedIterator",
    "ExactSizeIterator",
    "Stream",
];

/// Concrete types that describe a lazy sequence of their first argument.
const SEQUENCE_TYPES: &[&str] = &["Sequence", "BoxStream", "LocalBoxStream"];

/// Smart pointers that do not change the shape of the value they hold.
const TRANSPARENT: &[&str] = &["Box", "Arc", "Rc", "Pin"];

/// Shape of an annotation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// A path type such as `String` or `std::collections::HashMap<K, V>`.
    Path,
    /// `impl Trait`; the node describes the first trait bound.
    Impl,
    /// `dyn Trait`; the node describes the first trait bound.
    Dyn,
    /// `&T`, `&mut T` or a raw pointer; the referent is the only argument.
    Reference,
    /// `[T]` or `[T; N]`; the element is the only argument.
    Slice,
    /// `(A, B, ..)`, including the unit type.
    Tuple,
    /// Anything the parser does not understand.
    Opaque,
}

/// A parsed type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    kind: AnnotationKind,
    path: Vec<String>,
    args: Vec<TypeAnnotation>,
    bindings: Vec<(String, TypeAnnotation)>,
    raw: String,
}

impl TypeAnnotation {
    /// Parse the text of a Rust type.
    ///
    /// Whitespace is insignificant, so both `Vec<String>` and the
    /// `Vec < String >` spelling produced by token printing are accepted.
    pub fn parse(text: &str) -> Self {
        let parsed = lex(text).and_then(|tokens| {
            let mut parser = Parser { tokens, pos: 0 };
            let ty = parser.ty()?;
            (parser.pos == parser.tokens.len()).then_some(ty)
        });

        parsed.unwrap_or_else(|| Self::opaque(text))
    }

    fn opaque(text: &str) -> Self {
        Self {
            kind: AnnotationKind::Opaque,
            path: Vec::new(),
            args: Vec::new(),
            bindings: Vec::new(),
            raw: text.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    fn node(kind: AnnotationKind, args: Vec<TypeAnnotation>) -> Self {
        Self {
            kind,
            path: Vec::new(),
            args,
            bindings: Vec::new(),
            raw: String::new(),
        }
    }

    /// The shape of this node.
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// The last path segment, e.g. `HashMap` for `std::collections::HashMap`.
    ///
    /// Empty for references, slices, tuples and opaque annotations.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Generic type arguments, lifetimes excluded.
    pub fn args(&self) -> &[TypeAnnotation] {
        &self.args
    }

    /// The first generic type argument, if any.
    pub fn first_arg(&self) -> Option<&TypeAnnotation> {
        self.args.first()
    }

    /// An associated type binding such as `Item` in `Iterator<Item = T>`.
    pub fn binding(&self, name: &str) -> Option<&TypeAnnotation> {
        self.bindings
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, ty)| ty)
    }

    /// Whether this is a path type carrying generic arguments.
    pub fn is_generic(&self) -> bool {
        self.kind == AnnotationKind::Path && !self.args.is_empty()
    }

    /// Whether this is the unit type `()`.
    pub fn is_unit(&self) -> bool {
        self.kind == AnnotationKind::Tuple && self.args.is_empty()
    }

    /// Strip references and transparent smart pointers.
    pub fn peel(&self) -> &TypeAnnotation {
        let mut current = self;
        loop {
            let transparent = current.kind == AnnotationKind::Reference
                || (current.kind == AnnotationKind::Path
                    && TRANSPARENT.contains(&current.name()));
            match current.first_arg() {
                Some(inner) if transparent => current = inner,
                _ => return current,
            }
        }
    }

    /// Look through one `Result<T, E>` layer.
    pub fn outcome(&self) -> &TypeAnnotation {
        match self.first_arg() {
            Some(ok) if self.kind == AnnotationKind::Path && self.name() == "Result" => ok,
            _ => self,
        }
    }

    /// The element type if this annotation describes a lazy sequence.
    ///
    /// Recognises `impl Iterator<Item = T>`, `impl Stream<Item = T>`, their
    /// boxed `dyn` forms and the `Sequence<T>` / `BoxStream<T>` types.
    pub fn sequence_item(&self) -> Option<&TypeAnnotation> {
        let ty = self.peel();
        match ty.kind {
            AnnotationKind::Impl | AnnotationKind::Dyn if SEQUENCE_TRAITS.contains(&ty.name()) => {
                ty.binding("Item").or_else(|| ty.first_arg())
            }
            AnnotationKind::Path if SEQUENCE_TYPES.contains(&ty.name()) => ty.first_arg(),
            _ => None,
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnnotationKind::Opaque => f.write_str(&self.raw),
            AnnotationKind::Reference => match self.first_arg() {
                Some(inner) => write!(f, "&{inner}"),
                None => f.write_str("&_"),
            },
            AnnotationKind::Slice => match self.first_arg() {
                Some(inner) => write!(f, "[{inner}]"),
                None => f.write_str("[_]"),
            },
            AnnotationKind::Tuple => {
                f.write_str("(")?;
                for (idx, arg) in self.args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                if self.args.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            AnnotationKind::Path | AnnotationKind::Impl | AnnotationKind::Dyn => {
                match self.kind {
                    AnnotationKind::Impl => f.write_str("impl ")?,
                    AnnotationKind::Dyn => f.write_str("dyn ")?,
                    _ => {}
                }
                f.write_str(&self.path.join("::"))?;
                if self.args.is_empty() && self.bindings.is_empty() {
                    return Ok(());
                }

                let mut parts: Vec<String> = self.args.iter().map(ToString::to_string).collect();
                parts.extend(self.bindings.iter().map(|(k, v)| format!("{k} = {v}")));
                write!(f, "<{}>", parts.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Lifetime,
    PathSep,
    Punct(char),
}

fn lex(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_alphanumeric() || ch == '_' {
            let mut ident = String::new();
            while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                ident.push(c);
            }
            tokens.push(Token::Ident(ident));
        } else if ch == '\'' {
            chars.next();
            while chars.next_if(|c| c.is_alphanumeric() || *c == '_').is_some() {}
            tokens.push(Token::Lifetime);
        } else if ch == ':' {
            chars.next();
            chars.next_if_eq(&':')?;
            tokens.push(Token::PathSep);
        } else if "<>,=&[]()+;*".contains(ch) {
            chars.next();
            tokens.push(Token::Punct(ch));
        } else {
            return None;
        }
    }

    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, ch: char) -> bool {
        self.eat_token(&Token::Punct(ch))
    }

    fn eat_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn ty(&mut self) -> Option<TypeAnnotation> {
        match self.peek()? {
            Token::Punct('&') => {
                self.pos += 1;
                self.eat_token(&Token::Lifetime);
                self.eat_keyword("mut");
                let inner = self.ty()?;
                Some(TypeAnnotation::node(AnnotationKind::Reference, vec![inner]))
            }
            Token::Punct('*') => {
                self.pos += 1;
                if !self.eat_keyword("const") {
                    self.eat_keyword("mut");
                }
                let inner = self.ty()?;
                Some(TypeAnnotation::node(AnnotationKind::Reference, vec![inner]))
            }
            Token::Punct('[') => {
                self.pos += 1;
                let inner = self.ty()?;
                if self.eat(';') {
                    while !self.eat(']') {
                        self.bump()?;
                    }
                } else if !self.eat(']') {
                    return None;
                }
                Some(TypeAnnotation::node(AnnotationKind::Slice, vec![inner]))
            }
            Token::Punct('(') => {
                self.pos += 1;
                let mut args = Vec::new();
                while !self.eat(')') {
                    args.push(self.ty()?);
                    if !self.eat(',') {
                        if !self.eat(')') {
                            return None;
                        }
                        break;
                    }
                }
                Some(TypeAnnotation::node(AnnotationKind::Tuple, args))
            }
            Token::Ident(word) if word == "impl" => {
                self.pos += 1;
                self.bounds(AnnotationKind::Impl)
            }
            Token::Ident(word) if word == "dyn" => {
                self.pos += 1;
                self.bounds(AnnotationKind::Dyn)
            }
            Token::Ident(_) | Token::PathSep => self.path(AnnotationKind::Path),
            _ => None,
        }
    }

    fn bounds(&mut self, kind: AnnotationKind) -> Option<TypeAnnotation> {
        let mut first = None;
        loop {
            if !self.eat_token(&Token::Lifetime) {
                let bound = self.path(kind)?;
                first.get_or_insert(bound);
            }
            if !self.eat('+') {
                return first;
            }
        }
    }

    fn path(&mut self, kind: AnnotationKind) -> Option<TypeAnnotation> {
        self.eat_token(&Token::PathSep);

        let mut path = Vec::new();
        let mut args = Vec::new();
        let mut bindings = Vec::new();
        loop {
            let Some(Token::Ident(segment)) = self.bump() else {
                return None;
            };
            path.push(segment);

            args.clear();
            bindings.clear();
            if self.eat('<') {
                self.generics(&mut args, &mut bindings)?;
            }
            if !self.eat_token(&Token::PathSep) {
                break;
            }
        }

        Some(TypeAnnotation {
            kind,
            path,
            args,
            bindings,
            raw: String::new(),
        })
    }

    fn generics(
        &mut self,
        args: &mut Vec<TypeAnnotation>,
        bindings: &mut Vec<(String, TypeAnnotation)>,
    ) -> Option<()> {
        loop {
            if self.eat('>') {
                return Some(());
            }

            match (self.peek()?, self.peek_nth(1)) {
                (Token::Lifetime, _) => self.pos += 1,
                (Token::Ident(name), Some(Token::Punct('='))) => {
                    let name = name.clone();
                    self.pos += 2;
                    bindings.push((name, self.ty()?));
                }
                _ => args.push(self.ty()?),
            }

            if !self.eat(',') {
                return self.eat('>').then_some(());
            }
        }
    }
}

// swcrv-core/src/patch/table.rs
//! Minimal structural model of the architecture table inside a generated
//! JavaScript loader.
//!
//! The loader is scanned with a small tokenizer that understands strings,
//! template literals, comments and regex literals, so braces and commas inside
//! them never confuse the bracket matching. The table is found by its own
//! property name (`linux: { ... }`) after a scope marker, and every edit is
//! positioned relative to a parsed entry rather than to surrounding text.

use swcrv_common::model::TableLocator;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("scope marker '{0}' not found")]
    ScopeNotFound(String),

    #[error("no object literal assigned to '{0}' after the scope marker")]
    TableNotFound(String),

    #[error("unterminated {0} starting at byte {1}")]
    Unterminated(&'static str, usize),

    #[error("unbalanced '{0}' at byte {1}")]
    Unbalanced(char, usize),

    #[error("anchor entry '{anchor}' not in table (found: {found})")]
    AnchorNotFound { anchor: String, found: String },

    #[error("entry '{0}' not in table")]
    EntryNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Str,
    Number,
    Regex,
    Punct(u8),
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

const REGEX_AFTER_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    prev: Option<Token>,
    before_prev: Option<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, from: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: from,
            prev: None,
            before_prev: None,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, TableError> {
        self.skip_trivia()?;
        let Some(&b) = self.bytes.get(self.pos) else {
            return Ok(None);
        };
        let start = self.pos;
        let kind = match b {
            b'"' | b'\'' => {
                self.skip_quoted(b, "string")?;
                TokenKind::Str
            }
            b'`' => {
                self.skip_template()?;
                TokenKind::Str
            }
            b'/' if self.regex_allowed() => {
                self.skip_regex()?;
                TokenKind::Regex
            }
            b if is_ident_start(b) => {
                self.pos += 1;
                while self.bytes.get(self.pos).is_some_and(|&c| is_ident_part(c)) {
                    self.pos += 1;
                }
                TokenKind::Ident
            }
            b'0'..=b'9' => {
                self.pos += 1;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|&c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
                {
                    self.pos += 1;
                }
                TokenKind::Number
            }
            other => {
                self.pos += 1;
                TokenKind::Punct(other)
            }
        };
        let token = Token {
            kind,
            start,
            end: self.pos,
        };
        self.before_prev = self.prev.replace(token);
        Ok(Some(token))
    }

    fn skip_trivia(&mut self) -> Result<(), TableError> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => {
                        while self.bytes.get(self.pos).is_some_and(|&c| c != b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'*') => {
                        let start = self.pos;
                        let close = self.src[self.pos + 2..]
                            .find("*/")
                            .ok_or(TableError::Unterminated("comment", start))?;
                        self.pos += 2 + close + 2;
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn skip_quoted(&mut self, quote: u8, what: &'static str) -> Result<(), TableError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(&c) = self.bytes.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                c if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(TableError::Unterminated(what, start))
    }

    fn skip_template(&mut self) -> Result<(), TableError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(&c) = self.bytes.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'$' if self.bytes.get(self.pos + 1) == Some(&b'{') => {
                    self.pos += 2;
                    self.skip_interpolation(start)?;
                }
                _ => self.pos += 1,
            }
        }
        Err(TableError::Unterminated("template literal", start))
    }

    fn skip_interpolation(&mut self, template_start: usize) -> Result<(), TableError> {
        let mut depth = 1usize;
        while let Some(&c) = self.bytes.get(self.pos) {
            match c {
                b'"' | b'\'' => {
                    self.skip_quoted(c, "string")?;
                    continue;
                }
                b'`' => {
                    self.skip_template()?;
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(TableError::Unterminated("template literal", template_start))
    }

    fn skip_regex(&mut self) -> Result<(), TableError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(&c) = self.bytes.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'\n' => break,
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.bytes.get(self.pos).is_some_and(|&f| is_ident_part(f)) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(TableError::Unterminated("regular expression", start))
    }

    fn regex_allowed(&self) -> bool {
        if self.after_postfix_update() {
            return false;
        }
        match self.prev {
            None => true,
            Some(Token {
                kind: TokenKind::Punct(p),
                ..
            }) => !matches!(p, b')' | b']' | b'}'),
            Some(Token {
                kind: TokenKind::Ident,
                start,
                end,
            }) => REGEX_AFTER_WORDS.contains(&&self.src[start..end]),
            Some(_) => false,
        }
    }

    /// `i++ /` and `i-- /` divide; a regex can never be the operand of `++`.
    fn after_postfix_update(&self) -> bool {
        match (self.before_prev, self.prev) {
            (
                Some(Token {
                    kind: TokenKind::Punct(a),
                    end,
                    ..
                }),
                Some(Token {
                    kind: TokenKind::Punct(b),
                    start,
                    ..
                }),
            ) => a == b && matches!(a, b'+' | b'-') && end == start,
            _ => false,
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// One `key: value` (or shorthand `key`) property of the table literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: String,
    pub value: String,
    /// Byte offset of the key.
    pub start: usize,
    /// Byte offset just past the value.
    pub value_end: usize,
    /// Byte offset of the separating comma, when the entry has one.
    pub comma: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderTable {
    pub open: usize,
    pub close: usize,
    pub entries: Vec<TableEntry>,
}

impl LoaderTable {
    pub fn entry(&self, key: &str) -> Option<&TableEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }
}

/// Finds and parses the table `locator` points at.
pub fn locate(src: &str, locator: &TableLocator) -> Result<LoaderTable, TableError> {
    let scope_pos = src
        .find(&locator.scope)
        .ok_or_else(|| TableError::ScopeNotFound(locator.scope.clone()))?;

    let mut lexer = Lexer::new(src, scope_pos);
    let mut window: [Option<Token>; 2] = [None, None];
    while let Some(token) = lexer.next_token()? {
        if token.kind == TokenKind::Punct(b'{') {
            if let [Some(key), Some(colon)] = window {
                if colon.kind == TokenKind::Punct(b':')
                    && key_text(src, &key).as_deref() == Some(locator.table_key.as_str())
                {
                    return parse_entries(src, &mut lexer, token.start);
                }
            }
        }
        window = [window[1], Some(token)];
    }
    Err(TableError::TableNotFound(locator.table_key.clone()))
}

fn key_text(src: &str, token: &Token) -> Option<String> {
    let text = &src[token.start..token.end];
    match token.kind {
        TokenKind::Ident | TokenKind::Number => Some(text.to_string()),
        TokenKind::Str if text.len() >= 2 => Some(text[1..text.len() - 1].to_string()),
        _ => None,
    }
}

fn parse_entries(src: &str, lexer: &mut Lexer<'_>, open: usize) -> Result<LoaderTable, TableError> {
    let mut entries = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut stack: Vec<(u8, usize)> = Vec::new();

    while let Some(token) = lexer.next_token()? {
        match token.kind {
            TokenKind::Punct(p @ (b'{' | b'[' | b'(')) => stack.push((p, token.start)),
            TokenKind::Punct(p @ (b'}' | b']' | b')')) => match stack.pop() {
                Some((opener, _)) if closes(opener, p) => {}
                Some(_) => return Err(TableError::Unbalanced(p as char, token.start)),
                None if p == b'}' => {
                    if let Some(entry) = finish_entry(src, &current, None) {
                        entries.push(entry);
                    }
                    return Ok(LoaderTable {
                        open,
                        close: token.start,
                        entries,
                    });
                }
                None => return Err(TableError::Unbalanced(p as char, token.start)),
            },
            TokenKind::Punct(b',') if stack.is_empty() => {
                if let Some(entry) = finish_entry(src, &current, Some(token.start)) {
                    entries.push(entry);
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(token);
    }
    Err(TableError::Unterminated("object literal", open))
}

fn closes(opener: u8, closer: u8) -> bool {
    matches!((opener, closer), (b'{', b'}') | (b'[', b']') | (b'(', b')'))
}

fn finish_entry(src: &str, tokens: &[Token], comma: Option<usize>) -> Option<TableEntry> {
    let first = tokens.first()?;
    let last = tokens.last()?;
    let key = key_text(src, first)?;
    match tokens.get(1) {
        // `darwin,` shorthand
        None if first.kind == TokenKind::Ident => Some(TableEntry {
            value: key.clone(),
            key,
            start: first.start,
            value_end: first.end,
            comma,
        }),
        Some(colon) if colon.kind == TokenKind::Punct(b':') => {
            let value_start = tokens.get(2)?.start;
            Some(TableEntry {
                key,
                value: src[value_start..last.end].to_string(),
                start: first.start,
                value_end: last.end,
                comma,
            })
        }
        // methods, spreads and computed keys are not table entries
        _ => None,
    }
}

fn line_start(src: &str, pos: usize) -> usize {
    src[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn line_indent(src: &str, pos: usize) -> &str {
    let start = line_start(src, pos);
    let line = &src[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Inserts `key: value` on its own line directly below the `anchor_key` entry,
/// using the anchor's indentation.
pub fn insert_after(
    src: &str,
    table: &LoaderTable,
    anchor_key: &str,
    key: &str,
    value: &str,
) -> Result<String, TableError> {
    let anchor = table
        .entry(anchor_key)
        .ok_or_else(|| TableError::AnchorNotFound {
            anchor: anchor_key.to_string(),
            found: table.keys().join(", "),
        })?;
    let indent = line_indent(src, anchor.start);
    let mut out = String::with_capacity(src.len() + indent.len() + key.len() + value.len() + 8);

    match anchor.comma {
        Some(comma) => {
            let after = comma + 1;
            let line_end = src[after..].find('\n').map(|i| after + i);
            let rest = &src[after..line_end.unwrap_or(src.len())];
            let rest_is_trivia = rest.trim().is_empty() || rest.trim_start().starts_with("//");
            match (rest_is_trivia, line_end) {
                (true, Some(end)) => {
                    out.push_str(&src[..=end]);
                    out.push_str(&format!("{indent}{key}: {value},\n"));
                    out.push_str(&src[end + 1..]);
                }
                (true, None) => {
                    out.push_str(src);
                    out.push_str(&format!("\n{indent}{key}: {value},"));
                }
                (false, _) => {
                    out.push_str(&src[..after]);
                    out.push_str(&format!(" {key}: {value},"));
                    out.push_str(&src[after..]);
                }
            }
        }
        None => {
            out.push_str(&src[..anchor.value_end]);
            out.push_str(&format!(",\n{indent}{key}: {value}"));
            out.push_str(&src[anchor.value_end..]);
        }
    }
    Ok(out)
}

/// Removes the `key: value` entry, dropping its whole line when it stands alone.
pub fn remove_entry(
    src: &str,
    table: &LoaderTable,
    key: &str,
    value: &str,
) -> Result<String, TableError> {
    let entry = table
        .entries
        .iter()
        .find(|e| e.key == key && e.value == value)
        .ok_or_else(|| TableError::EntryNotFound(format!("{key}: {value}")))?;

    if let Some(out) = remove_trailing_entry(src, table, entry) {
        return Ok(out);
    }

    let end = entry.comma.map_or(entry.value_end, |c| c + 1);
    let start_of_line = line_start(src, entry.start);
    let end_of_line = src[end..].find('\n').map(|i| end + i);
    let alone = src[start_of_line..entry.start].trim().is_empty()
        && src[end..end_of_line.unwrap_or(src.len())].trim().is_empty();

    let mut out = String::with_capacity(src.len());
    if alone {
        out.push_str(&src[..start_of_line]);
        if let Some(eol) = end_of_line {
            out.push_str(&src[eol + 1..]);
        }
    } else {
        let trailing = src[end..].len() - src[end..].trim_start_matches(' ').len();
        out.push_str(&src[..entry.start]);
        out.push_str(&src[end + trailing..]);
    }
    Ok(out)
}

/// Undoes an insert below a last entry that had no comma: the comma added to
/// the previous entry goes together with the removed line.
fn remove_trailing_entry(src: &str, table: &LoaderTable, entry: &TableEntry) -> Option<String> {
    if entry.comma.is_some() {
        return None;
    }
    let index = table.entries.iter().position(|e| e.start == entry.start)?;
    let previous = table.entries.get(index.checked_sub(1)?)?;
    let comma = previous.comma?;
    if comma != previous.value_end || !src[comma + 1..entry.start].trim().is_empty() {
        return None;
    }
    let mut out = String::with_capacity(src.len());
    out.push_str(&src[..comma]);
    out.push_str(&src[entry.value_end..]);
    Some(out)
}

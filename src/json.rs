//! Flat token index over raw JSON response bytes.
//!
//! Responses are scanned once, depth-first, into a sequence of typed spans
//! instead of a materialized parse tree. Each span records its byte range in
//! the response buffer and its immediate-child count, which is enough to walk
//! or skip whole subtrees without recursion into values the caller never
//! asked for. The span count is capped per response, so a hostile or
//! oversized body is rejected instead of growing memory without bound.
//!
//! Layout of the index: an object's children are its keys, a key has exactly
//! one child (its value), and an array's children are its elements. Key
//! lookups via [`TokenIndex::find_key`] only ever visit the immediate keys of
//! the object they are given, so a key buried in a nested object can never
//! shadow a sibling.

use thiserror::Error;

/// Structural type of one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    Primitive,
}

/// One span of the index: a byte range into the response buffer plus the
/// number of immediate children. String spans cover the content between the
/// quotes; escape sequences are left undecoded.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub children: usize,
}

/// Errors from tokenizing or extracting fields.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    /// The input is not well-formed JSON. Carries the byte offset of the
    /// first offending byte.
    #[error("malformed JSON at byte offset {0}")]
    Malformed(usize),
    /// The input needed more spans than the caller allowed for it.
    #[error("token capacity exceeded (limit {0})")]
    CapacityExceeded(usize),
    /// A string extraction was attempted on a non-string span.
    #[error("token at index {0} is not a string")]
    NotAString(usize),
}

/// What the parser is allowed to see next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    Key,
    Colon,
    CommaOrEnd,
    Done,
}

/// The flat index for one response buffer.
pub struct TokenIndex<'a> {
    buf: &'a [u8],
    tokens: Vec<Token>,
}

impl<'a> TokenIndex<'a> {
    /// Tokenizes `buf` in a single pass, producing at most `max_tokens`
    /// spans. Returns an error (and no partial index) if the input is
    /// malformed, needs more spans than allowed, or contains anything after
    /// the first top-level value.
    pub fn parse(buf: &'a [u8], max_tokens: usize) -> Result<Self, JsonError> {
        let mut tokens: Vec<Token> = Vec::new();
        // Open containers, innermost last; `pending_key` runs parallel to it
        // and holds the key awaiting a value for each open object.
        let mut stack: Vec<usize> = Vec::new();
        let mut pending_key: Vec<Option<usize>> = Vec::new();
        let mut expect = Expect::Value;
        let mut pos = 0usize;

        while pos < buf.len() {
            match buf[pos] {
                b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
                open @ (b'{' | b'[') => {
                    if expect != Expect::Value {
                        return Err(JsonError::Malformed(pos));
                    }
                    let kind = if open == b'{' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    let idx = new_token(&mut tokens, max_tokens, kind, pos)?;
                    attach_value(&mut tokens, &stack, &mut pending_key, pos)?;
                    stack.push(idx);
                    pending_key.push(None);
                    expect = if kind == TokenKind::Object {
                        Expect::Key
                    } else {
                        Expect::Value
                    };
                    pos += 1;
                }
                b'}' => {
                    let Some(&top) = stack.last() else {
                        return Err(JsonError::Malformed(pos));
                    };
                    if tokens[top].kind != TokenKind::Object
                        || !matches!(expect, Expect::Key | Expect::CommaOrEnd)
                    {
                        return Err(JsonError::Malformed(pos));
                    }
                    tokens[top].end = pos + 1;
                    stack.pop();
                    pending_key.pop();
                    expect = if stack.is_empty() {
                        Expect::Done
                    } else {
                        Expect::CommaOrEnd
                    };
                    pos += 1;
                }
                b']' => {
                    let Some(&top) = stack.last() else {
                        return Err(JsonError::Malformed(pos));
                    };
                    if tokens[top].kind != TokenKind::Array
                        || !matches!(expect, Expect::Value | Expect::CommaOrEnd)
                    {
                        return Err(JsonError::Malformed(pos));
                    }
                    tokens[top].end = pos + 1;
                    stack.pop();
                    pending_key.pop();
                    expect = if stack.is_empty() {
                        Expect::Done
                    } else {
                        Expect::CommaOrEnd
                    };
                    pos += 1;
                }
                b',' => {
                    if expect != Expect::CommaOrEnd {
                        return Err(JsonError::Malformed(pos));
                    }
                    let Some(&top) = stack.last() else {
                        return Err(JsonError::Malformed(pos));
                    };
                    expect = if tokens[top].kind == TokenKind::Object {
                        Expect::Key
                    } else {
                        Expect::Value
                    };
                    pos += 1;
                }
                b':' => {
                    if expect != Expect::Colon {
                        return Err(JsonError::Malformed(pos));
                    }
                    expect = Expect::Value;
                    pos += 1;
                }
                b'"' => {
                    let start = pos + 1;
                    let mut end = start;
                    loop {
                        if end >= buf.len() {
                            return Err(JsonError::Malformed(end));
                        }
                        match buf[end] {
                            b'"' => break,
                            b'\\' => {
                                end += 1;
                                if end >= buf.len() {
                                    return Err(JsonError::Malformed(end));
                                }
                                match buf[end] {
                                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {
                                        end += 1;
                                    }
                                    b'u' => {
                                        if end + 4 >= buf.len() {
                                            return Err(JsonError::Malformed(end));
                                        }
                                        for k in 1..=4 {
                                            if !buf[end + k].is_ascii_hexdigit() {
                                                return Err(JsonError::Malformed(end + k));
                                            }
                                        }
                                        end += 5;
                                    }
                                    _ => return Err(JsonError::Malformed(end)),
                                }
                            }
                            c if c < 0x20 => return Err(JsonError::Malformed(end)),
                            _ => end += 1,
                        }
                    }
                    let idx = new_token(&mut tokens, max_tokens, TokenKind::String, start)?;
                    tokens[idx].end = end;
                    match expect {
                        Expect::Key => {
                            let Some(&top) = stack.last() else {
                                return Err(JsonError::Malformed(pos));
                            };
                            tokens[top].children += 1;
                            if let Some(slot) = pending_key.last_mut() {
                                *slot = Some(idx);
                            }
                            expect = Expect::Colon;
                        }
                        Expect::Value => {
                            attach_value(&mut tokens, &stack, &mut pending_key, pos)?;
                            expect = if stack.is_empty() {
                                Expect::Done
                            } else {
                                Expect::CommaOrEnd
                            };
                        }
                        _ => return Err(JsonError::Malformed(pos)),
                    }
                    pos = end + 1;
                }
                b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                    if expect != Expect::Value {
                        return Err(JsonError::Malformed(pos));
                    }
                    let start = pos;
                    while pos < buf.len()
                        && !matches!(buf[pos], b',' | b']' | b'}' | b' ' | b'\t' | b'\n' | b'\r')
                    {
                        pos += 1;
                    }
                    let idx = new_token(&mut tokens, max_tokens, TokenKind::Primitive, start)?;
                    tokens[idx].end = pos;
                    attach_value(&mut tokens, &stack, &mut pending_key, start)?;
                    expect = if stack.is_empty() {
                        Expect::Done
                    } else {
                        Expect::CommaOrEnd
                    };
                }
                _ => return Err(JsonError::Malformed(pos)),
            }
        }

        if expect != Expect::Done || !stack.is_empty() {
            return Err(JsonError::Malformed(buf.len()));
        }
        Ok(Self { buf, tokens })
    }

    /// The root span. `parse` guarantees at least one token.
    pub fn root(&self) -> &Token {
        &self.tokens[0]
    }

    /// The span at `index`.
    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    /// Number of spans in the index.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index one past the subtree rooted at `index`.
    pub fn subtree_end(&self, index: usize) -> usize {
        let mut end = index;
        let mut remaining = 1usize;
        while remaining > 0 {
            remaining -= 1;
            remaining += self.tokens[end].children;
            end += 1;
        }
        end
    }

    /// Iterator over the indices of the immediate children of the span at
    /// `index`: keys for an object, elements for an array. Each step skips
    /// the previous child's whole subtree.
    pub fn children(&self, index: usize) -> Children<'_, 'a> {
        Children {
            index: self,
            next: index + 1,
            remaining: self.tokens[index].children,
        }
    }

    /// Looks up `key` among the immediate keys of the object at `object` and
    /// returns the index of its value span. Nested objects are skipped
    /// whole, so only siblings can match; with duplicate keys the first one
    /// wins. Returns `None` when `object` is not an object span.
    pub fn find_key(&self, object: usize, key: &str) -> Option<usize> {
        if self.tokens[object].kind != TokenKind::Object {
            return None;
        }
        for key_idx in self.children(object) {
            let tok = &self.tokens[key_idx];
            if tok.kind == TokenKind::String && &self.buf[tok.start..tok.end] == key.as_bytes() {
                // The value span immediately follows its key.
                return Some(key_idx + 1);
            }
        }
        None
    }

    /// Copies the string span at `index`, truncated to at most `cap` bytes
    /// (cut on a character boundary). Fails when the span is not a string.
    pub fn string(&self, index: usize, cap: usize) -> Result<String, JsonError> {
        let tok = self.tokens[index];
        if tok.kind != TokenKind::String {
            return Err(JsonError::NotAString(index));
        }
        let text = String::from_utf8_lossy(&self.buf[tok.start..tok.end]);
        Ok(truncate_utf8(&text, cap))
    }

    /// Raw bytes of the span at `index`. Used to compare primitives such as
    /// the channel type code without materializing them.
    pub fn raw(&self, index: usize) -> &[u8] {
        let tok = &self.tokens[index];
        &self.buf[tok.start..tok.end]
    }
}

/// Immediate-children iterator, see [`TokenIndex::children`].
pub struct Children<'i, 'a> {
    index: &'i TokenIndex<'a>,
    next: usize,
    remaining: usize,
}

impl Iterator for Children<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.next = self.index.subtree_end(current);
        self.remaining -= 1;
        Some(current)
    }
}

/// Copies `input` truncated to at most `cap` bytes, cutting on a character
/// boundary so a multi-byte character is dropped rather than split.
pub(crate) fn truncate_utf8(input: &str, cap: usize) -> String {
    if input.len() <= cap {
        return input.to_string();
    }
    let mut end = cap;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    input[..end].to_string()
}

fn new_token(
    tokens: &mut Vec<Token>,
    max_tokens: usize,
    kind: TokenKind,
    start: usize,
) -> Result<usize, JsonError> {
    if tokens.len() >= max_tokens {
        return Err(JsonError::CapacityExceeded(max_tokens));
    }
    tokens.push(Token {
        kind,
        start,
        end: start,
        children: 0,
    });
    Ok(tokens.len() - 1)
}

/// Credits a freshly started value span to its parent: the enclosing array,
/// or the pending key of the enclosing object. At the top level there is
/// nothing to credit.
fn attach_value(
    tokens: &mut [Token],
    stack: &[usize],
    pending_key: &mut [Option<usize>],
    pos: usize,
) -> Result<(), JsonError> {
    let Some(&top) = stack.last() else {
        return Ok(());
    };
    if tokens[top].kind == TokenKind::Array {
        tokens[top].children += 1;
        return Ok(());
    }
    let Some(slot) = pending_key.last_mut() else {
        return Err(JsonError::Malformed(pos));
    };
    match slot.take() {
        Some(key_idx) => {
            tokens[key_idx].children += 1;
            Ok(())
        }
        None => Err(JsonError::Malformed(pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> TokenIndex<'_> {
        TokenIndex::parse(input.as_bytes(), 256).expect("well-formed input")
    }

    #[test]
    fn test_parse_flat_object() {
        let index = parse(r#"{"id":"42","name":"general"}"#);
        assert_eq!(index.root().kind, TokenKind::Object);
        assert_eq!(index.root().children, 2);

        let id = index.find_key(0, "id").unwrap();
        assert_eq!(index.string(id, 32).unwrap(), "42");
        let name = index.find_key(0, "name").unwrap();
        assert_eq!(index.string(name, 32).unwrap(), "general");
    }

    #[test]
    fn test_find_key_never_matches_nested_keys() {
        // "id" appears first inside the nested author object; the scoped
        // lookup must return the sibling value, not the nested one.
        let index = parse(r#"{"author":{"id":"inner","username":"u"},"id":"outer"}"#);
        let id = index.find_key(0, "id").unwrap();
        assert_eq!(index.string(id, 32).unwrap(), "outer");

        let author = index.find_key(0, "author").unwrap();
        let nested_id = index.find_key(author, "id").unwrap();
        assert_eq!(index.string(nested_id, 32).unwrap(), "inner");
    }

    #[test]
    fn test_find_key_missing_and_non_object() {
        let index = parse(r#"{"a":1}"#);
        assert_eq!(index.find_key(0, "b"), None);

        let arr = parse(r#"[1,2]"#);
        assert_eq!(arr.find_key(0, "a"), None);
    }

    #[test]
    fn test_children_skip_nested_subtrees() {
        let index = parse(r#"[{"a":{"b":1}},"x",[1,2],7]"#);
        let elements: Vec<usize> = index.children(0).collect();
        assert_eq!(elements.len(), 4);
        assert_eq!(index.token(elements[0]).kind, TokenKind::Object);
        assert_eq!(index.token(elements[1]).kind, TokenKind::String);
        assert_eq!(index.token(elements[2]).kind, TokenKind::Array);
        assert_eq!(index.token(elements[3]).kind, TokenKind::Primitive);
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(parse("{}").root().children, 0);
        assert_eq!(parse("[]").root().children, 0);
        assert_eq!(parse("[]").children(0).count(), 0);
    }

    #[test]
    fn test_string_escapes_kept_raw() {
        let index = parse(r#"{"content":"say \"hi\"\n"}"#);
        let content = index.find_key(0, "content").unwrap();
        assert_eq!(index.string(content, 64).unwrap(), r#"say \"hi\"\n"#);
    }

    #[test]
    fn test_string_truncates_at_cap() {
        let index = parse(r#"{"name":"abcdefgh"}"#);
        let name = index.find_key(0, "name").unwrap();
        assert_eq!(index.string(name, 4).unwrap(), "abcd");
    }

    #[test]
    fn test_string_truncation_respects_char_boundaries() {
        // "héllo" - the é is two bytes, a 2-byte cap may not split it.
        let index = parse("{\"name\":\"h\u{e9}llo\"}");
        let name = index.find_key(0, "name").unwrap();
        assert_eq!(index.string(name, 2).unwrap(), "h");
    }

    #[test]
    fn test_string_extraction_rejects_non_strings() {
        let index = parse(r#"{"type":0}"#);
        let value = index.find_key(0, "type").unwrap();
        assert_eq!(index.string(value, 16), Err(JsonError::NotAString(value)));
        assert_eq!(index.raw(value), b"0");
    }

    #[test]
    fn test_primitives() {
        let index = parse("[0,-12,true,false,null,3.5e2]");
        let raws: Vec<&[u8]> = index.children(0).map(|i| index.raw(i)).collect();
        assert_eq!(
            raws,
            [
                b"0".as_slice(),
                b"-12".as_slice(),
                b"true".as_slice(),
                b"false".as_slice(),
                b"null".as_slice(),
                b"3.5e2".as_slice(),
            ]
        );
    }

    #[test]
    fn test_capacity_exceeded() {
        let result = TokenIndex::parse(br#"[1,2,3,4]"#, 3);
        assert_eq!(result.err(), Some(JsonError::CapacityExceeded(3)));
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [
            "",
            "{",
            "[1,2",
            r#"{"a":}"#,
            r#"{"a" "b"}"#,
            r#"{"a":1]"#,
            r#"{"a":1} extra"#,
            "garbage",
            "\"unterminated",
            "{\"a\":\"bad\\q\"}",
        ] {
            assert!(
                matches!(
                    TokenIndex::parse(input.as_bytes(), 64),
                    Err(JsonError::Malformed(_))
                ),
                "input {input:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_trailing_commas_are_tolerated() {
        assert_eq!(parse("[1,2,]").root().children, 2);
        assert_eq!(parse(r#"{"a":1,}"#).root().children, 1);
    }

    #[test]
    fn test_subtree_end_covers_whole_subtree() {
        let index = parse(r#"{"a":{"b":[1,2]},"c":3}"#);
        let a = index.find_key(0, "a").unwrap();
        let after = index.subtree_end(a);
        // The span right after a's subtree is the "c" key.
        assert_eq!(index.token(after).kind, TokenKind::String);
        assert_eq!(index.raw(after), b"c");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("hello", 16), "hello");
        assert_eq!(truncate_utf8("hello", 5), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        assert_eq!(truncate_utf8("h\u{e9}llo", 2), "h");
    }
}

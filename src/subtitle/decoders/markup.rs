/*!
 * Minimal markup reader shared by the TTML and SAMI decoders.
 *
 * `Tokenizer` yields start tags, end tags and text from XML or HTML-like input.
 * Comments, processing instructions and doctype declarations are skipped; CDATA
 * sections are returned as text. `parse_document` builds a small element tree on
 * top of it for well-formed XML.
 */

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DecodeError;

// @const: Attribute pattern (quoted or bare values)
static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap()
});

// @const: Character and named entity references
static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap()
});

/// Markup token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Start tag, possibly self-closing
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    /// End tag
    Close { name: String },
    /// Raw text between tags (entities not yet decoded)
    Text(&'a str),
    /// CDATA section content
    CData(&'a str),
}

/// Pull tokenizer over a markup string
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_until(&mut self, terminator: &str, construct: &str) -> Result<&'a str, DecodeError> {
        let src = self.src;
        let rest = &src[self.pos..];
        match rest.find(terminator) {
            Some(end) => {
                self.pos += end + terminator.len();
                Ok(&rest[..end])
            }
            None => Err(DecodeError::UnterminatedTag { tag: construct.to_string() }),
        }
    }

    // Reads one tag; `None` for skipped constructs (comments, declarations)
    fn read_tag(&mut self) -> Result<Option<Token<'a>>, DecodeError> {
        let src = self.src;
        let rest = &src[self.pos..];

        if rest.starts_with("<!--") {
            self.pos += 4;
            self.skip_until("-->", "!--")?;
            return Ok(None);
        }
        if rest.starts_with("<![CDATA[") {
            self.pos += 9;
            let content = self.skip_until("]]>", "![CDATA[")?;
            return Ok(Some(Token::CData(content)));
        }
        if rest.starts_with("<?") {
            self.pos += 2;
            self.skip_until("?>", "?")?;
            return Ok(None);
        }
        if rest.starts_with("<!") {
            self.pos += 2;
            self.skip_until(">", "!")?;
            return Ok(None);
        }

        let end = find_tag_end(rest).ok_or_else(|| DecodeError::UnterminatedTag {
            tag: tag_name_prefix(&rest[1..]).to_string(),
        })?;
        let inner = &rest[1..end];
        self.pos += end + 1;

        if let Some(name) = inner.strip_prefix('/') {
            return Ok(Some(Token::Close { name: name.trim().to_string() }));
        }

        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };
        let name = tag_name_prefix(inner).to_string();
        if name.is_empty() {
            return Err(DecodeError::InvalidText(format!("empty tag name in '<{}>'", inner)));
        }
        let attributes = parse_attributes(&inner[name.len()..]);

        Ok(Some(Token::Open { name, attributes, self_closing }))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.src.len() {
                return None;
            }
            let src = self.src;
            let rest = &src[self.pos..];
            if rest.starts_with('<') {
                match self.read_tag() {
                    Ok(Some(token)) => return Some(Ok(token)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.pos = self.src.len();
                        return Some(Err(e));
                    }
                }
            }
            let end = rest.find('<').unwrap_or(rest.len());
            self.pos += end;
            return Some(Ok(Token::Text(&rest[..end])));
        }
    }
}

// Position of the '>' closing a tag, ignoring '>' inside quoted attribute values
fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, '<') if i > 0 => return None,
            _ => {}
        }
    }
    None
}

fn tag_name_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(s.len());
    &s[..end]
}

fn parse_attributes(s: &str) -> Vec<(String, String)> {
    ATTRIBUTE_REGEX
        .captures_iter(s)
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()).into_owned())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Name without its namespace prefix (`tts:fontStyle` -> `fontStyle`)
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Decode character references and the common named entities.
///
/// Unknown named entities are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_REGEX.replace_all(text, |caps: &regex::Captures| {
        let entity = &caps[1];
        let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match entity.to_ascii_lowercase().as_str() {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "lrm" => Some('\u{200e}'),
                "rlm" => Some('\u{200f}'),
                "hellip" => Some('\u{2026}'),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                _ => None,
            }
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

/// Collapse XML whitespace runs to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Element node of a parsed document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name as written (including any prefix)
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Document node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Text with entities decoded
    Text(String),
}

impl Element {
    /// Local part of the tag name
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether the local tag name matches (case-sensitive, as XML is)
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value by local name (`tts:fontStyle` is found as `fontStyle`)
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| local_name(name) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }

    /// All descendant elements with the given local name, in document order
    pub fn descendants<'e>(&'e self, local: &str, out: &mut Vec<&'e Element>) {
        for element in self.elements() {
            if element.is(local) {
                out.push(element);
            }
            element.descendants(local, out);
        }
    }
}

/// Parse a well-formed XML document and return its root element
pub fn parse_document(src: &str) -> Result<Element, DecodeError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    for token in Tokenizer::new(src) {
        match token? {
            Token::Open { name, attributes, self_closing } => {
                let element = Element { name, attributes, children: Vec::new() };
                if self_closing {
                    attach(&mut stack, &mut root, element);
                } else {
                    stack.push(element);
                }
            }
            Token::Close { name } => {
                let element = stack.pop().ok_or_else(|| DecodeError::MismatchedTag {
                    expected: String::new(),
                    found: name.clone(),
                })?;
                if element.name != name {
                    return Err(DecodeError::MismatchedTag { expected: element.name, found: name });
                }
                attach(&mut stack, &mut root, element);
            }
            Token::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(decode_entities(text).into_owned()));
                }
            }
            Token::CData(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.to_string()));
                }
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(DecodeError::UnterminatedTag { tag: open.name });
    }
    root.ok_or(DecodeError::MissingRoot("document"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

//! Font text decoding.
//!
//! Show operators carry character codes, not text. A font's `ToUnicode`
//! CMap maps those codes to Unicode. Without one, simple fonts go through
//! their named `/Encoding` (WinAnsi, MacRoman, ...) and the rest fall back to
//! UTF-16BE (when the string has a byte order mark) or Latin-1.
//!
//! The CMap parser here also covers one-byte codes, which lopdf's own
//! `ToUnicode` decoding does not.

use lopdf::{Dictionary, Document, Encoding, Object};
use std::collections::HashMap;

/// Largest `bfrange` we expand; anything bigger is treated as corrupt.
const MAX_RANGE_LEN: u32 = 0x1_0000;

/// Mapping from character codes to Unicode text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    /// Bytes per character code, from the codespace range.
    code_len: Option<usize>,
    map: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parse the body of a `ToUnicode` CMap stream.
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = Self::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    i += 1;
                    while i + 1 < tokens.len() && !tokens[i].is_word("endcodespacerange") {
                        if let Token::Hex(lo) = &tokens[i] {
                            cmap.code_len.get_or_insert(lo.len().max(1));
                        }
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() && !tokens[i].is_word("endbfchar") {
                        if let (Token::Hex(src), Token::Hex(dst)) = (&tokens[i], &tokens[i + 1]) {
                            cmap.insert_code_len(src.len());
                            cmap.map.insert(code_value(src), utf16be(dst));
                        }
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() && !tokens[i].is_word("endbfrange") {
                        i = cmap.parse_range(&tokens, i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        cmap
    }

    /// Parse one `bfrange` entry starting at `i`; returns the index after it.
    fn parse_range(&mut self, tokens: &[Token], i: usize) -> usize {
        let (lo, hi) = match (&tokens[i], &tokens[i + 1]) {
            (Token::Hex(lo), Token::Hex(hi)) => (lo, hi),
            _ => return i + 1,
        };
        self.insert_code_len(lo.len());
        let (start, end) = (code_value(lo), code_value(hi));
        if end < start || end - start >= MAX_RANGE_LEN {
            log::debug!("Ignoring bfrange {:#x}..{:#x}", start, end);
            return self.skip_destination(tokens, i + 2);
        }

        match &tokens[i + 2] {
            Token::Hex(dst) => {
                let mut units: Vec<u16> = dst
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                    .collect();
                for code in start..=end {
                    self.map.insert(code, String::from_utf16_lossy(&units));
                    if let Some(last) = units.last_mut() {
                        *last = last.wrapping_add(1);
                    }
                }
                i + 3
            }
            Token::ArrayStart => {
                let mut j = i + 3;
                let mut code = start;
                while j < tokens.len() && tokens[j] != Token::ArrayEnd {
                    if let Token::Hex(dst) = &tokens[j] {
                        if code <= end {
                            self.map.insert(code, utf16be(dst));
                        }
                        code += 1;
                    }
                    j += 1;
                }
                j + 1
            }
            _ => i + 2,
        }
    }

    fn skip_destination(&self, tokens: &[Token], i: usize) -> usize {
        if tokens.get(i) == Some(&Token::ArrayStart) {
            let mut j = i;
            while j < tokens.len() && tokens[j] != Token::ArrayEnd {
                j += 1;
            }
            j + 1
        } else {
            i + 1
        }
    }

    fn insert_code_len(&mut self, len: usize) {
        self.code_len.get_or_insert(len.max(1));
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }
}

/// Code-to-character table of a single-byte font encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteEncoding {
    table: Vec<Option<char>>,
}

impl ByteEncoding {
    /// Table for a named base encoding such as `WinAnsiEncoding`.
    ///
    /// Returns `None` for names lopdf does not know as one-byte encodings
    /// (`Identity-H`, CJK CMaps, ...).
    pub fn named(doc: &Document, encoding_name: &[u8]) -> Option<Self> {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Encoding", Object::Name(encoding_name.to_vec()));

        let encoding = font.get_font_encoding(doc).ok()?;
        if !matches!(encoding, Encoding::OneByteEncoding(_)) {
            return None;
        }

        let table = (0..=u8::MAX)
            .map(|code| {
                Document::decode_text(&encoding, &[code])
                    .ok()
                    .and_then(|text| text.chars().next())
            })
            .collect();
        Some(Self { table })
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .iter()
            .filter_map(|&b| self.table.get(usize::from(b)).copied().flatten())
            .collect()
    }
}

/// Decodes show-operator strings for one font.
#[derive(Debug, Clone, Default)]
pub struct FontDecoder {
    to_unicode: Option<ToUnicodeMap>,
    encoding: Option<ByteEncoding>,
    /// Composite (Type0) fonts use two-byte codes by default.
    composite: bool,
}

impl FontDecoder {
    pub fn new(to_unicode: Option<ToUnicodeMap>, composite: bool) -> Self {
        Self {
            to_unicode: to_unicode.filter(|m| !m.is_empty()),
            encoding: None,
            composite,
        }
    }

    /// Use a single-byte encoding for codes without a `ToUnicode` entry.
    /// Ignored for composite fonts.
    pub fn with_encoding(mut self, encoding: Option<ByteEncoding>) -> Self {
        self.encoding = encoding.filter(|_| !self.composite);
        self
    }

    /// Decode the bytes of a string operand.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if let Some(cmap) = &self.to_unicode {
            let width = cmap
                .code_len
                .unwrap_or(if self.composite { 2 } else { 1 });
            return bytes
                .chunks(width)
                .filter_map(|chunk| match cmap.get(code_value(chunk)) {
                    Some(text) => Some(text.to_string()),
                    None if width == 1 => Some(self.decode_byte(chunk[0])),
                    None => None,
                })
                .collect();
        }

        if bytes.starts_with(&[0xFE, 0xFF]) {
            return utf16be(&bytes[2..]);
        }

        if let Some(encoding) = &self.encoding {
            return encoding.decode(bytes);
        }

        if self.composite {
            log::debug!("Composite font without ToUnicode; text dropped");
            return String::new();
        }

        bytes.iter().map(|&b| char::from(b)).collect()
    }

    fn decode_byte(&self, byte: u8) -> String {
        match &self.encoding {
            Some(encoding) => encoding.decode(&[byte]),
            None => char::from(byte).to_string(),
        }
    }
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Word(String),
    ArrayStart,
    ArrayEnd,
}

impl Token {
    fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w == word)
    }
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                i += 1;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                i += 1;
            }
            b'<' => {
                let mut digits = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                if digits.len() % 2 == 1 {
                    digits.push(b'0');
                }
                let bytes = digits
                    .chunks(2)
                    .map(|pair| (hex_digit(pair[0]) << 4) | hex_digit(pair[1]))
                    .collect();
                tokens.push(Token::Hex(bytes));
            }
            b'[' => tokens.push(Token::ArrayStart),
            b']' => tokens.push(Token::ArrayEnd),
            b'(' => {
                let mut depth = 1;
                i += 1;
                while i < data.len() && depth > 0 {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                continue;
            }
            _ if b.is_ascii_whitespace() => {}
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !b"<>[]()%".contains(&data[i])
                {
                    i += 1;
                }
                tokens.push(Token::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
                continue;
            }
        }
        i += 1;
    }

    tokens
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

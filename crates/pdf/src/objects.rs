//! Small helpers for walking the PDF object graph.

use lopdf::{Dictionary, Document, Object, Stream};

/// Depth limit for reference chains and inherited attributes.
const MAX_DEPTH: usize = 16;

/// Follow references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            _ => return Some(current),
        }
    }
    None
}

/// Resolved value of `key` in `dict`.
pub fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// The object as a dictionary; streams yield their dictionary.
pub fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn as_stream<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, obj)? {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

pub fn name(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(name) => Some(name),
        _ => None,
    }
}

/// Resolved array of numbers, e.g. a `MediaBox` or `Matrix`.
pub fn numbers(doc: &Document, obj: &Object) -> Option<Vec<f64>> {
    match resolve(doc, obj)? {
        Object::Array(items) => items
            .iter()
            .map(|item| resolve(doc, item).and_then(number))
            .collect(),
        _ => None,
    }
}

/// Look up a page attribute, walking `Parent` links for inherited ones.
pub fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_DEPTH {
        if let Some(value) = get(doc, dict, key) {
            return Some(value);
        }
        dict = as_dict(doc, dict.get(b"Parent").ok()?)?;
    }
    None
}

/// Bytes of a stream with its filters removed.
///
/// Streams without a filter are returned as stored.
pub fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Some(stream.content.clone());
    }
    stream.decompressed_content().ok()
}

use std::fmt::Write;

use serde_json::{json, Value};

use super::{BValue, Dictionary};

/// Byte strings longer than this are summarized in [`dump`].
const DUMP_STRING_LIMIT: usize = 64;

/// Convert a `BValue` into JSON (using Serde JSON `Value`).
///
/// - `Integer(i)` => JSON number
/// - `ByteString(bytes)` => Attempt UTF-8; if invalid, store hex in `"_bytes_hex"`.
/// - `List(...)` => JSON array
/// - `Dict(...)` => JSON object, keys converted lossily
pub fn bvalue_to_json(bv: &BValue) -> Value {
    match bv {
        BValue::Integer(i) => json!(i),
        BValue::ByteString(bytes) => match std::str::from_utf8(bytes) {
            Ok(utf8_str) => Value::String(utf8_str.to_string()),
            Err(_) => json!({ "_bytes_hex": hex::encode(bytes) }),
        },
        BValue::List(items) => Value::Array(items.iter().map(bvalue_to_json).collect()),
        BValue::Dict(dict) => dict_to_json(dict),
    }
}

pub fn dict_to_json(dict: &Dictionary) -> Value {
    let mut json_map = serde_json::Map::new();
    for (k, v) in dict.iter() {
        json_map.insert(String::from_utf8_lossy(k).into_owned(), bvalue_to_json(v));
    }
    Value::Object(json_map)
}

/// Renders a value as an indented tree, one entry per line.
pub fn dump(bv: &BValue) -> String {
    let mut out = String::new();
    dump_into(&mut out, bv, 0);
    out
}

pub fn dump_dict(dict: &Dictionary) -> String {
    let mut out = String::new();
    dump_entries(&mut out, dict, 0);
    out
}

fn dump_into(out: &mut String, bv: &BValue, indent: usize) {
    match bv {
        BValue::Integer(i) => {
            let _ = writeln!(out, "{}", i);
        }
        BValue::ByteString(bytes) => {
            let _ = writeln!(out, "{}", describe_bytes(bytes));
        }
        BValue::List(items) => {
            let _ = writeln!(out, "list ({} items)", items.len());
            for item in items {
                let _ = write!(out, "{:width$}- ", "", width = indent + 2);
                dump_into(out, item, indent + 4);
            }
        }
        BValue::Dict(dict) => {
            let _ = writeln!(out, "dict ({} entries)", dict.len());
            dump_entries(out, dict, indent + 2);
        }
    }
}

fn dump_entries(out: &mut String, dict: &Dictionary, indent: usize) {
    for (k, v) in dict.iter() {
        let _ = write!(
            out,
            "{:width$}{}: ",
            "",
            String::from_utf8_lossy(k),
            width = indent
        );
        dump_into(out, v, indent + 2);
    }
}

fn describe_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() <= DUMP_STRING_LIMIT => format!("{:?}", s),
        Ok(_) => format!("<{} bytes of text>", bytes.len()),
        Err(_) => format!("<{} bytes>", bytes.len()),
    }
}

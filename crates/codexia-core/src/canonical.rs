//! Canonical JSON (sorted keys, compact, ASCII-only) and its sha256.
//!
//! Non-ASCII characters are written as lower-case `\uXXXX` escapes, astral
//! characters as surrogate pairs, so hashes match an `ensure_ascii` encoder.
//!
//! Object keys are sorted here rather than relying on the map type behind
//! `serde_json::Value`, whose order depends on crate features.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::CoreError;

pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

/// Lower-case hex sha256 of the canonical serialisation.
pub fn canonical_sha256<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CoreError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_ascii(&serde_json::to_string(key)?, out);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        scalar => push_ascii(&serde_json::to_string(scalar)?, out),
    }
    Ok(())
}

fn push_ascii(json: &str, out: &mut String) {
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
}

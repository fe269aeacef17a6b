//! Streaming diagnostic-notation rendering (§4.5), used by tests to produce human-readable
//! assertions against wire structures instead of comparing raw bytes.

use ciborium::value::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default)]
pub struct DiagOptions {
    /// Pretty-print nested maps/arrays across multiple lines with indentation.
    pub pretty: bool,
    /// When encountering tag 24 (embedded CBOR), recursively render its contents instead of the
    /// raw byte string.
    pub decode_embedded_cbor: bool,
}

/// Render `value` in (a subset of) CBOR diagnostic notation (RFC 8949 §8).
pub fn to_diagnostic(value: &Value, options: DiagOptions) -> String {
    let mut out = String::new();
    write_value(&mut out, value, options, 0);
    out
}

fn indent(out: &mut String, options: DiagOptions, depth: usize) {
    if options.pretty {
        out.push('\n');
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
}

fn write_value(out: &mut String, value: &Value, options: DiagOptions, depth: usize) {
    match value {
        Value::Integer(i) => {
            let i: i128 = (*i).into();
            let _ = write!(out, "{i}");
        }
        Value::Bytes(b) => {
            let _ = write!(out, "h'{}'", hex::encode(b));
        }
        Value::Text(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
        Value::Float(f) => {
            let _ = write!(out, "{f}");
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                indent(out, options, depth + 1);
                write_value(out, item, options, depth + 1);
            }
            indent(out, options, depth);
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (idx, (k, v)) in entries.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                indent(out, options, depth + 1);
                write_value(out, k, options, depth + 1);
                out.push_str(": ");
                write_value(out, v, options, depth + 1);
            }
            indent(out, options, depth);
            out.push('}');
        }
        Value::Tag(24, boxed) if options.decode_embedded_cbor => {
            if let Value::Bytes(bytes) = boxed.as_ref() {
                match ciborium::from_reader::<Value, _>(bytes.as_slice()) {
                    Ok(inner) => {
                        out.push_str("24(");
                        write_value(out, &inner, options, depth);
                        out.push(')');
                    }
                    Err(_) => {
                        let _ = write!(out, "24(h'{}')", hex::encode(bytes));
                    }
                }
            }
        }
        Value::Tag(tag, boxed) => {
            let _ = write!(out, "{tag}(");
            write_value(out, boxed, options, depth);
            out.push(')');
        }
        other => {
            let _ = write!(out, "{other:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_flat_map_compactly() {
        let value = Value::Map(vec![(Value::Text("a".into()), Value::Integer(1.into()))]);
        assert_eq!(to_diagnostic(&value, DiagOptions::default()), "{\"a\": 1}");
    }

    #[test]
    fn decodes_embedded_cbor_when_requested() {
        let mut inner_bytes = Vec::new();
        ciborium::into_writer(&Value::Integer(42.into()), &mut inner_bytes).unwrap();
        let tagged = Value::Tag(24, Box::new(Value::Bytes(inner_bytes)));

        let options = DiagOptions { decode_embedded_cbor: true, ..Default::default() };
        assert_eq!(to_diagnostic(&tagged, options), "24(42)");

        let options = DiagOptions { decode_embedded_cbor: false, ..Default::default() };
        assert!(to_diagnostic(&tagged, options).starts_with("24(h'"));
    }
}

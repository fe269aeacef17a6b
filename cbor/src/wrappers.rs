//! Wrapper types that change how their inner value is shaped on the wire (§4.5, §6), mirroring
//! the ISO 18013-5 structures that are CBOR arrays or tagged-encoded-CBOR rather than plain maps.

use std::marker::PhantomData;

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Tag 24: "embedded CBOR data item" (RFC 8949 §3.4.5.1). Several mdoc structures are carried
/// as the *bytes* of their own CBOR encoding rather than inline, so that the bytes can be hashed
/// or signed without re-encoding (and thus without risking a non-canonical round trip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedBytes<T>(pub T);

const CBOR_TAG_ENCODED_CBOR: u64 = 24;

impl<T> From<T> for TaggedBytes<T> {
    fn from(value: T) -> Self {
        TaggedBytes(value)
    }
}

impl<T: Serialize> Serialize for TaggedBytes<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut encoded = Vec::new();
        ciborium::into_writer(&self.0, &mut encoded).map_err(S::Error::custom)?;
        let tagged = Value::Tag(CBOR_TAG_ENCODED_CBOR, Box::new(Value::Bytes(encoded)));
        tagged.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for TaggedBytes<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Tag(CBOR_TAG_ENCODED_CBOR, boxed) = value else {
            return Err(D::Error::custom("expected CBOR tag 24 (embedded CBOR)"));
        };
        let Value::Bytes(encoded) = *boxed else {
            return Err(D::Error::custom("tag 24 content was not a byte string"));
        };
        let inner = ciborium::from_reader(encoded.as_slice()).map_err(D::Error::custom)?;
        Ok(TaggedBytes(inner))
    }
}

/// Serializes `T` as a CBOR array of its field values (in declaration order) instead of a map
/// of name/value pairs — the shape the spec calls for `SessionTranscript`, `DeviceAuthentication`,
/// and similar structures that are positionally defined by ISO/IEC 18013-5 rather than named.
///
/// Works by round-tripping through `ciborium`'s own struct-as-map encoding and reshaping the
/// resulting [`Value`]: the map's values (in order) become the array's elements. Deserializing
/// does the reverse via `Value`'s own untyped `Deserializer` impl, which — like every
/// non-self-describing serde format — lets a derived struct `Visitor` read its fields
/// positionally from a sequence just as readily as by name from a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborSeq<T>(pub T);

impl<T> From<T> for CborSeq<T> {
    fn from(value: T) -> Self {
        CborSeq(value)
    }
}

fn map_to_array(value: Value) -> Result<Value, String> {
    match value {
        Value::Map(entries) => Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect())),
        array @ Value::Array(_) => Ok(array),
        other => Err(format!("expected a struct-shaped value, got {other:?}")),
    }
}

impl<T: Serialize> Serialize for CborSeq<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = Value::serialized(&self.0).map_err(S::Error::custom)?;
        let array = map_to_array(value).map_err(S::Error::custom)?;
        array.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for CborSeq<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let inner = value.deserialized::<T>().map_err(D::Error::custom)?;
        Ok(CborSeq(inner))
    }
}

/// Maps a struct's field names to the small non-contiguous integers ISO/IEC 18013-5 actually
/// assigns them on the wire (`DeviceEngagement`/`ReaderEngagement`'s `Engagement` map: §4.9).
/// Unlike [`CborSeq`], position in the struct alone doesn't determine the wire key, so each
/// implementer spells the mapping out explicitly.
pub trait IntKeyed {
    const KEYS: &'static [(&'static str, i64)];
}

/// Serializes `T` as a CBOR map keyed by small integers instead of field-name strings — the shape
/// ISO/IEC 18013-5 uses for `DeviceEngagement`/`ReaderEngagement`, as opposed to the purely
/// positional arrays [`CborSeq`] models.
///
/// Works the same way `CborSeq` does: round-trip `T` through `ciborium`'s own struct-as-map
/// encoding, then rewrite the map's keys in place using `T::KEYS` (for serialization) or invert
/// the lookup (for deserialization) before re-parsing into `T` via `Value`'s untyped
/// `Deserializer` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborIntMap<T>(pub T);

impl<T> From<T> for CborIntMap<T> {
    fn from(value: T) -> Self {
        CborIntMap(value)
    }
}

fn lookup_int(keys: &'static [(&'static str, i64)], name: &str) -> Option<i64> {
    keys.iter().find(|(field, _)| *field == name).map(|(_, int_key)| *int_key)
}

fn lookup_name(keys: &'static [(&'static str, i64)], int_key: i64) -> Option<&'static str> {
    keys.iter().find(|(_, key)| *key == int_key).map(|(field, _)| *field)
}

fn names_to_ints<T: IntKeyed>(value: Value) -> Result<Value, String> {
    let Value::Map(entries) = value else {
        return Err(format!("expected a struct-shaped value, got {value:?}"));
    };
    let mapped = entries
        .into_iter()
        .map(|(key, value)| {
            let Value::Text(name) = &key else {
                return Err(format!("expected a string field name, got {key:?}"));
            };
            let int_key = lookup_int(T::KEYS, name).ok_or_else(|| format!("unknown field `{name}` for int-keyed map"))?;
            Ok((Value::Integer(int_key.into()), value))
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Value::Map(mapped))
}

fn ints_to_names<T: IntKeyed>(value: Value) -> Result<Value, String> {
    let Value::Map(entries) = value else {
        return Err(format!("expected a map, got {value:?}"));
    };
    let mapped = entries
        .into_iter()
        .map(|(key, value)| {
            let Value::Integer(int_key) = &key else {
                return Err(format!("expected an integer key, got {key:?}"));
            };
            let int_key: i64 = (*int_key).try_into().map_err(|_| format!("int key `{int_key:?}` out of range"))?;
            let name = lookup_name(T::KEYS, int_key).ok_or_else(|| format!("unknown int key `{int_key}` for int-keyed map"))?;
            Ok((Value::Text(name.to_owned()), value))
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Value::Map(mapped))
}

impl<T: Serialize + IntKeyed> Serialize for CborIntMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = Value::serialized(&self.0).map_err(S::Error::custom)?;
        let mapped = names_to_ints::<T>(value).map_err(S::Error::custom)?;
        mapped.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned + IntKeyed> Deserialize<'de> for CborIntMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let mapped = ints_to_names::<T>(value).map_err(D::Error::custom)?;
        let inner = mapped.deserialized::<T>().map_err(D::Error::custom)?;
        Ok(CborIntMap(inner))
    }
}

/// A marker field whose only valid wire value is a fixed string constant, used for structures
/// like `DeviceAuthentication`'s leading `"DeviceAuthentication"` / `"ReaderAuthentication"`
/// discriminator that exist purely to bind the signature to the structure's purpose.
#[derive(Debug, Clone, Default)]
pub struct RequiredValue<C: ConstString>(PhantomData<C>);

pub trait ConstString {
    const VALUE: &'static str;
}

impl<C: ConstString> Serialize for RequiredValue<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(C::VALUE)
    }
}

impl<'de, C: ConstString> Deserialize<'de> for RequiredValue<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let found = String::deserialize(deserializer)?;
        if found != C::VALUE {
            return Err(D::Error::custom(format!("expected constant `{}`, found `{found}`", C::VALUE)));
        }
        Ok(RequiredValue(PhantomData))
    }
}

#[macro_export]
macro_rules! const_cbor_string {
    ($name:ident, $value:literal) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::wrappers::ConstString for $name {
            const VALUE: &'static str = $value;
        }
    };
}

const_cbor_string!(DeviceAuthenticationString, "DeviceAuthentication");
const_cbor_string!(ReaderAuthenticationString, "ReaderAuthentication");
const_cbor_string!(ReaderAuthenticationAllString, "ReaderAuthenticationAll");

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde::Serialize;

    use super::*;
    use crate::ser::cbor_deserialize;
    use crate::ser::cbor_serialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Point {
        x: u32,
        y: u32,
    }

    #[test]
    fn cbor_seq_round_trips_as_array() {
        let seq = CborSeq(Point { x: 1, y: 2 });
        let bytes = cbor_serialize(&seq).unwrap();

        // Must decode as a two-element array, not a map.
        let value: Value = cbor_value_roundtrip(&bytes);
        assert!(matches!(value, Value::Array(ref a) if a.len() == 2));

        let back: CborSeq<Point> = cbor_deserialize(&bytes).unwrap();
        assert_eq!(back, seq);
    }

    fn cbor_value_roundtrip(bytes: &[u8]) -> Value {
        ciborium::from_reader(bytes).unwrap()
    }

    #[test]
    fn tagged_bytes_round_trips_through_tag_24() {
        let tagged = TaggedBytes(Point { x: 7, y: 9 });
        let bytes = cbor_serialize(&tagged).unwrap();
        let value = cbor_value_roundtrip(&bytes);
        assert!(matches!(value, Value::Tag(24, _)));

        let back: TaggedBytes<Point> = cbor_deserialize(&bytes).unwrap();
        assert_eq!(back, tagged);
    }

    #[test]
    fn required_value_rejects_mismatched_constant() {
        let bytes = cbor_serialize(&"WrongValue").unwrap();
        let result: Result<RequiredValue<DeviceAuthenticationString>, _> = cbor_deserialize(&bytes);
        assert!(result.is_err());
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Labeled {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
    }

    impl IntKeyed for Labeled {
        const KEYS: &'static [(&'static str, i64)] = &[("name", 0), ("nickname", 5)];
    }

    #[test]
    fn cbor_int_map_round_trips_with_integer_keys() {
        let labeled = CborIntMap(Labeled { name: "alice".to_owned(), nickname: None });
        let bytes = cbor_serialize(&labeled).unwrap();

        let value = cbor_value_roundtrip(&bytes);
        match value {
            Value::Map(entries) => {
                assert_eq!(entries, vec![(Value::Integer(0.into()), Value::Text("alice".to_owned()))]);
            }
            other => panic!("expected a map, got {other:?}"),
        }

        let back: CborIntMap<Labeled> = cbor_deserialize(&bytes).unwrap();
        assert_eq!(back, labeled);
    }

    #[test]
    fn cbor_int_map_rejects_unknown_wire_key() {
        let value = Value::Map(vec![(Value::Integer(0.into()), Value::Text("alice".to_owned())), (Value::Integer(99.into()), Value::Bool(true))]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();

        let result: Result<CborIntMap<Labeled>, _> = cbor_deserialize(&bytes);
        assert!(result.is_err());
    }
}

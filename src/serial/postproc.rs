//! Normalizers for well-known container classes.
//!
//! Java's collection classes serialize as a field soup plus `writeObject`
//! block data. Each normalizer rewrites one class's generic decoded layer
//! into its natural JSON shape and stores it under the canonical-projection
//! key, which makes the dispatcher surface the projection instead of the
//! shell.
//!
//! The registry is keyed by `className@serialVersionUIDHex`, so only the
//! exact serialized forms shipped by the JDK are rewritten.

use chrono::{FixedOffset, TimeZone};
use itertools::Itertools;

use super::parsing::Error;
use super::OBJECT_VALUE_KEY;
use crate::value::{Object, Value};

/// A container normalizer: receives the decoded field layer and the
/// annotation values, returns the rewritten layer.
pub(crate) type PostProc = fn(Object, &[Value], FixedOffset) -> Result<Object, Error>;

/// Looks up the normalizer for a `name@uidHex` signature.
pub(crate) fn lookup(signature: &str) -> Option<PostProc> {
    Some(match signature {
        "java.lang.Byte@9c4e6084ee50f51c"
        | "java.lang.Character@348b47d96b1a2678"
        | "java.lang.Double@80b3c24a296bfb04"
        | "java.lang.Float@daedc9a2db3cf0ec"
        | "java.lang.Integer@12e2a0a4f7818738"
        | "java.lang.Long@3b8be490cc8f23df"
        | "java.lang.Short@684d37133460da52"
        | "java.lang.Boolean@cd207280d59cfaee" => primitive_wrapper,
        "java.util.ArrayList@7881d21d99c7619d"
        | "java.util.ArrayDeque@207cda2e240da08b"
        | "java.util.concurrent.CopyOnWriteArrayList@785d9fd546ab90c3"
        | "java.util.CollSer@578eabb63a1ba811" => list,
        "java.util.Hashtable@13bb0f25214ae4b8" | "java.util.HashMap@0507dac1c31660d1" => map,
        "java.util.EnumMap@065d7df7be907ca1" => enum_map,
        "java.util.HashSet@ba44859596b8b734" => hash_set,
        "java.util.Date@686a81014b597419" => date,
        "java.util.Calendar@e6ea4d1ec8dc5b8e" => calendar,
        "java.util.Arrays$ArrayList@d9a43cbecd8806d2" => arrays_as_list,
        _ => return None,
    })
}

/// Reads the element count, a big-endian `i32` at `offset` into the first
/// annotation block. The offset skips whatever housekeeping the class's
/// `writeObject` emits before the count.
fn element_count(data: &[Value], offset: usize) -> Result<usize, Error> {
    let Some(first) = data.first() else {
        return Err(Error::MissingContainerData);
    };
    let Value::Bytes(block) = first else {
        return Err(Error::UnexpectedContainerData);
    };
    if block.len() < offset + 4 {
        return Err(Error::ShortContainerData {
            want: offset + 4,
            got: block.len(),
        });
    }
    let count = i32::from_be_bytes([
        block[offset],
        block[offset + 1],
        block[offset + 2],
        block[offset + 3],
    ]);
    usize::try_from(count).map_err(|_| Error::MalformedContainerPayload {
        want: i64::from(count),
        got: data.len() as i64 - 1,
    })
}

/// Boxed primitive wrappers project their `value` field.
fn primitive_wrapper(mut fields: Object, _data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let value = fields.get("value").cloned().unwrap_or(Value::Null);
    fields.insert(OBJECT_VALUE_KEY, value);
    Ok(fields)
}

/// List-shaped containers: annotation 0 carries the count, annotations
/// 1..=count carry the elements.
fn list(mut fields: Object, data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let count = element_count(data, 0)?;
    if data.len() != count + 1 {
        return Err(Error::MalformedContainerPayload {
            want: count as i64,
            got: data.len() as i64 - 1,
        });
    }
    fields.insert(OBJECT_VALUE_KEY, Value::Array(data[1..=count].to_vec()));
    Ok(fields)
}

/// `Hashtable`/`HashMap`: the count sits past the load-factor/threshold
/// region of the size block; annotations alternate keys and values.
fn map(fields: Object, data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let count = element_count(data, 4)?;
    key_value_pairs(fields, data, count)
}

/// `EnumMap`: same pairing, but the count opens the size block. Keys are
/// enum constants, which have already collapsed to their names.
fn enum_map(fields: Object, data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let count = element_count(data, 0)?;
    key_value_pairs(fields, data, count)
}

fn key_value_pairs(mut fields: Object, data: &[Value], count: usize) -> Result<Object, Error> {
    if count * 2 + 1 > data.len() {
        return Err(Error::MalformedContainerPayload {
            want: count as i64,
            got: data.len() as i64 - 1,
        });
    }
    let mut entries = Object::new();
    for (key, value) in data[1..].iter().tuples::<(_, _)>().take(count) {
        entries.insert(key.to_string(), value.clone());
    }
    fields.insert(OBJECT_VALUE_KEY, Value::Object(entries));
    Ok(fields)
}

/// `HashSet`: the count sits past capacity and load factor.
fn hash_set(mut fields: Object, data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let count = element_count(data, 8)?;
    if data.len() != count + 1 {
        return Err(Error::MalformedContainerPayload {
            want: count as i64,
            got: data.len() as i64 - 1,
        });
    }
    fields.insert(OBJECT_VALUE_KEY, Value::Array(data[1..=count].to_vec()));
    Ok(fields)
}

/// `Date`: the first eight bytes of the first annotation block are the
/// epoch milliseconds.
fn date(mut fields: Object, data: &[Value], zone: FixedOffset) -> Result<Object, Error> {
    let Some(first) = data.first() else {
        return Err(Error::MissingContainerData);
    };
    let Value::Bytes(block) = first else {
        return Err(Error::UnexpectedContainerData);
    };
    if block.len() < 8 {
        return Err(Error::ShortContainerData {
            want: 8,
            got: block.len(),
        });
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&block[..8]);
    let millis = i64::from_be_bytes(raw);
    fields.insert(OBJECT_VALUE_KEY, timestamp(millis, zone)?);
    Ok(fields)
}

/// `Calendar`: the `time` field is already the epoch milliseconds.
fn calendar(mut fields: Object, _data: &[Value], zone: FixedOffset) -> Result<Object, Error> {
    let Some(Value::Long(millis)) = fields.get("time") else {
        return Err(Error::MissingContainerData);
    };
    let millis = *millis;
    fields.insert(OBJECT_VALUE_KEY, timestamp(millis, zone)?);
    Ok(fields)
}

/// `Arrays$ArrayList` wraps its backing array in the `a` field.
fn arrays_as_list(mut fields: Object, _data: &[Value], _zone: FixedOffset) -> Result<Object, Error> {
    let value = fields.get("a").cloned().unwrap_or(Value::Null);
    fields.insert(OBJECT_VALUE_KEY, value);
    Ok(fields)
}

fn timestamp(millis: i64, zone: FixedOffset) -> Result<Value, Error> {
    zone.timestamp_millis_opt(millis)
        .single()
        .map(Value::Timestamp)
        .ok_or(Error::TimestampOutOfRange(millis))
}

#[cfg(test)]
mod tests {
    use chrono::{Offset, Utc};

    use super::*;

    fn size_block(prefix: &[u8], count: i32) -> Value {
        let mut block = prefix.to_vec();
        block.extend_from_slice(&count.to_be_bytes());
        Value::Bytes(block)
    }

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    #[test]
    fn element_count_honors_offset() {
        let data = [size_block(&[0, 0, 0, 0], 3)];
        assert_eq!(element_count(&data, 4).unwrap(), 3);
        assert_eq!(element_count(&data, 0).unwrap(), 0);
    }

    #[test]
    fn element_count_requires_a_byte_block() {
        assert!(matches!(
            element_count(&[], 0),
            Err(Error::MissingContainerData)
        ));
        assert!(matches!(
            element_count(&[Value::Int(1)], 0),
            Err(Error::UnexpectedContainerData)
        ));
        assert!(matches!(
            element_count(&[Value::Bytes(vec![0, 0])], 0),
            Err(Error::ShortContainerData { want: 4, got: 2 })
        ));
    }

    #[test]
    fn list_projects_elements() {
        let data = [
            size_block(&[], 2),
            Value::Str("a".into()),
            Value::Str("b".into()),
        ];
        let fields = list(Object::new(), &data, utc()).unwrap();
        assert_eq!(
            fields.get(OBJECT_VALUE_KEY),
            Some(&Value::Array(vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
            ]))
        );
    }

    #[test]
    fn list_rejects_wrong_count() {
        let data = [size_block(&[], 3), Value::Str("a".into())];
        let err = list(Object::new(), &data, utc()).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedContainerPayload { want: 3, got: 1 }
        ));
        assert_eq!(
            err.to_string(),
            "incorrect number of elements: want 3 got 1"
        );
    }

    #[test]
    fn map_pairs_keys_and_values() {
        let data = [
            size_block(&[0, 0, 0, 0], 2),
            Value::Str("k1".into()),
            Value::Str("v1".into()),
            Value::Int(7),
            Value::Str("v2".into()),
        ];
        let fields = map(Object::new(), &data, utc()).unwrap();
        let Some(Value::Object(entries)) = fields.get(OBJECT_VALUE_KEY) else {
            panic!("expected a mapping");
        };
        assert_eq!(entries.get("k1"), Some(&Value::Str("v1".into())));
        assert_eq!(entries.get("7"), Some(&Value::Str("v2".into())));
    }

    #[test]
    fn map_tolerates_trailing_annotations() {
        let data = [
            size_block(&[0, 0, 0, 0], 1),
            Value::Str("k".into()),
            Value::Str("v".into()),
            Value::Str("extra".into()),
        ];
        assert!(map(Object::new(), &data, utc()).is_ok());
    }

    #[test]
    fn hash_set_skips_capacity_and_load_factor() {
        let data = [
            size_block(&[0, 0, 0, 16, 0x3F, 0x40, 0, 0], 1),
            Value::Str("hse1".into()),
        ];
        let fields = hash_set(Object::new(), &data, utc()).unwrap();
        assert_eq!(
            fields.get(OBJECT_VALUE_KEY),
            Some(&Value::Array(vec![Value::Str("hse1".into())]))
        );
    }

    #[test]
    fn date_reads_millis_from_block() {
        let data = [Value::Bytes(1_648_645_162_302_i64.to_be_bytes().to_vec())];
        let fields = date(Object::new(), &data, utc()).unwrap();
        let Some(Value::Timestamp(ts)) = fields.get(OBJECT_VALUE_KEY) else {
            panic!("expected a timestamp");
        };
        assert_eq!(ts.timestamp_millis(), 1_648_645_162_302);
    }

    #[test]
    fn date_rejects_short_block() {
        let data = [Value::Bytes(vec![0; 4])];
        assert!(matches!(
            date(Object::new(), &data, utc()),
            Err(Error::ShortContainerData { want: 8, got: 4 })
        ));
    }

    #[test]
    fn calendar_requires_time_field() {
        let mut fields = Object::new();
        fields.insert("time", Value::Long(1_648_650_171_587));
        let fields = calendar(fields, &[], utc()).unwrap();
        assert!(matches!(
            fields.get(OBJECT_VALUE_KEY),
            Some(Value::Timestamp(_))
        ));
        assert!(matches!(
            calendar(Object::new(), &[], utc()),
            Err(Error::MissingContainerData)
        ));
    }

    #[test]
    fn primitive_wrapper_projects_value_field() {
        let mut fields = Object::new();
        fields.insert("value", Value::Int(123));
        let fields = primitive_wrapper(fields, &[], utc()).unwrap();
        assert_eq!(fields.get(OBJECT_VALUE_KEY), Some(&Value::Int(123)));
    }

    #[test]
    fn registry_covers_known_signatures() {
        assert!(lookup("java.util.ArrayList@7881d21d99c7619d").is_some());
        assert!(lookup("java.util.HashMap@0507dac1c31660d1").is_some());
        assert!(lookup("java.util.Date@686a81014b597419").is_some());
        assert!(lookup("java.util.ArrayList@0000000000000000").is_none());
        assert!(lookup("com.example.Custom@7881d21d99c7619d").is_none());
    }
}

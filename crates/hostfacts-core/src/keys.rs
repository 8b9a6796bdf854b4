//! Reversible escaping of mapping keys in nested fact payloads.
//!
//! The legacy document store refused `.` and `$` inside document keys, so
//! fact payloads were written with those characters swapped for full-width
//! private substitutes. [`KeyCodec`] applies (or undoes) that substitution on
//! every mapping key of an arbitrary JSON tree. Values, sequence elements and
//! scalars are never touched.

use serde_json::{Map, Value};

/// Substitutions used by the legacy fact store, in application order.
pub const LEGACY_KEY_RULES: &[(char, char)] =
  &[('.', '\u{FF0E}'), ('$', '\u{FF04}')];

#[derive(Debug, Clone, Copy)]
enum Direction {
  Encode,
  Decode,
}

/// An ordered list of `(literal, substitute)` character rules applied to
/// mapping keys.
///
/// `encode` rewrites literal → substitute with the rules in order; `decode`
/// rewrites substitute → literal with the same rules in reverse order.
/// Callers apply exactly one direction, once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
  rules: Vec<(char, char)>,
}

impl KeyCodec {
  pub fn new(rules: impl IntoIterator<Item = (char, char)>) -> Self {
    Self { rules: rules.into_iter().collect() }
  }

  /// The codec matching the legacy store's key restrictions.
  pub fn legacy() -> Self { Self::new(LEGACY_KEY_RULES.iter().copied()) }

  pub fn encode_key(&self, key: &str) -> String {
    self.transform_key(key, Direction::Encode)
  }

  pub fn decode_key(&self, key: &str) -> String {
    self.transform_key(key, Direction::Decode)
  }

  /// Escape every mapping key in `value`.
  pub fn encode(&self, value: &Value) -> Value {
    self.transform(value.clone(), Direction::Encode)
  }

  /// Restore every mapping key in `value`.
  pub fn decode(&self, value: &Value) -> Value {
    self.transform(value.clone(), Direction::Decode)
  }

  /// Like [`KeyCodec::encode`] but consumes the payload instead of cloning.
  pub fn encode_owned(&self, value: Value) -> Value {
    self.transform(value, Direction::Encode)
  }

  /// Like [`KeyCodec::decode`] but consumes the payload instead of cloning.
  pub fn decode_owned(&self, value: Value) -> Value {
    self.transform(value, Direction::Decode)
  }

  fn transform_key(&self, key: &str, direction: Direction) -> String {
    let mut buf = [0u8; 4];
    match direction {
      Direction::Encode => self.rules.iter().fold(key.to_owned(), |k, (lit, sub)| {
        k.replace(*lit, sub.encode_utf8(&mut buf))
      }),
      Direction::Decode => {
        self.rules.iter().rev().fold(key.to_owned(), |k, (lit, sub)| {
          k.replace(*sub, lit.encode_utf8(&mut buf))
        })
      }
    }
  }

  fn transform(&self, value: Value, direction: Direction) -> Value {
    match value {
      // Two source keys may collapse onto one target key (e.g. both `a.b`
      // and `a\u{FF0E}b` present); the later one in map order wins.
      Value::Object(map) => Value::Object(
        map
          .into_iter()
          .map(|(k, v)| {
            (self.transform_key(&k, direction), self.transform(v, direction))
          })
          .collect::<Map<String, Value>>(),
      ),
      Value::Array(items) => Value::Array(
        items
          .into_iter()
          .map(|v| self.transform(v, direction))
          .collect(),
      ),
      scalar => scalar,
    }
  }
}

impl Default for KeyCodec {
  fn default() -> Self { Self::legacy() }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn encode_key_substitutes_in_rule_order() {
    let codec = KeyCodec::legacy();
    assert_eq!(codec.encode_key("ansible.os$family"), "ansible\u{FF0E}os\u{FF04}family");
    assert_eq!(codec.decode_key("ansible\u{FF0E}os\u{FF04}family"), "ansible.os$family");
  }

  #[test]
  fn decode_applies_rules_in_reverse() {
    // 'a' → 'b' then 'b' → 'c': encoding "a" yields "c"; decoding must undo
    // the second rule first to get back to "a".
    let codec = KeyCodec::new([('a', 'b'), ('b', 'c')]);
    assert_eq!(codec.encode_key("a"), "c");
    assert_eq!(codec.decode_key("c"), "a");
  }

  #[test]
  fn nested_round_trip() {
    let codec = KeyCodec::legacy();
    let doc = json!({
      "ansible_facts": {
        "eth0.ipv4": { "address": "10.0.0.1", "$netmask": "255.0.0.0" },
        "mounts": [
          { "mount.point": "/", "size": 1024 },
          { "mount.point": "/boot", "opts": ["rw", "noatime"] }
        ],
        "empty.map": {},
        "empty.list": [],
        "missing": null
      },
      "version": 2
    });

    let encoded = codec.encode(&doc);
    assert!(encoded["ansible_facts"].get("eth0\u{FF0E}ipv4").is_some());
    assert_eq!(
      encoded["ansible_facts"]["mounts"][1]["mount\u{FF0E}point"],
      json!("/boot")
    );
    assert_eq!(codec.decode(&encoded), doc);
  }

  #[test]
  fn values_are_never_rewritten() {
    let codec = KeyCodec::legacy();
    let encoded = codec.encode(&json!({ "a.b": "x.y" }));
    assert_eq!(encoded, json!({ "a\u{FF0E}b": "x.y" }));

    let decoded = codec.decode(&json!({ "k": "x\u{FF0E}y", "l": ["\u{FF04}"] }));
    assert_eq!(decoded, json!({ "k": "x\u{FF0E}y", "l": ["\u{FF04}"] }));
  }

  #[test]
  fn scalars_and_null_pass_through() {
    let codec = KeyCodec::legacy();
    for v in [json!(null), json!(1.5), json!("a.b"), json!(true), json!([]), json!({})] {
      assert_eq!(codec.decode(&v), v);
      assert_eq!(codec.encode(&v), v);
    }
  }

  #[test]
  fn decode_leaves_literal_characters_alone() {
    let codec = KeyCodec::legacy();
    assert_eq!(codec.decode_key("already.plain$key"), "already.plain$key");
  }

  #[test]
  fn colliding_keys_keep_the_later_value() {
    let codec = KeyCodec::legacy();
    let doc = json!({ "a.b": 1, "a\u{FF0E}b": 2 });
    assert_eq!(codec.decode(&doc), json!({ "a.b": 2 }));
  }

  #[test]
  fn owned_variants_match_borrowed() {
    let codec = KeyCodec::legacy();
    let doc = json!({ "x.y": [{ "$z": 1 }] });
    assert_eq!(codec.encode_owned(doc.clone()), codec.encode(&doc));
    let enc = codec.encode(&doc);
    assert_eq!(codec.decode_owned(enc), doc);
  }
}

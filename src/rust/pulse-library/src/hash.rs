// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Hash elements for waveform reuse.
//!
//! Every pulse shape returns an ordered list of [`HashElement`]s that
//! uniquely identifies its generated samples relative to an element start
//! time. The upload layer keys previously-programmed hardware waveforms by
//! these lists: two pulses with equal hash elements on the same channel are
//! guaranteed to produce bit-identical samples over any shared time grid.
//! An incomplete list is a silent correctness bug (stale waveform reuse), so
//! every numeric parameter entering a shape's waveform formula must appear
//! here.

use serde::Serialize;
use sha1::{Digest, Sha1};
use std::fmt::Write;
use std::hash::{Hash, Hasher};

/// Normalize an f64 to bits, mapping NaN and -0.0 onto canonical values so
/// that hashing and equality agree with numeric equality.
pub fn normalize_f64(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Reduce a phase in degrees into `[0, 360)`. NaN maps to 0.
pub fn normalize_phase_deg(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.rem_euclid(360.0)
}

/// A single primitive entry of a pulse's hash-element list.
///
/// `Float` entries compare and hash through [`normalize_f64`], so `-0.0`
/// and `0.0` produce the same cache key.
#[derive(Debug, Clone, Serialize)]
pub enum HashElement {
    Str(&'static str),
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl PartialEq for HashElement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HashElement::Str(a), HashElement::Str(b)) => a == b,
            (HashElement::Text(a), HashElement::Text(b)) => a == b,
            (HashElement::Bool(a), HashElement::Bool(b)) => a == b,
            (HashElement::Int(a), HashElement::Int(b)) => a == b,
            (HashElement::Float(a), HashElement::Float(b)) => {
                normalize_f64(*a) == normalize_f64(*b)
            }
            _ => false,
        }
    }
}

impl Eq for HashElement {}

impl Hash for HashElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            HashElement::Str(s) => s.hash(state),
            HashElement::Text(s) => s.hash(state),
            HashElement::Bool(b) => b.hash(state),
            HashElement::Int(i) => i.hash(state),
            HashElement::Float(f) => normalize_f64(*f).hash(state),
        }
    }
}

impl From<f64> for HashElement {
    fn from(value: f64) -> Self {
        HashElement::Float(value)
    }
}

impl From<bool> for HashElement {
    fn from(value: bool) -> Self {
        HashElement::Bool(value)
    }
}

impl From<i64> for HashElement {
    fn from(value: i64) -> Self {
        HashElement::Int(value)
    }
}

impl From<usize> for HashElement {
    fn from(value: usize) -> Self {
        HashElement::Int(value as i64)
    }
}

impl From<&'static str> for HashElement {
    fn from(value: &'static str) -> Self {
        HashElement::Str(value)
    }
}

impl From<String> for HashElement {
    fn from(value: String) -> Self {
        HashElement::Text(value)
    }
}

/// Cache key of a hash-element list, as used by the upload layer to skip
/// redundant hardware programming.
pub fn waveform_uid(hashables: &[HashElement]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    hashables.hash(&mut hasher);
    hasher.finish()
}

/// The maximum length of the readable property part of a signature string.
const MAX_LEN_PROPERTY_PARTS: usize = 56;
/// The maximum length of the hash part of a signature string.
const MAX_LEN_HASH_PARTS: usize = 8;

/// A printable, filesystem- and SeqC-safe identifier for a hash-element
/// list: a readable prefix built from the leading elements, terminated by a
/// truncated SHA-1 of the full serialized list. The prefix is best-effort
/// and may be cut off; uniqueness comes from the hash part.
pub fn signature_string(hashables: &[HashElement]) -> String {
    let mut prefix = String::with_capacity(MAX_LEN_PROPERTY_PARTS + MAX_LEN_HASH_PARTS);
    prefix.push_str("wf");
    for element in hashables {
        let mut part = String::new();
        match element {
            HashElement::Str(s) => write!(&mut part, "_{s}"),
            HashElement::Text(s) => write!(&mut part, "_{s}"),
            HashElement::Bool(b) => write!(&mut part, "_{}", u8::from(*b)),
            HashElement::Int(i) => write!(&mut part, "_{i}"),
            HashElement::Float(v) => {
                let sign = if *v < 0.0 { "m" } else { "" };
                write!(&mut part, "_{}{}", sign, (v.abs() * 1e4).round() as i64)
            }
        }
        .expect("Internal error: writing to a string failed");
        if prefix.len() + part.len() > MAX_LEN_PROPERTY_PARTS {
            break;
        }
        prefix.push_str(&part);
    }
    let sanitized: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    // The formatted prefix parts are not unique on their own; the signature
    // ends with a hash of the full element list.
    let serialized = serde_json::to_string(hashables)
        .expect("Internal error: hash element serialization failed while generating signature string");
    let mut hasher = Sha1::new();
    hasher.update(serialized.as_bytes());
    let digest = hasher.finalize();
    format!(
        "{}_{}",
        sanitized,
        &format!("{digest:x}")[..MAX_LEN_HASH_PARTS - 1]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_hash<T: Hash>(t: &T) -> u64 {
        let mut s = std::collections::hash_map::DefaultHasher::new();
        t.hash(&mut s);
        s.finish()
    }

    #[test]
    fn test_normalize_f64() {
        assert_eq!(normalize_f64(0.0), normalize_f64(-0.0));
        assert_eq!(normalize_f64(f64::NAN), normalize_f64(f64::NAN));
        assert_eq!(normalize_f64(-1.0), normalize_f64(-1.0));
        assert_ne!(normalize_f64(-1.0), normalize_f64(1.0));
    }

    #[test]
    fn test_normalize_phase_deg() {
        assert_eq!(normalize_phase_deg(0.0), 0.0);
        assert_eq!(normalize_phase_deg(360.0), 0.0);
        assert_eq!(normalize_phase_deg(-10.0), 350.0);
        assert_eq!(normalize_phase_deg(725.0), 5.0);
        assert_eq!(normalize_phase_deg(f64::NAN), 0.0);
    }

    #[test]
    fn test_hash_element_float_normalization() {
        assert_eq!(HashElement::Float(0.0), HashElement::Float(-0.0));
        assert_eq!(
            create_hash(&HashElement::Float(0.0)),
            create_hash(&HashElement::Float(-0.0))
        );
        assert_ne!(HashElement::Float(1.0), HashElement::Float(2.0));
    }

    #[test]
    fn test_hash_element_variants_are_distinct() {
        assert_ne!(HashElement::Int(1), HashElement::Float(1.0));
        assert_ne!(HashElement::Bool(true), HashElement::Int(1));
    }

    #[test]
    fn test_waveform_uid_is_order_sensitive() {
        let forward = vec![HashElement::Float(1.0), HashElement::Float(2.0)];
        let backward = vec![HashElement::Float(2.0), HashElement::Float(1.0)];
        assert_ne!(waveform_uid(&forward), waveform_uid(&backward));
        assert_eq!(waveform_uid(&forward), waveform_uid(&forward.clone()));
    }

    #[test]
    fn test_signature_string_stable_and_sensitive() {
        let elements = vec![
            HashElement::Str("square"),
            HashElement::Float(10e-9),
            HashElement::Float(0.5),
        ];
        let signature = signature_string(&elements);
        assert_eq!(signature, signature_string(&elements.clone()));

        let mut other = elements.clone();
        other[2] = HashElement::Float(0.6);
        assert_ne!(signature, signature_string(&other));
    }

    #[test]
    fn test_signature_string_is_sanitized() {
        let elements = vec![
            HashElement::Text("flux ch-1".to_string()),
            HashElement::Float(-2.5),
        ];
        let signature = signature_string(&elements);
        assert!(
            signature
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        );
    }
}

//! Order-preserving key encoding.
//!
//! Every key starts with a namespace tag byte. Data keys then carry the series
//! name with `0x00` escaped as `0x00 0xFF`, terminated by `0x00 0x01`, followed
//! by the timestamp as 8 big-endian bytes with the sign bit flipped. Byte order
//! of encoded keys therefore matches `(series asc, timestamp asc)` for any
//! series name and the full `i64` range.
//!
//! TTL registry keys are the tag byte followed by the raw series name.

use thiserror::Error;

/// Namespace tag for series data points
pub const NAMESPACE_DATA: u8 = 0x01;
/// Namespace tag for the TTL registry
pub const NAMESPACE_TTL: u8 = 0x02;

const ESCAPE: u8 = 0x00;
const ESCAPED_NUL: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;
const TIMESTAMP_LEN: usize = 8;
const SIGN_BIT: u64 = 1 << 63;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Key too short: {0} bytes")]
    TooShort(usize),
    #[error("Unexpected namespace tag: expected 0x{expected:02x}, got 0x{actual:02x}")]
    WrongNamespace { expected: u8, actual: u8 },
    #[error("Invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("Missing series name terminator")]
    MissingTerminator,
    #[error("Invalid timestamp length: expected 8, got {0}")]
    InvalidTimestampLength(usize),
    #[error("Series name is not valid UTF-8")]
    InvalidUtf8,
    #[error("Invalid TTL value length: expected 8, got {0}")]
    InvalidTtlValue(usize),
}

/// A half-open key range `[lo, hi)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub lo: Vec<u8>,
    pub hi: Vec<u8>,
}

impl KeyRange {
    pub fn new(lo: Vec<u8>, hi: Vec<u8>) -> Self {
        Self { lo, hi }
    }
}

/// Encodes a timestamp so that unsigned byte order equals signed numeric order.
pub fn encode_timestamp(timestamp: i64) -> [u8; TIMESTAMP_LEN] {
    ((timestamp as u64) ^ SIGN_BIT).to_be_bytes()
}

pub fn decode_timestamp(bytes: [u8; TIMESTAMP_LEN]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64
}

/// Key of a single data point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataKey {
    pub series: String,
    pub timestamp: i64,
}

impl DataKey {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (series, rest) = split_series(buf)?;
        if rest.len() != TIMESTAMP_LEN {
            return Err(DecodeError::InvalidTimestampLength(rest.len()));
        }
        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(rest);
        Ok(Self {
            series,
            timestamp: decode_timestamp(ts),
        })
    }
}

/// Encodes `(series, timestamp)` into a data key.
pub fn encode(series: &str, timestamp: i64) -> Vec<u8> {
    let mut buf = series_key_prefix(series);
    buf.extend_from_slice(&encode_timestamp(timestamp));
    buf
}

/// Decodes a data key back into `(series, timestamp)`.
pub fn decode(buf: &[u8]) -> Result<(String, i64), DecodeError> {
    DataKey::decode(buf).map(|key| (key.series, key.timestamp))
}

/// Decodes only the series part of a data key.
pub fn decode_series(buf: &[u8]) -> Result<String, DecodeError> {
    split_series(buf).map(|(series, _)| series)
}

fn series_key_prefix(series: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(series.len() + 3 + TIMESTAMP_LEN);
    buf.push(NAMESPACE_DATA);
    for &b in series.as_bytes() {
        buf.push(b);
        if b == ESCAPE {
            buf.push(ESCAPED_NUL);
        }
    }
    buf.push(ESCAPE);
    buf.push(TERMINATOR);
    buf
}

fn split_series(buf: &[u8]) -> Result<(String, &[u8]), DecodeError> {
    if buf.len() < 3 {
        return Err(DecodeError::TooShort(buf.len()));
    }
    if buf[0] != NAMESPACE_DATA {
        return Err(DecodeError::WrongNamespace {
            expected: NAMESPACE_DATA,
            actual: buf[0],
        });
    }

    let mut name = Vec::with_capacity(buf.len());
    let mut i = 1;
    loop {
        let b = *buf.get(i).ok_or(DecodeError::MissingTerminator)?;
        if b != ESCAPE {
            name.push(b);
            i += 1;
            continue;
        }
        match buf.get(i + 1) {
            Some(&ESCAPED_NUL) => {
                name.push(ESCAPE);
                i += 2;
            }
            Some(&TERMINATOR) => {
                i += 2;
                break;
            }
            Some(_) => return Err(DecodeError::InvalidEscape(i)),
            None => return Err(DecodeError::MissingTerminator),
        }
    }

    let series = String::from_utf8(name).map_err(|_| DecodeError::InvalidUtf8)?;
    Ok((series, &buf[i..]))
}

/// Bounds covering exactly the keys of one series.
pub fn series_prefix(series: &str) -> KeyRange {
    let lo = series_key_prefix(series);
    let mut hi = lo.clone();
    if let Some(last) = hi.last_mut() {
        *last = TERMINATOR + 1;
    }
    KeyRange::new(lo, hi)
}

/// Bounds covering the keys of one series with `timestamp <= cutoff`.
pub fn series_range_through(series: &str, cutoff: i64) -> KeyRange {
    let prefix = series_prefix(series);
    let hi = match cutoff.checked_add(1) {
        Some(next) => encode(series, next),
        None => prefix.hi,
    };
    KeyRange::new(prefix.lo, hi)
}

/// Bounds of the whole data namespace.
pub fn data_namespace() -> KeyRange {
    KeyRange::new(vec![NAMESPACE_DATA], vec![NAMESPACE_DATA + 1])
}

pub fn ttl_key(series: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(series.len() + 1);
    buf.push(NAMESPACE_TTL);
    buf.extend_from_slice(series.as_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(range: &KeyRange, key: &[u8]) -> bool {
        key >= range.lo.as_slice() && key < range.hi.as_slice()
    }

    #[test]
    fn test_round_trip() {
        for (series, ts) in [
            ("temp", 100),
            ("temp", 0),
            ("temp", -1),
            ("a\0b", i64::MIN),
            ("ünïcode", i64::MAX),
        ] {
            let key = encode(series, ts);
            assert_eq!(decode(&key).unwrap(), (series.to_string(), ts));
        }
    }

    #[test]
    fn test_timestamp_order_ignores_digit_count() {
        // 9 < 10 < 100 must hold byte-wise, unlike decimal string keys
        let timestamps = [i64::MIN, -1_000, -1, 0, 9, 10, 100, 1_000_000_000_000, i64::MAX];
        let keys: Vec<_> = timestamps.iter().map(|&ts| encode("s", ts)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_series_order_is_lexicographic() {
        let names = ["a", "a\0", "a\0\0", "a\u{1}", "aa", "ab", "b"];
        for pair in names.windows(2) {
            assert!(pair[0] < pair[1]);
            // Largest timestamp of the smaller series still sorts first
            assert!(encode(pair[0], i64::MAX) < encode(pair[1], i64::MIN));
        }
    }

    #[test]
    fn test_series_prefix_isolates_neighbours() {
        let range = series_prefix("a");
        assert!(in_range(&range, &encode("a", i64::MIN)));
        assert!(in_range(&range, &encode("a", i64::MAX)));
        assert!(!in_range(&range, &encode("a\0", 0)));
        assert!(!in_range(&range, &encode("aa", 0)));
        assert!(!in_range(&range, &encode("", 0)));
        assert!(!in_range(&range, &ttl_key("a")));
    }

    #[test]
    fn test_series_range_through_is_inclusive() {
        let range = series_range_through("s", 100);
        assert!(in_range(&range, &encode("s", 100)));
        assert!(in_range(&range, &encode("s", -5)));
        assert!(!in_range(&range, &encode("s", 101)));

        let all = series_range_through("s", i64::MAX);
        assert!(in_range(&all, &encode("s", i64::MAX)));
        assert!(!in_range(&all, &encode("t", i64::MIN)));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let data = data_namespace();
        let ttl = KeyRange::new(vec![NAMESPACE_TTL], vec![NAMESPACE_TTL + 1]);
        assert!(in_range(&data, &encode("_TTL_SERIES", 1)));
        assert!(!in_range(&ttl, &encode("_TTL_SERIES", 1)));
        assert!(in_range(&ttl, &ttl_key("temp")));
        assert!(!in_range(&data, &ttl_key("temp")));
    }

    #[test]
    fn test_decode_rejects_malformed_keys() {
        assert_eq!(decode(&[]), Err(DecodeError::TooShort(0)));
        assert!(matches!(
            decode(&ttl_key("temp")),
            Err(DecodeError::WrongNamespace { .. })
        ));

        let mut short = encode("temp", 1);
        short.pop();
        assert_eq!(decode(&short), Err(DecodeError::InvalidTimestampLength(7)));

        assert_eq!(
            decode(&[NAMESPACE_DATA, b'x', b'y']),
            Err(DecodeError::MissingTerminator)
        );
        assert_eq!(
            decode(&[NAMESPACE_DATA, b'x', ESCAPE, 0x07, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(DecodeError::InvalidEscape(2))
        );
    }
}

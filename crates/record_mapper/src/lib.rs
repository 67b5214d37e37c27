use core_types::DrawEntry;
use serde_json::Value;

/// Keys that may carry the round identifier, highest priority first.
pub const PERIOD_KEYS: &[&str] = &[
    "issueNumber",
    "issue",
    "period",
    "issueNo",
    "periodNo",
    "drawNo",
    "expect",
    "termNo",
];

/// Keys that may carry the drawn value, highest priority first.
pub const NUMBER_KEYS: &[&str] = &[
    "number",
    "result",
    "openNumber",
    "openCode",
    "winningNumber",
    "value",
    "num",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingPeriod,
    MissingNumber,
    UnparsableNumber,
    NotAnObject,
}

/// First non-null value among `keys`, in table order.
pub fn pick<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = raw.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

pub fn has_period_field(raw: &Value) -> bool {
    pick(raw, PERIOD_KEYS).is_some()
}

pub fn period_of(raw: &Value) -> Option<String> {
    let text = match pick(raw, PERIOD_KEYS)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(v), _) => v.to_string(),
            (None, Some(v)) => v.to_string(),
            _ => {
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.0}")
                } else {
                    n.to_string()
                }
            }
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Magnitudes past this keep only their low 18 digits; callers read `mod 10`.
const TAIL_MODULUS: u64 = 1_000_000_000_000_000_000;

/// Lenient integer read: JSON integers as-is, finite floats truncated, strings
/// by their leading signed digit run (`"3,5,9"` reads as 3). Values beyond
/// `i64` keep their low digits instead of failing.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Some(v);
            }
            if let Some(v) = n.as_u64() {
                return Some((v % TAIL_MODULUS) as i64);
            }
            let f = n.as_f64()?;
            if !f.is_finite() {
                return None;
            }
            if f.abs() < i64::MAX as f64 {
                return Some(f.trunc() as i64);
            }
            Some((f.abs() % 10.0).trunc() as i64)
        }
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    // Only the last digit matters downstream; keep a bounded tail so huge
    // digit runs cannot overflow.
    let digits = &rest[..digits_len];
    let tail = &digits[digits.len().saturating_sub(18)..];
    let v = tail.parse::<i64>().ok()?;
    Some(if negative { -v } else { v })
}

pub fn try_map_record(raw: &Value, admitted_ms: i64) -> Result<DrawEntry, Rejection> {
    if !raw.is_object() {
        return Err(Rejection::NotAnObject);
    }
    let period = period_of(raw).ok_or(Rejection::MissingPeriod)?;
    let value = pick(raw, NUMBER_KEYS).ok_or(Rejection::MissingNumber)?;
    let n = parse_int(value).ok_or(Rejection::UnparsableNumber)?;
    let digit = (n.unsigned_abs() % 10) as u8;
    Ok(DrawEntry::new(period, digit, admitted_ms))
}

/// Normalize one upstream record; `None` when the record is unusable.
pub fn map_record(raw: &Value, admitted_ms: i64) -> Option<DrawEntry> {
    try_map_record(raw, admitted_ms).ok()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MappedBatch {
    pub entries: Vec<DrawEntry>,
    pub rejected: usize,
}

pub fn map_records(raws: &[Value], admitted_ms: i64) -> MappedBatch {
    let mut batch = MappedBatch::default();
    for raw in raws {
        match map_record(raw, admitted_ms) {
            Some(entry) => batch.entries.push(entry),
            None => batch.rejected += 1,
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::BigSmall;
    use serde_json::json;

    #[test]
    fn maps_canonical_record() {
        let e = map_record(&json!({"issueNumber": "123", "number": "7"}), 5).expect("mapped");
        assert_eq!(e.period, "123");
        assert_eq!(e.number, 7);
        assert!(e.is_big);
        assert_eq!(e.label, BigSmall::Big);
        assert_eq!(e.timestamp, 5);
    }

    #[test]
    fn value_is_reduced_mod_ten() {
        let e = map_record(&json!({"issue": "9", "result": 104}), 0).expect("mapped");
        assert_eq!(e.number, 4);
        assert!(!e.is_big);
        assert_eq!(e.label, BigSmall::Small);

        let e = map_record(&json!({"issue": "9", "result": -17}), 0).expect("mapped");
        assert_eq!(e.number, 7);
    }

    #[test]
    fn rejects_missing_or_non_numeric_value() {
        assert_eq!(
            try_map_record(&json!({"issueNumber": "1"}), 0),
            Err(Rejection::MissingNumber)
        );
        assert_eq!(
            try_map_record(&json!({"issueNumber": "1", "number": "abc"}), 0),
            Err(Rejection::UnparsableNumber)
        );
        assert_eq!(
            try_map_record(&json!({"issueNumber": "1", "number": true}), 0),
            Err(Rejection::UnparsableNumber)
        );
        assert_eq!(
            try_map_record(&json!({"issueNumber": "  ", "number": 3}), 0),
            Err(Rejection::MissingPeriod)
        );
        assert_eq!(try_map_record(&json!([1, 2]), 0), Err(Rejection::NotAnObject));
    }

    #[test]
    fn alias_priority_is_table_order() {
        let raw = json!({"period": "p2", "issueNumber": "p1", "openCode": "3,5,9", "value": 8});
        let e = map_record(&raw, 0).expect("mapped");
        assert_eq!(e.period, "p1");
        assert_eq!(e.number, 3);
    }

    #[test]
    fn null_alias_falls_through() {
        let raw = json!({"issueNumber": null, "issue": 20240101, "number": null, "result": "6"});
        let e = map_record(&raw, 0).expect("mapped");
        assert_eq!(e.period, "20240101");
        assert_eq!(e.number, 6);
    }

    #[test]
    fn lenient_integer_parsing() {
        assert_eq!(parse_int(&json!("12abc")), Some(12));
        assert_eq!(parse_int(&json!(" -3 ")), Some(-3));
        assert_eq!(parse_int(&json!(7.9)), Some(7));
        assert_eq!(parse_int(&json!("")), None);
        assert_eq!(parse_int(&json!("x1")), None);
        assert_eq!(parse_int(&json!("123456789012345678901234567")), Some(12_345_678_901_234_567));
    }

    #[test]
    fn oversized_numbers_agree_across_json_types() {
        let as_int = json!({"issue": "1", "number": 18446744073709551615u64});
        let as_text = json!({"issue": "1", "number": "18446744073709551615"});
        assert_eq!(try_map_record(&as_int, 0).map(|e| e.number), Ok(5));
        assert_eq!(try_map_record(&as_text, 0).map(|e| e.number), Ok(5));
        assert_eq!(parse_int(&json!(18446744073709551615u64)), Some(446_744_073_709_551_615));

        let as_float = json!({"issue": "1", "number": 1.0e19});
        assert_eq!(try_map_record(&as_float, 0).map(|e| e.number), Ok(0));
        assert_eq!(parse_int(&json!(-2.3e19)), Some(0));
        assert_eq!(parse_int(&json!(9.5e18)), Some(0));
    }

    #[test]
    fn mapping_is_deterministic() {
        let raw = json!({"drawNo": 77, "winningNumber": "5"});
        assert_eq!(map_record(&raw, 9), map_record(&raw, 9));
    }

    #[test]
    fn batch_counts_rejections() {
        let raws = vec![
            json!({"issueNumber": "1", "number": 1}),
            json!({"issueNumber": "2"}),
            json!("junk"),
        ];
        let batch = map_records(&raws, 0);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.rejected, 2);
    }
}

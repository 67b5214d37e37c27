use std::cmp::Ordering;

/// A period parsed as an arbitrary-length signed decimal integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecimalKey<'a> {
    negative: bool,
    /// Digits without leading zeros; empty means zero.
    digits: &'a str,
}

impl<'a> DecimalKey<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let (negative, rest) = match raw.as_bytes().first()? {
            b'-' => (true, &raw[1..]),
            b'+' => (false, &raw[1..]),
            _ => (false, raw),
        };
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = rest.trim_start_matches('0');
        Some(Self {
            negative: negative && !digits.is_empty(),
            digits,
        })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(other.digits))
    }
}

impl Ord for DecimalKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for DecimalKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn is_numeric_period(period: &str) -> bool {
    DecimalKey::parse(period).is_some()
}

/// Dedup identity: canonical digits for numeric periods, the raw text
/// otherwise. Two periods that compare `Equal` share a key.
pub fn period_key(period: &str) -> String {
    match DecimalKey::parse(period) {
        Some(key) if key.digits.is_empty() => "0".to_string(),
        Some(key) if key.negative => format!("-{}", key.digits),
        Some(key) => key.digits.to_string(),
        None => period.to_string(),
    }
}

/// Ascending comparison of two periods: exact integer order when both parse,
/// byte-wise string order otherwise.
pub fn compare_periods(a: &str, b: &str) -> Ordering {
    match (DecimalKey::parse(a), DecimalKey::parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Sort newest first. Numeric order applies only when every period parses;
/// a mixed set falls back to string order throughout so the comparator stays
/// a total order.
pub fn sort_newest_first<T>(items: &mut [T], period: impl Fn(&T) -> &str) {
    if items.iter().all(|item| is_numeric_period(period(item))) {
        items.sort_by(|a, b| compare_periods(period(b), period(a)));
    } else {
        items.sort_by(|a, b| period(b).cmp(period(a)));
    }
}

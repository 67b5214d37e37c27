use record_mapper::has_period_field;
use serde_json::Value;

/// Known envelope shapes, tried in order before the heuristic scan. A hit
/// only counts when its array carries at least one identified record.
const LIST_PATHS: &[&[&str]] = &[
    &["data", "list"],
    &["data", "List"],
    &["data", "records"],
    &["data"],
    &["list"],
    &["List"],
    &["records"],
    &["rows"],
];

const MAX_SCAN_DEPTH: usize = 4;

/// Locate the result records inside an arbitrarily shaped payload.
/// Returns an empty vec when nothing plausible is found.
pub fn extract_records(payload: &Value) -> Vec<Value> {
    if let Value::Array(items) = payload {
        if !items.is_empty() {
            return items.clone();
        }
    }

    for path in LIST_PATHS {
        if let Some(Value::Array(items)) = lookup(payload, path) {
            if looks_like_records(items) {
                return items.clone();
            }
        }
    }

    scan(payload, 0).cloned().unwrap_or_default()
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

fn looks_like_records(items: &[Value]) -> bool {
    items.iter().any(|item| item.is_object() && has_period_field(item))
}

fn scan(node: &Value, depth: usize) -> Option<&Vec<Value>> {
    let obj = node.as_object()?;

    for value in obj.values() {
        if let Value::Array(items) = value {
            if looks_like_records(items) {
                return Some(items);
            }
        }
    }

    if depth >= MAX_SCAN_DEPTH {
        return None;
    }

    obj.values()
        .filter(|v| v.is_object())
        .find_map(|v| scan(v, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_data_list() {
        let payload = json!({
            "code": 0,
            "list": [{"issue": "x", "number": 1}],
            "data": {"list": [{"issueNumber": "1", "number": "2"}], "pageNo": 1}
        });
        let out = extract_records(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["issueNumber"], "1");
    }

    #[test]
    fn accepts_case_variants_and_bare_data_array() {
        let payload = json!({"data": {"List": [{"issue": "a"}]}});
        assert_eq!(extract_records(&payload).len(), 1);

        let payload = json!({"data": [{"issue": "a"}, {"issue": "b"}]});
        assert_eq!(extract_records(&payload).len(), 2);

        let payload = json!({"List": [{"period": "9"}]});
        assert_eq!(extract_records(&payload).len(), 1);
    }

    #[test]
    fn top_level_array_is_used_directly() {
        let payload = json!([{"issue": "1"}, {"issue": "2"}, {"issue": "3"}]);
        assert_eq!(extract_records(&payload).len(), 3);
    }

    #[test]
    fn heuristic_scan_finds_nested_records() {
        let payload = json!({
            "result": {
                "meta": {"tags": [{"name": "a"}]},
                "page": {"items": [{"drawNo": "42", "openCode": "5"}]}
            }
        });
        let out = extract_records(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["drawNo"], "42");
    }

    #[test]
    fn scan_skips_arrays_without_identity_fields() {
        let payload = json!({
            "banners": [{"title": "x"}],
            "history": [{"title": "y"}, {"issue": "7", "number": 7}]
        });
        let out = extract_records(&payload);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["issue"], "7");
    }

    #[test]
    fn known_path_without_records_falls_through_to_scan() {
        let payload = json!({
            "data": [1, 2, 3],
            "result": {"draws": [{"issueNumber": "88", "number": "4"}]}
        });
        let out = extract_records(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["issueNumber"], "88");

        let payload = json!({
            "data": {"list": [{"title": "ad"}]},
            "list": [{"period": "5", "result": 5}]
        });
        assert_eq!(extract_records(&payload)[0]["period"], "5");

        assert!(extract_records(&json!({"data": ["a", "b"]})).is_empty());
    }

    #[test]
    fn unknown_shapes_yield_empty() {
        assert!(extract_records(&json!({"code": 500, "msg": "error"})).is_empty());
        assert!(extract_records(&json!("plain text")).is_empty());
        assert!(extract_records(&json!({"data": {"list": []}})).is_empty());
        assert!(extract_records(&json!(null)).is_empty());
    }

    #[test]
    fn scan_depth_is_bounded() {
        let payload = json!({"a": {"b": {"c": {"d": {"e": {"f": [{"issue": "1"}]}}}}}});
        assert!(extract_records(&payload).is_empty());
        let payload = json!({"a": {"b": {"c": {"d": [{"issue": "1"}]}}}});
        assert_eq!(extract_records(&payload).len(), 1);
    }
}

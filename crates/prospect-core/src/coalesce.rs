//! Field coalescing over loosely-shaped upstream JSON.
//!
//! Upstream tools disagree on field names (`revenue` vs `annualRevenue`, `teams` vs
//! `departments`, ...). Every lookup here is an ordered alias list: the first present
//! (non-null) value wins. Nothing in this module panics or errors on a missing field.

use serde_json::{Number, Value};

/// Vendor-name signatures that indicate infrastructure artifacts rather than vendors.
const HOSTNAME_NOISE: [&str; 3] = ["awsglobalaccelerator.com", "placeholder", "cdn-"];

/// First non-null value among `keys`.
pub fn first_present<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = v.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|x| !x.is_null())
}

/// Walk a nested object path (`["location", "city"]`).
pub fn at_path<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = v;
    for k in path {
        cur = cur.as_object()?.get(*k)?;
    }
    (!cur.is_null()).then_some(cur)
}

/// Scalar-to-text for display fields. Objects and arrays have no text form.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    first_present(v, keys).and_then(scalar_text)
}

/// Numbers pass through; numeric strings are parsed; anything else is absent.
pub fn to_number(v: &Value) -> Option<Number> {
    match v {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(Number::from(i));
            }
            s.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}

/// First present alias as a numeric field. Numbers and numeric strings become JSON
/// numbers; any other value (`"1,001-5,000"`, `"$10M"`) is carried through unchanged and
/// still shadows later aliases.
pub fn first_number(v: &Value, keys: &[&str]) -> Option<Value> {
    first_present(v, keys).map(|x| to_number(x).map(Value::Number).unwrap_or_else(|| x.clone()))
}

/// Accumulator-friendly numeric read: absent or non-numeric counts as zero.
pub fn number_or_zero(v: Option<&Value>) -> f64 {
    v.and_then(to_number).and_then(|n| n.as_f64()).unwrap_or(0.0)
}

/// Rank key for optional numeric fields: absent or non-numeric sorts as zero.
pub fn rank_value(v: Option<&Value>) -> f64 {
    number_or_zero(v)
}

/// Emit whole floats as integers so summed counters serialize as `3`, not `3.0`.
pub fn number_from_f64(f: f64) -> Number {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        Number::from(f as i64)
    } else {
        Number::from_f64(f).unwrap_or_else(|| Number::from(0))
    }
}

/// First candidate key whose value is an array; otherwise empty.
pub fn pick_array<'a>(v: &'a Value, keys: &[&str]) -> &'a [Value] {
    let Some(obj) = v.as_object() else {
        return &[];
    };
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|x| x.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
}

/// First `n` items of `v[key]` when it is an array; otherwise empty.
pub fn head(v: &Value, key: &str, n: usize) -> Vec<Value> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().take(n).cloned().collect())
        .unwrap_or_default()
}

/// Human-readable label for heterogeneous list items.
///
/// Strings and numbers stringify; objects try `name`, `title`, `category`, `label` in
/// that order; everything else is the empty string.
pub fn to_label(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) => first_present(v, &["name", "title", "category", "label"])
            .and_then(scalar_text)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Rewrite `MM/DD/YY` to `YYYY-MM-DD`. Years `>= 70` are 19xx, the rest 20xx.
/// Empty input is absent; anything else is returned unchanged.
pub fn to_iso_date_from_mmddyy(s: Option<&str>) -> Option<String> {
    let s = s.filter(|s| !s.is_empty())?;
    let b = s.as_bytes();
    let is_mmddyy = b.len() == 8
        && b[2] == b'/'
        && b[5] == b'/'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| b[i].is_ascii_digit());
    if !is_mmddyy {
        return Some(s.to_string());
    }
    let (mm, dd, yy) = (&s[0..2], &s[3..5], &s[6..8]);
    let century = if yy.parse::<u8>().unwrap_or(0) >= 70 {
        "19"
    } else {
        "20"
    };
    Some(format!("{century}{yy}-{mm}-{dd}"))
}

pub fn looks_like_hostname_noise(vendor_name: &str) -> bool {
    let lower = vendor_name.to_lowercase();
    HOSTNAME_NOISE.iter().any(|sig| lower.contains(sig))
}

/// Vendor names are displayed, not matched: trim only.
pub fn normalize_vendor_name(s: &str) -> String {
    s.trim().to_string()
}

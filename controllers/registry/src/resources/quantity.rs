//! Resource quantity comparison
//!
//! The API server stores quantities in canonical form (`1024Mi` comes back
//! as `1Gi`, `0.5Gi` as `512Mi`), so drift checks compare values, not text.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

const BINARY_SUFFIXES: [(&str, u32); 6] = [("Ki", 10), ("Mi", 20), ("Gi", 30), ("Ti", 40), ("Pi", 50), ("Ei", 60)];
const DECIMAL_SUFFIXES: [(&str, u32); 6] = [("k", 3), ("M", 6), ("G", 9), ("T", 12), ("P", 15), ("E", 18)];

/// Exact value of a quantity as `mantissa / 10^scale`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Exact {
    mantissa: u128,
    scale: u32,
}

/// Split `quantity` into its number and (multiplier, extra decimal scale)
fn split_suffix(quantity: &str) -> Option<(&str, u128, u32)> {
    for (suffix, shift) in BINARY_SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return Some((number, 1u128 << shift, 0));
        }
    }
    if let Some(position) = quantity.find(['e', 'E']) {
        let exponent = &quantity[position + 1..];
        if !exponent.is_empty() {
            let exponent: i32 = exponent.parse().ok()?;
            let magnitude = exponent.unsigned_abs();
            return if exponent >= 0 {
                Some((&quantity[..position], 10u128.checked_pow(magnitude)?, 0))
            } else {
                Some((&quantity[..position], 1, magnitude))
            };
        }
    }
    if let Some(number) = quantity.strip_suffix('m') {
        return Some((number, 1, 3));
    }
    for (suffix, power) in DECIMAL_SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return Some((number, 10u128.pow(power), 0));
        }
    }
    Some((quantity, 1, 0))
}

fn parse(quantity: &str) -> Option<Exact> {
    let quantity = quantity.trim();
    let quantity = quantity.strip_prefix('+').unwrap_or(quantity);
    let (number, multiplier, extra_scale) = split_suffix(quantity)?;
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{whole}{fraction}");
    let mantissa: u128 = digits.parse().ok()?;
    Some(Exact {
        mantissa: mantissa.checked_mul(multiplier)?,
        scale: u32::try_from(fraction.len()).ok()?.checked_add(extra_scale)?,
    })
}

/// Whether two quantities denote the same amount
///
/// Unparseable quantities only match when their text is identical.
pub fn quantities_equal(a: &Quantity, b: &Quantity) -> bool {
    if a.0 == b.0 {
        return true;
    }
    let (Some(a), Some(b)) = (parse(&a.0), parse(&b.0)) else {
        return false;
    };
    let scaled = |value: Exact, to: u32| {
        10u128
            .checked_pow(to - value.scale)
            .and_then(|factor| value.mantissa.checked_mul(factor))
    };
    let scale = a.scale.max(b.scale);
    match (scaled(a, scale), scaled(b, scale)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Whether two resource lists name the same resources with equal amounts
pub fn resource_lists_equal(a: Option<&BTreeMap<String, Quantity>>, b: Option<&BTreeMap<String, Quantity>>) -> bool {
    let empty = BTreeMap::new();
    let a = a.unwrap_or(&empty);
    let b = b.unwrap_or(&empty);
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|((a_name, a_amount), (b_name, b_amount))| a_name == b_name && quantities_equal(a_amount, b_amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: &str) -> Quantity {
        Quantity(value.to_string())
    }

    #[test]
    fn test_canonical_forms_are_equal() {
        assert!(quantities_equal(&q("1024Mi"), &q("1Gi")));
        assert!(quantities_equal(&q("0.5Gi"), &q("512Mi")));
        assert!(quantities_equal(&q("1048576Ki"), &q("1Gi")));
        assert!(quantities_equal(&q("1000M"), &q("1G")));
        assert!(quantities_equal(&q("1e3"), &q("1k")));
        assert!(quantities_equal(&q("1500m"), &q("1.5")));
        assert!(quantities_equal(&q("268435456"), &q("256Mi")));
    }

    #[test]
    fn test_different_amounts_differ() {
        assert!(!quantities_equal(&q("1Gi"), &q("1G")));
        assert!(!quantities_equal(&q("256Mi"), &q("512Mi")));
        assert!(!quantities_equal(&q("1Ei"), &q("1E")));
    }

    #[test]
    fn test_unparseable_quantities_compare_as_text() {
        assert!(quantities_equal(&q("lots"), &q("lots")));
        assert!(!quantities_equal(&q("lots"), &q("1Gi")));
        assert!(!quantities_equal(&q("-1Gi"), &q("1Gi")));
    }

    #[test]
    fn test_resource_lists_compare_by_value() {
        let live = BTreeMap::from([("memory".to_string(), q("1Gi"))]);
        let desired = BTreeMap::from([("memory".to_string(), q("1024Mi"))]);
        assert!(resource_lists_equal(Some(&live), Some(&desired)));
        assert!(resource_lists_equal(None, Some(&BTreeMap::new())));
        assert!(!resource_lists_equal(Some(&live), None));
    }
}

use super::types::KeywordRule;

/// Fertility vocabulary → knowledge entity keys.
///
/// Walked top to bottom; candidate order follows the first rule that
/// mentions each key.
pub static FERTILITY_KEYWORDS: &[KeywordRule] = &[
    KeywordRule { keyword: "amh", entity_keys: &["amh_levels"] },
    KeywordRule { keyword: "anti-müllerian", entity_keys: &["amh_levels"] },
    KeywordRule { keyword: "ovarian reserve", entity_keys: &["amh_levels", "fsh_levels"] },
    KeywordRule { keyword: "pcos", entity_keys: &["pcos", "amh_levels"] },
    KeywordRule { keyword: "polycystic", entity_keys: &["pcos"] },
    KeywordRule { keyword: "fsh", entity_keys: &["fsh_levels"] },
    KeywordRule { keyword: "follicle stimulating", entity_keys: &["fsh_levels"] },
    KeywordRule { keyword: "cycle", entity_keys: &["cycle_tracking"] },
    KeywordRule { keyword: "ovulation", entity_keys: &["cycle_tracking"] },
    KeywordRule { keyword: "fertile window", entity_keys: &["cycle_tracking"] },
    KeywordRule { keyword: "tracking", entity_keys: &["cycle_tracking"] },
];

/// Every entity key the table can emit, deduplicated, in table order.
pub fn emitted_keys(table: &[KeywordRule]) -> Vec<&'static str> {
    let mut keys = Vec::new();
    for rule in table {
        for key in rule.entity_keys {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }
    }
    keys
}

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;

lazy_static! {
    static ref TRAILING_NUMBER: Regex = Regex::new(r"(\d+)\D*$").unwrap();
}

/// `numerator / denominator` as a percentage, clamped to [0, 100].
/// A zero denominator yields 0.
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    clamp_pct(numerator as f64 * 100.0 / denominator as f64)
}

pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Number carried by a bureau name, e.g. `12` for "Bureau 12".
pub fn bureau_number(name: &str) -> Option<u64> {
    TRAILING_NUMBER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lowercased name with Latin accents removed, so "École" files next to
/// "ecole" rather than after "Zola".
pub fn name_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            c => c,
        })
        .collect()
}

/// Case- and accent-insensitive name order. Names that fold to the same key
/// fall back to their raw text so the order stays total.
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    name_key(a).cmp(&name_key(b)).then_with(|| a.cmp(b))
}

/// Orders bureau names by their numeric suffix, unnumbered names last,
/// then by the name itself.
pub fn cmp_bureau_names(a: &str, b: &str) -> Ordering {
    match (bureau_number(a), bureau_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| cmp_names(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => cmp_names(a, b),
    }
}

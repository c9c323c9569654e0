use std::collections::HashMap;

/// Sørensen–Dice coefficient over character bigrams, ignoring whitespace.
///
/// Returns a value in `0.0..=1.0`; identical strings score `1.0`. The result
/// is symmetric and case-sensitive.
pub fn compare(a: &str, b: &str) -> f64 {
    let a = a.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>();
    let b = b.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut shared = 0_usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1]))
            && *count > 0
        {
            *count -= 1;
            shared += 1;
        }
    }

    (2 * shared) as f64 / (a.len() + b.len() - 2) as f64
}

//! Remove retrieved lines that the window already carries.

use std::collections::HashSet;

/// Drop every line of `retrieved` whose trimmed text is in `window_lines`.
#[must_use]
pub fn dedup_against_window(retrieved: &str, window_lines: &HashSet<String>) -> String {
    retrieved
        .lines()
        .filter(|line| !window_lines.contains(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_trimmed_matches_only() {
        let window: HashSet<String> = ["shared line".to_string()].into_iter().collect();
        let out = dedup_against_window("  shared line \nunique line\nshared line!", &window);
        assert_eq!(out, "unique line\nshared line!");
    }
}

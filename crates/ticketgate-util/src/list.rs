//! Comma-separated argument lists

/// Split a comma-separated list (issue ids, labels), trimming each item and
/// dropping empty ones.
pub fn parse_comma_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

use keycheck_storage::Dataset;

/// Row-level opt-in predicate over the filter column.
///
/// No filter column in the schema means no filtering is configured and every
/// row passes. An unset cell is an explicit opt-out. Text is matched against
/// the configured truthy tokens after trim + lowercase; anything numeric is
/// truthy iff non-zero. Pure and deterministic.
pub fn should_check(
    dataset: &Dataset,
    row: usize,
    filter_column: &str,
    truthy_tokens: &[String],
) -> bool {
    if !dataset.column_exists(filter_column) {
        return true;
    }
    let Some(raw) = dataset.get(row, filter_column) else {
        return false;
    };
    let value = raw.trim().to_lowercase();
    if truthy_tokens.iter().any(|t| t == &value) {
        return true;
    }
    if let Ok(n) = value.parse::<f64>() {
        return n != 0.0;
    }
    false
}

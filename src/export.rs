//! Plain-text report of point query results.

use crate::models::QueryResult;

/// Report text when a point matches no zone
pub const NOT_FOUND_MESSAGE: &str = "Address not found in any defined zones.";

/// Render results as `Zone: <name>` blocks with indented `key: value` lines.
///
/// Blocks follow result order, attribute lines follow key order, and each
/// block ends with a blank line.
pub fn render_report(results: &[QueryResult]) -> String {
    if results.is_empty() {
        return NOT_FOUND_MESSAGE.to_string();
    }

    let mut report = String::new();
    for result in results {
        report.push_str(&format!("Zone: {}\n", result.zone_name));
        for (key, value) in &result.attributes {
            report.push_str(&format!("  {}: {}\n", key, value));
        }
        report.push('\n');
    }
    report
}

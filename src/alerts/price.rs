/// Parse a price written the Chilean way.
///
/// Everything but digits, `.` and `,` is dropped, `.` is a thousands
/// separator and `,` the decimal separator: `"$550.000"` is 550000.0.
pub fn normalize_price(raw: Option<&str>) -> Option<f64> {
    let kept: String = raw?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let canonical = kept.replace('.', "").replace(',', ".");
    if canonical.is_empty() {
        return None;
    }
    canonical.parse::<f64>().ok()
}

//! Width tag normalisation

use crate::model::AttrValue;

/// Width in metres rounded to 0.1, or `None` when the value is not a width.
///
/// Text values may carry a metre unit and list several widths separated by
/// `;`, in which case the first one is used.
pub fn parse_width(value: &AttrValue) -> Option<f64> {
    let width = match value {
        AttrValue::Integer(_) | AttrValue::Float(_) => value.as_f64()?,
        AttrValue::Text(text) => parse_width_text(text)?,
        AttrValue::Null | AttrValue::Bool(_) => return None,
    };
    (width.is_finite() && width >= 0.0).then(|| (width * 10.0).round() / 10.0)
}

fn parse_width_text(text: &str) -> Option<f64> {
    let first = text.split(';').next()?.trim().to_lowercase();
    let number = ["metres", "meters", "meter", "metre", "m"]
        .iter()
        .find_map(|unit| first.strip_suffix(unit))
        .unwrap_or(&first)
        .trim()
        .replace(',', ".");
    number.parse::<f64>().ok()
}

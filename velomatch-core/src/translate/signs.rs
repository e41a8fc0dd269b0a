//! Traffic sign lookups on `traffic_sign` tag values

/// Whether the tag value carries the German traffic sign `sign`.
///
/// Accepts lists such as `DE:240`, `DE:239,1022-10` or `DE:237;DE:1022-10`.
/// Signs with parameters (`DE:1020-30[Anlieger]`) match their base number.
/// Values without any `DE:` prefix never match.
pub fn has_traffic_sign(value: &str, sign: &str) -> bool {
    if !value.contains("DE:") {
        return false;
    }
    value
        .split([',', ';'])
        .map(str::trim)
        .map(|part| part.strip_prefix("DE:").unwrap_or(part))
        .any(|part| {
            part == sign
                || part
                    .strip_prefix(sign)
                    .is_some_and(|rest| rest.starts_with('['))
        })
}

use staffquiz_domain::Letter;

/// Legacy letter names accepted as answers. `H` is the German name for B.
const KEY_ALIASES: &[(char, Letter)] = &[('H', Letter::B)];

/// Turns raw key text into an answer. Anything that is not a single note
/// letter (or an alias for one) yields `None` and should be ignored.
pub fn parse_answer_key(key: &str) -> Option<Letter> {
    let mut chars = key.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_ascii_uppercase(),
        _ => return None,
    };
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == c)
        .map(|(_, letter)| *letter)
        .or_else(|| Letter::from_char(c).ok())
}

/// Clamps a same-staff bias into `[0, 1]`. NaN is rejected.
pub fn normalize_bias(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

pub fn bias_percent(bias: f64) -> u32 {
    (bias * 100.0).round() as u32
}

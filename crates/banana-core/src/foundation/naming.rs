//! The underscored naming convention used for every persisted key.

/// Converts `CoolDownSeconds`, `coolDownSeconds`, `cool-down seconds` and
/// `HTTPServer` to `cool_down_seconds`/`http_server`.
///
/// Already snake_cased input is returned unchanged.
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // Last capital of an acronym: `HTTPServer` → `http_server`.
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Returns `true` when two keys are equal after normalisation.
pub fn keys_match(a: &str, b: &str) -> bool {
    a == b || to_snake_case(a) == to_snake_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_common_shapes() {
        assert_eq!(to_snake_case("CoolDownSeconds"), "cool_down_seconds");
        assert_eq!(to_snake_case("coolDownSeconds"), "cool_down_seconds");
        assert_eq!(to_snake_case("cool_down_seconds"), "cool_down_seconds");
        assert_eq!(to_snake_case("cool-down seconds"), "cool_down_seconds");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("Round2Start"), "round2_start");
        assert_eq!(to_snake_case("ShouldEnable"), "should_enable");
    }

    #[test]
    fn keys_match_ignores_format() {
        assert!(keys_match("CoolDownSeconds", "cool_down_seconds"));
        assert!(!keys_match("cool_down", "cool_down_seconds"));
    }
}

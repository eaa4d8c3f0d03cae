use chrono::Duration;
use regex::Regex;
use std::sync::LazyLock;

/// Longest accepted duration, ten years.
pub const MAX_DURATION_SECS: i64 = 3650 * 24 * 3600;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([wdhms])").expect("duration regex is valid"));

/// Parses compact durations such as `1d12h`, `30m` or `2w`. Anything other
/// than number/unit pairs is rejected, as is a total of zero or one longer
/// than [`MAX_DURATION_SECS`].
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_ascii_lowercase();
    let mut total_seconds = 0i64;
    let mut consumed = 0;

    for cap in TOKEN.captures_iter(&input) {
        let whole = cap.get(0)?;
        if !input[consumed..whole.start()].trim().is_empty() {
            return None;
        }
        consumed = whole.end();

        let value: i64 = cap[1].parse().ok()?;
        let unit_seconds = match &cap[2] {
            "w" => 7 * 24 * 3600,
            "d" => 24 * 3600,
            "h" => 3600,
            "m" => 60,
            _ => 1,
        };
        total_seconds = total_seconds.checked_add(value.checked_mul(unit_seconds)?)?;
    }

    if consumed == 0 || !input[consumed..].trim().is_empty() || total_seconds == 0 {
        return None;
    }
    if total_seconds > MAX_DURATION_SECS {
        return None;
    }

    Duration::try_seconds(total_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10m30s"), Some(Duration::seconds(630)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::seconds(5400)));
        assert_eq!(parse_duration("1d"), Some(Duration::seconds(86400)));
        assert_eq!(parse_duration("2w"), Some(Duration::days(14)));
        assert_eq!(parse_duration(" 1D 12H "), Some(Duration::hours(36)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("1h and then some"), None);
        assert_eq!(parse_duration("0s"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("99999999999999999999d"), None);
    }

    #[test]
    fn test_caps_at_ten_years() {
        assert_eq!(parse_duration("3650d"), Some(Duration::days(3650)));
        assert_eq!(parse_duration("3650d1s"), None);
        assert_eq!(parse_duration("100000000w"), None);
        assert_eq!(parse_duration("9223372036854775807s"), None);
    }
}

// src/config/duration.rs

use std::time::Duration;

/// Parse a simple duration string like `"10s"`, `"250ms"`, `"1m"`.
///
/// A bare number is read as milliseconds, which is how the readiness
/// timeout has always been expressed on the command line.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .unwrap_or(s.len());

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s or m",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_supported_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 2m "), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("5000"), Ok(Duration::from_millis(5000)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("10h").is_err());
        assert!(parse_duration("1.5s").is_err());
    }

    proptest! {
        #[test]
        fn seconds_and_millis_agree(secs in 0u64..100_000) {
            prop_assert_eq!(
                parse_duration(&format!("{secs}s")).unwrap(),
                parse_duration(&format!("{}ms", secs * 1000)).unwrap()
            );
        }
    }
}

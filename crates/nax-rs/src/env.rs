use std::env;
use std::sync::OnceLock;

static NAX_CHECK_RESULTS: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Whether raw arrays returned by the engine are checked against the computed output axes.
pub(crate) fn result_checks_enabled() -> bool {
    *NAX_CHECK_RESULTS.get_or_init(|| {
        let default = cfg!(debug_assertions);
        match env::var("NAX_CHECK_RESULTS") {
            Ok(value) if !value.trim().is_empty() => parse_bool(&value).unwrap_or_else(|| {
                log::warn!("ignoring unrecognised NAX_CHECK_RESULTS value {value:?}");
                default
            }),
            _ => default,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}

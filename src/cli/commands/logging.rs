/// Verbosity is taken from the environment only; `rdo` has no flags of its own.
pub const ENV_LOG_LEVEL: &str = "RDO_LOG_LEVEL";

/// Filter directives, same syntax as `RUST_LOG`.
pub const ENV_LOG_FILTER: &str = "RDO_LOG";

/// Map a level name or number to a verbosity count, 0 being ERROR.
#[must_use]
pub fn parse_log_level(level: &str) -> Option<u8> {
    if let Ok(parsed) = level.parse::<u8>() {
        // Successfully parsed as a number
        if parsed <= 4 {
            return Some(parsed);
        }
    }

    match level.to_lowercase().as_str() {
        "error" => Some(0),
        "warn" => Some(1),
        "info" => Some(2),
        "debug" => Some(3),
        "trace" => Some(4),
        _ => None,
    }
}

/// Verbosity requested through [`ENV_LOG_LEVEL`]; unset or invalid means 0.
#[must_use]
pub fn verbosity_from_env() -> u8 {
    std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|level| parse_log_level(&level))
        .unwrap_or(0)
}

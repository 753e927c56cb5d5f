/// Interpret a string value such as "1" or "no" as a boolean.
///
/// Unrecognized values are logged and treated as false.
pub fn str_as_bool(s: &str) -> bool {
    match s {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => {
            log::warn!("Unrecognized boolean value \"{}\"", s);
            false
        }
    }
}

/// Return whether a flag controlled by an environment variable is enabled.
pub fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .as_ref()
        .map(|s| str_as_bool(s))
        .unwrap_or(default)
}

/// Return the value of an environment variable, if set to a non-empty
/// string.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

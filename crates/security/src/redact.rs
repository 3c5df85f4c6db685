//! Redaction of auth metadata in log output.

use watchtower_core::state::AuthMetadata;

pub const REDACTED: &str = "[REDACTED]";

/// Render a command line for logging with every auth value replaced.
pub fn redact_command(args: &[String], auth: &AuthMetadata) -> String {
    let mut line = args.join(" ");
    for value in auth.values().filter(|v| !v.is_empty()) {
        line = line.replace(value.as_str(), REDACTED);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_values_are_hidden() {
        let mut auth = AuthMetadata::new();
        auth.insert("Cookie".into(), "session=abc123".into());
        auth.insert("Authorization".into(), "Bearer t0ken".into());
        let args = vec![
            "sqlmap".to_string(),
            "--cookie=session=abc123".to_string(),
            "--headers=Authorization: Bearer t0ken".to_string(),
        ];
        let line = redact_command(&args, &auth);
        assert!(!line.contains("abc123"));
        assert!(!line.contains("t0ken"));
        assert!(line.contains("--cookie=[REDACTED]"));
    }

    #[test]
    fn empty_values_do_not_mangle_output() {
        let mut auth = AuthMetadata::new();
        auth.insert("X-Empty".into(), String::new());
        let args = vec!["nmap".to_string(), "example.com".to_string()];
        assert_eq!(redact_command(&args, &auth), "nmap example.com");
    }
}

use tracing_subscriber::EnvFilter;

const WORKSPACE_TARGETS: &[&str] = &[
    "arc14_cli",
    "arc14_web",
    "arc14_notify",
    "arc14_store",
    "arc14_core",
];

/// Builds a filter that applies `log_level` to workspace crates and keeps
/// dependencies (hyper, reqwest, rusqlite) at `warn`.
pub fn directives(log_level: &str) -> String {
    let level = log_level.trim();
    let mut out = String::from("warn");
    for target in WORKSPACE_TARGETS {
        out.push_str(&format!(",{target}={level}"));
    }
    out
}

pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::directives;

    #[test]
    fn scopes_level_to_workspace_crates() {
        let filter = directives(" debug ");
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("arc14_web=debug"));
        assert!(filter.contains("arc14_store=debug"));
    }
}

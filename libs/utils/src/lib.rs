use tracing_subscriber::EnvFilter;

/// Directive for every crate of the workspace at `level`
pub fn log_directive(level: &str) -> String {
    ["livectl", "http_log", "tower_http"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` wins over the configured directive
pub fn set_log(env_filter: String) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}

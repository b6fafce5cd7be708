use authpipe::{config::AppConfig, init_server, observability::init_tracing};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    // JSON logs when AUTHPIPE_LOG_JSON is set
    init_tracing(env::var_os("AUTHPIPE_LOG_JSON").is_some());

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/authpipe.yaml".to_string());

    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: authpipe [config_file]");
            process::exit(1);
        }
    };

    if let Err(e) = init_server(config).await {
        eprintln!("Server error: {}", e);
        process::exit(1);
    }
}

mod action;
mod analysis;
mod api;
mod app;
mod app_state;
mod auth;
mod component;
mod components;
mod ingest;
mod layout;
mod pipeline;
mod render;
mod stats;
mod theme;
mod widgets;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = docpipe_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("docpipe.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("docpipe log: {}", log_path.display());

    tracing::info!("docpipe starting…");

    let config = docpipe_proto::config::Config::load().unwrap_or_default();

    let durable = docpipe_proto::store::DurableStore::open_default();
    let session = docpipe_proto::store::SessionStore::open_default();

    let app = app::App::new(config, durable, session, log_path);
    app.run().await?;

    Ok(())
}

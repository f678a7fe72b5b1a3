use std::sync::Arc;
use tokio::net::TcpListener;

use gesture_relay::config::{Config, UnauthenticatedPolicy};
use gesture_relay::persistence::SqliteGestureStore;
use gesture_relay::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_relay=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    // Nothing useful can run without the store.
    let store = match SqliteGestureStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("failed to open gesture store {}: {e}", config.database_url);
            std::process::exit(1);
        }
    };
    tracing::info!("gesture store ready");

    let state = AppState::new(config.relay, Arc::new(store), config.static_dir);
    let app = gesture_relay::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app).await.expect("server error");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let policy = match config.relay.unauthenticated {
        UnauthenticatedPolicy::Reject => "reject",
        UnauthenticatedPolicy::Permissive => "permissive",
    };

    eprintln!();
    eprintln!("  \x1b[1;36mgesture-relay\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m     {}", config.database_url);
    eprintln!("  \x1b[2mstatic\x1b[0m       {}", config.static_dir.display());
    eprintln!("  \x1b[2munauth\x1b[0m       {policy}");
    eprintln!(
        "  \x1b[2msave retry\x1b[0m   {} x {}ms",
        config.relay.save_max_attempts,
        config.relay.save_backoff.as_millis()
    );
    eprintln!();
}

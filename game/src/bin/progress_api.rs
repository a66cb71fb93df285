use std::env;

use game::progress_api::{ApiState, default_progress_path, resolve_api_addr, router};
use game::tree;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (def, def_path) = tree::load_default();
    match def_path {
        Some(path) => tracing::info!("serving skill tree from {path:?}"),
        None => tracing::info!("serving compiled-in skill tree"),
    }

    let progress_path = default_progress_path();
    tracing::info!("progress file: {progress_path:?}");
    let app = router(ApiState::new(def, progress_path));

    let addr = resolve_api_addr(|k| env::var(k).ok());
    tracing::info!("progress api listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind progress api");

    axum::serve(listener, app)
        .await
        .expect("serve progress api");
}

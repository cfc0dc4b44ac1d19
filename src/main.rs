use std::process;
use std::sync::Arc;

use bitwig_assist::api;
use bitwig_assist::controller::spawn_refresh_loop;
use bitwig_assist::logging;
use bitwig_assist::paths;
use bitwig_assist::state::AppState;

#[tokio::main]
async fn main() {
    logging::init_tracing();

    let app_config_dir = paths::app_config_dir();
    let state = match AppState::load(app_config_dir.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, dir = %app_config_dir.display(), "Failed to load state");
            process::exit(1);
        }
    };

    let info = state.controller.system_info();
    tracing::info!(
        platform = %info.platform,
        supported = info.supported,
        backend = %info.backend,
        "Starting Bitwig assistant"
    );

    let (poll, port) = {
        let settings = state.settings.lock();
        (settings.poll_interval(), settings.server_port)
    };

    // Initial probe in the background; requests that need it will wait.
    let init_controller = Arc::clone(&state.controller);
    tokio::spawn(async move {
        init_controller.wait_for_initialization().await;
    });

    let _refresh = poll.map(|interval| spawn_refresh_loop(Arc::clone(&state.controller), interval));

    let port = match api::start_api_server(Arc::clone(&state), port).await {
        Ok(port) => port,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start API server");
            process::exit(1);
        }
    };

    // Port file lets local tools find the API.
    let port_file = paths::port_file_path(&app_config_dir);
    if let Err(e) = std::fs::create_dir_all(&app_config_dir)
        .and_then(|()| std::fs::write(&port_file, port.to_string()))
    {
        tracing::warn!(error = %e, path = %port_file.display(), "Failed to write port file");
    }

    tracing::info!("API server listening on http://127.0.0.1:{port}");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
    let _ = std::fs::remove_file(&port_file);
}

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::path::{Path, PathBuf};

use agenthire::config::Config;
use agenthire::controllers;
use agenthire::gateway::ws::ws_handler;
use agenthire::AppState;

/// SPA fallback handler - serves index.html for client-side routing
async fn spa_fallback(dist: web::Data<PathBuf>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(dist.join("index.html"))?)
}

/// Frontend build to serve, if any.
/// FRONTEND_DIST wins; otherwise ./frontend/dist then ../frontend/dist.
fn resolve_frontend_dist(config: &Config) -> Option<PathBuf> {
    if config.disable_frontend {
        log::info!("Frontend serving disabled via DISABLE_FRONTEND env var");
        return None;
    }
    if let Some(ref dist) = config.frontend_dist {
        if dist.exists() {
            return Some(dist.clone());
        }
        log::warn!("FRONTEND_DIST {:?} does not exist - static file serving disabled", dist);
        return None;
    }
    ["./frontend/dist", "../frontend/dist"]
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .or_else(|| {
            log::warn!("Frontend dist not found in ./frontend/dist or ../frontend/dist - static file serving disabled");
            None
        })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("Invalid configuration");
    let port = config.port;
    log::info!("Using config directory: {:?}", config.config_dir);

    let frontend_dist = resolve_frontend_dist(&config);
    let state = AppState::from_config(config).expect("Failed to initialize application state");

    let chain_id = state.network.network.chain_id;
    if let Err(e) = state.chain.ensure_network().await {
        log::warn!("Network check against chain {} failed: {}", chain_id, e);
    }

    match state.wallet.address() {
        Some(address) if state.wallet.can_sign() => log::info!("Wallet {:?} connected (signing)", address),
        Some(address) => log::info!("Wallet {:?} connected (watch-only)", address),
        None => log::warn!("No wallet configured - task runs and funding are disabled"),
    }

    log::info!("Starting agenthire server on port {}", port);
    log::info!("WebSocket Gateway available at /ws");
    if let Some(ref dist) = frontend_dist {
        log::info!("Serving frontend from: {:?}", dist);
    }

    let state = web::Data::new(state);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::network::config)
            .configure(controllers::agents::config)
            .configure(controllers::balances::config)
            .configure(controllers::wallet::config)
            .configure(controllers::tasks::config)
            .route("/ws", web::get().to(ws_handler));

        // Serve static files only if frontend dist exists
        if let Some(ref dist) = frontend_dist {
            app = app.app_data(web::Data::new(dist.clone())).service(
                Files::new("/", dist.clone())
                    .index_file("index.html")
                    .default_handler(web::to(spa_fallback)),
            );
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

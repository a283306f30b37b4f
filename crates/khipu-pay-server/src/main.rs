use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use khipu_server::{cors::build_cors, routes, AppState, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}. Set KHIPU_RECEIVER_ID and KHIPU_SECRET in the environment or .env");
            std::process::exit(1);
        }
    };

    let port = config.port;
    let rate_limit_rpm = config.rate_limit_rpm;
    let allowed_origins = config.allowed_origins.clone();
    let static_dir = config.static_dir.clone();

    tracing::info!("Khipu checkout server listening on port {port}");
    tracing::info!("Gateway API: {}", config.api_base_url);
    tracing::info!("Public URL: {}", config.public_url);
    tracing::info!("Notification URL: {}", config.callback_urls().notify_url);
    tracing::info!("Rate limit: {rate_limit_rpm} req/min per IP");
    if config.metrics_token.is_none() && !config.public_metrics {
        tracing::info!("/metrics disabled (set METRICS_TOKEN or KHIPU_PUBLIC_METRICS=true)");
    }

    let state = match AppState::new(config) {
        Ok(s) => web::Data::new(s),
        Err(e) => {
            tracing::error!("Failed to build gateway client: {e}");
            std::process::exit(1);
        }
    };

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
    else {
        tracing::error!("Invalid rate limiter config: RATE_LIMIT_RPM={rate_limit_rpm}");
        std::process::exit(1);
    };

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::FormConfig::default().limit(16_384))
            .configure(routes::configure)
            .service(actix_files::Files::new("/static", &static_dir))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

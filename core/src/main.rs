mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_billing::AppState;
use common::{catalog::Catalog, env_config::Config, stripe::StripeGateway};
use db::PgStore;
use panel::PanelClient;
use provisioner::{PgQueue, Worker};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");

    // static product data
    let catalog = Arc::new(Catalog::load(&config.catalog_path).expect("Failed to load catalog"));

    let state = AppState {
        store: PgStore::new(pool.clone()),
        panel: PanelClient::new(&config.panel).expect("Failed to create panel client"),
        queue: PgQueue::new(pool.clone(), config.worker.max_attempts),
        gateway: StripeGateway::new(&config.stripe_secret_key),
        catalog: catalog.clone(),
    };

    // provisioning runs next to the HTTP workers and shares the database queue
    let worker = Worker::new(
        state.queue.clone(),
        state.store.clone(),
        state.panel.clone(),
        catalog,
        config.worker.clone(),
    );
    actix_web::rt::spawn(worker.run());

    log::info!(
        "Listening on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    let origin = config.cors_allowed_origin.clone();
    HttpServer::new(move || {
        let secret = config_data.jwt_config.secret.as_str();
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(state.clone()))
            .wrap(limiter::global_middleware(config_data.rate_limit_per_second)) // 3rd
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_billing::mount_webhook())
                    .service(
                        web::scope("/internal")
                            .wrap(api_auth::internal_middleware(&config_data.internal_api_key))
                            .service(api_billing::mount_internal()),
                    )
                    .service(
                        web::scope("/dashboard")
                            .wrap(api_auth::auth_middleware(secret))
                            .service(api_billing::mount_servers())
                            .service(api_billing::mount_invoices()),
                    )
                    .service(
                        web::scope("/admin")
                            .wrap(api_auth::admin_middleware(secret))
                            .service(api_billing::mount_admin()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}

use actix_web::{middleware, App, HttpServer};
use admissions::config::AppConfig;
use admissions::job_controller::state::JobsState;
use admissions::services::fees::seed_fee_schedule;
use admissions::state::AppState;
use admissions::store::Store;
use env_logger::Env;
use log::info;
use std::io;

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load().map_err(startup_error)?;
    std::fs::create_dir_all(&config.storage.root)?;
    std::fs::create_dir_all(&config.fees.invoice_dir)?;

    let store = Store::open(&config.database.path).map_err(startup_error)?;
    info!("Database ready at {}", config.database.path.display());

    let jobs = JobsState::start();
    let (host, port) = config.bind_address();
    let state = AppState::new(config, store, jobs);
    seed_fee_schedule(&state).map_err(startup_error)?;

    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(admissions::configure(state.clone()))
    })
    .bind((host, port))?
    .run()
    .await
}

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::env;
use tracing::info;
use vision_service::config::Settings;
use vision_service::server::{routes, AppState};
use vision_service::util::{init_logging, load_classifier};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = Settings::load()?;
    let args: Vec<String> = env::args().skip(1).collect();
    settings.apply_args(&args)?;

    init_logging(&settings);

    // The model must load before binding, otherwise the service never
    // reports ready
    let classifier = load_classifier(&settings)?;
    let addr = settings.bind_addr();
    let state = web::Data::new(AppState::new(settings, classifier));

    info!("listening on {addr}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(&addr)
    .with_context(|| format!("binding {addr}"))?
    .run()
    .await?;

    Ok(())
}

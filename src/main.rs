use actix_web::HttpServer;
use std::env;

use crate::app::config::Config;
use crate::app::factory::{AppState, CreateApp};

mod app;
mod ai_agent;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  if env::var_os("RUST_LOG").is_none() {
    env::set_var("RUST_LOG", "actix_web=info,info");
  }
  env_logger::init();

  let config : Config = Config::load();
  let app_state: AppState = AppState::from_config(&config);
  log::info!("Serving {} analysis with markers {:?}", config.provider, config.markers);

  let server_builder = HttpServer::new(move || {
    let factory: CreateApp = CreateApp::new(app_state.clone());
    factory.build_app().wrap(actix_web::middleware::Logger::default())
  });

  let server = server_builder.bind((config.bind_address.as_str(), config.port))?;
  log::info!("Listening on {}:{}", config.bind_address, config.port);

  server.run().await?;

  Ok(())
}

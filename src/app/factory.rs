use actix_web::{web, App};
use std::sync::Arc;

use crate::ai_agent::llm::models::{default_model_factory, ModelFactory};
use crate::app::config::Config;
use crate::app::routes::routes::Routes;

use super::controller::statement_controllers::StatementController;
use super::services::service::StatementServices;
use super::services::session_service::SessionService;

/// Spreadsheets are uploaded as a raw body.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
  pub statement_controller: Arc<StatementController>
}

impl AppState {

  pub fn new(app_config: &Config, model_factory: ModelFactory) -> Self {
    let session_service: Arc<SessionService> = Arc::new(SessionService::new(app_config.clone(), model_factory));
    let statement_services: Arc<StatementServices> = Arc::new(StatementServices::new(
      session_service, app_config.markers.clone(), app_config.cache_capacity,
    ));
    let statement_controller: Arc<StatementController> = Arc::new(StatementController::new(statement_services));
    AppState { statement_controller }
  }

  pub fn from_config(app_config: &Config) -> Self {
    AppState::new(app_config, default_model_factory())
  }
}

/// Built once per worker. The state is shared, so every worker sees the same sessions.
pub struct CreateApp {
  app_state: AppState,
}

impl CreateApp {
  pub fn new(app_state: AppState) -> Self {
    CreateApp { app_state }
  }

  pub fn build_app(&self,) -> App<impl actix_web::dev::ServiceFactory<actix_web::dev::ServiceRequest,Config = (),Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,Error = actix_web::Error,InitError = (),>,> {
    App::new()
    .app_data(web::Data::new(self.app_state.statement_controller.clone()))
    .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
    .app_data(web::JsonConfig::default().limit(MAX_UPLOAD_BYTES))
    .configure(Routes::configure)
  }
}

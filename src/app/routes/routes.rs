use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use futures::StreamExt;

use crate::app::controller::statement_controllers::StatementController;
use crate::app::error::AppError;

#[derive(Deserialize, Serialize, Default)]
pub struct StartSessionRequest {
  #[serde(default)]
  api_key: Option<String>,
}

#[derive(Deserialize, Serialize)]
pub struct StatementRowsRequest {
  rows: Vec<Vec<Value>>,
}

#[derive(Deserialize, Serialize)]
pub struct ChatRequest {
  message: String,
}

pub struct Routes;

impl Routes {

  pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(Self::health)));
    cfg.service(web::resource("/models").route(web::get().to(Self::get_models)));
    cfg.service(web::resource("/session").route(web::post().to(Self::start_session)));
    cfg.service(web::resource("/session/{id}").route(web::delete().to(Self::end_session)));
    cfg.service(web::resource("/session/{id}/transcript").route(web::get().to(Self::transcript)));
    cfg.service(web::resource("/session/{id}/statement").route(web::post().to(Self::upload_statement)));
    cfg.service(web::resource("/session/{id}/statement/rows").route(web::post().to(Self::upload_rows)));
    cfg.service(web::resource("/session/{id}/narrative").route(web::post().to(Self::narrative)));
    cfg.service(web::resource("/session/{id}/chat").route(web::post().to(Self::chat)));
  }

  async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
      "status": "ok",
      "Info": "Financial statement analyst is running.",
      "code": 200,
    }))
  }

  async fn get_models(controller: web::Data<Arc<StatementController>>) -> impl Responder {
    HttpResponse::Ok().json(controller.get_available_models())
  }

  async fn start_session(controller: web::Data<Arc<StatementController>>, request: Option<web::Json<StartSessionRequest>>) -> Result<HttpResponse, AppError> {
    let request = request.map(|r| r.into_inner()).unwrap_or_default();
    let summary = controller.start_session(request.api_key).await?;
    Ok(HttpResponse::Created().json(summary))
  }

  async fn end_session(controller: web::Data<Arc<StatementController>>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    controller.end_session(&path).await?;
    Ok(HttpResponse::NoContent().finish())
  }

  async fn transcript(controller: web::Data<Arc<StatementController>>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let messages = controller.transcript(&path).await?;
    Ok(HttpResponse::Ok().json(messages))
  }

  async fn upload_statement(controller: web::Data<Arc<StatementController>>, path: web::Path<String>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    let report = controller.upload_statement(&path, &body).await?;
    Ok(HttpResponse::Ok().json(report))
  }

  async fn upload_rows(controller: web::Data<Arc<StatementController>>, path: web::Path<String>, request: web::Json<StatementRowsRequest>) -> Result<HttpResponse, AppError> {
    let report = controller.upload_rows(&path, request.into_inner().rows).await?;
    Ok(HttpResponse::Ok().json(report))
  }

  async fn narrative(controller: web::Data<Arc<StatementController>>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let report = controller.narrative(&path).await?;
    Ok(HttpResponse::Ok().json(report))
  }

  /// One JSON render per line; the last line is the final state of the turn.
  async fn chat(controller: web::Data<Arc<StatementController>>, path: web::Path<String>, request: web::Json<ChatRequest>) -> Result<HttpResponse, AppError> {
    let renders = controller.chat(&path, request.into_inner().message)?;
    let lines = renders.map(|render| {
      serde_json::to_vec(&render)
        .map(|mut line| {
          line.push(b'\n');
          web::Bytes::from(line)
        })
        .map_err(actix_web::error::ErrorInternalServerError)
    });
    Ok(HttpResponse::Ok().content_type("application/x-ndjson").streaming(lines))
  }
}

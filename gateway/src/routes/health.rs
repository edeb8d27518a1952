use actix_web::{HttpResponse, Responder, web};
use converters::Gateway;
use serde_json::json;
use tracing::instrument;

#[instrument(skip(gateway))]
pub async fn health_check(gateway: web::Data<Gateway>) -> impl Responder {
    let snapshot = gateway.health.snapshot();
    let body = json!({ "health": snapshot });

    if gateway.is_ready() {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

pub async fn health_options() -> impl Responder {
    HttpResponse::NoContent().insert_header(("Allow", "GET")).finish()
}

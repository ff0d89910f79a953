use actix_web::{web, HttpResponse, Responder};

use super::error_response;
use crate::wallet::parse_address;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/balances")
            .route("/{address}", web::get().to(get_balances))
            .route("/{address}/refresh", web::post().to(refresh_balances)),
    );
}

/// Cached summary, read from the chain on first request
async fn get_balances(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let address = match parse_address(&path) {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    let summary = state.balances.get_or_refresh(address).await;
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "address": address,
        "balances": summary,
        "can_claim_free": summary.can_claim_free(),
    }))
}

async fn refresh_balances(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let address = match parse_address(&path) {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    let summary = state.balances.refresh(address).await;
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "address": address,
        "balances": summary,
        "can_claim_free": summary.can_claim_free(),
    }))
}

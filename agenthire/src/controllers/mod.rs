pub mod agents;
pub mod balances;
pub mod health;
pub mod network;
pub mod tasks;
pub mod wallet;

use crate::error::AppError;
use actix_web::HttpResponse;

/// `{ "success": false, "error": ... }` with a status matching the error kind
pub(crate) fn error_response(err: &AppError) -> HttpResponse {
    let mut body = serde_json::json!({
        "success": false,
        "error": err.to_string(),
        "kind": err.kind(),
    });
    if let AppError::InsufficientFunds {
        shortfall, required, available, ..
    } = err
    {
        body["shortfall"] = serde_json::json!(shortfall.to_string());
        body["required"] = serde_json::json!(required.to_string());
        body["available"] = serde_json::json!(available.to_string());
    }

    match err {
        AppError::InvalidInput(_) | AppError::InsufficientFunds { .. } => HttpResponse::BadRequest().json(body),
        AppError::NoActiveAgents => HttpResponse::NotFound().json(body),
        AppError::WalletNotConnected => HttpResponse::Unauthorized().json(body),
        AppError::Config(_) => {
            log::error!("Configuration error in request: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
        _ => {
            log::warn!("Upstream failure: {}", err);
            HttpResponse::BadGateway().json(body)
        }
    }
}

//! Wallet session and escrow funding endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use super::error_response;
use crate::error::AppError;
use crate::funding;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/wallet")
            .route("", web::get().to(get_session))
            .route("/disconnect", web::post().to(disconnect))
            .route("/approve", web::post().to(approve))
            .route("/deposit", web::post().to(deposit))
            .route("/claim", web::post().to(claim))
            .route("/bridge", web::post().to(bridge)),
    );
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Human amount, e.g. "12.5"
    pub amount: String,
}

async fn get_session(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "connected": state.wallet.connected(),
        "address": state.wallet.address(),
        "can_sign": state.wallet.can_sign(),
    }))
}

async fn disconnect(state: web::Data<AppState>) -> impl Responder {
    state.wallet.disconnect();
    log::info!("[wallet] Session disconnected");
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

fn tx_response(state: &AppState, tx_hash: &str, extra: serde_json::Value) -> HttpResponse {
    let mut body = serde_json::json!({
        "success": true,
        "tx_hash": tx_hash,
        "explorer_url": state.network.network.explorer_tx_url(tx_hash),
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    HttpResponse::Ok().json(body)
}

async fn approve(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    if !state.wallet.connected() {
        return error_response(&AppError::WalletNotConnected);
    }
    match funding::approve_escrow(&state.balances, state.writer.as_ref(), &body.amount).await {
        Ok(receipt) => {
            let tx_hash = receipt.tx_hash.clone();
            tx_response(&state, &tx_hash, serde_json::json!({ "receipt": receipt }))
        }
        Err(e) => error_response(&e),
    }
}

async fn deposit(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    if !state.wallet.connected() {
        return error_response(&AppError::WalletNotConnected);
    }
    match funding::deposit_to_escrow(&state.balances, state.writer.as_ref(), &body.amount).await {
        Ok(receipt) => {
            let tx_hash = receipt.tx_hash.clone();
            tx_response(&state, &tx_hash, serde_json::json!({ "receipt": receipt }))
        }
        Err(e) => error_response(&e),
    }
}

async fn claim(state: web::Data<AppState>) -> impl Responder {
    if !state.wallet.connected() {
        return error_response(&AppError::WalletNotConnected);
    }
    match funding::claim_free_credits(&state.balances, state.writer.as_ref()).await {
        Ok(tx_hash) => tx_response(&state, &tx_hash, serde_json::json!({})),
        Err(e) => error_response(&e),
    }
}

async fn bridge(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    let Some(ref bridge) = state.bridge else {
        return error_response(&AppError::InvalidInput(
            "USDC bridge is not configured for this network".to_string(),
        ));
    };
    let address = match state.wallet.require_address() {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    match bridge.bridge_usdc_to_agent(&body.amount).await {
        Ok(receipt) => {
            state.balances.refresh(address).await;
            let tx_hash = receipt.claim_tx_hash.clone();
            tx_response(&state, &tx_hash, serde_json::json!({ "bridge": receipt }))
        }
        Err(e) => error_response(&e),
    }
}

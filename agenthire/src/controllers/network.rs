//! Network definition for browser wallets and the CLI.

use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/network").route(web::get().to(get_network)));
}

async fn get_network(state: web::Data<AppState>) -> impl Responder {
    let network = &state.network;
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "chain_id": network.network.chain_id,
        "add_chain_params": network.network.add_chain_params(),
        "contracts": network.contracts,
        "explorer_url": network.network.explorer_url,
        "bridge": network.bridge.as_ref().map(|b| serde_json::json!({
            "source_chain_id": b.source_chain_id,
            "usdc_address": b.usdc_address,
            "usdc_decimals": b.usdc_decimals,
        })),
    }))
}

//! Agent listing and cost estimate endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use super::error_response;
use crate::chain::get_active_agents;
use crate::estimate::estimate_cost;
use crate::pipeline::select_best_pipeline;
use crate::wallet::parse_address;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/agents").route(web::get().to(list_agents)));
    cfg.service(web::resource("/api/estimate").route(web::post().to(estimate)));
}

#[derive(Debug, Default, Deserialize)]
pub struct EstimateRequest {
    /// Client to check the escrow deposit for; defaults to the session wallet
    pub client: Option<String>,
}

async fn list_agents(state: web::Data<AppState>) -> impl Responder {
    match get_active_agents(state.chain.as_ref()).await {
        Ok(agents) => {
            let pipeline = select_best_pipeline(&agents);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "agents": agents,
                "pipeline": pipeline,
            }))
        }
        Err(e) => {
            log::error!("Failed to load agents: {}", e);
            error_response(&e)
        }
    }
}

async fn estimate(state: web::Data<AppState>, body: Option<web::Json<EstimateRequest>>) -> impl Responder {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let client = match request.client {
        Some(ref s) => match parse_address(s) {
            Ok(address) => Some(address),
            Err(e) => return error_response(&e),
        },
        None => state.wallet.address(),
    };

    match estimate_cost(&state.balances, client).await {
        Ok(estimate) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "estimate": estimate,
        })),
        Err(e) => error_response(&e),
    }
}

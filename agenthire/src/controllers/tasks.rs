//! Task run endpoints.
//!
//! `POST /api/tasks` validates and publishes the run, then drives it in the
//! background; progress is read back via `GET /api/tasks/{id}` or `/ws`.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use super::error_response;
use crate::chain::get_active_agents;
use crate::error::AppError;
use crate::orchestrator::TaskRequest;
use crate::pipeline::select_best_pipeline;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::post().to(start_task))
            .route("", web::get().to(list_tasks))
            .route("/{id}", web::get().to(get_task)),
    );
}

#[derive(Debug, Deserialize)]
pub struct StartTaskRequest {
    pub prompt: String,
}

async fn start_task(state: web::Data<AppState>, body: web::Json<StartTaskRequest>) -> impl Responder {
    let client = match state.wallet.require_address() {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    let agents = match get_active_agents(state.chain.as_ref()).await {
        Ok(agents) if agents.is_empty() => return error_response(&AppError::NoActiveAgents),
        Ok(agents) => agents,
        Err(e) => return error_response(&e),
    };

    let request = TaskRequest {
        client,
        prompt: body.into_inner().prompt,
        pipeline: select_best_pipeline(&agents),
    };
    let prepared = match state.orchestrator.prepare(request) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let run = prepared.run.clone();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.execute(prepared).await;
    });

    log::info!("Task run {} accepted for {:?}", run.id, client);
    HttpResponse::Accepted().json(serde_json::json!({
        "success": true,
        "run": run,
    }))
}

async fn list_tasks(state: web::Data<AppState>) -> impl Responder {
    let runs = state.tracker.list();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": runs.len(),
        "runs": runs,
    }))
}

async fn get_task(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.tracker.get(&path) {
        Some(run) => {
            let (completed, failed, pending) = run.progress();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "step_label": run.step.label(),
                "progress": {
                    "completed": completed,
                    "failed": failed,
                    "pending": pending,
                },
                "run": run,
            }))
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": format!("Task run {} not found", path.as_str()),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeBackend;
    use crate::chain::testing::{FakeChain, FAKE_SIGNER};
    use crate::models::AgentType;
    use crate::pipeline::tests::agent;
    use crate::state::testing::state;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use ethers::types::Address;
    use std::sync::Arc;
    use std::time::Duration;

    fn chain(escrow: u64) -> Arc<FakeChain> {
        let chain = Arc::new(FakeChain::with_agents(vec![
            agent(1, AgentType::Coordinator, 900, 15),
            agent(2, AgentType::Research, 850, 10),
        ]));
        chain.set_balances(Address::from_low_u64_be(FAKE_SIGNER), 100, escrow);
        chain
    }

    async fn wait_for_terminal(state: &AppState, id: &str) {
        for _ in 0..200 {
            if state.tracker.get(id).is_some_and(|run| run.step.is_terminal()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {} did not finish", id);
    }

    #[actix_web::test]
    async fn test_start_and_follow_run() {
        let data = web::Data::new(state(chain(25), FakeBackend::new()));
        let app = test::init_service(App::new().app_data(data.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(serde_json::json!({ "prompt": "Research the market" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let id = body["run"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["run"]["total_budget"], "25");

        wait_for_terminal(&data, &id).await;
        let req = test::TestRequest::get().uri(&format!("/api/tasks/{}", id)).to_request();
        let done: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(done["run"]["step"], "completed");
        assert_eq!(done["step_label"], "Task completed");
        assert_eq!(done["progress"]["completed"], 2);
        assert_eq!(done["run"]["final_output"], "Research(Research the market)");

        let req = test::TestRequest::get().uri("/api/tasks").to_request();
        let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list["total"], 1);
    }

    #[actix_web::test]
    async fn test_underfunded_run_fails_in_checking() {
        let data = web::Data::new(state(chain(10), FakeBackend::new()));
        let app = test::init_service(App::new().app_data(data.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(serde_json::json!({ "prompt": "Research the market" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = body["run"]["id"].as_str().unwrap().to_string();

        wait_for_terminal(&data, &id).await;
        let req = test::TestRequest::get().uri(&format!("/api/tasks/{}", id)).to_request();
        let done: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(done["run"]["step"], "failed");
        assert_eq!(done["run"]["failed_during"], "checking");
        assert!(done["run"]["error"].as_str().unwrap().contains("15"));
    }

    #[actix_web::test]
    async fn test_unknown_run() {
        let data = web::Data::new(state(chain(0), FakeBackend::new()));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/tasks/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_empty_prompt_rejected() {
        let data = web::Data::new(state(chain(25), FakeBackend::new()));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(serde_json::json!({ "prompt": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

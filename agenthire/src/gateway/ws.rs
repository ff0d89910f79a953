//! `/ws` event stream. Clients only listen; anything they send other than
//! ping/close is ignored.

use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;

pub async fn ws_handler(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, body)?;
    let mut events = state.broadcaster.subscribe();

    log::info!(
        "[gateway] WebSocket client connected ({} subscribers)",
        state.broadcaster.subscriber_count()
    );

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                log::error!("[gateway] Failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if session.text(text).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[gateway] WebSocket client lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                msg = msg_stream.next() => match msg {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        let _ = session.close(reason).await;
                        log::info!("[gateway] WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("[gateway] WebSocket protocol error: {}", e);
                        break;
                    }
                    None => break,
                },
            }
        }

        let _ = session.close(None).await;
        log::info!("[gateway] WebSocket client disconnected");
    });

    Ok(response)
}

use crate::config::QaConfig;
use crate::models::{AskRequest, ErrorResponse, HistoryQuery, HistoryResponse, SessionQuery};
use crate::qa::QaHandler;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use tracing::{info, warn};

const DEFAULT_HISTORY_LIMIT: u32 = 10;
const MAX_HISTORY_LIMIT: u32 = 500;

fn session_or_default(session_id: Option<&str>, config: &QaConfig) -> String {
    session_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(&config.default_session_id)
        .to_string()
}

#[post("/qa/ask")]
pub async fn ask(
    req: web::Json<AskRequest>,
    handler: web::Data<QaHandler>,
    config: web::Data<QaConfig>,
) -> impl Responder {
    if req.question.trim().is_empty() {
        warn!("Rejected empty question");
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Question must not be empty".to_string(),
        });
    }

    let session_id = session_or_default(req.session_id.as_deref(), &config);
    info!(session_id = %session_id, "Received question");

    let response = handler
        .process_question(&session_id, &req.question, req.user_id.as_deref())
        .await;

    if response.success {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::InternalServerError().json(response)
    }
}

#[get("/qa/history")]
pub async fn get_history(
    query: web::Query<HistoryQuery>,
    handler: web::Data<QaHandler>,
    config: web::Data<QaConfig>,
) -> impl Responder {
    let session_id = session_or_default(query.session_id.as_deref(), &config);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT) as usize;

    let history = handler.get_conversation_history(&session_id, limit).await;

    HttpResponse::Ok().json(HistoryResponse {
        session_id,
        history,
    })
}

#[delete("/qa/history")]
pub async fn clear_history(
    query: web::Query<SessionQuery>,
    handler: web::Data<QaHandler>,
    config: web::Data<QaConfig>,
) -> impl Responder {
    let session_id = session_or_default(query.session_id.as_deref(), &config);
    let response = handler.clear_history(&session_id).await;

    if response.success {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::InternalServerError().json(response)
    }
}

#[get("/qa/test-connection")]
pub async fn test_connection(handler: web::Data<QaHandler>) -> impl Responder {
    let status = handler.test_connection().await;

    if status.success {
        HttpResponse::Ok().json(status)
    } else {
        HttpResponse::ServiceUnavailable().json(status)
    }
}

/// Register every Q&A route on an actix `App` or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(ask)
        .service(get_history)
        .service(clear_history)
        .service(test_connection);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_falls_back_to_configured_default() {
        let config = QaConfig::default();

        assert_eq!(session_or_default(None, &config), "default");
        assert_eq!(session_or_default(Some("   "), &config), "default");
        assert_eq!(session_or_default(Some(" team-a "), &config), "team-a");
    }
}

use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::error;

use crate::db::JobLedger;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    ledger: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn probe(
    ledger: &dyn JobLedger,
    healthy: &'static str,
    unhealthy: &'static str,
) -> HttpResponse {
    match ledger.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: healthy,
            ledger: "connected",
            error: None,
        }),
        Err(e) => {
            error!("{} check failed: {}", healthy, e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: unhealthy,
                ledger: "disconnected",
                error: Some(e.to_string()),
            })
        }
    }
}

/// General health check including ledger connectivity.
#[get("/health")]
async fn health_check(ledger: web::Data<dyn JobLedger>) -> impl Responder {
    probe(ledger.get_ref(), "healthy", "unhealthy").await
}

/// Readiness probe: 503 while the ledger is unreachable.
#[get("/ready")]
async fn readiness_check(ledger: web::Data<dyn JobLedger>) -> impl Responder {
    probe(ledger.get_ref(), "ready", "not_ready").await
}

/// Liveness probe; does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive",
        ledger: "not_checked",
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    use super::*;
    use crate::db::InMemoryJobLedger;

    #[actix_web::test]
    async fn test_probes_with_reachable_ledger() {
        let ledger: Arc<dyn JobLedger> = Arc::new(InMemoryJobLedger::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(ledger))
                .configure(health_config),
        )
        .await;

        for (uri, status) in [("/health", "healthy"), ("/ready", "ready"), ("/live", "alive")] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["status"], status);
        }
    }
}

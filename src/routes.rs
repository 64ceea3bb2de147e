use crate::{
    api::{attendance, inbound, leave_request, report},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let inbound_limiter = build_limiter(config.rate_inbound_per_min);
    let operations_limiter = build_limiter(config.rate_operations_per_min);

    // All routes are gateway-authenticated
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .service(
                web::resource("/inbound")
                    .wrap(inbound_limiter)
                    .route(web::post().to(inbound::receive)),
            )
            .service(
                web::scope("")
                    .wrap(operations_limiter) // rate limiting
                    .service(
                        web::scope("/attendance")
                            // /attendance/check-in
                            .service(
                                web::resource("/check-in")
                                    .route(web::post().to(attendance::check_in)),
                            )
                            // /attendance/check-out
                            .service(
                                web::resource("/check-out")
                                    .route(web::post().to(attendance::check_out)),
                            )
                            // /attendance/location
                            .service(
                                web::resource("/location")
                                    .route(web::post().to(attendance::evaluate_location)),
                            ),
                    )
                    .service(
                        web::scope("/leave")
                            // /leave
                            .service(
                                web::resource("")
                                    .route(web::post().to(leave_request::create_leave)),
                            )
                            // /leave/decision
                            .service(
                                web::resource("/decision")
                                    .route(web::post().to(leave_request::decide_leave)),
                            ),
                    )
                    .service(
                        web::scope("/report/{tenant_id}/{employee_id}")
                            // /report/{tenant_id}/{employee_id}/weekly
                            .service(
                                web::resource("/weekly")
                                    .route(web::get().to(report::weekly_summary)),
                            )
                            // /report/{tenant_id}/{employee_id}/history?days=N
                            .service(
                                web::resource("/history").route(web::get().to(report::history)),
                            ),
                    ),
            ),
    );
}

// GATEWAY REQUEST
//  └─ Authorization: Bearer <gateway token, optionally tenant-scoped>

// POST /inbound
//  └─ resolve sender (tenant, phone) → classify text/location → workflow service
//       └─ reply text + optional notification for the gateway to deliver

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_gateway_token;
    use crate::store::{MemoryStore, PresenceStore};
    use crate::testing::{employee, manager};
    use crate::utils::sender_cache::SenderCache;
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web::Data};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_employee(employee("acme", "e1", "+221770000001"));
        store.add_employee(manager("acme", "m1", "+221770000009"));
        store.add_employee(employee("globex", "g1", "+33600000001"));
        Arc::new(store)
    }

    fn token(tenant: Option<&str>) -> String {
        let secret = Config::for_tests().jwt_secret;
        let jwt = generate_gateway_token("test-gw", tenant, &secret, 60).unwrap();
        format!("Bearer {jwt}")
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    macro_rules! app {
        ($store:expr) => {{
            let config = Config::for_tests();
            let store: Data<dyn PresenceStore> =
                Data::from($store.clone() as Arc<dyn PresenceStore>);
            test::init_service(
                App::new()
                    .app_data(store)
                    .app_data(Data::new(SenderCache::new(Duration::from_secs(60))))
                    .app_data(Data::new(config.clone()))
                    .configure(|cfg| configure(cfg, config.clone())),
            )
            .await
        }};
    }

    fn post(uri: &str, auth: &str, body: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .peer_addr(peer())
            .insert_header(("Authorization", auth.to_string()))
            .set_json(body)
    }

    #[actix_web::test]
    async fn requests_without_token_are_rejected() {
        let store = seeded_store();
        let app = app!(store);
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .set_json(json!({"tenant_id": "acme", "employee_id": "e1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn inbound_check_in_resolves_sender_and_rejects_duplicates() {
        let store = seeded_store();
        let app = app!(store);
        let auth = token(None);
        let body = json!({"tenant_id": "acme", "from": "whatsapp:+221 77 000 00 01", "text": "Arrivée"});

        let first: Value =
            test::call_and_read_body_json(&app, post("/api/inbound", &auth, body.clone()).to_request())
                .await;
        assert_eq!(first["ok"], true);
        assert!(first["text"].as_str().unwrap().starts_with("Checked in at"));

        let second: Value =
            test::call_and_read_body_json(&app, post("/api/inbound", &auth, body).to_request()).await;
        assert_eq!(second["ok"], false);
        assert!(second["text"].as_str().unwrap().contains("already checked in"));
        assert_eq!(store.sessions().len(), 1);
    }

    #[actix_web::test]
    async fn inbound_from_unknown_number_is_not_found() {
        let store = seeded_store();
        let app = app!(store);
        let req = post(
            "/api/inbound",
            &token(None),
            json!({"tenant_id": "acme", "from": "+10000000000", "text": "IN"}),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn check_out_without_session_is_conflict() {
        let store = seeded_store();
        let app = app!(store);
        let req = post(
            "/api/attendance/check-out",
            &token(None),
            json!({"tenant_id": "acme", "employee_id": "e1"}),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["retry"], false);
    }

    #[actix_web::test]
    async fn tenant_scoped_token_cannot_reach_other_tenants() {
        let store = seeded_store();
        let app = app!(store);
        let req = post(
            "/api/attendance/check-in",
            &token(Some("acme")),
            json!({"tenant_id": "globex", "employee_id": "g1"}),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(store.sessions().is_empty());
    }

    #[actix_web::test]
    async fn location_endpoint_reports_verdict_without_recording() {
        let store = seeded_store();
        let app = app!(store);
        let body: Value = test::call_and_read_body_json(
            &app,
            post(
                "/api/attendance/location",
                &token(None),
                json!({"tenant_id": "acme", "employee_id": "e1", "latitude": 1.0, "longitude": 2.0}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(body["verdict"]["compliant"], true);
        assert_eq!(body["verdict"]["reason"], "mobile_profile");
        assert!(store.sessions().is_empty());
    }

    #[actix_web::test]
    async fn leave_request_and_decision_over_http() {
        let store = seeded_store();
        let app = app!(store);
        let auth = token(Some("acme"));

        let created: Value = test::call_and_read_body_json(
            &app,
            post(
                "/api/leave",
                &auth,
                json!({"tenant_id": "acme", "employee_id": "e1", "text": "05/09/2030"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(created["notification"]["to"], "+221770000009");

        let short_id = store.leave_requests()[0].id[..8].to_string();
        let decision = json!({"tenant_id": "acme", "manager_id": "m1", "text": format!("OK #{short_id}")});

        let decided: Value = test::call_and_read_body_json(
            &app,
            post("/api/leave/decision", &auth, decision.clone()).to_request(),
        )
        .await;
        assert_eq!(decided["ok"], true);
        assert_eq!(decided["notification"]["to"], "+221770000001");

        let resp =
            test::call_service(&app, post("/api/leave/decision", &auth, decision).to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn invalid_leave_date_is_bad_request() {
        let store = seeded_store();
        let app = app!(store);
        let resp = test::call_service(
            &app,
            post(
                "/api/leave",
                &token(None),
                json!({"tenant_id": "acme", "employee_id": "e1", "text": "31/02"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(store.leave_requests().is_empty());
    }

    #[actix_web::test]
    async fn weekly_and_history_reports_render_text() {
        let store = seeded_store();
        let app = app!(store);
        let auth = token(None);

        test::call_service(
            &app,
            post(
                "/api/attendance/check-in",
                &auth,
                json!({"tenant_id": "acme", "employee_id": "e1"}),
            )
            .to_request(),
        )
        .await;

        let weekly: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/report/acme/e1/weekly")
                .peer_addr(peer())
                .insert_header(("Authorization", auth.clone()))
                .to_request(),
        )
        .await;
        assert_eq!(weekly["summary"]["ongoing_session"], true);
        assert!(weekly["text"].as_str().unwrap().contains("in progress"));

        let history: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/report/acme/e1/history?days=3")
                .peer_addr(peer())
                .insert_header(("Authorization", auth))
                .to_request(),
        )
        .await;
        assert_eq!(history["history"]["days"], 3);
        assert_eq!(history["history"]["entries"].as_array().unwrap().len(), 1);
    }
}

use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    api::types::{
        EvidenceResponse, FaceVerificationRequest, RosterRequest, ScanRequest,
        ScheduleSessionRequest, ToggleRequest,
    },
    core::{attendance::ClassSession, capability::SubmittedDescriptor, services::AttendanceService},
    utils::error::AttendanceError,
};

pub fn scope() -> Scope {
    web::scope("/attendance")
        .service(
            web::resource("/sessions")
                .route(web::post().to(schedule_session))
        )
        .service(
            web::resource("/sessions/{class_id}")
                .route(web::get().to(get_session))
        )
        .service(
            web::resource("/sessions/{class_id}/scan")
                .route(web::post().to(record_scan))
        )
        .service(
            web::resource("/sessions/{class_id}/face")
                .route(web::post().to(verify_face))
        )
        .service(
            web::resource("/sessions/{class_id}/toggle")
                .route(web::post().to(toggle_check_in))
        )
        .service(
            web::resource("/sessions/{class_id}/roster")
                .route(web::post().to(class_roster))
        )
        .service(
            web::resource("/sessions/{class_id}/summary")
                .route(web::post().to(class_summary))
        )
        .service(
            web::resource("/users/{user_id}/summary")
                .route(web::get().to(attendance_summary))
        )
        .service(
            web::resource("/users/{user_id}/history")
                .route(web::get().to(attendance_history))
        )
        .service(
            web::resource("/metrics")
                .route(web::get().to(metrics))
        )
}

fn log_failure(operation: &'static str) -> impl Fn(AttendanceError) -> AttendanceError {
    move |e| {
        match &e {
            AttendanceError::CapabilityUnavailable(_) => error!("{} failed: {}", operation, e),
            _ => warn!("{} rejected: {}", operation, e),
        }
        e
    }
}

async fn schedule_session(
    service: Data<AttendanceService>,
    request: Json<ScheduleSessionRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let request = request.into_inner();
    let mut session = ClassSession::new(request.name, request.mode, request.scheduled_at, request.room)?;
    if let Some(coordinates) = request.coordinates {
        session = session.with_coordinates(coordinates);
    }

    let session = service
        .schedule_session(session)
        .await
        .map_err(log_failure("Scheduling session"))?;

    Ok(HttpResponse::Created().json(session))
}

async fn get_session(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
) -> Result<HttpResponse, AttendanceError> {
    let session = service.session(*class_id).await?;
    Ok(HttpResponse::Ok().json(session))
}

async fn record_scan(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
    request: Json<ScanRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let outcome = service
        .record_scan(request.user_id, *class_id)
        .await
        .map_err(log_failure("QR scan"))?;

    Ok(HttpResponse::Ok().json(EvidenceResponse {
        user_id: request.user_id,
        class_id: *class_id,
        evidence: outcome.evidence,
        can_check_in: outcome.can_check_in,
    }))
}

async fn verify_face(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
    request: Json<FaceVerificationRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let request = request.into_inner();
    info!("Received face verification for user {} in class {}", request.user_id, class_id);

    let capture = SubmittedDescriptor::new(request.descriptor);
    let outcome = service
        .verify_face(request.user_id, *class_id, &capture)
        .await
        .map_err(log_failure("Face verification"))?;

    Ok(HttpResponse::Ok().json(outcome))
}

async fn toggle_check_in(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
    request: Json<ToggleRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let request = request.into_inner();
    let outcome = service
        .toggle_check_in(request.user_id, *class_id, request.context)
        .await
        .map_err(log_failure("Check-in toggle"))?;

    Ok(HttpResponse::Ok().json(outcome))
}

async fn class_roster(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
    request: Json<RosterRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let roster = service
        .class_roster(*class_id, &request.students)
        .await
        .map_err(log_failure("Class roster"))?;

    Ok(HttpResponse::Ok().json(roster))
}

async fn class_summary(
    service: Data<AttendanceService>,
    class_id: Path<Uuid>,
    request: Json<RosterRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let summary = service
        .class_summary(*class_id, &request.students)
        .await
        .map_err(log_failure("Class summary"))?;

    Ok(HttpResponse::Ok().json(summary))
}

async fn attendance_summary(
    service: Data<AttendanceService>,
    user_id: Path<Uuid>,
) -> Result<HttpResponse, AttendanceError> {
    let summary = service
        .attendance_summary(*user_id)
        .await
        .map_err(log_failure("Attendance summary"))?;

    Ok(HttpResponse::Ok().json(summary))
}

async fn attendance_history(
    service: Data<AttendanceService>,
    user_id: Path<Uuid>,
) -> Result<HttpResponse, AttendanceError> {
    let history = service
        .attendance_history(*user_id)
        .await
        .map_err(log_failure("Attendance history"))?;

    Ok(HttpResponse::Ok().json(history))
}

async fn metrics(service: Data<AttendanceService>) -> HttpResponse {
    HttpResponse::Ok().json(service.metrics().snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ErrorResponse;
    use crate::core::attendance::{CheckInState, ClassMode, VerificationEvidence};
    use crate::core::capability::SystemClock;
    use crate::storage::MemoryStore;
    use crate::utils::config::PolicyConfig;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn service() -> Data<AttendanceService> {
        let config = PolicyConfig {
            descriptor_dimension: 4,
            ..PolicyConfig::default()
        };
        Data::new(AttendanceService::new(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        ))
    }

    #[actix_web::test]
    async fn test_offline_session_requires_room() {
        let app = test::init_service(App::new().app_data(service()).service(scope())).await;

        let request = test::TestRequest::post()
            .uri("/attendance/sessions")
            .set_json(json!({
                "name": "Physics Lab",
                "mode": "offline",
                "scheduled_at": Utc::now(),
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_mode_rejected() {
        let app = test::init_service(App::new().app_data(service()).service(scope())).await;

        let request = test::TestRequest::post()
            .uri("/attendance/sessions")
            .set_json(json!({
                "name": "Calculus",
                "mode": "hybrid",
                "scheduled_at": Utc::now(),
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_online_check_in_over_http() {
        let app = test::init_service(App::new().app_data(service()).service(scope())).await;
        let user_id = Uuid::new_v4();

        let request = test::TestRequest::post()
            .uri("/attendance/sessions")
            .set_json(json!({
                "name": "Calculus",
                "mode": "online",
                "scheduled_at": Utc::now(),
            }))
            .to_request();
        let session: ClassSession = test::call_and_read_body_json(&app, request).await;
        assert_eq!(session.mode, ClassMode::Online);

        let toggle_uri = format!("/attendance/sessions/{}/toggle", session.id);
        let request = test::TestRequest::post()
            .uri(&toggle_uri)
            .set_json(json!({ "user_id": user_id }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: ErrorResponse = test::read_body_json(response).await;
        assert!(body.error.contains("0 of 3 QR codes scanned"));

        let mut last: Value = Value::Null;
        for _ in 0..3 {
            let request = test::TestRequest::post()
                .uri(&format!("/attendance/sessions/{}/scan", session.id))
                .set_json(ScanRequest { user_id })
                .to_request();
            last = test::call_and_read_body_json(&app, request).await;
        }
        assert_eq!(last["evidence"]["qr_scans_completed"], 3);
        assert_eq!(last["can_check_in"], true);

        let request = test::TestRequest::post()
            .uri(&toggle_uri)
            .set_json(json!({ "user_id": user_id, "device_info": "Firefox" }))
            .to_request();
        let outcome: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(outcome["state"], "checked_in");
        assert_eq!(outcome["record"]["method"], "qr_code");
        assert_eq!(outcome["record"]["device_info"], "Firefox");

        let request = test::TestRequest::get()
            .uri(&format!("/attendance/users/{}/summary", user_id))
            .to_request();
        let summary: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(summary["present"], 1);
        assert_eq!(summary["total"], 1);
    }

    #[actix_web::test]
    async fn test_face_verification_without_enrollment() {
        let service = service();
        let session = service
            .schedule_session(
                ClassSession::new("Physics Lab", ClassMode::Offline, Utc::now(), Some("Lab 101".into())).unwrap(),
            )
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(service.clone()).service(scope())).await;

        let request = test::TestRequest::post()
            .uri(&format!("/attendance/sessions/{}/face", session.id))
            .set_json(json!({ "user_id": Uuid::new_v4(), "descriptor": [0.1, 0.2, 0.3, 0.4] }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_check_out_over_http() {
        let service = service();
        let session = service
            .schedule_session(ClassSession::new("Calculus", ClassMode::Online, Utc::now(), None).unwrap())
            .await
            .unwrap();
        let user_id = Uuid::new_v4();
        for _ in 0..3 {
            service.record_scan(user_id, session.id).await.unwrap();
        }
        service.toggle_check_in(user_id, session.id, Default::default()).await.unwrap();

        let app = test::init_service(App::new().app_data(service.clone()).service(scope())).await;
        let request = test::TestRequest::post()
            .uri(&format!("/attendance/sessions/{}/toggle", session.id))
            .set_json(json!({ "user_id": user_id }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["state"], "checked_out");
        assert_eq!(body["record"], Value::Null);
        assert_eq!(service.evidence(user_id, session.id).await, VerificationEvidence::default());
        assert_eq!(service.state(user_id, session.id).await, CheckInState::CheckedOut);
    }

    #[actix_web::test]
    async fn test_unknown_session_is_not_found() {
        let app = test::init_service(App::new().app_data(service()).service(scope())).await;
        let request = test::TestRequest::get()
            .uri(&format!("/attendance/sessions/{}", Uuid::new_v4()))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_scan_unknown_session_is_not_found() {
        let app = test::init_service(App::new().app_data(service()).service(scope())).await;
        let request = test::TestRequest::post()
            .uri(&format!("/attendance/sessions/{}/scan", Uuid::new_v4()))
            .set_json(ScanRequest { user_id: Uuid::new_v4() })
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_class_summary_over_http() {
        let service = service();
        let session = service
            .schedule_session(ClassSession::new("Calculus", ClassMode::Online, Utc::now(), None).unwrap())
            .await
            .unwrap();
        let attended = Uuid::new_v4();
        for _ in 0..3 {
            service.record_scan(attended, session.id).await.unwrap();
        }
        service.toggle_check_in(attended, session.id, Default::default()).await.unwrap();

        let app = test::init_service(App::new().app_data(service.clone()).service(scope())).await;
        let request = test::TestRequest::post()
            .uri(&format!("/attendance/sessions/{}/summary", session.id))
            .set_json(json!({ "students": [attended, Uuid::new_v4()] }))
            .to_request();
        let summary: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(summary["present"], 1);
        assert_eq!(summary["total"], 2);
        assert_eq!(summary["rate"], 50.0);
    }
}

use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api::types::{EnrollRequest, EnrollmentResponse},
    core::{capability::SubmittedDescriptor, services::AttendanceService},
    utils::error::AttendanceError,
};

pub fn scope() -> Scope {
    web::scope("/biometrics")
        .service(
            web::resource("/{user_id}")
                .route(web::post().to(enroll))
        )
}

async fn enroll(
    service: Data<AttendanceService>,
    user_id: Path<Uuid>,
    request: Json<EnrollRequest>,
) -> Result<HttpResponse, AttendanceError> {
    info!("Received enrollment request for user: {}", user_id);

    let capture = SubmittedDescriptor::new(request.into_inner().descriptor);
    let enrollment = service
        .enroll(*user_id, &capture)
        .await
        .map_err(|e| {
            warn!("Enrollment failed for user {}: {}", user_id, e);
            e
        })?;

    Ok(HttpResponse::Created().json(EnrollmentResponse::from(&enrollment)))
}

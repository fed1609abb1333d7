use actix_web::{
    get, post,
    web::{Data, Path, ServiceConfig, scope},
    HttpRequest, HttpResponse,
};
use actix_web_validator::Json;

use crate::api::job::dto::ProfilesResponse;
use crate::api::job::models::CreateJobRequest;
use crate::api::job::service::{JobService, ServiceError};
use crate::formatting::{profiles, DEFAULT_PROFILE};

/// Identity of the caller, set by the authentication layer in front of
/// this service.
pub const OWNER_HEADER: &str = "X-Authenticated-User";

fn owner_of(req: &HttpRequest) -> String {
    req.headers()
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

#[post("")]
async fn create_job(
    req: HttpRequest,
    service: Data<JobService>,
    request: Json<CreateJobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let owner = owner_of(&req);
    let response = service.create_job(request.into_inner(), &owner).await?;
    if response.created {
        Ok(HttpResponse::Accepted().json(response))
    } else {
        Ok(HttpResponse::Ok().json(response))
    }
}

#[get("/{job_id}")]
async fn get_job(
    service: Data<JobService>,
    job_id: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let job = service.get_job(&job_id).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[get("/profiles")]
async fn list_profiles() -> HttpResponse {
    HttpResponse::Ok().json(ProfilesResponse {
        default: DEFAULT_PROFILE,
        profiles: profiles::all().to_vec(),
    })
}

pub fn job_config(config: &mut ServiceConfig) {
    config
        .service(list_profiles)
        .service(scope("/jobs").service(create_job).service(get_job));
}

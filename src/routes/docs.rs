use axum::Json;
use utoipa::OpenApi;

use crate::dto::application_dto::{
    ApplicationListResponse, Pagination, SubmitApplicationPayload, SubmitApplicationResponse,
    UpdateApplicationPayload,
};
use crate::models::application::{Application, ApplicationStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::applications::list_applications,
        crate::routes::applications::submit_application,
        crate::routes::applications::get_application,
        crate::routes::applications::update_application,
        crate::routes::applications::delete_application,
        crate::routes::stats::get_stats,
    ),
    components(schemas(
        Application,
        ApplicationStatus,
        ApplicationListResponse,
        Pagination,
        SubmitApplicationPayload,
        SubmitApplicationResponse,
        UpdateApplicationPayload,
    )),
    tags((name = "applications", description = "Scholarship application intake and reporting"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplicationListQuery, ApplicationListResponse, NewApplication, Pagination,
        SubmitApplicationPayload, SubmitApplicationResponse, UpdateApplicationPayload,
        SUBMITTED_MESSAGE,
    },
    error::{Error, Result},
    models::application::Application,
    AppState,
};

#[utoipa::path(
    get,
    path = "/applications",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "Page of applications, best candidates first", body = ApplicationListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Json<ApplicationListResponse> {
    let page = query.page();
    let limit = query.limit();
    let filter = query.to_filter();

    match state.application_service.list(&filter).await {
        Ok(result) => Json(ApplicationListResponse {
            applications: result.items,
            pagination: Pagination::new(page, limit, result.total),
        }),
        Err(e) => {
            tracing::error!(error = ?e, filter = ?filter, "Failed to list applications");
            Json(ApplicationListResponse::empty())
        }
    }
}

#[utoipa::path(
    post,
    path = "/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 200, description = "Application submitted", body = SubmitApplicationResponse),
        (status = 400, description = "Grade below 16, missing field or duplicate email / national ID"),
        (status = 500, description = "Storage failure")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitApplicationPayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let application = NewApplication::try_from(payload)?;
    application.validate().map_err(|e| {
        tracing::warn!(media_final = application.media_final, "Submission below minimum grade");
        e
    })?;

    let id = state
        .application_service
        .insert(&application)
        .await
        .map_err(|e| match e {
            Error::DuplicateKey(field) => {
                tracing::warn!(field = field.label(), email = %application.email, "Duplicate submission");
                Error::DuplicateKey(field)
            }
            other => {
                tracing::error!(error = ?other, email = %application.email, "Failed to store application");
                Error::Internal("Erro ao submeter candidatura".to_string())
            }
        })?;

    Ok(Json(SubmitApplicationResponse {
        message: SUBMITTED_MESSAGE.to_string(),
        application_id: id,
    }))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application found", body = Application),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>> {
    let application = state.application_service.fetch(id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    patch,
    path = "/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateApplicationPayload,
    responses(
        (status = 200, description = "Application updated", body = Application),
        (status = 400, description = "Empty payload or duplicate email / national ID"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: std::result::Result<Json<UpdateApplicationPayload>, JsonRejection>,
) -> Result<Json<Application>> {
    let Json(payload) = payload?;
    payload.validate()?;
    if payload.is_empty() {
        return Err(Error::BadRequest("Nenhum campo para atualizar".to_string()));
    }
    let application = state
        .application_service
        .update(id, &payload)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, application_id = %id, "Failed to update application");
            e
        })?;
    Ok(Json(application))
}

#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 204, description = "Application deleted"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.delete(id).await.map_err(|e| {
        tracing::error!(error = ?e, application_id = %id, "Failed to delete application");
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

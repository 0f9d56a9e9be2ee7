use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Unique field that rejected an insert or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Email,
    NationalId,
}

impl DuplicateField {
    /// Both unique constraints are named after their column; anything that is
    /// not the email constraint is the national ID one.
    pub fn from_constraint(constraint: Option<&str>) -> Self {
        match constraint {
            Some(name) if name.contains("email") => DuplicateField::Email,
            _ => DuplicateField::NationalId,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DuplicateField::Email => "email",
            DuplicateField::NationalId => "bilhete de identidade",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Duplicate {}", .0.label())]
    DuplicateKey(DuplicateField),

    #[error("Unsupported report type: {0}")]
    UnsupportedReport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)
            | Error::Validation(_)
            | Error::DuplicateKey(_)
            | Error::UnsupportedReport(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = match self {
            Error::BadRequest(msg) => msg,
            Error::Validation(err) => first_validation_message(&err),
            Error::DuplicateKey(field) => {
                format!("Este {} já está registado no sistema", field.label())
            }
            Error::UnsupportedReport(_) => "Tipo de estatística não suportado".to_string(),
            Error::NotFound(msg) => msg,
            Error::Internal(msg) => msg,
            _ => "Erro interno do servidor".to_string(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Candidatura não encontrada".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::DuplicateKey(DuplicateField::from_constraint(db.constraint()))
            }
            other => Error::Database(other),
        }
    }
}

pub const INVALID_BODY_MESSAGE: &str = "Corpo do pedido inválido";

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(reason = %rejection.body_text(), "Rejected request body");
        Error::BadRequest(INVALID_BODY_MESSAGE.to_string())
    }
}

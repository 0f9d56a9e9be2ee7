use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::query_builder::ApplicationFilter;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub const MIN_GRADE_MESSAGE: &str = "Média final deve ser pelo menos 16 valores";
pub const SUBMITTED_MESSAGE: &str = "Candidatura submetida com sucesso";

/// Query string of the admin list. Everything arrives as text so malformed
/// numbers fall back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct ApplicationListQuery {
    /// Substring of name, email or national ID
    pub search: Option<String>,
    /// `pendente`, `aprovado`, `rejeitado` or `todos`
    pub status: Option<String>,
    /// Category, or `all`
    pub categoria: Option<String>,
    pub media_min: Option<String>,
    pub media_max: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ApplicationListQuery {
    pub fn page(&self) -> i64 {
        parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        parse_positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn to_filter(&self) -> ApplicationFilter {
        ApplicationFilter {
            search: self.search.clone(),
            status: self.status.clone(),
            categoria: self.categoria.clone(),
            media_min: parse_grade(self.media_min.as_deref()),
            media_max: parse_grade(self.media_max.as_deref()),
            ..Default::default()
        }
        .paged(self.page(), self.limit())
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v.max(1))
}

fn parse_grade(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListResponse {
    pub applications: Vec<Application>,
    pub pagination: Pagination,
}

impl ApplicationListResponse {
    /// Well-formed first page with no rows.
    pub fn empty() -> Self {
        Self {
            applications: Vec::new(),
            pagination: Pagination::new(DEFAULT_PAGE, DEFAULT_LIMIT, 0),
        }
    }
}

/// Grade as sent by the form: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    fn is_blank(&self) -> bool {
        matches!(self, NumericInput::Text(s) if s.trim().is_empty())
    }

    fn parse(&self) -> Option<f64> {
        let value = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Submission body. The public form posts camelCase keys, older clients post
/// snake_case; both are read and the camelCase value wins when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SubmitApplicationPayload {
    #[serde(rename = "nomeCompleto")]
    pub nome_completo_camel: Option<String>,
    pub nome_completo: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    #[serde(rename = "bilheteIdentidade")]
    pub bilhete_identidade_camel: Option<String>,
    pub bilhete_identidade: Option<String>,
    #[serde(rename = "dataNascimento")]
    pub data_nascimento_camel: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    #[serde(rename = "situacaoAcademica")]
    pub situacao_academica_camel: Option<String>,
    pub situacao_academica: Option<String>,
    #[serde(rename = "nomeEscola")]
    pub nome_escola_camel: Option<String>,
    pub nome_escola: Option<String>,
    #[serde(rename = "mediaFinal")]
    #[schema(value_type = Option<f64>)]
    pub media_final_camel: Option<NumericInput>,
    #[schema(value_type = Option<f64>)]
    pub media_final: Option<NumericInput>,
    pub universidade: Option<String>,
    pub curso: Option<String>,
    pub categoria: Option<String>,
    #[serde(rename = "cartaMotivacao")]
    pub carta_motivacao_camel: Option<String>,
    pub carta_motivacao: Option<String>,
    #[serde(rename = "nomeEncarregado")]
    pub nome_encarregado_camel: Option<String>,
    pub nome_encarregado: Option<String>,
    #[serde(rename = "telefoneEncarregado")]
    pub telefone_encarregado_camel: Option<String>,
    pub telefone_encarregado: Option<String>,
}

/// A validated submission ready for insertion.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewApplication {
    pub nome_completo: String,
    pub email: String,
    pub telefone: String,
    pub bilhete_identidade: String,
    pub data_nascimento: NaiveDate,
    pub endereco: Option<String>,
    pub situacao_academica: String,
    pub nome_escola: String,
    #[validate(range(min = 16.0, message = "Média final deve ser pelo menos 16 valores"))]
    pub media_final: f64,
    pub universidade: Option<String>,
    pub curso: Option<String>,
    pub categoria: String,
    pub carta_motivacao: String,
    pub nome_encarregado: Option<String>,
    pub telefone_encarregado: Option<String>,
}

impl TryFrom<SubmitApplicationPayload> for NewApplication {
    type Error = Error;

    fn try_from(p: SubmitApplicationPayload) -> Result<Self> {
        let media_final = p
            .media_final_camel
            .filter(|v| !v.is_blank())
            .or(p.media_final)
            .filter(|v| !v.is_blank())
            .ok_or_else(|| missing("media_final"))?
            .parse()
            .ok_or_else(|| Error::BadRequest("Média final inválida".to_string()))?;

        let data_nascimento = required(
            pick(p.data_nascimento_camel, p.data_nascimento),
            "data_nascimento",
        )?;

        Ok(Self {
            nome_completo: required(pick(p.nome_completo_camel, p.nome_completo), "nome_completo")?,
            email: required(p.email, "email")?,
            telefone: required(p.telefone, "telefone")?,
            bilhete_identidade: required(
                pick(p.bilhete_identidade_camel, p.bilhete_identidade),
                "bilhete_identidade",
            )?,
            data_nascimento: parse_birth_date(&data_nascimento)?,
            endereco: optional(p.endereco),
            situacao_academica: required(
                pick(p.situacao_academica_camel, p.situacao_academica),
                "situacao_academica",
            )?,
            nome_escola: required(pick(p.nome_escola_camel, p.nome_escola), "nome_escola")?,
            media_final,
            universidade: optional(p.universidade),
            curso: optional(p.curso),
            categoria: required(p.categoria, "categoria")?,
            carta_motivacao: required(
                pick(p.carta_motivacao_camel, p.carta_motivacao),
                "carta_motivacao",
            )?,
            nome_encarregado: optional(pick(p.nome_encarregado_camel, p.nome_encarregado)),
            telefone_encarregado: optional(pick(
                p.telefone_encarregado_camel,
                p.telefone_encarregado,
            )),
        })
    }
}

fn pick(camel: Option<String>, snake: Option<String>) -> Option<String> {
    optional(camel).or_else(|| optional(snake))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    optional(value).ok_or_else(|| missing(field))
}

fn missing(field: &str) -> Error {
    Error::BadRequest(format!("Campo obrigatório em falta: {}", field))
}

/// Accepts `YYYY-MM-DD`, or a full timestamp of which only the date is kept.
fn parse_birth_date(raw: &str) -> Result<NaiveDate> {
    let date = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| Error::BadRequest("Data de nascimento inválida".to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitApplicationResponse {
    pub message: String,
    #[serde(rename = "applicationId")]
    pub application_id: Uuid,
}

/// Partial update used by administrators for status changes and corrections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateApplicationPayload {
    #[validate(length(min = 1))]
    pub nome_completo: Option<String>,
    #[validate(length(min = 1))]
    pub email: Option<String>,
    pub telefone: Option<String>,
    #[validate(length(min = 1))]
    pub bilhete_identidade: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub endereco: Option<String>,
    pub situacao_academica: Option<String>,
    pub nome_escola: Option<String>,
    pub media_final: Option<f64>,
    pub universidade: Option<String>,
    pub curso: Option<String>,
    pub categoria: Option<String>,
    pub carta_motivacao: Option<String>,
    pub nome_encarregado: Option<String>,
    pub telefone_encarregado: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl UpdateApplicationPayload {
    pub fn is_empty(&self) -> bool {
        self.nome_completo.is_none()
            && self.email.is_none()
            && self.telefone.is_none()
            && self.bilhete_identidade.is_none()
            && self.data_nascimento.is_none()
            && self.endereco.is_none()
            && self.situacao_academica.is_none()
            && self.nome_escola.is_none()
            && self.media_final.is_none()
            && self.universidade.is_none()
            && self.curso.is_none()
            && self.categoria.is_none()
            && self.carta_motivacao.is_none()
            && self.nome_encarregado.is_none()
            && self.telefone_encarregado.is_none()
            && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_body() -> serde_json::Value {
        json!({
            "nomeCompleto": "Ana Maria",
            "email": "ana@example.com",
            "telefone": "923000000",
            "bilheteIdentidade": "004512345LA042",
            "dataNascimento": "2006-04-12",
            "situacaoAcademica": "concluido",
            "nomeEscola": "Liceu Central",
            "mediaFinal": "17.5",
            "categoria": "ensino_superior",
            "cartaMotivacao": "Quero estudar engenharia."
        })
    }

    fn parse(body: serde_json::Value) -> Result<NewApplication> {
        let payload: SubmitApplicationPayload = serde_json::from_value(body).unwrap();
        NewApplication::try_from(payload)
    }

    #[test]
    fn camel_case_body_is_accepted() {
        let app = parse(full_body()).unwrap();
        assert_eq!(app.nome_completo, "Ana Maria");
        assert_eq!(app.media_final, 17.5);
        assert_eq!(app.data_nascimento, NaiveDate::from_ymd_opt(2006, 4, 12).unwrap());
        assert_eq!(app.endereco, None);
    }

    #[test]
    fn camel_case_wins_over_snake_case() {
        let mut body = full_body();
        body["nome_completo"] = json!("Outro Nome");
        body["media_final"] = json!(16.5);
        let app = parse(body).unwrap();
        assert_eq!(app.nome_completo, "Ana Maria");
        assert_eq!(app.media_final, 17.5);
    }

    #[test]
    fn snake_case_fills_blank_camel_case() {
        let mut body = full_body();
        body["nomeCompleto"] = json!("");
        body["nome_completo"] = json!("Ana Snake");
        body["mediaFinal"] = json!("");
        body["media_final"] = json!(19);
        let app = parse(body).unwrap();
        assert_eq!(app.nome_completo, "Ana Snake");
        assert_eq!(app.media_final, 19.0);
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut body = full_body();
        body.as_object_mut().unwrap().remove("email");
        match parse(body) {
            Err(Error::BadRequest(msg)) => assert!(msg.ends_with("email")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn grade_below_minimum_fails_validation() {
        let mut body = full_body();
        body["mediaFinal"] = json!(15.99);
        let app = parse(body).unwrap();
        assert!(app.validate().is_err());

        let mut body = full_body();
        body["mediaFinal"] = json!(16);
        let app = parse(body).unwrap();
        assert!(app.validate().is_ok());
    }

    #[test]
    fn non_numeric_grade_is_rejected() {
        let mut body = full_body();
        body["mediaFinal"] = json!("dezassete");
        assert!(matches!(parse(body), Err(Error::BadRequest(_))));
    }

    #[test]
    fn timestamp_birth_date_keeps_the_day() {
        let mut body = full_body();
        body["dataNascimento"] = json!("2006-04-12T00:00:00.000Z");
        let app = parse(body).unwrap();
        assert_eq!(app.data_nascimento, NaiveDate::from_ymd_opt(2006, 4, 12).unwrap());
    }

    #[test]
    fn list_query_defaults_and_clamps() {
        let query = ApplicationListQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 10);

        let query = ApplicationListQuery {
            page: Some("0".into()),
            limit: Some("5000".into()),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_LIMIT);

        let query = ApplicationListQuery {
            page: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn list_query_builds_paged_filter() {
        let query = ApplicationListQuery {
            media_min: Some("17".into()),
            media_max: Some("".into()),
            page: Some("3".into()),
            limit: Some("20".into()),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.media_min, Some(17.0));
        assert_eq!(filter.media_max, None);
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, Some(40));
    }

    #[test]
    fn max_page_does_not_overflow_offset() {
        let query = ApplicationListQuery {
            page: Some(i64::MAX.to_string()),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.limit, Some(DEFAULT_LIMIT));
        assert_eq!(filter.offset, Some(i64::MAX));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(2, 10, 25).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 20).total_pages, 2);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
    }

    #[test]
    fn pagination_serializes_total_pages_in_camel_case() {
        let value = serde_json::to_value(Pagination::new(1, 10, 11)).unwrap();
        assert_eq!(value["totalPages"], 2);
    }

    #[test]
    fn update_payload_reports_emptiness() {
        assert!(UpdateApplicationPayload::default().is_empty());
        let payload: UpdateApplicationPayload =
            serde_json::from_value(json!({ "status": "aprovado" })).unwrap();
        assert_eq!(payload.status, Some(ApplicationStatus::Approved));
        assert!(!payload.is_empty());
    }
}

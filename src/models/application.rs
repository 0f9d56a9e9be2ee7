use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Application {
    pub id: Uuid,
    pub nome_completo: String,
    pub email: String,
    pub telefone: String,
    pub bilhete_identidade: String,
    pub data_nascimento: NaiveDate,
    pub endereco: Option<String>,
    pub situacao_academica: String,
    pub nome_escola: String,
    pub media_final: f64,
    pub universidade: Option<String>,
    pub curso: Option<String>,
    pub categoria: String,
    pub carta_motivacao: String,
    pub nome_encarregado: Option<String>,
    pub telefone_encarregado: Option<String>,
    pub status: String,
    pub relevancia_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ApplicationStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "aprovado")]
    Approved,
    #[serde(rename = "rejeitado")]
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pendente",
            ApplicationStatus::Approved => "aprovado",
            ApplicationStatus::Rejected => "rejeitado",
        }
    }
}

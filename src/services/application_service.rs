use crate::dto::application_dto::{NewApplication, UpdateApplicationPayload};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::query_builder::{self, ApplicationFilter, APPLICATION_COLUMNS};
use crate::services::scoring::relevance_score;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
}

pub struct ApplicationPage {
    pub items: Vec<Application>,
    pub total: i64,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a submission as pending and returns its id. Unique collisions on
    /// email or national ID surface as `Error::DuplicateKey`.
    pub async fn insert(&self, app: &NewApplication) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO applications (
                nome_completo, email, telefone, bilhete_identidade, data_nascimento,
                endereco, situacao_academica, nome_escola, media_final, universidade,
                curso, categoria, carta_motivacao, nome_encarregado, telefone_encarregado,
                status, relevancia_score, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15,
                $16, $17, NOW(), NOW()
            )
            RETURNING id
            "#,
        )
        .bind(&app.nome_completo)
        .bind(&app.email)
        .bind(&app.telefone)
        .bind(&app.bilhete_identidade)
        .bind(app.data_nascimento)
        .bind(&app.endereco)
        .bind(&app.situacao_academica)
        .bind(&app.nome_escola)
        .bind(app.media_final)
        .bind(&app.universidade)
        .bind(&app.curso)
        .bind(&app.categoria)
        .bind(&app.carta_motivacao)
        .bind(&app.nome_encarregado)
        .bind(&app.telefone_encarregado)
        .bind(ApplicationStatus::Pending.as_str())
        .bind(relevance_score(app.media_final))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(application_id = %id, "Application stored");
        Ok(id)
    }

    pub async fn select(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let items = query_builder::select_query(filter)
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count(&self, filter: &ApplicationFilter) -> Result<i64> {
        let total = query_builder::count_query(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Page of rows plus the total matching the same predicate.
    pub async fn list(&self, filter: &ApplicationFilter) -> Result<ApplicationPage> {
        let (items, total) = tokio::try_join!(self.select(filter), self.count(filter))?;
        Ok(ApplicationPage { items, total })
    }

    pub async fn fetch(&self, id: Uuid) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }

    /// Applies the fields present in `payload`. The relevance score follows the
    /// grade whenever the grade changes.
    pub async fn update(&self, id: Uuid, payload: &UpdateApplicationPayload) -> Result<Application> {
        let mut qb = update_query(id, payload);
        let application = qb
            .build_query_as::<Application>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidatura não encontrada".to_string()))?;

        tracing::info!(application_id = %id, status = %application.status, "Application updated");
        Ok(application)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Candidatura não encontrada".to_string()));
        }
        tracing::info!(application_id = %id, "Application deleted");
        Ok(())
    }

    /// Runs a prepared report query and decodes its rows.
    pub async fn aggregate<T>(&self, mut query: QueryBuilder<'_, Postgres>) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let rows = query.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

fn update_query(id: Uuid, payload: &UpdateApplicationPayload) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE applications SET ");
    let mut set = qb.separated(", ");

    macro_rules! assign {
        ($field:ident) => {
            if let Some(value) = payload.$field.clone() {
                set.push(concat!(stringify!($field), " = "));
                set.push_bind_unseparated(value);
            }
        };
    }

    assign!(nome_completo);
    assign!(email);
    assign!(telefone);
    assign!(bilhete_identidade);
    assign!(data_nascimento);
    assign!(endereco);
    assign!(situacao_academica);
    assign!(nome_escola);
    assign!(universidade);
    assign!(curso);
    assign!(categoria);
    assign!(carta_motivacao);
    assign!(nome_encarregado);
    assign!(telefone_encarregado);

    if let Some(media_final) = payload.media_final {
        set.push("media_final = ");
        set.push_bind_unseparated(media_final);
        set.push("relevancia_score = ");
        set.push_bind_unseparated(relevance_score(media_final));
    }
    if let Some(status) = payload.status {
        set.push("status = ");
        set.push_bind_unseparated(status.as_str());
    }
    set.push("updated_at = NOW()");

    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" RETURNING ")
        .push(APPLICATION_COLUMNS);
    qb
}

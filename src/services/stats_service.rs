//! Fixed reports over the applications table. Each report is one named query
//! builder plus a typed row, so the SQL can be checked without a database.

use crate::error::{Error, Result};
use crate::models::application::Application;
use crate::services::application_service::ApplicationService;
use crate::services::query_builder::ApplicationFilter;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;

/// Lower bounds of the final-grade buckets; the last value closes the range.
pub const GRADE_BOUNDARIES: &[i32] = &[16, 17, 18, 19, 20, 21];
/// Lower bounds of the relevance-score buckets; the last value closes the range.
pub const RELEVANCE_BOUNDARIES: &[i32] = &[0, 25, 50, 75, 100, 101];
/// Label for rows outside every bucket.
pub const OTHER_BUCKET: &str = "Outros";

/// Sub-bands used by the category cross-tab: (exclusive upper grade, label).
const GRADE_BANDS: &[(i32, &str)] = &[
    (17, "16.0-16.9"),
    (18, "17.0-17.9"),
    (19, "18.0-18.9"),
    (20, "19.0-19.9"),
];
const TOP_BAND: &str = "20.0+";

pub const TIMELINE_WINDOW_DAYS: i32 = 30;
pub const TOP_CANDIDATES_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Overview,
    ByCategory,
    ByGrade,
    Relevance,
    CategoryGrade,
    Timeline,
    TopCandidates,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Overview => "geral",
            ReportKind::ByCategory => "por_categoria",
            ReportKind::ByGrade => "por_media",
            ReportKind::Relevance => "relevancia",
            ReportKind::CategoryGrade => "categoria_media",
            ReportKind::Timeline => "timeline",
            ReportKind::TopCandidates => "top_candidatos",
        }
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geral" => Ok(ReportKind::Overview),
            "por_categoria" => Ok(ReportKind::ByCategory),
            "por_media" => Ok(ReportKind::ByGrade),
            "relevancia" => Ok(ReportKind::Relevance),
            "categoria_media" => Ok(ReportKind::CategoryGrade),
            "timeline" => Ok(ReportKind::Timeline),
            "top_candidatos" => Ok(ReportKind::TopCandidates),
            other => Err(Error::UnsupportedReport(other.to_string())),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct OverviewRow {
    pub total: i64,
    pub media_geral: Option<f64>,
    pub media_maxima: Option<f64>,
    pub media_minima: Option<f64>,
    pub pendentes: i64,
    pub aprovados: i64,
    pub rejeitados: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryRow {
    pub categoria: String,
    pub count: i64,
    pub media_categoria: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BucketLabel {
    Lower(i32),
    Other(&'static str),
}

impl BucketLabel {
    /// Maps the index produced by `bucket_case` back to its lower bound.
    pub fn for_index(boundaries: &[i32], index: i32) -> Self {
        match usize::try_from(index) {
            Ok(i) if i + 1 < boundaries.len() => BucketLabel::Lower(boundaries[i]),
            _ => BucketLabel::Other(OTHER_BUCKET),
        }
    }
}

#[derive(Debug, FromRow)]
struct BucketRow {
    bucket: i32,
    count: i64,
    first_avg: Option<f64>,
    second_avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeBucket {
    pub faixa: BucketLabel,
    pub count: i64,
    pub media_range: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevanceBucket {
    pub faixa: BucketLabel,
    pub count: i64,
    pub media_score: Option<f64>,
    pub media_final_avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryGradeRow {
    pub categoria: String,
    pub faixa_media: String,
    pub count: i64,
    pub media_avg: Option<f64>,
    pub relevancia_avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimelineRow {
    pub dia: String,
    pub count: i64,
    pub media_avg: Option<f64>,
    pub relevancia_avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatsReport {
    Overview {
        geral: OverviewRow,
        por_categoria: Vec<CategoryRow>,
        por_media: Vec<GradeBucket>,
    },
    ByCategory {
        por_categoria: Vec<CategoryRow>,
    },
    ByGrade {
        por_media: Vec<GradeBucket>,
    },
    Relevance {
        relevancia: Vec<RelevanceBucket>,
    },
    CategoryGrade {
        categoria_media: Vec<CategoryGradeRow>,
    },
    Timeline {
        timeline: Vec<TimelineRow>,
    },
    TopCandidates {
        top_candidatos: Vec<Application>,
    },
}

#[derive(Clone)]
pub struct StatsService {
    applications: ApplicationService,
    report_timezone: String,
}

impl StatsService {
    pub fn new(applications: ApplicationService, report_timezone: String) -> Self {
        Self {
            applications,
            report_timezone,
        }
    }

    pub async fn report(&self, kind: ReportKind) -> Result<StatsReport> {
        let report = match kind {
            ReportKind::Overview => {
                let (geral, por_categoria, por_media) = tokio::try_join!(
                    self.overview(),
                    self.by_category(),
                    self.by_grade()
                )?;
                StatsReport::Overview {
                    geral,
                    por_categoria,
                    por_media,
                }
            }
            ReportKind::ByCategory => StatsReport::ByCategory {
                por_categoria: self.by_category().await?,
            },
            ReportKind::ByGrade => StatsReport::ByGrade {
                por_media: self.by_grade().await?,
            },
            ReportKind::Relevance => StatsReport::Relevance {
                relevancia: self.by_relevance().await?,
            },
            ReportKind::CategoryGrade => StatsReport::CategoryGrade {
                categoria_media: self
                    .applications
                    .aggregate(category_grade_query())
                    .await?,
            },
            ReportKind::Timeline => StatsReport::Timeline {
                timeline: self
                    .applications
                    .aggregate(timeline_query(&self.report_timezone))
                    .await?,
            },
            ReportKind::TopCandidates => StatsReport::TopCandidates {
                top_candidatos: self
                    .applications
                    .select(&ApplicationFilter::default().paged(1, TOP_CANDIDATES_LIMIT))
                    .await?,
            },
        };
        Ok(report)
    }

    async fn overview(&self) -> Result<OverviewRow> {
        let rows: Vec<OverviewRow> = self.applications.aggregate(overview_query()).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn by_category(&self) -> Result<Vec<CategoryRow>> {
        self.applications.aggregate(category_query()).await
    }

    async fn by_grade(&self) -> Result<Vec<GradeBucket>> {
        let rows: Vec<BucketRow> = self
            .applications
            .aggregate(bucket_query(
                "media_final",
                GRADE_BOUNDARIES,
                "AVG(media_final)::float8",
                "NULL::float8",
            ))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| GradeBucket {
                faixa: BucketLabel::for_index(GRADE_BOUNDARIES, row.bucket),
                count: row.count,
                media_range: row.first_avg,
            })
            .collect())
    }

    async fn by_relevance(&self) -> Result<Vec<RelevanceBucket>> {
        let rows: Vec<BucketRow> = self
            .applications
            .aggregate(bucket_query(
                "relevancia_score",
                RELEVANCE_BOUNDARIES,
                "AVG(relevancia_score)::float8",
                "AVG(media_final)::float8",
            ))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RelevanceBucket {
                faixa: BucketLabel::for_index(RELEVANCE_BOUNDARIES, row.bucket),
                count: row.count,
                media_score: row.first_avg,
                media_final_avg: row.second_avg,
            })
            .collect())
    }
}

/// Postgres SQLSTATE for an unknown time zone name.
const INVALID_PARAMETER_VALUE: &str = "22023";

/// Asks Postgres to resolve the reporting time zone. An unknown zone is a
/// configuration error; connection failures pass through unchanged.
pub async fn check_report_timezone(pool: &PgPool, timezone: &str) -> Result<()> {
    sqlx::query_scalar::<_, bool>("SELECT (NOW() AT TIME ZONE $1) IS NOT NULL")
        .bind(timezone)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(INVALID_PARAMETER_VALUE) => {
                Error::Config(format!("REPORT_TIMEZONE not recognized: {}", timezone))
            }
            other => Error::from(other),
        })?;
    Ok(())
}

pub fn overview_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(
        "SELECT COUNT(*) AS total, \
         AVG(media_final)::float8 AS media_geral, \
         MAX(media_final) AS media_maxima, \
         MIN(media_final) AS media_minima, \
         COUNT(*) FILTER (WHERE status = 'pendente') AS pendentes, \
         COUNT(*) FILTER (WHERE status = 'aprovado') AS aprovados, \
         COUNT(*) FILTER (WHERE status = 'rejeitado') AS rejeitados \
         FROM applications",
    )
}

pub fn category_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(
        "SELECT categoria, COUNT(*) AS count, AVG(media_final)::float8 AS media_categoria \
         FROM applications GROUP BY categoria ORDER BY count DESC, categoria",
    )
}

/// `CASE` expression yielding the index of the half-open bucket `column`
/// falls in, or -1 when it falls in none.
pub fn bucket_case(column: &str, boundaries: &[i32]) -> String {
    let mut sql = String::from("CASE");
    for (index, bounds) in boundaries.windows(2).enumerate() {
        sql.push_str(&format!(
            " WHEN {column} >= {} AND {column} < {} THEN {index}",
            bounds[0], bounds[1]
        ));
    }
    sql.push_str(" ELSE -1 END");
    sql
}

/// Rows per bucket, ordered by bound with the catch-all bucket last.
fn bucket_query(
    column: &str,
    boundaries: &[i32],
    first_avg: &str,
    second_avg: &str,
) -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT bucket, COUNT(*) AS count, {first_avg} AS first_avg, {second_avg} AS second_avg \
         FROM (SELECT {} AS bucket, media_final, relevancia_score FROM applications) bucketed \
         GROUP BY bucket ORDER BY bucket < 0, bucket",
        bucket_case(column, boundaries)
    ))
}

pub fn band_case() -> String {
    let mut sql = String::from("CASE");
    for (upper, label) in GRADE_BANDS {
        sql.push_str(&format!(" WHEN media_final < {upper} THEN '{label}'"));
    }
    sql.push_str(&format!(" ELSE '{TOP_BAND}' END"));
    sql
}

pub fn category_grade_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT categoria, faixa_media, COUNT(*) AS count, \
         AVG(media_final)::float8 AS media_avg, AVG(relevancia_score)::float8 AS relevancia_avg \
         FROM (SELECT categoria, media_final, relevancia_score, {} AS faixa_media FROM applications) banded \
         GROUP BY categoria, faixa_media ORDER BY categoria, faixa_media",
        band_case()
    ))
}

/// Per-day totals over the trailing window; days are cut in `timezone`.
pub fn timeline_query(timezone: &str) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT to_char(created_at AT TIME ZONE ");
    qb.push_bind(timezone.to_string())
        .push(
            ", 'YYYY-MM-DD') AS dia, COUNT(*) AS count, \
             AVG(media_final)::float8 AS media_avg, AVG(relevancia_score)::float8 AS relevancia_avg \
             FROM applications WHERE created_at >= NOW() - make_interval(days => ",
        )
        .push_bind(TIMELINE_WINDOW_DAYS)
        .push(") GROUP BY dia ORDER BY dia");
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_report_name() {
        for name in [
            "geral",
            "por_categoria",
            "por_media",
            "relevancia",
            "categoria_media",
            "timeline",
            "top_candidatos",
        ] {
            let kind: ReportKind = name.parse().unwrap();
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn unknown_report_is_unsupported() {
        match "bogus".parse::<ReportKind>() {
            Err(Error::UnsupportedReport(name)) => assert_eq!(name, "bogus"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bucket_case_uses_half_open_ranges() {
        assert_eq!(
            bucket_case("media_final", &[16, 17, 18]),
            "CASE WHEN media_final >= 16 AND media_final < 17 THEN 0 \
             WHEN media_final >= 17 AND media_final < 18 THEN 1 ELSE -1 END"
        );
    }

    #[test]
    fn bucket_labels_map_back_to_lower_bounds() {
        assert_eq!(
            BucketLabel::for_index(GRADE_BOUNDARIES, 0),
            BucketLabel::Lower(16)
        );
        assert_eq!(
            BucketLabel::for_index(GRADE_BOUNDARIES, 4),
            BucketLabel::Lower(20)
        );
        assert_eq!(
            BucketLabel::for_index(GRADE_BOUNDARIES, 5),
            BucketLabel::Other(OTHER_BUCKET)
        );
        assert_eq!(
            BucketLabel::for_index(RELEVANCE_BOUNDARIES, -1),
            BucketLabel::Other(OTHER_BUCKET)
        );
    }

    #[test]
    fn relevance_of_one_hundred_has_its_own_bucket() {
        let case = bucket_case("relevancia_score", RELEVANCE_BOUNDARIES);
        assert!(case.contains("relevancia_score >= 100 AND relevancia_score < 101 THEN 4"));
    }

    #[test]
    fn band_case_covers_five_bands() {
        assert_eq!(
            band_case(),
            "CASE WHEN media_final < 17 THEN '16.0-16.9' WHEN media_final < 18 THEN '17.0-17.9' \
             WHEN media_final < 19 THEN '18.0-18.9' WHEN media_final < 20 THEN '19.0-19.9' \
             ELSE '20.0+' END"
        );
    }

    #[test]
    fn timeline_binds_zone_and_window() {
        let qb = timeline_query("Africa/Luanda");
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT to_char(created_at AT TIME ZONE $1, 'YYYY-MM-DD') AS dia"));
        assert!(sql.contains("make_interval(days => $2)"));
        assert!(sql.ends_with("GROUP BY dia ORDER BY dia"));
    }

    #[test]
    fn bucket_labels_serialize_as_number_or_text() {
        let bucket = GradeBucket {
            faixa: BucketLabel::Lower(17),
            count: 3,
            media_range: Some(17.4),
        };
        let value = serde_json::to_value(bucket).unwrap();
        assert_eq!(value["faixa"], 17);

        let other = serde_json::to_value(BucketLabel::Other(OTHER_BUCKET)).unwrap();
        assert_eq!(other, "Outros");
    }

    #[test]
    fn reports_are_wrapped_in_their_name() {
        let value = serde_json::to_value(StatsReport::Timeline { timeline: vec![] }).unwrap();
        assert!(value["timeline"].is_array());

        let value = serde_json::to_value(StatsReport::Overview {
            geral: OverviewRow::default(),
            por_categoria: vec![],
            por_media: vec![],
        })
        .unwrap();
        assert_eq!(value["geral"]["total"], 0);
        assert!(value["por_media"].is_array());
    }
}

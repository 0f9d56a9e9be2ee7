//! Translation of the admin list filters into SQL.
//!
//! `select_query` and `count_query` share one predicate so the reported total
//! always matches the rows a caller can page through.

use sqlx::{Postgres, QueryBuilder};

pub const APPLICATION_COLUMNS: &str = "id, nome_completo, email, telefone, bilhete_identidade, \
     data_nascimento, endereco, situacao_academica, nome_escola, media_final, universidade, curso, \
     categoria, carta_motivacao, nome_encarregado, telefone_encarregado, status, relevancia_score, \
     created_at, updated_at";

/// Best candidates first; `id` only breaks exact ties so paging is stable.
pub const DEFAULT_ORDER: &str = "relevancia_score DESC, media_final DESC, created_at DESC, id DESC";

/// Filter values that mean "do not filter".
const SENTINELS: [&str; 2] = ["all", "todos"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub categoria: Option<String>,
    pub media_min: Option<f64>,
    pub media_max: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ApplicationFilter {
    /// Applies page-based pagination; `page` is 1-based.
    pub fn paged(mut self, page: i64, limit: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(page.saturating_sub(1).saturating_mul(limit));
        self
    }

    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut first = true;

        if let Some(pattern) = self.search.as_deref().and_then(search_pattern) {
            qb.push(connector(&mut first))
                .push("(nome_completo ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR bilhete_identidade ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(status) = active_value(self.status.as_deref()) {
            qb.push(connector(&mut first))
                .push("status = ")
                .push_bind(status);
        }

        if let Some(categoria) = active_value(self.categoria.as_deref()) {
            qb.push(connector(&mut first))
                .push("categoria = ")
                .push_bind(categoria);
        }

        if let Some(min) = self.media_min {
            qb.push(connector(&mut first))
                .push("media_final >= ")
                .push_bind(min);
        }

        if let Some(max) = self.media_max {
            qb.push(connector(&mut first))
                .push("media_final <= ")
                .push_bind(max);
        }
    }
}

fn connector(first: &mut bool) -> &'static str {
    if std::mem::take(first) {
        " WHERE "
    } else {
        " AND "
    }
}

/// Trimmed value, or `None` when blank or a sentinel.
pub fn active_value(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty()
        || SENTINELS
            .iter()
            .any(|sentinel| value.eq_ignore_ascii_case(sentinel))
    {
        return None;
    }
    Some(value.to_string())
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
pub fn search_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Some(format!("%{}%", escaped))
}

pub fn select_query(filter: &ApplicationFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM applications", APPLICATION_COLUMNS));
    filter.push_predicate(&mut qb);
    qb.push(" ORDER BY ").push(DEFAULT_ORDER);
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = filter.offset {
        qb.push(" OFFSET ").push_bind(offset);
    }
    qb
}

pub fn count_query(filter: &ApplicationFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM applications");
    filter.push_predicate(&mut qb);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_page_saturates_offset() {
        let filter = ApplicationFilter::default().paged(i64::MAX, 100);
        assert_eq!(filter.limit, Some(100));
        assert_eq!(filter.offset, Some(i64::MAX));
    }

    #[test]
    fn empty_filter_has_no_where_clause() {
        let filter = ApplicationFilter::default();
        assert_eq!(count_query(&filter).sql(), "SELECT COUNT(*) FROM applications");
        assert!(select_query(&filter)
            .sql()
            .ends_with(" FROM applications ORDER BY relevancia_score DESC, media_final DESC, created_at DESC, id DESC"));
    }

    #[test]
    fn search_matches_any_identity_field() {
        let filter = ApplicationFilter {
            search: Some("ana".into()),
            ..Default::default()
        };
        assert_eq!(
            count_query(&filter).sql(),
            "SELECT COUNT(*) FROM applications WHERE (nome_completo ILIKE $1 OR email ILIKE $2 OR bilhete_identidade ILIKE $3)"
        );
    }

    #[test]
    fn all_filters_are_joined_with_and() {
        let filter = ApplicationFilter {
            search: Some("ana".into()),
            status: Some("aprovado".into()),
            categoria: Some("ensino_medio".into()),
            media_min: Some(17.0),
            media_max: Some(19.0),
            ..Default::default()
        };
        assert_eq!(
            count_query(&filter).sql(),
            "SELECT COUNT(*) FROM applications WHERE (nome_completo ILIKE $1 OR email ILIKE $2 OR bilhete_identidade ILIKE $3) \
             AND status = $4 AND categoria = $5 AND media_final >= $6 AND media_final <= $7"
        );
    }

    #[test]
    fn count_applies_grade_range_like_select() {
        let filter = ApplicationFilter {
            media_min: Some(18.0),
            ..Default::default()
        };
        assert!(count_query(&filter).sql().contains("media_final >= $1"));
        assert!(select_query(&filter).sql().contains("media_final >= $1"));
    }

    #[test]
    fn sentinels_disable_status_and_category() {
        let filter = ApplicationFilter {
            status: Some("todos".into()),
            categoria: Some("ALL".into()),
            ..Default::default()
        };
        assert_eq!(count_query(&filter).sql(), "SELECT COUNT(*) FROM applications");
    }

    #[test]
    fn pagination_binds_limit_then_offset() {
        let filter = ApplicationFilter {
            status: Some("pendente".into()),
            ..Default::default()
        }
        .paged(2, 10);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(10));
        assert!(select_query(&filter)
            .sql()
            .ends_with("WHERE status = $1 ORDER BY relevancia_score DESC, media_final DESC, created_at DESC, id DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn first_page_starts_at_zero() {
        let filter = ApplicationFilter::default().paged(1, 25);
        assert_eq!(filter.offset, Some(0));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern("50%_a\\b").as_deref(), Some("%50\\%\\_a\\\\b%"));
        assert_eq!(search_pattern("  Maria ").as_deref(), Some("%Maria%"));
        assert_eq!(search_pattern("   "), None);
    }

    #[test]
    fn active_value_trims_and_drops_blanks() {
        assert_eq!(active_value(Some(" aprovado ")).as_deref(), Some("aprovado"));
        assert_eq!(active_value(Some("")), None);
        assert_eq!(active_value(Some("Todos")), None);
        assert_eq!(active_value(None), None);
    }
}

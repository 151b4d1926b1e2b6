//! PostgreSQL store
//!
//! Data points are stored whole in the `data` JSONB column of `data_points`
//! and searched with predicates rendered by [`SqlCompiler`].

use std::collections::HashSet;

use async_stream::try_stream;
use async_trait::async_trait;
use dsu_search::{BindValue, SqlCompiler, SqlPredicate};
use futures::TryStreamExt;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres, Row};

use super::executor::{DistinctPlan, FindPlan};
use super::traits::{DataPointStore, DataPointStream};
use crate::{models::DataPoint, Result};

const TABLE: &str = "data_points";

#[derive(Debug, Clone)]
pub struct PgDataPointStore {
    pool: PgPool,
    compiler: SqlCompiler,
}

impl PgDataPointStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            compiler: SqlCompiler::new("data"),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `SELECT data ... WHERE <predicate> [OFFSET $n] [LIMIT $m]`, in heap order.
fn find_sql(plan: FindPlan<SqlPredicate>) -> SqlPredicate {
    let FindPlan {
        mut predicate,
        skip,
        limit,
    } = plan;

    let mut sql = format!("SELECT data FROM {TABLE} WHERE {}", predicate.sql);
    if let Some(skip) = skip {
        let idx = predicate.push_bind(BindValue::BigInt(clamp_i64(skip)));
        sql.push_str(&format!(" OFFSET ${idx}"));
    }
    if let Some(limit) = limit {
        let idx = predicate.push_bind(BindValue::BigInt(clamp_i64(limit)));
        sql.push_str(&format!(" LIMIT ${idx}"));
    }
    predicate.sql = sql;
    predicate
}

/// Filter, unwind the grouped field with a lateral join, and keep distinct values.
fn distinct_sql(plan: DistinctPlan<SqlPredicate>) -> SqlPredicate {
    let DistinctPlan {
        mut predicate,
        aggregation,
    } = plan;

    let group = predicate.push_bind(BindValue::TextArray(segments(&aggregation.group_field)));
    let collect_expr = if aggregation.collect_field == aggregation.group_field {
        "unwound.value".to_string()
    } else {
        let collect =
            predicate.push_bind(BindValue::TextArray(segments(&aggregation.collect_field)));
        format!("data #>> ${collect}::text[]")
    };

    predicate.sql = format!(
        "SELECT DISTINCT {collect_expr} AS value \
         FROM {TABLE} \
         CROSS JOIN LATERAL jsonb_array_elements_text( \
             CASE jsonb_typeof(data #> ${group}::text[]) \
                 WHEN 'array' THEN data #> ${group}::text[] \
                 ELSE jsonb_build_array(data #> ${group}::text[]) \
             END \
         ) AS unwound(value) \
         WHERE unwound.value IS NOT NULL AND ({}) ",
        predicate.sql
    );
    predicate
}

fn segments(dotted: &str) -> Vec<String> {
    dotted.split('.').map(str::to_string).collect()
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
    binds: Vec<BindValue>,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for value in binds {
        query = match value {
            BindValue::Text(v) => query.bind(v),
            BindValue::TextArray(vs) => query.bind(vs),
            BindValue::BigInt(n) => query.bind(n),
        };
    }
    query
}

#[async_trait]
impl DataPointStore for PgDataPointStore {
    type Compiler = SqlCompiler;

    fn compiler(&self) -> &SqlCompiler {
        &self.compiler
    }

    fn find(&self, plan: FindPlan<SqlPredicate>) -> DataPointStream {
        let pool = self.pool.clone();
        let SqlPredicate { sql, binds } = find_sql(plan);
        tracing::trace!(sql = %sql, binds = binds.len(), "find");

        Box::pin(try_stream! {
            let mut rows = bind_all(sqlx::query(&sql), binds).fetch(&pool);
            while let Some(row) = rows.try_next().await? {
                let data: serde_json::Value = row.try_get("data")?;
                let data_point: DataPoint = serde_json::from_value(data)?;
                yield data_point;
            }
        })
    }

    async fn distinct(&self, plan: DistinctPlan<SqlPredicate>) -> Result<HashSet<String>> {
        let SqlPredicate { sql, binds } = distinct_sql(plan);
        tracing::trace!(sql = %sql, binds = binds.len(), "distinct");

        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("value").map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AggregationSpec;
    use dsu_search::{FilterTranslator, PredicateCompiler};

    fn predicate(filter: &str) -> SqlPredicate {
        SqlCompiler::new("data").compile(&FilterTranslator::default().translate(filter).unwrap())
    }

    #[test]
    fn find_appends_pagination_binds_after_predicate() {
        let built = find_sql(FindPlan {
            predicate: predicate("header.user_id == 'u1'"),
            skip: Some(20),
            limit: Some(10),
        });
        assert!(built
            .sql
            .starts_with("SELECT data FROM data_points WHERE COALESCE("));
        assert!(built.sql.ends_with(" OFFSET $3 LIMIT $4"));
        assert_eq!(built.binds[2], BindValue::BigInt(20));
        assert_eq!(built.binds[3], BindValue::BigInt(10));
    }

    #[test]
    fn find_without_pagination_has_no_offset_or_limit() {
        let built = find_sql(FindPlan {
            predicate: predicate("a == 1"),
            skip: None,
            limit: None,
        });
        assert!(!built.sql.contains("OFFSET"));
        assert!(!built.sql.contains("LIMIT"));
        assert_eq!(built.binds.len(), 2);
    }

    #[test]
    fn distinct_unwinds_the_owner_field() {
        let built = distinct_sql(DistinctPlan {
            predicate: predicate("header.schema_id.name == 'step-count'"),
            aggregation: AggregationSpec::participants(),
        });
        assert!(built.sql.starts_with("SELECT DISTINCT unwound.value AS value"));
        assert!(built.sql.contains("CROSS JOIN LATERAL jsonb_array_elements_text("));
        assert!(built.sql.contains("CASE jsonb_typeof(data #> $3::text[])"));
        assert_eq!(
            built.binds[2],
            BindValue::TextArray(vec!["header".into(), "user_id".into()])
        );
    }
}

//! In-memory store
//!
//! Keeps serialized data points in insertion order and evaluates document
//! predicates against them. Used for development and tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use dsu_search::{DocumentCompiler, DocumentPredicate};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use super::executor::{DistinctPlan, FindPlan};
use super::traits::{DataPointStore, DataPointStream};
use crate::{models::DataPoint, Error, Result};

#[derive(Debug, Clone, Default)]
pub struct MemoryDataPointStore {
    documents: Arc<RwLock<Vec<JsonValue>>>,
    compiler: DocumentCompiler,
}

impl MemoryDataPointStore {
    pub async fn insert(&self, data_point: &DataPoint) -> Result<()> {
        let doc = serde_json::to_value(data_point)?;
        self.documents.write().await.push(doc);
        Ok(())
    }

    pub async fn insert_all(&self, data_points: impl IntoIterator<Item = DataPoint>) -> Result<()> {
        let docs = data_points
            .into_iter()
            .map(|dp| serde_json::to_value(&dp))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.documents.write().await.extend(docs);
        Ok(())
    }

    /// Load a JSON array of data points.
    pub async fn load_file(&self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("cannot read seed file {}: {e}", path.display()))
        })?;
        let data_points: Vec<DataPoint> = serde_json::from_str(&raw)?;
        let count = data_points.len();
        self.insert_all(data_points).await?;
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DataPointStore for MemoryDataPointStore {
    type Compiler = DocumentCompiler;

    fn compiler(&self) -> &DocumentCompiler {
        &self.compiler
    }

    fn find(&self, plan: FindPlan<DocumentPredicate>) -> DataPointStream {
        let documents = Arc::clone(&self.documents);
        let skip = plan.skip.map_or(0, to_usize);
        let limit = plan.limit.map_or(usize::MAX, to_usize);

        Box::pin(try_stream! {
            let matched: Vec<JsonValue> = {
                let docs = documents.read().await;
                docs.iter()
                    .filter(|doc| plan.predicate.matches(doc))
                    .skip(skip)
                    .take(limit)
                    .cloned()
                    .collect()
            };
            for doc in matched {
                let data_point: DataPoint = serde_json::from_value(doc)?;
                yield data_point;
            }
        })
    }

    async fn distinct(&self, plan: DistinctPlan<DocumentPredicate>) -> Result<HashSet<String>> {
        let docs = self.documents.read().await;
        let group_pointer = pointer(&plan.aggregation.group_field);
        let collect_pointer = pointer(&plan.aggregation.collect_field);

        // $match → $unwind → $group with $addToSet
        let mut groups: HashMap<String, HashSet<String>> = HashMap::new();
        for doc in docs.iter().filter(|doc| plan.predicate.matches(doc)) {
            for element in unwind(doc.pointer(&group_pointer)) {
                let Some(key) = scalar_text(element) else {
                    continue;
                };
                let collected = if collect_pointer == group_pointer {
                    Some(key.clone())
                } else {
                    doc.pointer(&collect_pointer).and_then(scalar_text)
                };
                let set = groups.entry(key).or_default();
                set.extend(collected);
            }
        }

        Ok(groups.into_values().flatten().collect())
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// `header.user_id` → `/header/user_id`
fn pointer(dotted: &str) -> String {
    dotted
        .split('.')
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Array fields yield each element; scalars yield themselves; absent yields nothing.
fn unwind(value: Option<&JsonValue>) -> Vec<&JsonValue> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AggregationSpec;
    use dsu_search::{FilterTranslator, PredicateCompiler};
    use futures::TryStreamExt;
    use serde_json::json;

    fn predicate(filter: &str) -> DocumentPredicate {
        DocumentCompiler.compile(&FilterTranslator::default().translate(filter).unwrap())
    }

    async fn store_with(docs: Vec<JsonValue>) -> MemoryDataPointStore {
        let store = MemoryDataPointStore::default();
        store.documents.write().await.extend(docs);
        store
    }

    #[test]
    fn pointers_escape_segments() {
        assert_eq!(pointer("header.user_id"), "/header/user_id");
        assert_eq!(pointer("a/b.c~d"), "/a~1b/c~0d");
    }

    #[tokio::test]
    async fn distinct_unwinds_array_owners() {
        let store = store_with(vec![
            json!({ "header": { "user_id": ["u1", "u2"] }, "kind": "shared" }),
            json!({ "header": { "user_id": "u3" }, "kind": "shared" }),
            json!({ "header": { "user_id": "u4" }, "kind": "private" }),
            json!({ "header": {}, "kind": "shared" }),
        ])
        .await;

        let owners = store
            .distinct(DistinctPlan {
                predicate: predicate("kind == shared"),
                aggregation: AggregationSpec::participants(),
            })
            .await
            .unwrap();
        assert_eq!(
            owners,
            HashSet::from(["u1".to_string(), "u2".to_string(), "u3".to_string()])
        );
    }

    #[tokio::test]
    async fn find_reports_undeserializable_documents() {
        let store = store_with(vec![json!({ "header": { "user_id": "u1" } })]).await;
        let result: Result<Vec<DataPoint>> = store
            .find(FindPlan {
                predicate: predicate("header.user_id == u1"),
                skip: None,
                limit: None,
            })
            .try_collect()
            .await;
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn loads_seed_files() {
        let path = std::env::temp_dir().join(format!("dsu-seed-{}.json", uuid::Uuid::new_v4()));
        let seed = json!([{
            "header": {
                "id": "dp-1",
                "creation_date_time": "2024-01-01T00:00:00Z",
                "schema_id": {
                    "namespace": "omh",
                    "name": "step-count",
                    "version": { "major": 1, "minor": 0 }
                },
                "user_id": "u1"
            },
            "body": {}
        }]);
        tokio::fs::write(&path, seed.to_string()).await.unwrap();

        let store = MemoryDataPointStore::default();
        assert_eq!(store.load_file(&path).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(matches!(
            store.load_file(Path::new("/nonexistent/seed.json")).await,
            Err(Error::Config(_))
        ));
    }
}

use dsu_server::models::DataPoint;
use serde_json::{json, Value};

/// Builder for data point fixtures.
#[derive(Debug, Clone)]
pub struct DataPointBuilder {
    id: String,
    user_id: Value,
    namespace: String,
    name: String,
    version: Value,
    created: String,
    body: Value,
}

impl DataPointBuilder {
    pub fn new(id: impl Into<String>, user_id: &str) -> Self {
        Self {
            id: id.into(),
            user_id: json!(user_id),
            namespace: "omh".to_string(),
            name: "step-count".to_string(),
            version: json!({ "major": 1, "minor": 0 }),
            created: "2024-01-01T00:00:00Z".to_string(),
            body: json!({}),
        }
    }

    pub fn schema(mut self, namespace: &str, name: &str) -> Self {
        self.namespace = namespace.to_string();
        self.name = name.to_string();
        self
    }

    pub fn version(mut self, major: u32, minor: u32, qualifier: Option<&str>) -> Self {
        self.version = match qualifier {
            Some(q) => json!({ "major": major, "minor": minor, "qualifier": q }),
            None => json!({ "major": major, "minor": minor }),
        };
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> DataPoint {
        serde_json::from_value(json!({
            "header": {
                "id": self.id,
                "creation_date_time": self.created,
                "schema_id": {
                    "namespace": self.namespace,
                    "name": self.name,
                    "version": self.version
                },
                "user_id": self.user_id
            },
            "body": self.body
        }))
        .expect("fixture is a valid data point")
    }
}

pub fn step_count(id: impl Into<String>, user_id: &str, steps: u64) -> DataPoint {
    DataPointBuilder::new(id, user_id)
        .body(json!({ "step_count": steps }))
        .build()
}

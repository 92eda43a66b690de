use serde_json::{json, Value};

/// Accumulated boolean clauses of one compiled search
///
/// Stages append clauses; nothing ever clobbers what an earlier stage wrote.
#[derive(Debug, Clone, Default)]
pub struct BoolQuery {
    pub filter: Vec<Value>,
    pub must: Vec<Value>,
    pub must_not: Vec<Value>,
    pub should: Vec<Value>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    /// Append a filter clause
    pub fn add_filter(&mut self, clause: Value) {
        self.filter.push(clause);
    }

    /// Append a must clause
    pub fn add_must(&mut self, clause: Value) {
        self.must.push(clause);
    }

    /// Append a must_not clause
    pub fn add_must_not(&mut self, clause: Value) {
        self.must_not.push(clause);
    }

    /// Append a should clause
    pub fn add_should(&mut self, clause: Value) {
        self.should.push(clause);
    }

    /// Set how many should clauses have to match
    pub fn set_minimum_should_match(&mut self, n: u32) {
        self.minimum_should_match = Some(n);
    }

    /// Check whether any clause has been accumulated
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
            && self.must.is_empty()
            && self.must_not.is_empty()
            && self.should.is_empty()
    }

    /// Render the accumulated tree as a store query
    pub fn to_query(&self) -> Value {
        if self.is_empty() {
            return match_all();
        }
        let mut body = serde_json::Map::new();
        if !self.filter.is_empty() {
            body.insert("filter".to_string(), Value::Array(self.filter.clone()));
        }
        if !self.must.is_empty() {
            body.insert("must".to_string(), Value::Array(self.must.clone()));
        }
        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), Value::Array(self.must_not.clone()));
        }
        if !self.should.is_empty() {
            body.insert("should".to_string(), Value::Array(self.should.clone()));
        }
        if let Some(msm) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(msm));
        }
        json!({ "bool": body })
    }
}

/// Match-everything query
pub fn match_all() -> Value {
    json!({"match_all": {}})
}

/// Exact term clause
pub fn term(field: &str, value: impl Into<Value>) -> Value {
    let value: Value = value.into();
    json!({"term": {(field): value}})
}

/// Any-of-the-values clause
pub fn terms(field: &str, values: &[String]) -> Value {
    json!({"terms": {(field): values}})
}

/// Field-presence clause
pub fn exists(field: &str) -> Value {
    json!({"exists": {"field": field}})
}

/// Document-id clause
pub fn ids(values: &[String]) -> Value {
    json!({"ids": {"values": values}})
}

/// Range clause; callers supply the bounds object
pub fn range(field: &str, bounds: Value) -> Value {
    json!({"range": {(field): bounds}})
}

/// Lenient query-string clause with an explicit operator
pub fn query_string(query: &str, default_operator: &str) -> Value {
    json!({"query_string": {
        "query": query,
        "default_operator": default_operator,
        "lenient": true,
    }})
}

/// Query-string clause for user-typed free text
pub fn free_text_query(query: &str, default_operator: &str, analyze_wildcard: bool) -> Value {
    json!({"query_string": {
        "query": query,
        "default_operator": default_operator,
        "lenient": true,
        "analyze_wildcard": analyze_wildcard,
    }})
}

/// Multi-field match clause for advanced search
pub fn multi_match(query: &str, fields: &[String], operator: &str, match_type: &str) -> Value {
    json!({"multi_match": {
        "query": query,
        "fields": fields,
        "operator": operator,
        "type": match_type,
    }})
}

/// Nested clause without correlation
pub fn nested(path: &str, query: Value) -> Value {
    json!({"nested": {"path": path, "query": query}})
}

/// Nested clause whose child matches surface under the given tag
pub fn nested_with_hits(path: &str, query: Value, tag: &str) -> Value {
    json!({"nested": {
        "path": path,
        "query": query,
        "inner_hits": {"name": tag},
    }})
}

/// Anonymous bool with only filter clauses
pub fn bool_filter(clauses: Vec<Value>) -> Value {
    json!({"bool": {"filter": clauses}})
}

/// Anonymous one-of bool over the given alternatives
pub fn bool_should(clauses: Vec<Value>) -> Value {
    json!({"bool": {"should": clauses, "minimum_should_match": 1}})
}

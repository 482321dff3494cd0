//! JSON rendering of rows

use rp_queries::{Record, Value};
use serde_json::{Map, Number, Value as Json};

pub fn record_to_json(record: &Record) -> Json {
    let object: Map<String, Json> = record
        .iter()
        .map(|(column, value)| (column.to_string(), value_to_json(value)))
        .collect();
    Json::Object(object)
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::Number((*v).into()),
        // NaN and infinities have no JSON form
        Value::Float(v) => Number::from_f64(*v).map(Json::Number).unwrap_or(Json::Null),
        Value::Text(v) => Json::String(v.clone()),
        Value::Uuid(v) => Json::String(v.to_string()),
        Value::Date(v) => Json::String(v.format("%Y-%m-%d").to_string()),
        Value::Timestamp(v) => Json::String(v.to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_to_json_keeps_columns() {
        let record = Record::new()
            .with("id", 1_i64)
            .with("name", "a")
            .with("score", f64::NAN)
            .with("nickname", Option::<String>::None);

        assert_eq!(
            record_to_json(&record),
            json!({"id": 1, "name": "a", "score": null, "nickname": null})
        );
    }

    #[test]
    fn test_record_to_json_keeps_select_order() {
        let record = Record::new()
            .with("zeta", 1_i64)
            .with("alpha", "a")
            .with("mid", true);

        assert_eq!(
            record_to_json(&record).to_string(),
            r#"{"zeta":1,"alpha":"a","mid":true}"#
        );
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(value_to_json(&Value::Bool(true)), json!(true));
        assert_eq!(value_to_json(&Value::Float(1.5)), json!(1.5));
    }
}

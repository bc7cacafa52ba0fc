// ABOUTME: Request body extraction that reports malformed JSON through AppError
// ABOUTME: Also holds serde helpers for form fields that clients may send as null

use axum::extract::FromRequest;
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// `Json` with rejections rendered as a localized validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Reads a string field, treating `null` as empty.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads any defaultable field, treating `null` as its default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        #[serde(deserialize_with = "null_as_empty")]
        name: String,
        #[serde(deserialize_with = "null_as_default")]
        count: u32,
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let form: Form = serde_json::from_value(json!({"name": null, "count": null})).unwrap();
        assert_eq!(form.name, "");
        assert_eq!(form.count, 0);

        let form: Form = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(form.name, "x");
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_validation_error() {
        let app = Router::new().route(
            "/",
            post(|AppJson(form): AppJson<Form>| async move { form.name }),
        );
        let server = TestServer::new(app).unwrap();

        let response = server.post("/").json(&json!({"name": 5})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "قيمة حقل body غير صالحة");
    }
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/health", get(health::health_handler))
        // Screening API
        .route("/api/v1/columns", post(handlers::handle_extract_columns))
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        .route("/api/v1/exports/csv", post(handlers::handle_export_csv))
        .route("/api/v1/demo", get(handlers::handle_demo))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::screening::test_support::ScriptedModel;

    const BOUNDARY: &str = "screener-test-boundary";

    fn test_config() -> Config {
        Config {
            openai_api_key: "test-key".to_string(),
            openai_base_url: "http://localhost:9".to_string(),
            default_model: "gpt-4o".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            max_upload_mb: 1,
            llm_timeout_secs: None,
        }
    }

    fn router_with(model: ScriptedModel) -> Router {
        build_router(AppState {
            llm: Arc::new(model),
            config: test_config(),
        })
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str),
    }

    fn multipart_body(parts: &[Part]) -> String {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match part {
                Part::Text(name, value) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                    ));
                }
                Part::File(name, file_name, content) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: text/plain\r\n\r\n{content}\r\n"
                    ));
                }
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn multipart_request(parts: &[Part]) -> Request<Body> {
        Request::post("/api/v1/evaluations")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "screener-api");
    }

    #[tokio::test]
    async fn test_demo_defaults_to_tabular() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(Request::get("/api/v1/demo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "tabular");
        assert_eq!(body["excelData"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_demo_text_uses_resume_count() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(
                Request::get("/api/v1/demo?kind=text&resumes=8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["type"], "text");
        assert!(body["data"].as_str().unwrap().contains("analyzed 8 resumes"));
    }

    #[tokio::test]
    async fn test_demo_accepts_huge_resume_count() {
        let uri = format!("/api/v1/demo?kind=text&resumes={}", usize::MAX);
        let response = router_with(ScriptedModel::failing())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["excelData"][1]["Value"].as_u64().unwrap() as usize,
            usize::MAX - usize::MAX.div_ceil(4)
        );
    }

    #[tokio::test]
    async fn test_columns_returns_names_and_kinds() {
        let model = ScriptedModel::new(vec![Ok(json!({
            "structured_response": { "columns": ["Candidate_Name", "SQL_Proficiency", "AWS_Services"] }
        }))]);
        let response = router_with(model)
            .oneshot(json_request(
                "/api/v1/columns",
                json!({ "criteria": "Strong SQL required" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["columns"],
            json!(["Candidate_Name", "SQL_Proficiency", "AWS_Services"])
        );
        assert_eq!(body["kinds"][0], json!({ "name": "Candidate_Name", "kind": "text" }));
        assert_eq!(body["kinds"][1]["kind"], "rating");
        assert_eq!(body["kinds"][1]["max"], 5.0);
        assert_eq!(body["kinds"][2]["kind"], "string_list");
    }

    #[tokio::test]
    async fn test_columns_rejects_blank_criteria() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(json_request("/api/v1/columns", json!({ "criteria": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_evaluation_requires_criteria() {
        let request = multipart_request(&[
            Part::Text("job_description", "Data engineer"),
            Part::File("resumes", "jane.txt", "Jane Doe"),
        ]);
        let response = router_with(ScriptedModel::failing())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Please enter evaluation criteria"
        );
    }

    #[tokio::test]
    async fn test_evaluation_requires_resumes() {
        let request = multipart_request(&[
            Part::Text("criteria", "SQL"),
            Part::Text("job_description", "Data engineer"),
        ]);
        let response = router_with(ScriptedModel::failing())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Please upload at least one resume"
        );
    }

    #[tokio::test]
    async fn test_evaluation_end_to_end() {
        let model = ScriptedModel::new(vec![
            Ok(json!({ "structured_response": { "columns": ["Candidate_Name", "AWS_Skills"] } })),
            Ok(json!({
                "structured_response": {
                    "candidates": [{ "Candidate_Name": "Jane Doe", "AWS_Skills": ["S3", "Lambda"] }]
                }
            })),
        ]);
        let request = multipart_request(&[
            Part::Text("criteria", "AWS depth"),
            Part::File("job_description_file", "jd.txt", "Senior data engineer"),
            Part::File("resumes", "jane.txt", "Jane Doe, S3 and Lambda"),
        ]);
        let response = router_with(model).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "tabular");
        assert_eq!(body["data"][0]["AWS_Skills"], json!(["S3", "Lambda"]));
        assert_eq!(
            body["excelData"][0],
            json!({ "Candidate_Name": "Jane Doe", "AWS_Skills": "S3; Lambda" })
        );
    }

    #[tokio::test]
    async fn test_export_csv_attachment() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(json_request(
                "/api/v1/exports/csv",
                json!({ "excelData": [{ "Candidate_Name": "Jane", "Overall_Fit": 80 }] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("resume-evaluation-report.csv"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(csv.starts_with("\"Candidate_Name\",\"Overall_Fit\""));
    }

    #[tokio::test]
    async fn test_export_csv_rejects_empty_rows() {
        let response = router_with(ScriptedModel::failing())
            .oneshot(json_request("/api/v1/exports/csv", json!({ "excelData": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use crop_core::{PredictError, PredictionResult};
use serde::Serialize;
use std::collections::HashMap;

use crate::page::render_index;
use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize, Debug)]
pub struct PredictResponse {
    pub result: String,
    pub crop: Option<String>,
    pub code: Option<i64>,
}

impl From<&PredictionResult> for PredictResponse {
    fn from(result: &PredictionResult) -> Self {
        let crop = result.crop();
        Self {
            result: result.message(),
            crop: crop.map(|c| c.name().to_string()),
            code: crop.map(|c| c.code()),
        }
    }
}

pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
}

async fn index() -> Result<Html<String>, AppError> {
    render_index(None)
}

async fn predict_form(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Html<String>, AppError> {
    let result = match form {
        Ok(Form(pairs)) => run_prediction(&state, first_values(pairs)).await,
        Err(rejection) => PredictionResult::Failed(PredictError::Other(rejection.body_text())),
    };
    render_index(Some(&result.message()))
}

/// A repeated form field keeps its first value.
fn first_values(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    let mut fields = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        fields.entry(key).or_insert(value);
    }
    fields
}

/// JSON variant of `/predict`. Field values may be strings or numbers.
async fn predict_json(
    State(state): State<AppState>,
    body: Result<Json<HashMap<String, serde_json::Value>>, JsonRejection>,
) -> Result<Json<ApiResponse<PredictResponse>>, AppError> {
    let Json(body) = body.map_err(|rejection| {
        AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("{}", rejection.body_text()),
        )
    })?;

    let fields = body
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect();

    let result = run_prediction(&state, fields).await;
    Ok(Json(ApiResponse::success(PredictResponse::from(&result))))
}

async fn run_prediction(state: &AppState, fields: HashMap<String, String>) -> PredictionResult {
    let predictor = state.predictor.clone();
    match tokio::task::spawn_blocking(move || predictor.predict_form(&fields)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Prediction task failed: {e}");
            PredictionResult::Failed(PredictError::Other(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_string, state, unfitted_state};
    use crate::build_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use crop_core::{SCALER_NOT_FITTED_MESSAGE, UNDETERMINED_MESSAGE};
    use tower::ServiceExt;

    fn form_body(nitrogen: &str, rainfall: &str) -> String {
        format!(
            "Nitrogen={nitrogen}&Phosporus=42&Potassium=43&Temperature=20.8&Humidity=82&pH=6.5&Rainfall={rainfall}"
        )
    }

    fn post_form(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = build_router(state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_string(response).await;
        assert!(page.contains(r#"action="/predict""#));
        assert!(!page.contains(r#"id="result""#));
    }

    #[tokio::test]
    async fn test_predict_recommends_crop() {
        let app = build_router(state());

        let response = app.clone().oneshot(post_form(form_body("10", "300"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response)
            .await
            .contains("Rice is the best crop to be cultivated right there."));

        let response = app.oneshot(post_form(form_body("90", "20"))).await.unwrap();
        assert!(body_string(response)
            .await
            .contains("Coffee is the best crop to be cultivated right there."));
    }

    #[tokio::test]
    async fn test_predict_out_of_table_label() {
        let app = build_router(state());
        let response = app.oneshot(post_form(form_body("90", "300"))).await.unwrap();
        assert!(body_string(response).await.contains(UNDETERMINED_MESSAGE));
    }

    #[tokio::test]
    async fn test_predict_missing_field() {
        let app = build_router(state());
        let body = "Nitrogen=10&Potassium=43&Temperature=20&Humidity=82&pH=6.5&Rainfall=100";
        let response = app.oneshot(post_form(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_string(response).await;
        assert!(page.contains(
            r#"<div class="result" id="result">An error occurred: missing form field &#39;Phosporus&#39;</div>"#
        ));
    }

    #[tokio::test]
    async fn test_predict_repeated_field_uses_first_value() {
        let app = build_router(state());
        let body = format!("{}&Nitrogen=90", form_body("10", "300"));
        let response = app.clone().oneshot(post_form(body)).await.unwrap();
        assert!(body_string(response)
            .await
            .contains("Rice is the best crop to be cultivated right there."));

        let body = format!("{}&Nitrogen=ten", form_body("90", "20"));
        let response = app.oneshot(post_form(body)).await.unwrap();
        assert!(body_string(response)
            .await
            .contains("Coffee is the best crop to be cultivated right there."));
    }

    #[tokio::test]
    async fn test_predict_non_numeric_field() {
        let app = build_router(state());
        let response = app.oneshot(post_form(form_body("ten", "100"))).await.unwrap();
        let page = body_string(response).await;
        assert!(page.contains("An error occurred: could not convert string to float: &#39;ten&#39;"));
    }

    #[tokio::test]
    async fn test_predict_wrong_content_type() {
        let app = build_router(state());
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "text/plain")
            .body(Body::from(form_body("10", "10")))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains(r#"id="result">An error occurred: "#));
    }

    #[tokio::test]
    async fn test_predict_unfitted_scalers() {
        let app = build_router(unfitted_state());
        for (n, r) in [("10", "300"), ("90", "20"), ("-1e6", "0")] {
            let response = app.clone().oneshot(post_form(form_body(n, r))).await.unwrap();
            let page = body_string(response).await;
            assert!(page.contains(&format!(r#"<div class="result" id="result">{SCALER_NOT_FITTED_MESSAGE}</div>"#)));
        }
    }

    #[tokio::test]
    async fn test_predict_is_idempotent() {
        let app = build_router(state());
        let first = body_string(app.clone().oneshot(post_form(form_body("90", "20"))).await.unwrap()).await;
        let second = body_string(app.oneshot(post_form(form_body("90", "20"))).await.unwrap()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_api_predict_accepts_numbers_and_strings() {
        let app = build_router(state());
        let response = app
            .oneshot(post_json(
                r#"{"Nitrogen": 90, "Phosporus": "42", "Potassium": 43, "Temperature": 20.8,
                    "Humidity": 82, "pH": 6.5, "Rainfall": "20"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["crop"], "Coffee");
        assert_eq!(body["data"]["code"], 22);
        assert_eq!(
            body["data"]["result"],
            "Coffee is the best crop to be cultivated right there."
        );
    }

    #[tokio::test]
    async fn test_api_predict_handled_failure_is_ok() {
        let app = build_router(state());
        let response = app.oneshot(post_json(r#"{"Nitrogen": 90}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["data"]["crop"], serde_json::Value::Null);
        assert_eq!(
            body["data"]["result"],
            "An error occurred: missing form field 'Phosporus'"
        );
    }

    #[tokio::test]
    async fn test_api_predict_malformed_json() {
        let app = build_router(state());
        let response = app.oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

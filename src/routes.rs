use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_files::Files;
use actix_web::http::header::ContentType;
use actix_web::{web, HttpRequest, HttpResponse};
use dashmap::DashMap;
use log::{error, info, warn};

use crate::inference::{Classifier, ModelInfo};
use crate::models::{ApiResponse, RawInput};
use crate::pages;
use crate::scoring;

/// Shared per-process state. The classifier is `None` when the startup load
/// failed; every scoring-path request then gets the fixed 500 below.
pub struct AppState {
    pub classifier: Option<Arc<dyn Classifier>>,
}

const MODEL_NOT_LOADED: &str = "Model not loaded. Please check logs.";

const PREDICT_LIMIT_PER_MIN: u32 = 100;

static RATE_LIMIT_CACHE: once_cell::sync::Lazy<DashMap<String, (AtomicU32, Instant)>> =
    once_cell::sync::Lazy::new(DashMap::new);

/// Sliding one-minute counter per client IP.
fn over_limit(ip: &str, limit: u32) -> bool {
    let now = Instant::now();
    let mut entry = RATE_LIMIT_CACHE
        .entry(ip.to_owned())
        .or_insert_with(|| (AtomicU32::new(0), now));

    if now.duration_since(entry.1) > Duration::from_secs(60) {
        entry.0.store(0, Ordering::Relaxed);
        entry.1 = now;
    }

    entry.0.fetch_add(1, Ordering::Relaxed) > limit
}

fn model_not_loaded() -> HttpResponse {
    HttpResponse::InternalServerError()
        .content_type(ContentType::plaintext())
        .body(MODEL_NOT_LOADED)
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

async fn index(state: web::Data<AppState>) -> HttpResponse {
    if state.classifier.is_none() {
        return model_not_loaded();
    }
    html(pages::scoring_page(&RawInput::default(), None, None))
}

async fn predict(
    state: web::Data<AppState>,
    form: web::Form<RawInput>,
    request: HttpRequest,
) -> HttpResponse {
    let Some(classifier) = state.classifier.clone() else {
        return model_not_loaded();
    };

    if let Some(client_ip) = request.peer_addr().map(|addr| addr.ip().to_string()) {
        if over_limit(&client_ip, PREDICT_LIMIT_PER_MIN) {
            warn!("rate limit exceeded for {client_ip}");
            return HttpResponse::TooManyRequests()
                .content_type(ContentType::plaintext())
                .body("Too many requests. Try again in a minute.");
        }
    }

    let input = form.into_inner();
    let outcome = web::block(move || {
        let verdict = scoring::score(classifier.as_ref(), &input);
        (input, verdict)
    })
    .await;

    match outcome {
        Ok((input, Ok(prediction))) => {
            info!(
                "prediction: {} (p={:.3})",
                prediction.outcome.as_str(),
                prediction.probability
            );
            html(pages::scoring_page(&input, Some(&prediction), None))
        }
        Ok((input, Err(err))) => {
            error!("scoring failed: {err}");
            html(pages::scoring_page(&input, None, Some(&err.to_string())))
        }
        Err(err) => {
            error!("blocking execution failed: {err}");
            HttpResponse::InternalServerError()
                .content_type(ContentType::html())
                .body(pages::scoring_page(
                    &RawInput::default(),
                    None,
                    Some("internal execution error"),
                ))
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success("credit default scoring API"))
}

async fn model_info(state: web::Data<AppState>) -> HttpResponse {
    match &state.classifier {
        Some(classifier) => HttpResponse::Ok().json(ApiResponse::success(classifier.info())),
        None => HttpResponse::InternalServerError()
            .json(ApiResponse::<ModelInfo>::error("model not loaded")),
    }
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<String>::error("endpoint not found"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/predict", web::post().to(predict))
        .route("/api/health", web::get().to(health))
        .route("/api/model-info", web::get().to(model_info))
        .service(Files::new("/static", "./static").prefer_utf8(true))
        .default_service(web::route().to(not_found));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::models::FeatureVector;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use std::sync::atomic::AtomicUsize;

    struct StubClassifier {
        label: u8,
        positive: f32,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(label: u8, positive: f32) -> Arc<Self> {
            Arc::new(Self {
                label,
                positive,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Classifier for StubClassifier {
        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<u8>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.label; rows.len()])
        }

        fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<[f32; 2]>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![[1.0 - self.positive, self.positive]; rows.len()])
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                input_shape: vec![1, 10],
                threshold: 0.5,
                version: "stub".to_owned(),
                features: vec!["LIMIT_BAL".to_owned()],
            }
        }
    }

    fn state_with(classifier: Option<Arc<dyn Classifier>>) -> web::Data<AppState> {
        web::Data::new(AppState { classifier })
    }

    fn full_form() -> Vec<(&'static str, &'static str)> {
        vec![
            ("LIMIT_BAL", "20000"),
            ("SEX", "1"),
            ("EDUCATION", "2"),
            ("MARRIAGE", "1"),
            ("AGE", "30"),
            ("TOTAL_BILL_AMT", "12000"),
            ("TOTAL_PAY_AMT", "6000"),
        ]
    }

    #[actix_web::test]
    async fn index_renders_the_form() {
        let stub = StubClassifier::new(0, 0.1);
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(stub)))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("name=\"LIMIT_BAL\""));
        assert!(body.contains("name=\"TOTAL_PAY_AMT\""));
    }

    #[actix_web::test]
    async fn predict_renders_label_probability_and_echo() {
        let stub = StubClassifier::new(1, 0.732);
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(stub)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form(full_form())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Default"));
        assert!(body.contains("0.732"));
        assert!(body.contains("value=\"20000\""));
        assert!(body.contains("value=\"30\""));
    }

    #[actix_web::test]
    async fn predict_with_missing_field_reports_error_without_inference() {
        let stub = StubClassifier::new(1, 0.9);
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(stub.clone())))
                .configure(configure),
        )
        .await;

        let mut form = full_form();
        form.retain(|(name, _)| *name != "AGE");
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form(form)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("class=\"error\""));
        assert!(body.contains("AGE"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn predict_with_non_numeric_field_names_the_field() {
        let stub = StubClassifier::new(1, 0.9);
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(stub)))
                .configure(configure),
        )
        .await;

        let mut form = full_form();
        form.retain(|(name, _)| *name != "SEX");
        form.push(("SEX", "male"));
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form(form)
            .to_request();
        let resp = test::call_service(&app, req).await;

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("SEX"));
        assert!(body.contains("class=\"error\""));
    }

    #[actix_web::test]
    async fn missing_model_short_circuits_both_routes() {
        let app = test::init_service(
            App::new().app_data(state_with(None)).configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert_eq!(body, MODEL_NOT_LOADED);

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form(full_form())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert_eq!(body, MODEL_NOT_LOADED);
    }

    #[actix_web::test]
    async fn model_info_reports_shape_and_threshold() {
        let stub = StubClassifier::new(0, 0.1);
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(stub)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/model-info").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["input_shape"][1], 10);
    }

    #[actix_web::test]
    async fn health_is_always_ok() {
        let app = test::init_service(
            App::new().app_data(state_with(None)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn unknown_route_is_a_json_404() {
        let app = test::init_service(
            App::new().app_data(state_with(None)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

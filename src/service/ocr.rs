use std::time::Instant;

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::ApiError;
use crate::prompts;
use crate::structs::request::EvaluationRequest;
use crate::structs::respond::OcrResponse;
use crate::traits::provider::AiProvider;
use crate::utils::decode_image;
use crate::validator;

// 识别图片中的手写内容
pub(crate) async fn ocr(
    req_body: web::Json<EvaluationRequest>,
    provider: web::Data<dyn AiProvider>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    log::info!("[{}] OCR request received", request_id);
    let result = extract_text(request_id, &req_body, provider.get_ref()).await;
    super::respond(request_id, result)
}

pub(crate) async fn extract_text(
    request_id: Uuid,
    request: &EvaluationRequest,
    provider: &dyn AiProvider,
) -> Result<OcrResponse, ApiError> {
    let image = decode_image(validator::validate_ocr(request)?)?;
    let started = Instant::now();
    let text = provider
        .complete(&prompts::ocr_prompt(&image))
        .await
        .map_err(|e| ApiError::provider("OCR failed", e))?;
    log::info!(
        "[{}] OCR finished in {:.2}s: {}",
        request_id,
        started.elapsed().as_secs_f64(),
        preview(&text)
    );
    Ok(OcrResponse::completed(text))
}

/// 日志里只打印前 100 个字符
pub(crate) fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(100).collect();
    if text.chars().nth(100).is_some() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::{json, Value};

    use crate::error::ProviderError;
    use crate::prompts::Task;
    use crate::service::test_support::{test_app, ScriptedProvider};

    fn png_data_url() -> String {
        format!(
            "data:image/png;base64,{}",
            STANDARD.encode([0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        )
    }

    #[actix_web::test]
    async fn transcribes_image() {
        let provider = ScriptedProvider::new(vec![Ok("$x^2 + 2x + 1 = 0$".to_string())]);
        let app = test_app!(provider);

        let req = test::TestRequest::post()
            .uri("/api/ocr")
            .set_json(json!({ "image": png_data_url() }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"success": true, "text": "$x^2 + 2x + 1 = 0$", "error": null}));
        assert!(body.get("evaluation").is_none());
        assert!(body.get("hint").is_none());

        let prompts = provider.prompts();
        assert_eq!(prompts[0].task, Task::Ocr);
        assert_eq!(prompts[0].image_url.as_deref(), Some(png_data_url().as_str()));
    }

    #[actix_web::test]
    async fn invalid_base64_is_rejected_without_provider_call() {
        let provider = ScriptedProvider::new(vec![]);
        let app = test_app!(provider);

        let req = test::TestRequest::post()
            .uri("/api/ocr")
            .set_json(json!({ "image": "not-base64!!" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["text"], Value::Null);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid base64 image data"));
        assert_eq!(provider.calls(), 0);
    }

    #[actix_web::test]
    async fn missing_image_is_named() {
        let provider = ScriptedProvider::new(vec![]);
        let app = test_app!(provider);

        let req = test::TestRequest::post()
            .uri("/api/ocr")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing required field: image");
        assert_eq!(provider.calls(), 0);
    }

    #[actix_web::test]
    async fn provider_failure_is_a_bad_gateway() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::Status {
            status: 401,
            message: "invalid api key".to_string(),
        })]);
        let app = test_app!(provider);

        let req = test::TestRequest::post()
            .uri("/api/ocr")
            .set_json(json!({ "image": png_data_url() }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["text"], Value::Null);
        assert!(body["error"].as_str().unwrap().starts_with("OCR failed: provider returned status 401"));
    }

    #[actix_web::test]
    async fn malformed_body_keeps_ocr_fields() {
        let provider = ScriptedProvider::new(vec![]);
        let app = test_app!(provider);

        let req = test::TestRequest::post()
            .uri("/api/ocr")
            .insert_header(("content-type", "application/json"))
            .set_payload("{bad")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body.get("text"), Some(&Value::Null));
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
        assert_eq!(provider.calls(), 0);
    }

    // 不引入 actix_web::test，免得覆盖标准的 #[test]
    mod preview {
        use crate::service::ocr::preview;

        #[test]
        fn truncates_long_text() {
            assert_eq!(preview("short"), "short");
            let long = "x".repeat(150);
            assert_eq!(preview(&long).len(), 103);
        }
    }
}

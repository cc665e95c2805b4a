use std::time::Instant;

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::ApiError;
use crate::feedback::Feedback;
use crate::prompts;
use crate::structs::request::EvaluationRequest;
use crate::structs::respond::EvaluationResponse;
use crate::traits::provider::AiProvider;
use crate::validator::{self, EvaluationInput};

// 评价文字形式的解题步骤
pub(crate) async fn evaluate(
    req_body: web::Json<EvaluationRequest>,
    provider: web::Data<dyn AiProvider>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    log::info!("[{}] evaluation request received", request_id);
    let result = evaluate_text(request_id, &req_body, provider.get_ref()).await;
    super::respond(request_id, result)
}

async fn evaluate_text(
    request_id: Uuid,
    request: &EvaluationRequest,
    provider: &dyn AiProvider,
) -> Result<EvaluationResponse, ApiError> {
    let input = validator::validate_evaluation(request)?;
    let feedback = run_evaluation(request_id, &input, provider).await?;
    Ok(EvaluationResponse::completed(feedback, input.step_count + 1))
}

/// 文字评价和图片评价共用
pub(crate) async fn run_evaluation(
    request_id: Uuid,
    input: &EvaluationInput<'_>,
    provider: &dyn AiProvider,
) -> Result<Feedback, ApiError> {
    let started = Instant::now();
    let raw = provider
        .complete(&prompts::evaluation_prompt(input))
        .await
        .map_err(|e| ApiError::provider("Evaluation failed", e))?;
    log::info!(
        "[{}] evaluation finished in {:.2}s: {}",
        request_id,
        started.elapsed().as_secs_f64(),
        super::ocr::preview(&raw)
    );
    Ok(Feedback::parse(&raw))
}

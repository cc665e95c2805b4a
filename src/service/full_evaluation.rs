use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::prompts;
use crate::structs::request::EvaluationRequest;
use crate::structs::respond::FullEvaluationResponse;
use crate::traits::provider::AiProvider;
use crate::utils::{decode_image, DecodedImage};
use crate::validator;

/// 识别成功但评价失败时，识别结果仍然返回给客户端
struct Failure {
    error: ApiError,
    partial: FullEvaluationResponse,
}

impl From<ApiError> for Failure {
    fn from(error: ApiError) -> Self {
        Failure {
            error,
            partial: FullEvaluationResponse::default(),
        }
    }
}

// JSON 请求，图片为 data URI
pub(crate) async fn full_evaluation(
    req_body: web::Json<EvaluationRequest>,
    provider: web::Data<dyn AiProvider>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    log::info!("[{}] full evaluation request received", request_id);
    evaluate(request_id, &req_body, provider.get_ref()).await
}

// 表单上传，图片为文件
pub(crate) async fn upload(
    payload: Multipart,
    provider: web::Data<dyn AiProvider>,
    config: web::Data<Config>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    log::info!("[{}] full evaluation upload received", request_id);
    match read_form(payload, config.max_payload_bytes()).await {
        Ok(request) => evaluate(request_id, &request, provider.get_ref()).await,
        Err(err) => super::respond::<FullEvaluationResponse>(request_id, Err(err)),
    }
}

async fn evaluate(
    request_id: Uuid,
    request: &EvaluationRequest,
    provider: &dyn AiProvider,
) -> HttpResponse {
    match process(request_id, request, provider).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(Failure { error, mut partial }) => {
            super::log_failure(request_id, &error);
            partial.error = Some(error.to_string());
            HttpResponse::build(error.status_code()).json(partial)
        }
    }
}

/// 先识别图片，再把识别结果当作学生答案进行评价
async fn process(
    request_id: Uuid,
    request: &EvaluationRequest,
    provider: &dyn AiProvider,
) -> Result<FullEvaluationResponse, Failure> {
    let input = validator::validate_full_evaluation(request)?;
    let image = decode_image(input.image)?;

    let started = Instant::now();
    let extracted = provider
        .complete(&prompts::ocr_prompt(&image))
        .await
        .map_err(|e| ApiError::provider("OCR failed", e))?;
    log::info!(
        "[{}] OCR processing time: {:.2}s",
        request_id,
        started.elapsed().as_secs_f64()
    );

    let next_step_count = input.step_count + 1;
    let chat_history = append_history(input.chat_history, &extracted);
    let evaluation =
        super::evaluate::run_evaluation(request_id, &input.with_answer(&extracted), provider).await;
    match evaluation {
        Ok(feedback) => Ok(FullEvaluationResponse::completed(
            extracted,
            feedback,
            next_step_count,
            chat_history,
        )),
        Err(error) => Err(Failure {
            error,
            partial: FullEvaluationResponse {
                extracted_text: Some(extracted),
                next_step_count: Some(next_step_count),
                chat_history: Some(chat_history),
                ..Default::default()
            },
        }),
    }
}

fn append_history(history: &str, extracted: &str) -> String {
    if history.is_empty() {
        extracted.to_string()
    } else {
        format!("{}\n{}", history, extracted)
    }
}

/// 读取表单字段，图片文件转为 data URI 后走和 JSON 请求相同的流程
async fn read_form(mut payload: Multipart, limit: usize) -> Result<EvaluationRequest, ApiError> {
    let mut request = EvaluationRequest::default();
    let mut total = 0usize;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::InvalidBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError::InvalidBody(e.to_string()))?
        {
            total += chunk.len();
            if total > limit {
                return Err(ApiError::PayloadTooLarge(limit));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "image" => request.image = image_field(data, content_type.as_deref())?,
            "question" => request.question = Some(text_field(&name, data)?),
            "correct_answer" => request.correct_answer = Some(text_field(&name, data)?),
            "chat_history" => request.chat_history = Some(text_field(&name, data)?),
            "currentStepCount" | "nextStepCount" => {
                let raw = text_field(&name, data)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let count = raw.parse::<u32>().map_err(|_| {
                        ApiError::InvalidBody(format!("{} must be a non-negative integer", name))
                    })?;
                    request.step_count = Some(count);
                }
            }
            _ => log::debug!("Ignoring form field {:?}", name),
        }
    }
    Ok(request)
}

// 空文件视为没有上传
fn image_field(data: Vec<u8>, content_type: Option<&str>) -> Result<Option<String>, ApiError> {
    if data.is_empty() {
        return Ok(None);
    }
    let declared = content_type.filter(|mime| mime.starts_with("image/"));
    Ok(Some(DecodedImage::from_bytes(data, declared)?.to_data_url()))
}

fn text_field(name: &str, data: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(data)
        .map_err(|_| ApiError::InvalidBody(format!("form field {} is not valid UTF-8", name)))
}

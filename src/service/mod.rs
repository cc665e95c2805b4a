use actix_web::error::InternalError;
use actix_web::guard::{self, GuardContext};
use actix_web::http::header;
use actix_web::{web, HttpResponse, ResponseError};
use uuid::Uuid;

use crate::error::ApiError;
use crate::structs::respond::{
    Envelope, EvaluationResponse, FullEvaluationResponse, OcrResponse,
};

pub mod evaluate;
pub mod full_evaluation;
pub mod ocr;
pub mod pages;

/// 注册所有路由
pub fn configure(cfg: &mut web::ServiceConfig, max_payload: usize) {
    cfg.route("/", web::get().to(pages::index))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(pages::health))
                .service(
                    web::resource("/ocr")
                        .app_data(json_config::<OcrResponse>(max_payload))
                        .route(web::post().to(ocr::ocr)),
                )
                .service(
                    web::resource("/evaluate")
                        .app_data(json_config::<EvaluationResponse>(max_payload))
                        .route(web::post().to(evaluate::evaluate)),
                )
                .service(
                    web::resource("/full_evaluation")
                        .app_data(json_config::<FullEvaluationResponse>(max_payload))
                        .route(
                            web::post()
                                .guard(guard::fn_guard(is_multipart))
                                .to(full_evaluation::upload),
                        )
                        .route(web::post().to(full_evaluation::full_evaluation)),
                ),
        )
        .default_service(web::to(pages::not_found));
}

/// 请求体解析失败时返回该接口自己的响应格式
fn json_config<T: Envelope + 'static>(max_payload: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_payload)
        .error_handler(|err, req| {
            let err = ApiError::from(err);
            log::warn!("Rejected body for {} {}: {}", req.method(), req.path(), err);
            let response = HttpResponse::build(err.status_code()).json(T::failed(err.to_string()));
            InternalError::from_response(err, response).into()
        })
}

fn is_multipart(ctx: &GuardContext<'_>) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// 把处理结果转换为 HTTP 响应，出错时带上接口自己的空字段
pub(crate) fn respond<T: Envelope>(request_id: Uuid, result: Result<T, ApiError>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(err) => {
            log_failure(request_id, &err);
            HttpResponse::build(err.status_code()).json(T::failed(err.to_string()))
        }
    }
}

pub(crate) fn log_failure(request_id: Uuid, err: &ApiError) {
    match err {
        ApiError::Internal(detail) => log::error!("[{}] internal error: {}", request_id, detail),
        err if err.is_client_error() => log::warn!("[{}] rejected request: {}", request_id, err),
        err => log::error!("[{}] {}", request_id, err),
    }
}

use serde::Serialize;

use crate::feedback::{Feedback, Verdict};

/// 所有接口共用的返回格式：success + error，再加上各接口自己的字段
pub trait Envelope: Serialize {
    fn failed(error: String) -> Self;
}

/// 没有接口专属字段时的错误返回
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: String) -> Self {
        ErrorBody { success: false, error }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl OcrResponse {
    pub fn completed(text: String) -> Self {
        OcrResponse {
            success: true,
            text: Some(text),
            error: None,
        }
    }
}

impl Envelope for OcrResponse {
    fn failed(error: String) -> Self {
        OcrResponse {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EvaluationResponse {
    pub success: bool,
    pub evaluation: Option<String>,
    pub hint: Option<String>,
    pub verdict: Option<Verdict>,
    #[serde(rename = "nextStepCount")]
    pub next_step_count: Option<u32>,
    pub error: Option<String>,
}

impl EvaluationResponse {
    pub fn completed(feedback: Feedback, next_step_count: u32) -> Self {
        EvaluationResponse {
            success: true,
            evaluation: Some(feedback.evaluation),
            hint: feedback.hint,
            verdict: feedback.verdict,
            next_step_count: Some(next_step_count),
            error: None,
        }
    }
}

impl Envelope for EvaluationResponse {
    fn failed(error: String) -> Self {
        EvaluationResponse {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct FullEvaluationResponse {
    pub success: bool,
    pub extracted_text: Option<String>,
    pub evaluation: Option<String>,
    pub hint: Option<String>,
    pub verdict: Option<Verdict>,
    pub is_finished: Option<bool>,
    #[serde(rename = "nextStepCount")]
    pub next_step_count: Option<u32>,
    pub chat_history: Option<String>,
    pub error: Option<String>,
}

impl FullEvaluationResponse {
    pub fn completed(
        extracted_text: String,
        feedback: Feedback,
        next_step_count: u32,
        chat_history: String,
    ) -> Self {
        FullEvaluationResponse {
            success: true,
            extracted_text: Some(extracted_text),
            is_finished: Some(feedback.is_finished()),
            evaluation: Some(feedback.evaluation),
            hint: feedback.hint,
            verdict: feedback.verdict,
            next_step_count: Some(next_step_count),
            chat_history: Some(chat_history),
            error: None,
        }
    }
}

impl Envelope for FullEvaluationResponse {
    fn failed(error: String) -> Self {
        FullEvaluationResponse {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::*;

    #[test]
    fn ocr_response_has_no_evaluation_fields() {
        let body = to_value(OcrResponse::completed("x = 2".into())).unwrap();
        assert_eq!(body, json!({"success": true, "text": "x = 2", "error": null}));
    }

    #[test]
    fn failed_envelopes_null_their_payload() {
        let ocr = to_value(OcrResponse::failed("bad".into())).unwrap();
        assert_eq!(ocr, json!({"success": false, "text": null, "error": "bad"}));

        let eval = to_value(EvaluationResponse::failed("bad".into())).unwrap();
        assert_eq!(eval["evaluation"], json!(null));
        assert_eq!(eval["success"], json!(false));
        assert!(eval.get("extracted_text").is_none());
    }

    #[test]
    fn full_response_reports_completion() {
        let feedback = Feedback {
            evaluation: "All done".into(),
            hint: Some("Your answer is correct".into()),
            verdict: Some(Verdict::Correct),
        };
        let body = to_value(FullEvaluationResponse::completed(
            "x = -1".into(),
            feedback,
            3,
            "(x+1)^2 = 0\nx = -1".into(),
        ))
        .unwrap();
        assert_eq!(body["is_finished"], json!(true));
        assert_eq!(body["verdict"], json!("correct"));
        assert_eq!(body["nextStepCount"], json!(3));
        assert_eq!(body["error"], json!(null));
    }
}

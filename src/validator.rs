use crate::error::ApiError;
use crate::structs::request::EvaluationRequest;

/// 文字评价所需的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationInput<'a> {
    pub question: &'a str,
    pub correct_answer: &'a str,
    pub student_answer: &'a str,
    pub chat_history: &'a str,
    pub step_count: u32,
}

/// 图片评价所需的字段，学生答案要等识别后才有
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullEvaluationInput<'a> {
    pub question: &'a str,
    pub image: &'a str,
    pub correct_answer: &'a str,
    pub chat_history: &'a str,
    pub step_count: u32,
}

impl<'a> FullEvaluationInput<'a> {
    pub fn with_answer<'b>(&'b self, student_answer: &'b str) -> EvaluationInput<'b> {
        EvaluationInput {
            question: self.question,
            correct_answer: self.correct_answer,
            student_answer,
            chat_history: self.chat_history,
            step_count: self.step_count,
        }
    }
}

/// 空字符串和只有空白的字段都视为缺失
fn required<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::MissingField(name)),
    }
}

/// 下一步的编号等于当前编号加一，当前编号不能取到上限
fn step_count(request: &EvaluationRequest) -> Result<u32, ApiError> {
    match request.step_count {
        Some(u32::MAX) => Err(ApiError::InvalidBody(format!(
            "currentStepCount must be less than {}",
            u32::MAX
        ))),
        count => Ok(count.unwrap_or(0)),
    }
}

pub fn validate_evaluation(request: &EvaluationRequest) -> Result<EvaluationInput<'_>, ApiError> {
    Ok(EvaluationInput {
        question: required("question", &request.question)?,
        correct_answer: required("correct_answer", &request.correct_answer)?,
        student_answer: required("student_answer", &request.student_answer)?,
        chat_history: request.chat_history.as_deref().unwrap_or_default().trim(),
        step_count: step_count(request)?,
    })
}

pub fn validate_full_evaluation(
    request: &EvaluationRequest,
) -> Result<FullEvaluationInput<'_>, ApiError> {
    Ok(FullEvaluationInput {
        question: required("question", &request.question)?,
        image: required("image", &request.image)?,
        correct_answer: required("correct_answer", &request.correct_answer)?,
        chat_history: request.chat_history.as_deref().unwrap_or_default().trim(),
        step_count: step_count(request)?,
    })
}

pub fn validate_ocr(request: &EvaluationRequest) -> Result<&str, ApiError> {
    required("image", &request.image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question: &str, image: &str, correct: &str, student: &str) -> EvaluationRequest {
        let field = |v: &str| if v.is_empty() { None } else { Some(v.to_string()) };
        EvaluationRequest {
            question: field(question),
            image: field(image),
            correct_answer: field(correct),
            student_answer: field(student),
            ..Default::default()
        }
    }

    fn missing(err: ApiError) -> &'static str {
        match err {
            ApiError::MissingField(name) => name,
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn evaluation_names_first_missing_field() {
        assert_eq!(missing(validate_evaluation(&request("", "", "", "")).unwrap_err()), "question");
        assert_eq!(
            missing(validate_evaluation(&request("q", "", "", "s")).unwrap_err()),
            "correct_answer"
        );
        assert_eq!(
            missing(validate_evaluation(&request("q", "", "a", "")).unwrap_err()),
            "student_answer"
        );
    }

    #[test]
    fn full_evaluation_checks_image_before_answer() {
        assert_eq!(
            missing(validate_full_evaluation(&request("q", "", "", "")).unwrap_err()),
            "image"
        );
        assert_eq!(
            missing(validate_full_evaluation(&request("q", "img", "", "")).unwrap_err()),
            "correct_answer"
        );
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let err = validate_ocr(&request("", "   ", "", "")).unwrap_err();
        assert_eq!(missing(err), "image");
    }

    #[test]
    fn valid_request_is_trimmed_and_defaults_applied() {
        let req = request(" Solve x+1=2 ", "", "x=1", "x = 1");
        let input = validate_evaluation(&req).unwrap();
        assert_eq!(input.question, "Solve x+1=2");
        assert_eq!(input.chat_history, "");
        assert_eq!(input.step_count, 0);
    }

    #[test]
    fn step_count_at_limit_is_rejected() {
        let mut req = request("q", "img", "a", "s");
        req.step_count = Some(u32::MAX);
        assert!(matches!(validate_evaluation(&req), Err(ApiError::InvalidBody(_))));
        assert!(matches!(validate_full_evaluation(&req), Err(ApiError::InvalidBody(_))));

        req.step_count = Some(u32::MAX - 1);
        assert_eq!(validate_evaluation(&req).unwrap().step_count, u32::MAX - 1);
    }

    #[test]
    fn extracted_answer_fills_evaluation_input() {
        let mut req = request("q", "img", "a", "");
        req.step_count = Some(4);
        let full = validate_full_evaluation(&req).unwrap();
        let extracted = String::from("x = 1");
        let input = full.with_answer(&extracted);
        assert_eq!(input.student_answer, "x = 1");
        assert_eq!(input.step_count, 4);
    }
}

use serde::Deserialize;

/// 三个接口共用的请求体，各接口只检查自己需要的字段
#[derive(Debug, Default, Deserialize)]
pub struct EvaluationRequest {
    pub question: Option<String>,
    /// data:image/<type>;base64,<payload>
    pub image: Option<String>,
    pub correct_answer: Option<String>,
    pub student_answer: Option<String>,
    /// 学生之前的解题步骤
    pub chat_history: Option<String>,
    #[serde(rename = "currentStepCount", alias = "nextStepCount")]
    pub step_count: Option<u32>,
}

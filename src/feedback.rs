use serde::Serialize;
use serde_json::{Map, Value};

/// 模型对当前步骤给出的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "correct")]
    Correct,
    #[serde(rename = "on track")]
    OnTrack,
    #[serde(rename = "incorrect")]
    Incorrect,
}

impl Verdict {
    /// "incorrect" 包含 "correct"，所以先判断否定的情况
    pub fn parse(raw: &str) -> Option<Verdict> {
        let raw = raw.trim().to_lowercase();
        if raw.contains("incorrect") {
            Some(Verdict::Incorrect)
        } else if raw.contains("on track") {
            Some(Verdict::OnTrack)
        } else if raw.contains("correct") {
            Some(Verdict::Correct)
        } else {
            None
        }
    }

    pub fn is_finished(self) -> bool {
        self == Verdict::Correct
    }
}

/// 从模型输出中解析出的评价和提示
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub evaluation: String,
    pub hint: Option<String>,
    pub verdict: Option<Verdict>,
}

impl Feedback {
    /// 解析失败时把原文作为 evaluation 返回
    pub fn parse(raw: &str) -> Feedback {
        let cleaned = strip_code_fences(raw);
        match parse_object(&cleaned).and_then(Feedback::from_object) {
            Some(feedback) => feedback,
            None => {
                log::warn!("Model reply is not the expected JSON object, passing it through");
                Feedback {
                    evaluation: cleaned,
                    hint: None,
                    verdict: None,
                }
            }
        }
    }

    fn from_object(object: Map<String, Value>) -> Option<Feedback> {
        let evaluation = object.get("evaluation").and_then(as_text)?;
        Some(Feedback {
            evaluation,
            hint: object.get("hint").and_then(as_text),
            verdict: object
                .get("verdict")
                .and_then(Value::as_str)
                .and_then(Verdict::parse),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.verdict.map_or(false, Verdict::is_finished)
    }
}

/// 去掉 ```json 代码块标记
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

// 模型有时会在 JSON 前后加说明文字，只取最外层的花括号
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let feedback = Feedback::parse(
            r###"{"evaluation": "## Current Step Analysis\nGood start.", "hint": "Subtract 5.", "verdict": "on track"}"###,
        );
        assert_eq!(feedback.evaluation, "## Current Step Analysis\nGood start.");
        assert_eq!(feedback.hint.as_deref(), Some("Subtract 5."));
        assert_eq!(feedback.verdict, Some(Verdict::OnTrack));
        assert!(!feedback.is_finished());
    }

    #[test]
    fn strips_fences_and_surrounding_text() {
        let raw = "Here you go:\n```json\n{\"evaluation\": \"Done\", \"hint\": \"Your answer is correct\", \"verdict\": \"Correct\"}\n```";
        let feedback = Feedback::parse(raw);
        assert_eq!(feedback.evaluation, "Done");
        assert_eq!(feedback.verdict, Some(Verdict::Correct));
        assert!(feedback.is_finished());
    }

    #[test]
    fn malformed_reply_passes_through() {
        // 缺少逗号，不是合法 JSON
        let raw = "{\n\"evaluation\": \"Check 13 - 5\",\n\"hint\": \"Try again\"\n\"verdict\": \"incorrect\"\n}";
        let feedback = Feedback::parse(raw);
        assert_eq!(feedback.evaluation, raw);
        assert!(feedback.hint.is_none());
        assert!(feedback.verdict.is_none());
    }

    #[test]
    fn plain_text_passes_through() {
        let feedback = Feedback::parse("  Looks right to me.  ");
        assert_eq!(feedback.evaluation, "Looks right to me.");
        assert!(!feedback.is_finished());
    }

    #[test]
    fn object_without_evaluation_passes_through() {
        let raw = r#"{"hint": "only a hint"}"#;
        assert_eq!(Feedback::parse(raw).evaluation, raw);
    }

    #[test]
    fn verdict_parsing_prefers_negative_match() {
        assert_eq!(Verdict::parse("Incorrect"), Some(Verdict::Incorrect));
        assert_eq!(Verdict::parse(" ON TRACK "), Some(Verdict::OnTrack));
        assert_eq!(Verdict::parse("correct"), Some(Verdict::Correct));
        assert_eq!(Verdict::parse("unsure"), None);
    }

    #[test]
    fn verdict_serializes_with_spaces() {
        assert_eq!(serde_json::to_string(&Verdict::OnTrack).unwrap(), "\"on track\"");
    }
}

use crate::utils::DecodedImage;
use crate::validator::EvaluationInput;

/// 用哪个模型由任务类型决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Ocr,
    Evaluation,
}

/// 发给模型的一次完整请求
#[derive(Debug, Clone)]
pub struct Prompt {
    pub task: Task,
    pub system: Option<&'static str>,
    pub user: String,
    /// data URL，随用户消息一起发送
    pub image_url: Option<String>,
}

pub const OCR_PROMPT: &str = "Extract all handwritten text from this image. \
Focus on mathematical expressions, numbers and equations, and transcribe every symbol and formula accurately. \
Reproduce the work exactly as it appears in the image, one line per written line. \
Format mathematical expressions strictly as markdown, using $...$ for inline math. \
Return only the extracted text without any additional commentary.";

pub const EVALUATION_PROMPT: &str = r###"You are a patient, supportive math tutor reviewing one step of a student's handwritten solution.

Tutoring rules:
- Evaluate only the student's current step, using the question, the correct answer and the previous steps for context.
- If the work so far is correct, do not give hints or solutions. Tell the student what to simplify or calculate next and let them do it.
- If the student made a simplification mistake, give a short, clear hint without computing it for them.
- If the mistake is conceptual (for example the wrong formula), guide them to recall the right concept. Never give the full solution.
- Never perform or show calculations, even when asked. Always ask the student to attempt the next step themselves.
- Use simple, everyday words: say "square root" rather than "radical", and say "denominator".
- Keep the guidance short (one or two sentences) and end with encouragement such as "Good work so far" or "Keep going, you're on track".
- Never use an em dash in the response.

Formatting rules:
- Write the evaluation and hint as markdown. Use $...$ for inline math and $$...$$ for display math; never write math as plain text.
- Structure the evaluation with a "## Current Step Analysis" section followed by a "## Next Step" section.
- Use \n for new lines inside JSON strings.

Verdict rules:
- "correct" only when the student's work is complete and the final answer matches the correct answer.
- "on track" when the work so far is right but unfinished.
- "incorrect" when the current step contains a mistake.

Reply with strict JSON only, no code fences and no text outside the object:
{"evaluation": "<markdown evaluation of the current step>", "hint": "<markdown hint, or 'Your answer is correct'>", "verdict": "correct" | "on track" | "incorrect"}"###;

pub fn ocr_prompt(image: &DecodedImage) -> Prompt {
    Prompt {
        task: Task::Ocr,
        system: None,
        user: OCR_PROMPT.to_string(),
        image_url: Some(image.to_data_url()),
    }
}

pub fn evaluation_prompt(input: &EvaluationInput<'_>) -> Prompt {
    let history = if input.chat_history.is_empty() {
        "None"
    } else {
        input.chat_history
    };
    let user = format!(
        "Question: {}\n\
         Correct Answer: {}\n\
         Student's previous steps (context only, do not grade them): {}\n\
         Student's current answer (evaluate this step only): {}",
        input.question, input.correct_answer, history, input.student_answer
    );
    Prompt {
        task: Task::Evaluation,
        system: Some(EVALUATION_PROMPT),
        user,
        image_url: None,
    }
}

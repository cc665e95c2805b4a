use async_trait::async_trait;

use crate::error::ProviderError;
use crate::prompts::Prompt;

/// 外部多模态模型服务，handler 只依赖这个接口
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// 发送一次完整请求并返回模型输出的文本
    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

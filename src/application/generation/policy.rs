//! 生成编排参数

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationPolicy {
    /// 流式增量提交的最小间隔
    pub commit_interval: Duration,
    /// 批量生成章节之间的停顿
    pub batch_pause: Duration,
    /// 自动锚点完成后的停顿
    pub anchor_pause: Duration,
    /// 存在锚点摘要时发送给模型的最近消息数
    pub recent_history_len: usize,
    /// 未锚定且消息数超过该值时提示锚定
    pub long_conversation_hint: usize,
}

impl Default for OrchestrationPolicy {
    fn default() -> Self {
        Self {
            commit_interval: Duration::from_millis(150),
            batch_pause: Duration::from_millis(1000),
            anchor_pause: Duration::from_millis(1000),
            recent_history_len: 6,
            long_conversation_hint: 50,
        }
    }
}

impl OrchestrationPolicy {
    /// 无停顿的参数（测试使用）
    pub fn immediate() -> Self {
        Self {
            commit_interval: Duration::ZERO,
            batch_pause: Duration::ZERO,
            anchor_pause: Duration::ZERO,
            ..Self::default()
        }
    }
}

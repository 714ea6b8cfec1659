//! 固定提示词与系统指令组装

use std::sync::Arc;

use crate::domain::document::sanitize_title;
use crate::domain::novel::{GenerationConfig, Message};

// ============================================================================
// System Instruction
// ============================================================================

/// 基础指令 + 锚点摘要 + 生效的知识库 + 生效的技能
pub fn build_system_instruction(config: &GenerationConfig, context_summary: Option<&str>) -> String {
    let mut instruction = config.system_instruction.clone();

    if let Some(summary) = context_summary.filter(|s| !s.trim().is_empty()) {
        instruction.push_str(&format!(
            "\n\n=== 剧情锚点 (Archive Context) ===\n这是前文的剧情与设定浓缩总结。请基于此继续创作，无需重复之前的内容。\n{}\n=== 锚点结束 ===\n",
            summary
        ));
    }

    let knowledge: Vec<_> = config.active_knowledge().collect();
    if !knowledge.is_empty() {
        instruction.push_str("\n\n=== MCP 知识库/上下文 (Knowledge Base) ===\n");
        for item in knowledge {
            instruction.push_str(&format!("\n[{}]:\n{}\n", item.name, item.content));
        }
        instruction.push_str("\n=== 请在创作时参考以上资料 ===\n");
    }

    let skills: Vec<_> = config.active_skills().collect();
    if !skills.is_empty() {
        instruction.push_str("\n\n=== 写作技能/风格 (Skills) ===\n");
        for item in skills {
            instruction.push_str(&format!("\n[{}]:\n{}\n", item.name, item.content));
        }
        instruction.push_str("\n=== 请在创作时遵循以上风格要求 ===\n");
    }

    instruction
}

/// 发送给模型的工作历史
///
/// 系统提示与空的占位回复不发送；存在锚点摘要时只保留最近 `recent_len` 条
pub fn working_history(
    messages: &[Arc<Message>],
    context_summary: Option<&str>,
    recent_len: usize,
) -> Vec<Arc<Message>> {
    let history: Vec<Arc<Message>> = messages
        .iter()
        .filter(|m| !m.is_system_notice())
        .filter(|m| !(m.is_model() && m.content().trim().is_empty()))
        .cloned()
        .collect();

    if context_summary.is_none() || history.len() <= recent_len {
        return history;
    }
    history[history.len() - recent_len..].to_vec()
}

// ============================================================================
// Anchor
// ============================================================================

pub const ANCHOR_PROMPT: &str = "【系统指令：分段锚定/卷末总结】
请对截止目前的小说内容进行“分段锚定”处理。我们将把长篇小说按“卷”或“单元”进行切割。
请生成一份高浓度的【剧情锚点】，用于作为下一卷的启动上下文。

请严格包含以下模块：
1. **卷末剧情总结**：简要概括当前这一卷/单元的核心剧情发生了什么，结局如何。
2. **核心锚点 (State)**：
   - 主角当前的物理状态（位置、等级、持有物）。
   - 主角当前的人际关系（盟友、敌人、待解决的羁绊）。
3. **关键未解伏笔**：下一卷必须要处理的剧情线索。
4. **衔接段**：一小段用于开启下一卷的“前情提要”，确保语气和文风连贯。

请以 `## 剧情锚点` 开头输出。";

const ANCHOR_PREVIEW_CHARS: usize = 100;

pub fn anchor_preview(digest: &str) -> String {
    digest.chars().take(ANCHOR_PREVIEW_CHARS).collect()
}

pub fn anchor_notice(digest: &str) -> String {
    format!(
        "✅ **锚点构建成功 (分段锚定完成)**\n\n历史剧情已归档到 AI 记忆中。历史消息已保留在界面上，但 AI 将仅关注最新的剧情锚点和后续内容，以节省 Token 并保持逻辑连贯。\n\n**当前锚点摘要：**\n{}...",
        anchor_preview(digest)
    )
}

pub fn auto_anchor_notice(current_chapters: usize) -> String {
    format!("自动触发剧情锚点 (第 {} 章)...", current_chapters)
}

pub const LONG_CONVERSATION_HINT: &str = "检测到对话过长，建议点击【剧情锚点】压缩上下文，避免遗忘。";

// ============================================================================
// Batch
// ============================================================================

pub fn toc_prompt(count: usize) -> String {
    format!(
        "请基于当前故事背景，批量生成接下来的 {} 个章节的目录。
【重要排版要求】
1. 请务必以 `## 目录` 作为开头标题。
2. 具体的章节列表请使用 Markdown 列表格式 (例如：1. 第X章 标题)。
3. **严禁**在列表项中使用标题格式 (##)，否则会导致系统识别错误。
4. 不要使用代码块。",
        count
    )
}

pub fn batch_start_message(count: usize) -> String {
    format!("【系统指令】开始批量生成接下来的 {} 个章节正文...", count)
}

pub fn chapter_prompt(words_per_chapter: u32) -> String {
    format!(
        "请撰写当前目录中下一个尚未撰写的章节正文。
【排版要求】
1. 必须明确标出章节标题，格式为：`## 第X章 标题` (请勿包含 (草稿) 或其他备注)。
2. **严禁**在结尾输出 \"Options:\" 交互选项。
3. **严禁**输出任何 \"好的\"、\"这是正文\" 等闲聊内容，直接输出小说内容。

【字数与内容硬性要求】
1. 字数目标：**{} 字**（这是一条硬性红线）。
2. 请通过大量的环境描写、心理活动、对话细节来填充内容。切勿写流水账。
3. 请将本章内容拆分为至少 3-4 个具体的场景或冲突点，逐一展开描写，不要一笔带过。",
        words_per_chapter
    )
}

pub fn auto_task_message(index: usize, total: usize, prompt: &str) -> String {
    format!("(自动任务 {}/{}) {}", index, total, prompt)
}

/// 批量章节完成后追加的快捷回复
pub const CHAPTER_FOLLOW_UPS: &[&str] = &["继续写下一章", "重写本章", "精修本章", "生成本章细纲"];

// ============================================================================
// Chat helpers
// ============================================================================

pub const CONTINUE_NEXT_CHAPTER: &str = "继续写下一章";
pub const REWRITE_THIS_CHAPTER: &str = "重写本章";

pub const SUMMARIZE_PROMPT: &str =
    "请简要总结之前的对话内容，包含已确定的核心设定、故事进展以及当前待解决的问题。";

pub fn analyze_prompt(title: &str, content: &str) -> String {
    format!("请分析以下章节：{}...\n{}", title, content)
}

pub fn optimize_prompt(title: &str, content: &str) -> String {
    format!("请优化润色以下章节：{}...\n{}", title, content)
}

pub fn regenerate_prompt(title: &str, words_per_chapter: u32) -> String {
    format!(
        "请完全重写这一章：{}...\n【要求】字数目标：**{} 字**以上...",
        title, words_per_chapter
    )
}

pub fn selection_prompt(text: &str) -> String {
    format!("请优化润色以下选中的段落...\n{}\n...", text)
}

// ============================================================================
// Deconstruct
// ============================================================================

const DECONSTRUCT_URL_TITLE: &str = "小说拆解分析";
const DECONSTRUCT_TITLE_MAX_CHARS: usize = 50;

/// 拆解会话的标题：链接统一命名，书名加 `拆解：` 前缀
pub fn deconstruct_title(source: &str) -> String {
    let source = source.trim();
    if source.starts_with("http") {
        return DECONSTRUCT_URL_TITLE.to_string();
    }
    let name: String = sanitize_title(source)
        .chars()
        .take(DECONSTRUCT_TITLE_MAX_CHARS)
        .collect();
    format!("拆解：{}", name)
}

pub fn deconstruct_prompt(source: &str) -> String {
    format!(
        "我希望你帮我拆解分析这本小说：{}。\n\n重要提示：\n\
1. 作为一个 AI 模型，你无法直接访问互联网链接。\n\
2. 如果用户提供的是链接 (URL)，请尝试根据链接中的关键词（如书名拼音、ID）判断是哪本书。如果你知道这本书（如果是知名小说），请直接基于你的知识库进行分析。\n\
3. 如果你无法识别该链接或不认识这本书，请直接告诉用户：“我无法访问该链接，也不认识这本书，请您提供该书的简介或开头正文，我将为您分析。” 并停止后续生成。\n\n\
如果这本是你知道的书，请分析它的：\n\
1. 题材类型与核心爽点\n\
2. 主角人设与金手指\n\
3. 读者画像与文风特点（例如：番茄快节奏、起点慢热逻辑严密等）\n\
4. 典型的开篇套路\n\n\
分析完成后，请基于这种风格，为我创建一个新的小说大纲。请先给出分析结果。",
        source.trim()
    )
}

pub fn error_message(message: &str) -> String {
    format!("⚠️ Error: {}", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::KnowledgeItem;

    fn item(name: &str, active: bool) -> KnowledgeItem {
        KnowledgeItem {
            id: name.to_string(),
            name: name.to_string(),
            content: format!("{}内容", name),
            is_active: active,
        }
    }

    #[test]
    fn test_system_instruction_composition() {
        let config = GenerationConfig {
            system_instruction: "BASE".into(),
            knowledge_items: vec![item("世界观", true), item("废弃设定", false)],
            skill_items: vec![item("快节奏", true)],
            ..GenerationConfig::default()
        };
        let instruction = build_system_instruction(&config, Some("## 剧情锚点\n摘要"));
        assert!(instruction.starts_with("BASE"));
        assert!(instruction.contains("=== 剧情锚点 (Archive Context) ===\n这是前文"));
        assert!(instruction.contains("[世界观]:\n世界观内容"));
        assert!(!instruction.contains("废弃设定"));
        assert!(instruction.contains("[快节奏]:"));

        let anchor_at = instruction.find("Archive Context").unwrap();
        let knowledge_at = instruction.find("Knowledge Base").unwrap();
        assert!(anchor_at < knowledge_at);
    }

    #[test]
    fn test_plain_instruction() {
        let config = GenerationConfig {
            system_instruction: "BASE".into(),
            ..GenerationConfig::default()
        };
        assert_eq!(build_system_instruction(&config, None), "BASE");
    }

    #[test]
    fn test_working_history_truncation() {
        let mut messages: Vec<Arc<Message>> = (0..20)
            .map(|i| Arc::new(Message::user(format!("m{}", i), i)))
            .collect();
        messages.push(Arc::new(Message::notice("✅", 21)));
        messages.push(Arc::new(Message::model("", 22)));

        let full = working_history(&messages, None, 6);
        assert_eq!(full.len(), 20);

        let recent = working_history(&messages, Some("摘要"), 6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[5].content(), "m19");
    }

    #[test]
    fn test_anchor_notice_preview() {
        let digest = "字".repeat(300);
        let notice = anchor_notice(&digest);
        assert!(notice.ends_with(&format!("{}...", "字".repeat(100))));
    }
}

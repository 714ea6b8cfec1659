//! 段落切分
//!
//! 逐行扫描剥离页脚后的模型消息，按 [`HeaderDetector`] 切出带标题的段落

use std::sync::Arc;

use super::{strip_options, HeaderDetector};
use crate::domain::novel::{Message, MessageId};

/// 段落（每次重算时生成，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    /// 去空白、小写化后的标题，用于同名段落去重
    pub key: String,
    pub content: String,
    pub source_message_id: MessageId,
    pub timestamp: i64,
    /// 在来源消息中的序号
    pub ordinal: usize,
}

/// 单条文本切分出的 (标题, 内容)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub title: String,
    pub content: String,
}

pub fn section_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 切分单条已清洗的文本
///
/// 第一个标题之前的内容不属于任何段落；内容为空的段落丢弃
pub fn segment_text(text: &str, detector: &HeaderDetector) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in text.lines() {
        match detector.detect(line, current.is_some()) {
            Some(header) => {
                flush(current.take(), &mut sections);
                let lines = header.inline.into_iter().collect();
                current = Some((header.title, lines));
            }
            None => {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line.to_string());
                }
            }
        }
    }
    flush(current, &mut sections);

    sections
}

fn flush(section: Option<(String, Vec<String>)>, out: &mut Vec<RawSection>) {
    let Some((title, lines)) = section else {
        return;
    };
    let content = lines.join("\n").trim().to_string();
    if !content.is_empty() {
        out.push(RawSection { title, content });
    }
}

/// 切分全部模型消息（系统提示与用户消息不参与）
pub fn segment_messages(messages: &[Arc<Message>], detector: &HeaderDetector) -> Vec<Section> {
    messages
        .iter()
        .filter(|m| m.is_authored_model_text())
        .flat_map(|message| {
            segment_text(&strip_options(message.content()), detector)
                .into_iter()
                .enumerate()
                .map(|(ordinal, raw)| Section {
                    key: section_key(&raw.title),
                    title: raw.title,
                    content: raw.content,
                    source_message_id: message.id().clone(),
                    timestamp: message.timestamp(),
                    ordinal,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<RawSection> {
        segment_text(text, &HeaderDetector::default())
    }

    #[test]
    fn test_basic_sections() {
        let text = "好的，下面是设定。\n\n## 基础设定\n题材：玄幻\n\n## 角色档案\n林风：主角\n";
        let sections = segment(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "基础设定");
        assert_eq!(sections[0].content, "题材：玄幻");
        assert_eq!(sections[1].title, "角色档案");
        assert_eq!(sections[1].content, "林风：主角");
    }

    #[test]
    fn test_emphasis_does_not_fragment_chapter() {
        let text = "## 第1章 风起\n他推开门。\n**小心！**\n一道剑光闪过。";
        let sections = segment(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.contains("**小心！**"));
        assert!(sections[0].content.ends_with("一道剑光闪过。"));
    }

    #[test]
    fn test_dialogue_label_inside_chapter() {
        let text = "## 第2章 夜行\n走吧：他说\n众人出发。";
        let sections = segment(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.starts_with("走吧：他说"));
    }

    #[test]
    fn test_label_seeds_inline_content() {
        let sections = segment("书名：《雾都》\n一座被雾笼罩的城市。");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "书名");
        assert_eq!(sections[0].content, "《雾都》\n一座被雾笼罩的城市。");
    }

    #[test]
    fn test_empty_sections_dropped() {
        let sections = segment("## 第3章 未完\n\n## 第4章 开始\n正文");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "第4章 开始");
    }

    #[test]
    fn test_segment_messages_skips_user_and_notices() {
        let messages = vec![
            Arc::new(Message::user("## 角色档案\n用户写的", 1)),
            Arc::new(Message::model("## 角色档案\nA\n\nOptions: [继续]", 2)),
            Arc::new(Message::notice("## 剧情锚点\n提示", 3)),
        ];
        let sections = segment_messages(&messages, &HeaderDetector::default());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "A");
        assert_eq!(sections[0].key, "角色档案");
        assert_eq!(sections[0].source_message_id, *messages[1].id());
    }

    #[test]
    fn test_section_key() {
        assert_eq!(section_key("Character  Profiles"), "characterprofiles");
        assert_eq!(section_key("第1章 风起"), "第1章风起");
    }
}

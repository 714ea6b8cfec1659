//! 小说文档视图
//!
//! 对消息列表的纯计算：同一消息列表总是得到完全相同的文档

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use super::{
    assemble_chapters, classify, extract_options, segment_messages, Chapter, HeaderDetector,
    ParseRules, Section,
};
use crate::domain::novel::{Message, NovelSession};

static TOC_LIST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\d+\.\s+第[0-9一二三四五六七八九十]+章").expect("invalid toc list regex")
});

const TOC_HEADER: &str = "## 目录";

/// 未设置目标章节数时的展示值
const FALLBACK_TOTAL_CHAPTERS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelStats {
    pub current_chapters: usize,
    pub total_chapters: u32,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelDocument {
    pub title: String,
    pub settings: Vec<Section>,
    pub database: Vec<Section>,
    pub chapters: Vec<Chapter>,
    /// 未能归类的段落，只在原始对话中可见
    pub unclassified: Vec<Section>,
    pub stats: NovelStats,
    /// 最后一条模型消息的快捷回复
    pub quick_replies: Vec<String>,
    pub has_table_of_contents: bool,
}

/// 是否已经生成过目录
pub fn has_table_of_contents(messages: &[Arc<Message>]) -> bool {
    messages.iter().filter(|m| m.is_authored_model_text()).any(|m| {
        m.content().contains(TOC_HEADER) || TOC_LIST_LINE.is_match(m.content())
    })
}

#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    detector: HeaderDetector,
}

impl DocumentParser {
    pub fn new(rules: ParseRules) -> Self {
        Self {
            detector: HeaderDetector::new(rules),
        }
    }

    pub fn chapters(&self, messages: &[Arc<Message>]) -> Vec<Chapter> {
        let vocabulary = self.detector.vocabulary();
        let classified = classify(segment_messages(messages, &self.detector), vocabulary);
        assemble_chapters(&classified.chapters, vocabulary)
    }

    /// 当前章节数（批量生成期间每轮重新计算）
    pub fn count_chapters(&self, messages: &[Arc<Message>]) -> usize {
        self.chapters(messages).len()
    }

    pub fn parse(&self, session: &NovelSession) -> NovelDocument {
        let vocabulary = self.detector.vocabulary();
        let messages = session.messages();
        let classified = classify(segment_messages(messages, &self.detector), vocabulary);
        let chapters = assemble_chapters(&classified.chapters, vocabulary);

        let target = session.settings().target_total_chapters;
        let stats = NovelStats {
            current_chapters: chapters.len(),
            total_chapters: if target == 0 {
                FALLBACK_TOTAL_CHAPTERS
            } else {
                target
            },
            word_count: chapters.iter().map(|c| c.word_count).sum(),
        };

        let quick_replies = messages
            .iter()
            .rev()
            .find(|m| m.is_authored_model_text())
            .map(|m| extract_options(m.content()))
            .unwrap_or_default();

        NovelDocument {
            title: session.title().to_string(),
            settings: classified.settings,
            database: classified.database,
            chapters,
            unclassified: classified.unclassified,
            stats,
            quick_replies,
            has_table_of_contents: has_table_of_contents(messages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::SessionEvent;

    fn session_with(replies: &[&str]) -> NovelSession {
        let mut session = NovelSession::new(0);
        for (i, reply) in replies.iter().enumerate() {
            let ts = i as i64 + 1;
            for message in [Message::user("继续", ts), Message::model(*reply, ts)] {
                session = session
                    .apply(&SessionEvent::MessageAppended { message }, ts)
                    .unwrap();
            }
        }
        session
    }

    #[test]
    fn test_idempotent_reparse() {
        let session = session_with(&[
            "## 基础设定\n题材：玄幻\n\n## 角色档案\n林风",
            "## 第2章 中\n正文二",
            "## 第1章 始\n正文一\n\nOptions: [继续写下一章]",
        ]);
        let parser = DocumentParser::default();
        let first = parser.parse(&session);
        let second = parser.parse(&session);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.quick_replies, vec!["继续写下一章"]);
    }

    #[test]
    fn test_database_last_write_wins() {
        let session = session_with(&["## 角色档案\nA", "## 角色档案\nB"]);
        let document = DocumentParser::default().parse(&session);
        assert_eq!(document.database.len(), 1);
        assert_eq!(document.database[0].content, "B");
    }

    #[test]
    fn test_chapter_ordering_is_numeric() {
        let session = session_with(&["## 第2章\n二", "## 第1章\n一", "## 第10章\n十"]);
        let document = DocumentParser::default().parse(&session);
        let titles: Vec<_> = document.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["第1章", "第2章", "第10章"]);
    }

    #[test]
    fn test_toc_is_not_a_chapter() {
        let session = session_with(&["## 目录\n1. 第5章 风暴\n2. 第6章 余波"]);
        let document = DocumentParser::default().parse(&session);
        assert!(document.chapters.is_empty());
        assert!(document.has_table_of_contents);
        assert_eq!(document.settings[0].title, "目录");
    }

    #[test]
    fn test_chapter_range_toc_is_visible_in_settings() {
        let session = session_with(&["## 第1章-第10章 目录
1. 第1章 风起
2. 第2章 云涌"]);
        let document = DocumentParser::default().parse(&session);
        assert!(document.chapters.is_empty());
        assert_eq!(document.settings.len(), 1);
        assert_eq!(document.settings[0].title, "第1章-第10章 目录");
    }

    #[test]
    fn test_stats() {
        let first = format!("## 第1章 始\n{}", "字".repeat(500));
        let second = format!("## 第2章 续\n{}", "文".repeat(800));
        let session = session_with(&[&first, &second]);
        let document = DocumentParser::default().parse(&session);
        assert_eq!(document.stats.current_chapters, 2);
        assert_eq!(document.stats.total_chapters, 20);
        assert_eq!(document.stats.word_count, 1300);
    }

    #[test]
    fn test_unstructured_reply_degrades_gracefully() {
        let session = session_with(&["随便聊聊，没有任何结构。", "**Boom!**\n砰"]);
        let document = DocumentParser::default().parse(&session);
        assert!(document.settings.is_empty());
        assert!(document.database.is_empty());
        assert!(document.chapters.is_empty());
        assert!(!document.has_table_of_contents);
    }

    #[test]
    fn test_no_toc_in_numbered_prose() {
        let messages = vec![Arc::new(Message::model("1. 准备\n2. 出发", 1))];
        assert!(!has_table_of_contents(&messages));
        let messages = vec![Arc::new(Message::model("1. 第1章 风起", 1))];
        assert!(has_table_of_contents(&messages));
    }
}

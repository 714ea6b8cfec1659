//! 段落分类
//!
//! 优先级: 章节标记 > 数据库词表 > 设定词表 > 未分类
//! 带章节标记的目录类标题（如 `第1章-第10章 目录`）归入设定

use std::collections::HashSet;

use super::{HeaderVocabulary, Section, CHAPTER_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Settings,
    Database,
    Chapter,
    Unclassified,
}

pub fn classify_title(title: &str, vocabulary: &HeaderVocabulary) -> Region {
    if CHAPTER_MARKER.is_match(title) {
        if vocabulary.is_toc(title) {
            Region::Settings
        } else {
            Region::Chapter
        }
    } else if vocabulary.is_database(title) {
        Region::Database
    } else if vocabulary.is_settings(title) {
        Region::Settings
    } else {
        Region::Unclassified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedSections {
    pub settings: Vec<Section>,
    pub database: Vec<Section>,
    /// 章节候选（不含目录类标题）
    pub chapters: Vec<Section>,
    pub unclassified: Vec<Section>,
}

/// 同名段落只保留最后一次出现，按最后出现的位置排序
pub fn dedup_last_write_wins(sections: Vec<Section>) -> Vec<Section> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Section> = sections
        .into_iter()
        .rev()
        .filter(|section| seen.insert(section.key.clone()))
        .collect();
    kept.reverse();
    kept
}

pub fn classify(sections: Vec<Section>, vocabulary: &HeaderVocabulary) -> ClassifiedSections {
    let mut classified = ClassifiedSections::default();
    for section in dedup_last_write_wins(sections) {
        let bucket = match classify_title(&section.title, vocabulary) {
            Region::Settings => &mut classified.settings,
            Region::Database => &mut classified.database,
            Region::Chapter => &mut classified.chapters,
            Region::Unclassified => &mut classified.unclassified,
        };
        bucket.push(section);
    }
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::section_key;
    use crate::domain::novel::MessageId;

    fn section(title: &str, content: &str, timestamp: i64) -> Section {
        Section {
            title: title.to_string(),
            key: section_key(title),
            content: content.to_string(),
            source_message_id: MessageId::from(format!("m{}", timestamp)),
            timestamp,
            ordinal: 0,
        }
    }

    #[test]
    fn test_region_precedence() {
        let vocab = HeaderVocabulary::default();
        assert_eq!(classify_title("角色设定", &vocab), Region::Database);
        assert_eq!(classify_title("世界观", &vocab), Region::Settings);
        assert_eq!(classify_title("第3章 角色登场", &vocab), Region::Chapter);
        assert_eq!(classify_title("第十二章 归来", &vocab), Region::Chapter);
        assert_eq!(classify_title("后记", &vocab), Region::Unclassified);
    }

    #[test]
    fn test_chapter_range_toc_goes_to_settings() {
        let vocab = HeaderVocabulary::default();
        assert_eq!(classify_title("第1章-第10章 目录", &vocab), Region::Settings);

        let classified = classify(
            vec![
                section("第1章-第10章 目录", "1. 第1章 风起", 1),
                section("第1章 风起", "正文", 2),
            ],
            &vocab,
        );
        assert_eq!(classified.settings[0].title, "第1章-第10章 目录");
        assert_eq!(classified.chapters.len(), 1);
        assert_eq!(classified.chapters[0].title, "第1章 风起");
    }

    #[test]
    fn test_last_write_wins() {
        let sections = vec![
            section("角色档案", "A", 1),
            section("世界观", "W", 2),
            section("角色 档案", "B", 3),
        ];
        let classified = classify(sections, &HeaderVocabulary::default());
        assert_eq!(classified.database.len(), 1);
        assert_eq!(classified.database[0].content, "B");
        assert_eq!(classified.settings[0].content, "W");
    }

    #[test]
    fn test_each_section_lands_in_one_bucket() {
        let sections = vec![
            section("势力设定", "S", 1),
            section("大纲", "O", 2),
            section("第1章 风起", "C", 3),
        ];
        let classified = classify(sections, &HeaderVocabulary::default());
        let total = classified.settings.len()
            + classified.database.len()
            + classified.chapters.len()
            + classified.unclassified.len();
        assert_eq!(total, 3);
        assert_eq!(classified.database[0].title, "势力设定");
        assert_eq!(classified.chapters[0].title, "第1章 风起");
    }
}

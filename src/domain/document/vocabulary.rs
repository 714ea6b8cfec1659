//! 标题词表
//!
//! 词表针对简体中文生成器调优，通过配置 `document.vocabulary` 覆盖

use serde::{Deserialize, Serialize};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// 区域关键词（大小写不敏感的子串匹配）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderVocabulary {
    /// 强标题：允许三级标题与加粗行开启新段落
    pub strong: Vec<String>,
    /// 基础设定区
    pub settings: Vec<String>,
    /// 数据库区（优先于设定区）
    pub database: Vec<String>,
    /// 目录/大纲类标题，从章节中排除
    pub toc: Vec<String>,
}

impl Default for HeaderVocabulary {
    fn default() -> Self {
        Self {
            strong: words(&[
                "书名", "简介", "大纲", "世界观", "设定", "角色", "人物", "势力", "物品", "目录",
                "背景", "梗概", "档案", "关系", "功法", "境界", "数据库", "Title", "Synopsis",
                "Outline", "World", "Setting", "Character", "Faction", "Item", "Contents",
            ]),
            settings: words(&[
                "书名", "基础设定", "设定", "大纲", "世界观", "概要", "背景", "梗概", "简介",
                "故事线", "核心梗", "分卷", "目录", "Title", "Outline", "Summary", "Setting",
                "Background", "Synopsis", "Storyline", "World", "Contents",
            ]),
            database: words(&[
                "数据库", "角色", "人物", "势力", "关系", "物品", "功法", "科技", "档案", "体系",
                "境界", "Database", "Character", "Faction", "Item", "Relationship", "Power",
            ]),
            toc: words(&[
                "目录", "列表", "大纲", "细纲", "规划", "Contents", "Outline", "Structure",
            ]),
        }
    }
}

impl HeaderVocabulary {
    pub fn is_strong(&self, title: &str) -> bool {
        contains_any(&self.strong, title)
    }

    pub fn is_settings(&self, title: &str) -> bool {
        contains_any(&self.settings, title)
    }

    pub fn is_database(&self, title: &str) -> bool {
        contains_any(&self.database, title)
    }

    pub fn is_toc(&self, title: &str) -> bool {
        contains_any(&self.toc, title)
    }
}

fn contains_any(keywords: &[String], title: &str) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| title.contains(&k.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let vocab = HeaderVocabulary::default();
        assert!(vocab.is_database("CHARACTER profiles"));
        assert!(vocab.is_settings("基础设定"));
        assert!(vocab.is_toc("章节目录"));
        assert!(!vocab.is_strong("小心！"));
    }

    #[test]
    fn test_partial_override() {
        let vocab: HeaderVocabulary = serde_json::from_str(r#"{"strong":["Prologue"]}"#).unwrap();
        assert!(vocab.is_strong("prologue"));
        assert!(!vocab.is_strong("角色"));
        assert!(vocab.is_database("角色"));
    }
}

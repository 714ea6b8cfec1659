//! Document Context - 小说文档重建
//!
//! 从自由文本的对话消息中重建结构化文档:
//! 消息 → 段落切分 → 段落分类 → {设定, 数据库} + 章节组装
//!
//! 整个流水线是纯函数，没有 I/O、时钟和隐藏状态

mod chapters;
mod classifier;
mod config_extractor;
mod header;
mod options;
mod segmenter;
mod title;
mod view;
mod vocabulary;

pub use chapters::{
    assemble_chapters, count_words, parse_chapter_number, parse_chinese_numeral, Chapter,
};
pub use classifier::{classify, classify_title, dedup_last_write_wins, ClassifiedSections, Region};
pub use config_extractor::{extract_announced_title, extract_config, Extraction};
pub use header::{
    HeaderDetector, HeaderMatch, HeaderTier, ParseRules, DEFAULT_BOLD_HEADER_MAX_CHARS,
    DEFAULT_LABEL_MAX_CHARS,
};
pub use options::{append_options, extract_options, strip_options, OPTIONS_MARKER};
pub use segmenter::{section_key, segment_messages, segment_text, RawSection, Section};
pub use title::sanitize_title;
pub use view::{has_table_of_contents, DocumentParser, NovelDocument, NovelStats};
pub use vocabulary::HeaderVocabulary;

pub(crate) use header::CHAPTER_MARKER;

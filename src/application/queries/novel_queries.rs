//! Novel Queries - 文档视图与书库

use crate::domain::novel::SessionId;

/// 获取重建后的小说文档（设定 / 数据库 / 章节 / 统计）
#[derive(Debug, Clone)]
pub struct GetNovelDocument {
    pub session_id: SessionId,
}

/// 获取完整会话快照
#[derive(Debug, Clone)]
pub struct GetNovelSession {
    pub session_id: SessionId,
}

/// 列出所有会话（按最后修改时间倒序）
#[derive(Debug, Clone)]
pub struct ListNovelSessions;

/// 导出书库（与导入格式一致）
#[derive(Debug, Clone)]
pub struct ExportLibrary;

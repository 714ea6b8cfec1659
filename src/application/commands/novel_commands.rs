//! Novel Commands - 会话管理

use serde_json::Value;

use crate::domain::novel::SessionId;

/// 新建小说命令
#[derive(Debug, Clone, Default)]
pub struct CreateNovelSession {
    pub title: Option<String>,
}

/// 删除小说命令
#[derive(Debug, Clone)]
pub struct DeleteNovelSession {
    pub session_id: SessionId,
}

/// 重命名命令
#[derive(Debug, Clone)]
pub struct RenameNovelSession {
    pub session_id: SessionId,
    pub title: String,
}

/// 导入书库命令（会话数组或早期单会话格式）
#[derive(Debug, Clone)]
pub struct ImportLibrary {
    pub payload: Value,
}

/// 小说拆解/仿写命令：新建会话并分析目标小说的风格
#[derive(Debug, Clone)]
pub struct DeconstructNovel {
    /// 书名或链接
    pub source: String,
}

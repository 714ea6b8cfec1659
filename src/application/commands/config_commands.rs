//! Config Commands - 生成配置与锚点策略

use crate::domain::novel::{AnchorMode, ConfigPatch, SessionId};

/// 应用配置补丁命令
#[derive(Debug, Clone)]
pub struct ApplyConfigPatch {
    pub session_id: SessionId,
    pub patch: ConfigPatch,
}

/// 保存锚点策略命令
#[derive(Debug, Clone)]
pub struct ConfigureAnchor {
    pub session_id: SessionId,
    pub enabled: bool,
    pub mode: AnchorMode,
    /// 20 或 50
    pub chapter_interval: u32,
}

/// 切换雪花写作模式命令
#[derive(Debug, Clone)]
pub struct SetSnowflakeMode {
    pub session_id: SessionId,
    pub enabled: bool,
}

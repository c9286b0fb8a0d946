//! 成就检查服务专用错误类型
//!
//! 在共享库 CommentError 基础上定义本服务特有的错误变体。
//! 用户名无法解析对任务是致命错误：不在内部重试，直接抛给
//! 队列运行时按其失败策略处理。

use comment_shared::error::CommentError;

/// 成就检查错误
#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    /// 用户名在目录中不存在，任务失败交由队列的失败策略处理
    #[error("用户不存在: {username}")]
    UnknownUser { username: String },

    /// 符号化徽章标识无法解析为具体类型
    #[error("未知徽章类型: {name}")]
    UnknownBadge { name: String },

    /// 本服务只处理成就检查任务，收到其他类型说明路由配置有误
    #[error("不支持的任务类型: {kind}")]
    UnsupportedTask { kind: String },

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] CommentError),
}

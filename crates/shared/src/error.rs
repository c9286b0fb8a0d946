//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum CommentError {
    // ==================== 存储错误 ====================
    #[error("存储错误: {0}")]
    Storage(String),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 队列错误 ====================
    #[error("队列错误: {0}")]
    Queue(String),

    // ==================== 通知投递错误 ====================
    #[error("通知投递失败: {0}")]
    Delivery(String),

    // ==================== 业务逻辑错误 ====================
    #[error("未注册的可评论实体类型: {kind}")]
    UnknownCommentableKind { kind: String },

    #[error("用户不存在: {username}")]
    UnknownUser { username: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, CommentError>;

impl CommentError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::UnknownCommentableKind { .. } => "UNKNOWN_COMMENTABLE_KIND",
            Self::UnknownUser { .. } => "UNKNOWN_USER",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 存储、队列、投递类错误属于基础设施故障，由队列/投递方的
    /// 重试策略兜底；业务与验证类错误重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Queue(_) | Self::Delivery(_))
    }
}

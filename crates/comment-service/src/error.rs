//! 评论服务专用错误类型
//!
//! 在共享库 CommentError 基础上定义本服务特有的错误变体，
//! 使上层可以精确区分"验证失败/评论缺失"等不同失败原因，
//! 而无需在共享库中为每个服务追加变体。

use comment_shared::error::CommentError;

/// 评论服务错误
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// 评论内容未通过创建时验证（如正文短于最小长度）
    #[error("评论内容不合法: {0}")]
    InvalidComment(String),

    /// 操作目标评论不存在
    #[error("评论未找到: comment_id={comment_id}")]
    CommentNotFound { comment_id: i64 },

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] CommentError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, CommentServiceError>;

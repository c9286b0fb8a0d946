//! 直接通知投递契约
//!
//! 通过 `NotificationDelivery` trait 抽象投递行为，真实的投递通道
//! （邮件、推送）由外部系统提供。当前内置实现为模拟投递（仅记录日志），
//! 便于在无外部依赖的情况下验证分发管道的完整性。未来替换为真实
//! 通道时只需实现同一 trait。

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use comment_shared::error::Result;

use crate::model::CommentId;

/// 通知投递接口
///
/// 投递是尽力而为的：失败重试由投递基础设施兜底，
/// 本子系统不假设投递同步成功。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    /// 投递"收到新评论"通知
    async fn deliver_comment_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()>;

    /// 投递"评论中提到了你"通知
    async fn deliver_comment_reply_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// 模拟投递
// ---------------------------------------------------------------------------

/// 模拟通知投递
///
/// 生产环境中替换为真实投递通道的 SDK 调用
pub struct LogNotificationDelivery;

#[async_trait]
impl NotificationDelivery for LogNotificationDelivery {
    async fn deliver_comment_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()> {
        info!(recipient, author, comment_id, "模拟投递新评论通知");
        Ok(())
    }

    async fn deliver_comment_reply_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()> {
        info!(recipient, author, comment_id, "模拟投递评论提及通知");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 记录式投递
// ---------------------------------------------------------------------------

/// 已投递通知的记录
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredNotification {
    pub kind: DeliveredKind,
    pub recipient: String,
    pub author: String,
    pub comment_id: CommentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveredKind {
    Comment,
    CommentReply,
}

/// 记录式通知投递
///
/// 只记录投递请求而不真正发送，供测试断言投递行为（收件人、类型）。
#[derive(Debug, Default)]
pub struct RecordingNotificationDelivery {
    delivered: Mutex<Vec<DeliveredNotification>>,
}

impl RecordingNotificationDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已投递通知的快照
    pub fn delivered(&self) -> Vec<DeliveredNotification> {
        self.delivered.lock().clone()
    }

    /// 发给指定收件人的通知
    pub fn delivered_to(&self, recipient: &str) -> Vec<DeliveredNotification> {
        self.delivered
            .lock()
            .iter()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationDelivery for RecordingNotificationDelivery {
    async fn deliver_comment_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()> {
        self.delivered.lock().push(DeliveredNotification {
            kind: DeliveredKind::Comment,
            recipient: recipient.to_string(),
            author: author.to_string(),
            comment_id,
        });
        Ok(())
    }

    async fn deliver_comment_reply_notification(
        &self,
        recipient: &str,
        author: &str,
        comment_id: CommentId,
    ) -> Result<()> {
        self.delivered.lock().push(DeliveredNotification {
            kind: DeliveredKind::CommentReply,
            recipient: recipient.to_string(),
            author: author.to_string(),
            comment_id,
        });
        Ok(())
    }
}

//! 事件负载组装
//!
//! 把一次评论动作组装为广播给下游的事件数据：实体公开投影合并
//! 评论数/点赞数、作者用户名、置空的 body 与秒级 created_at。
//! 正文内容不回显进事件。分类是纯函数：有 liker 即点赞事件，
//! 否则是新评论事件，没有持久化状态机。

use std::sync::Arc;

use serde_json::json;

use comment_shared::error::{CommentError, Result};
use comment_shared::events::EventType;
use comment_shared::users::UserDirectory;

use crate::commentable::CommentableHost;
use crate::model::Comment;

/// 组装选项
///
/// `liker` 仅在点赞触发的事件中出现，会覆盖负载中的用户名。
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub liker: Option<String>,
}

impl ComposeOptions {
    pub fn liked_by(username: impl Into<String>) -> Self {
        Self {
            liker: Some(username.into()),
        }
    }
}

/// 事件负载组装器
pub struct EventComposer {
    directory: Arc<dyn UserDirectory>,
}

impl EventComposer {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// 按组装选项对事件做两路分类
    pub fn classify(options: &ComposeOptions) -> EventType {
        if options.liker.is_some() {
            EventType::CommentLike
        } else {
            EventType::NewComment
        }
    }

    /// 组装事件数据
    pub async fn compose(
        &self,
        comment: &Comment,
        host: &Arc<dyn CommentableHost>,
        options: &ComposeOptions,
    ) -> Result<serde_json::Value> {
        let mut data = host.to_public_projection().await;
        let Some(fields) = data.as_object_mut() else {
            return Err(CommentError::Internal(
                "可评论实体的公开投影不是 JSON 对象".to_string(),
            ));
        };

        fields.insert("comments".to_string(), json!(host.comment_count().await));
        fields.insert("likes".to_string(), json!(comment.likes_cache));

        // 作者缺失时用户名为 null，与目录记录被删除的场景对齐
        let author_username = self
            .directory
            .find_many_by_id(&[comment.author_id])
            .await?
            .into_iter()
            .next()
            .map(|user| user.username);
        fields.insert("user".to_string(), json!({"username": author_username}));

        // 正文不回显进事件，只保留占位对象
        fields.insert("body".to_string(), json!({}));
        fields.insert(
            "created_at".to_string(),
            json!(comment.created_at.timestamp()),
        );

        if let Some(liker) = &options.liker {
            fields.insert("user".to_string(), json!({"username": liker}));
            fields.insert("liker".to_string(), json!(liker));
        }

        Ok(data)
    }
}

//! 事件受众解析
//!
//! 把事件类型映射到通知目标：新评论事件通知实体属主，其余事件
//! （含点赞）默认通知评论作者。提及产生的受众不走此解析器，
//! 由分发器基于解析出的提及用户集合单独构造。

use std::sync::Arc;

use comment_shared::events::{Audience, EventType};

use crate::commentable::CommentableHost;
use crate::model::Comment;

/// 受众解析器
pub struct AudienceResolver;

impl AudienceResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析事件的默认受众
    ///
    /// 属主缺失时新评论事件退化为空受众，不是错误。
    pub async fn resolve(
        &self,
        event_type: &EventType,
        comment: &Comment,
        host: &Arc<dyn CommentableHost>,
    ) -> Audience {
        match event_type {
            EventType::NewComment => Audience::user(host.owner_user_id().await),
            _ => Audience::user(Some(comment.author_id)),
        }
    }
}

impl Default for AudienceResolver {
    fn default() -> Self {
        Self::new()
    }
}

//! 事件模型
//!
//! 定义评论动作广播给下游消费者的事件类型、受众描述和事件负载。
//! 事件负载是临时结构：组装、入队、丢弃，没有持久化身份。

use serde::{Deserialize, Serialize};

use crate::users::UserId;

// ---------------------------------------------------------------------------
// EventType — 事件类型枚举
// ---------------------------------------------------------------------------

/// 事件类型枚举
///
/// 评论子系统只产生三类事件：新评论、评论被点赞、评论回复（@提及）。
/// 分类结果决定受众解析走哪条路径，也是下游消费者路由的依据。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NewComment,
    CommentLike,
    CommentReply,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 序列化为 SCREAMING_SNAKE_CASE 保持与 serde 的一致性，
        // 便于在日志和任务参数中统一引用
        let s = match self {
            Self::NewComment => "NEW_COMMENT",
            Self::CommentLike => "COMMENT_LIKE",
            Self::CommentReply => "COMMENT_REPLY",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Audience — 事件受众
// ---------------------------------------------------------------------------

/// 事件受众
///
/// 通知或事件的目标用户 id 集合。空受众是合法取值（例如被评论实体
/// 没有属主），表示该事件没有通知目标，而不是错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    pub user_ids: Vec<UserId>,
}

impl Audience {
    /// 单用户受众；属主缺失时退化为空受众
    pub fn user(user_id: Option<UserId>) -> Self {
        Self {
            user_ids: user_id.into_iter().collect(),
        }
    }

    /// 多用户受众，去重并保持首次出现的顺序
    pub fn users(user_ids: Vec<UserId>) -> Self {
        let mut seen = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        Self { user_ids: seen }
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EventPayload — 事件负载
// ---------------------------------------------------------------------------

/// 事件负载
///
/// 延迟事件生成任务的参数体。`data` 由 EventComposer 组装：被评论实体的
/// 公开投影合并评论数/点赞数、作者用户名、置空的 body 和秒级 created_at，
/// 点赞事件额外携带 liker 字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_type: EventType,
    pub audience: Audience,
    pub data: serde_json::Value,
}

impl EventPayload {
    pub fn new(event_type: EventType, audience: Audience, data: serde_json::Value) -> Self {
        Self {
            event_type,
            audience,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------

//! 可评论实体契约
//!
//! 被评论的实体由外部系统持有，这里只定义 (kind, id) 标签引用和
//! 宿主契约，通过显式注册表把 kind 分发到对应实现，而不是运行时反射。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use comment_shared::error::{CommentError, Result};
use comment_shared::users::UserId;

// ---------------------------------------------------------------------------
// CommentableRef
// ---------------------------------------------------------------------------

/// 可评论实体的标签引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentableRef {
    pub kind: String,
    pub id: i64,
}

impl CommentableRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl std::fmt::Display for CommentableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// CommentableHost
// ---------------------------------------------------------------------------

/// 可评论实体宿主契约
///
/// 评论子系统对宿主的全部依赖：属主（可能缺失）、公开投影、
/// 评论总数，以及每次评论保存后触发的回调钩子。
#[async_trait]
pub trait CommentableHost: Send + Sync {
    /// 实体属主的用户 id；无属主实体返回 None
    async fn owner_user_id(&self) -> Option<UserId>;

    /// 实体的公开投影，作为事件负载的基底
    async fn to_public_projection(&self) -> serde_json::Value;

    /// 每次评论保存（含计数缓存写入）之后触发
    async fn on_commented(&self);

    /// 实体上的评论总数
    async fn comment_count(&self) -> i64;
}

// ---------------------------------------------------------------------------
// CommentableRegistry
// ---------------------------------------------------------------------------

/// 按 id 解析出宿主实例
#[async_trait]
pub trait CommentableResolver: Send + Sync {
    async fn resolve(&self, id: i64) -> Result<Arc<dyn CommentableHost>>;
}

/// 可评论实体注册表
///
/// kind 到解析器的显式分发表。未注册的 kind 是错误，
/// 说明调用方传入了本系统不认识的实体类型。
#[derive(Default)]
pub struct CommentableRegistry {
    resolvers: DashMap<String, Arc<dyn CommentableResolver>>,
}

impl CommentableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: impl Into<String>, resolver: Arc<dyn CommentableResolver>) {
        self.resolvers.insert(kind.into(), resolver);
    }

    /// 解析引用指向的宿主实例
    pub async fn host_for(&self, commentable: &CommentableRef) -> Result<Arc<dyn CommentableHost>> {
        let resolver = self
            .resolvers
            .get(commentable.kind.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CommentError::UnknownCommentableKind {
                kind: commentable.kind.clone(),
            })?;

        resolver.resolve(commentable.id).await
    }
}

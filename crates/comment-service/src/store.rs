//! 存储契约与内存参考实现
//!
//! 存储引擎与表结构由外部系统负责，这里只定义评论/点赞的持久化接口，
//! 便于服务层依赖抽象而非具体实现，支持 mock 测试。内存实现用于在无
//! 外部依赖的情况下验证完整的业务管道，接入真实存储时只需实现同一 trait。

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use comment_shared::error::{CommentError, Result};
use comment_shared::users::UserId;

use crate::commentable::CommentableRef;
use crate::model::{Comment, CommentId, CommentOrder, Like, NewComment};

// ---------------------------------------------------------------------------
// 存储契约
// ---------------------------------------------------------------------------

/// 评论存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// 持久化新评论，由存储分配 id 与时间戳，计数缓存从零开始
    async fn insert(&self, input: NewComment) -> Result<Comment>;

    async fn get(&self, id: CommentId) -> Result<Option<Comment>>;

    /// 原子地对计数缓存施加增量
    ///
    /// 必须由存储层原子加实现（条件更新/条目锁内读改写），
    /// 不允许应用内存中的读改写，否则并发点赞会丢失更新。
    /// 此写入绕过业务验证，只有存储故障才是致命错误。
    async fn apply_like_delta(
        &self,
        id: CommentId,
        count_delta: i64,
        value_delta: i64,
    ) -> Result<()>;

    /// 全量覆写计数缓存，仅用于对账修复
    async fn set_like_caches(&self, id: CommentId, count: i64, value: i64) -> Result<()>;

    /// 按显式排序参数读取实体下的评论
    async fn list_for_commentable(
        &self,
        commentable: &CommentableRef,
        order: CommentOrder,
    ) -> Result<Vec<Comment>>;

    /// 跨实体按创建时间降序读取最新评论
    async fn latest(&self, limit: usize) -> Result<Vec<Comment>>;

    async fn count_for_commentable(&self, commentable: &CommentableRef) -> Result<i64>;
}

/// 点赞存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// 创建点赞记录
    ///
    /// (comment_id, user_id) 上已有活跃记录时返回 None（唯一约束语义，
    /// 等价于 ON CONFLICT DO NOTHING），调用方据此静默跳过。
    async fn create(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        value: i64,
    ) -> Result<Option<Like>>;

    /// 按 id 销毁点赞记录，返回被移除的记录
    async fn destroy(&self, like_id: i64) -> Result<Option<Like>>;

    async fn find_active(&self, comment_id: CommentId, user_id: UserId) -> Result<Option<Like>>;

    async fn exists_active(&self, comment_id: CommentId, user_id: UserId) -> Result<bool>;

    async fn list_for_comment(&self, comment_id: CommentId) -> Result<Vec<Like>>;
}

// ---------------------------------------------------------------------------
// MemoryCommentStore
// ---------------------------------------------------------------------------

/// 内存评论存储
#[derive(Debug, Default)]
pub struct MemoryCommentStore {
    comments: DashMap<CommentId, Comment>,
    next_id: AtomicI64,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self {
            comments: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, input: NewComment) -> Result<Comment> {
        let now = Utc::now();
        let comment = Comment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: input.title,
            body: input.body,
            commentable: input.commentable,
            author_id: input.author_id,
            likes_cache: 0,
            likes_value_cache: 0,
            created_at: now,
            updated_at: now,
        };
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|entry| entry.value().clone()))
    }

    async fn apply_like_delta(
        &self,
        id: CommentId,
        count_delta: i64,
        value_delta: i64,
    ) -> Result<()> {
        // 条目写锁内完成增量，等价于存储层的原子加：
        // 并发的加减不会互相覆盖
        let Some(mut comment) = self.comments.get_mut(&id) else {
            return Err(CommentError::NotFound {
                entity: "Comment".to_string(),
                id: id.to_string(),
            });
        };

        comment.likes_cache += count_delta;
        comment.likes_value_cache += value_delta;
        comment.updated_at = Utc::now();
        Ok(())
    }

    async fn set_like_caches(&self, id: CommentId, count: i64, value: i64) -> Result<()> {
        let Some(mut comment) = self.comments.get_mut(&id) else {
            return Err(CommentError::NotFound {
                entity: "Comment".to_string(),
                id: id.to_string(),
            });
        };

        comment.likes_cache = count;
        comment.likes_value_cache = value;
        comment.updated_at = Utc::now();
        Ok(())
    }

    async fn list_for_commentable(
        &self,
        commentable: &CommentableRef,
        order: CommentOrder,
    ) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|entry| entry.value().commentable == *commentable)
            .map(|entry| entry.value().clone())
            .collect();

        match order {
            CommentOrder::TopLiked => comments.sort_by(|a, b| {
                b.likes_cache
                    .cmp(&a.likes_cache)
                    .then(a.created_at.cmp(&b.created_at))
            }),
            CommentOrder::Latest => comments.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        Ok(comments)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments.truncate(limit);
        Ok(comments)
    }

    async fn count_for_commentable(&self, commentable: &CommentableRef) -> Result<i64> {
        Ok(self
            .comments
            .iter()
            .filter(|entry| entry.value().commentable == *commentable)
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// MemoryLikeStore
// ---------------------------------------------------------------------------

/// 内存点赞存储
///
/// `active_pairs` 充当 (comment_id, user_id) 上的唯一索引，
/// 并发创建同一二元组时只有一方成功。
#[derive(Debug, Default)]
pub struct MemoryLikeStore {
    likes: DashMap<i64, Like>,
    active_pairs: DashMap<(CommentId, UserId), i64>,
    next_id: AtomicI64,
}

impl MemoryLikeStore {
    pub fn new() -> Self {
        Self {
            likes: DashMap::new(),
            active_pairs: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl LikeStore for MemoryLikeStore {
    async fn create(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        value: i64,
    ) -> Result<Option<Like>> {
        match self.active_pairs.entry((comment_id, user_id)) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(vacant) => {
                let like = Like {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    comment_id,
                    user_id,
                    value,
                    created_at: Utc::now(),
                };
                self.likes.insert(like.id, like.clone());
                vacant.insert(like.id);
                Ok(Some(like))
            }
        }
    }

    async fn destroy(&self, like_id: i64) -> Result<Option<Like>> {
        let Some((_, like)) = self.likes.remove(&like_id) else {
            return Ok(None);
        };
        self.active_pairs.remove(&(like.comment_id, like.user_id));
        Ok(Some(like))
    }

    async fn find_active(&self, comment_id: CommentId, user_id: UserId) -> Result<Option<Like>> {
        Ok(self
            .active_pairs
            .get(&(comment_id, user_id))
            .and_then(|entry| self.likes.get(entry.value()))
            .map(|entry| entry.value().clone()))
    }

    async fn exists_active(&self, comment_id: CommentId, user_id: UserId) -> Result<bool> {
        Ok(self.active_pairs.contains_key(&(comment_id, user_id)))
    }

    async fn list_for_comment(&self, comment_id: CommentId) -> Result<Vec<Like>> {
        Ok(self
            .likes
            .iter()
            .filter(|entry| entry.value().comment_id == comment_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------

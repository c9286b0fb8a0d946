//! 点赞计数缓存维护
//!
//! Like 记录的创建/销毁同步触发计数缓存的增量更新，使缓存保持
//! 近实时；更新经由存储层原子加落盘，绕过业务验证。缓存写入与
//! Like 行写入不在同一事务内，崩溃造成的偏差由 `recount` 对账修复。

use std::sync::Arc;

use tracing::{debug, info};

use comment_shared::error::Result;

use crate::model::CommentId;
use crate::store::{CommentStore, LikeStore};

/// 点赞计数器
///
/// 前置条件（重复点赞、自赞拦截）由调用方保证，
/// 本组件只负责把增量原子地施加到缓存字段上。
pub struct LikeCounter {
    comments: Arc<dyn CommentStore>,
    likes: Arc<dyn LikeStore>,
}

impl LikeCounter {
    pub fn new(comments: Arc<dyn CommentStore>, likes: Arc<dyn LikeStore>) -> Self {
        Self { comments, likes }
    }

    /// 点赞创建后：计数 +1，价值累加
    pub async fn on_like_created(&self, comment_id: CommentId, value: i64) -> Result<()> {
        self.comments.apply_like_delta(comment_id, 1, value).await?;

        debug!(comment_id, value, "点赞计数缓存已累加");
        Ok(())
    }

    /// 点赞移除后：计数 -1，价值扣减
    pub async fn on_like_removed(&self, comment_id: CommentId, value: i64) -> Result<()> {
        self.comments
            .apply_like_delta(comment_id, -1, -value)
            .await?;

        debug!(comment_id, value, "点赞计数缓存已扣减");
        Ok(())
    }

    /// 从活跃 Like 记录全量重算缓存
    ///
    /// 运维修复通道：Like 行与缓存写入之间发生崩溃后用于对账，
    /// 正常业务路径永不调用。返回重算后的 (计数, 价值和)。
    pub async fn recount(&self, comment_id: CommentId) -> Result<(i64, i64)> {
        let likes = self.likes.list_for_comment(comment_id).await?;
        let count = likes.len() as i64;
        let value: i64 = likes.iter().map(|like| like.value).sum();

        self.comments
            .set_like_caches(comment_id, count, value)
            .await?;

        info!(comment_id, count, value, "点赞计数缓存已重算");
        Ok((count, value))
    }
}

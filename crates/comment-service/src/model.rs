//! 评论数据模型
//!
//! Comment 独占计数缓存字段；Like 归属 (comment, user) 二元组，
//! 其创建/销毁是计数缓存变更的唯一触发源。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use comment_shared::users::UserId;

use crate::commentable::CommentableRef;

/// 评论 id
pub type CommentId = i64;

/// 评论
///
/// `likes_cache` / `likes_value_cache` 是增量维护的聚合缓存：
/// 前者等于当前活跃 Like 的数量，后者等于其 value 之和。
/// 正常运行路径上永不全量重算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub title: String,
    pub body: String,
    pub commentable: CommentableRef,
    pub author_id: UserId,
    pub likes_cache: i64,
    pub likes_value_cache: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn authored_by(&self, user_id: UserId) -> bool {
        self.author_id == user_id
    }
}

/// 待创建评论
///
/// 创建时校验正文长度；计数缓存写入不走此验证路径。
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    pub commentable: CommentableRef,
    pub author_id: UserId,
    #[validate(length(min = 2, message = "评论正文长度不能少于2个字符"))]
    pub body: String,
    #[validate(length(max = 50, message = "评论标题长度不能超过50个字符"))]
    #[serde(default)]
    pub title: String,
}

impl NewComment {
    pub fn new(commentable: CommentableRef, author_id: UserId, body: impl Into<String>) -> Self {
        Self {
            commentable,
            author_id,
            body: body.into(),
            title: String::new(),
        }
    }
}

/// 点赞
///
/// `value` 是点赞时刻用户积分的快照，之后不再回读。
/// 同一 (comment_id, user_id) 至多存在一条活跃记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub comment_id: CommentId,
    pub user_id: UserId,
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

/// 读取评论列表时的显式排序参数
///
/// 排序是调用方声明的命名参数而非隐式全局默认，
/// 需要"最新在前"的调用方不必对抗隐藏的排序规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentOrder {
    /// 点赞数降序，同数按创建时间升序
    TopLiked,
    /// 创建时间降序
    Latest,
}

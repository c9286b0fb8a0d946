//! 用户目录契约
//!
//! 用户身份由外部系统管理，本系统只通过 `UserDirectory` 读取用户记录，
//! 便于服务层依赖抽象而非具体实现，支持 mock 测试。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 用户 id
pub type UserId = i64;

/// 用户目录记录
///
/// `score` 是用户当前积分，点赞时作为 Like 的 value 快照写入，之后不再回读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub score: i64,
}

/// 用户目录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 按用户名查找，未找到返回 None（不是错误）
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// 按 id 批量查找，缺失的 id 直接跳过
    async fn find_many_by_id(&self, ids: &[UserId]) -> Result<Vec<User>>;
}

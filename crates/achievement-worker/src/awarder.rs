//! 成就检查任务处理
//!
//! AWARD_USER 任务的参数是用户名加一组徽章标识。处理流程：
//! 解析用户 → 解析徽章类型 → 调用用户的成就检查。成就检查本身
//! 是幂等的（外部契约），同一徽章集合重复触发是安全的，因此
//! 队列的至少一次投递不需要额外去重。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use comment_shared::error::Result;
use comment_shared::queue::{QueueTier, Task, TaskKind};
use comment_shared::users::{User, UserDirectory};

use crate::badges::BadgeType;
use crate::error::AchievementError;

/// AWARD_USER 任务参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardUserArgs {
    pub username: String,
    pub badges: Vec<String>,
}

/// 成就检查接口
///
/// 由外部成就系统实现；必须幂等——同一徽章集合重复调用是安全的。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementSink: Send + Sync {
    async fn check_achievements(&self, user: &User, badges: &[BadgeType]) -> Result<()>;
}

/// 模拟成就检查
///
/// 生产环境中替换为成就系统的真实调用
pub struct LogAchievementSink;

#[async_trait]
impl AchievementSink for LogAchievementSink {
    async fn check_achievements(&self, user: &User, badges: &[BadgeType]) -> Result<()> {
        info!(
            user_id = user.id,
            username = %user.username,
            ?badges,
            "模拟触发成就检查"
        );
        Ok(())
    }
}

/// 成就检查器
pub struct AchievementAwarder {
    directory: Arc<dyn UserDirectory>,
    sink: Arc<dyn AchievementSink>,
}

impl AchievementAwarder {
    pub fn new(directory: Arc<dyn UserDirectory>, sink: Arc<dyn AchievementSink>) -> Self {
        Self { directory, sink }
    }

    /// 构建低优先级的 AWARD_USER 任务
    ///
    /// 队列层级是任务级的显式配置：成就检查不抢占事件生成的资源。
    pub fn award_task(username: impl Into<String>, badges: Vec<String>) -> Task {
        let args = AwardUserArgs {
            username: username.into(),
            badges,
        };
        Task::new(TaskKind::AwardUser, serde_json::json!(args)).with_tier(QueueTier::Low)
    }

    /// 处理一个队列任务
    pub async fn handle_task(&self, task: Task) -> std::result::Result<(), AchievementError> {
        if task.kind != TaskKind::AwardUser {
            return Err(AchievementError::UnsupportedTask {
                kind: task.kind.to_string(),
            });
        }

        let args: AwardUserArgs = task.deserialize_args()?;
        self.perform(args).await
    }

    /// 执行成就检查
    ///
    /// 用户名无法解析是致命错误，直接抛出交由队列的失败策略处理。
    pub async fn perform(&self, args: AwardUserArgs) -> std::result::Result<(), AchievementError> {
        let user = self
            .directory
            .find_by_username(&args.username)
            .await?
            .ok_or_else(|| AchievementError::UnknownUser {
                username: args.username.clone(),
            })?;

        let badges = args
            .badges
            .iter()
            .map(|name| {
                BadgeType::from_name(name).ok_or_else(|| AchievementError::UnknownBadge {
                    name: name.clone(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            username = %user.username,
            badge_count = badges.len(),
            "触发用户成就检查"
        );

        self.sink.check_achievements(&user, &badges).await?;
        Ok(())
    }
}

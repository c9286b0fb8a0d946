//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数、内存实现和测试数据生成器。
//! 用于简化测试代码编写，提高测试的可重复性和可维护性。

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::Result;
use crate::queue::{Task, TaskKind, TaskQueue};
use crate::users::{User, UserDirectory, UserId};

// ==================== 内存用户目录 ====================

/// 内存用户目录
///
/// 用于无外部依赖的测试，预先装入用户记录后按名/按 id 查找。
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批量装入用户
    pub fn with_users(users: Vec<User>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.add_user(user);
        }
        directory
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn find_many_by_id(&self, ids: &[UserId]) -> Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

// ==================== 记录式任务队列 ====================

/// 记录式任务队列
///
/// 只记录入队的任务而不执行，供测试断言入队行为（类型、受众、延迟）。
#[derive(Debug, Default)]
pub struct RecordingTaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl RecordingTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已入队任务的快照
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// 按任务类型过滤的快照
    pub fn tasks_of_kind(&self, kind: TaskKind) -> Vec<Task> {
        self.tasks
            .lock()
            .iter()
            .filter(|task| task.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskQueue for RecordingTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        self.tasks.lock().push(task);
        Ok(())
    }
}

// ==================== 测试数据生成器 ====================

/// 构造测试用户，id 和积分由调用方指定
pub fn test_user(id: UserId, username: &str, score: i64) -> User {
    User {
        id,
        username: username.to_string(),
        score,
    }
}

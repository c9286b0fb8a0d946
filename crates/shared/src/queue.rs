//! 任务队列抽象
//!
//! 将底层队列运行时封装为业务友好的入队/执行抽象，统一任务信封格式、
//! 延迟语义与优雅关闭，避免各服务重复编写样板代码。队列运行时本身由
//! 基础设施提供：至少一次投递、无跨任务顺序保证、声明的延迟只是执行
//! 时间下界。`InMemoryTaskQueue` 是进程内参考实现，接入真实运行时只需
//! 实现同一 trait。

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{CommentError, Result};

// ---------------------------------------------------------------------------
// QueueTier / TaskKind
// ---------------------------------------------------------------------------

/// 队列层级
///
/// 以显式的任务级配置代替全局队列状态：每个任务在入队时声明自己的
/// 层级，低优先级任务（如成就检查）不会挤占事件生成的执行资源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueTier {
    High,
    Default,
    Low,
}

impl Default for QueueTier {
    fn default() -> Self {
        Self::Default
    }
}

impl std::fmt::Display for QueueTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Default => "DEFAULT",
            Self::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// 延迟事件生成：将评论动作广播给下游事件消费者
    GenerateEvent,
    /// 成就检查：按用户名触发徽章检查
    AwardUser,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GenerateEvent => "GENERATE_EVENT",
            Self::AwardUser => "AWARD_USER",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Task — 任务信封
// ---------------------------------------------------------------------------

/// 任务信封
///
/// 所有进入队列的任务都包装在此信封中：
/// - `task_id`（UUID v7）时间有序，便于日志关联与幂等排查
/// - `args` 以 JSON 承载不同任务类型的参数，避免为每种任务定义独立消息结构
/// - `delay_seconds` 声明最早执行时间相对入队时刻的偏移，是下界而非精确时刻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub kind: TaskKind,
    pub tier: QueueTier,
    pub args: serde_json::Value,
    pub delay_seconds: u64,
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    /// 构建新任务，自动生成 UUID v7 并记录入队时间
    pub fn new(kind: TaskKind, args: serde_json::Value) -> Self {
        Self {
            task_id: Uuid::now_v7().to_string(),
            kind,
            tier: QueueTier::default(),
            args,
            delay_seconds: 0,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_seconds = delay.as_secs();
        self
    }

    pub fn with_tier(mut self, tier: QueueTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// 将 JSON 参数反序列化为目标类型
    pub fn deserialize_args<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.args.clone())
            .map_err(|e| CommentError::Queue(format!("任务参数反序列化失败: {e}")))
    }
}

// ---------------------------------------------------------------------------
// TaskQueue trait
// ---------------------------------------------------------------------------

/// 任务队列接口
///
/// 入队即忘：调用方不等待任务完成，失败重试由队列运行时兜底。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: Task) -> Result<()>;
}

// ---------------------------------------------------------------------------
// InMemoryTaskQueue
// ---------------------------------------------------------------------------

/// 按就绪时间排序的堆元素
///
/// 只按 (ready_at, seq) 比较：seq 是入队序号，保证同一就绪时刻的
/// 任务按入队顺序弹出，也让 Ord 不必依赖 Task 本身可比较。
struct ScheduledTask {
    ready_at: DateTime<Utc>,
    seq: u64,
    task: Task,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

/// next_ready 单次检查的结果
enum NextState {
    Ready(Task),
    Sleep(Duration),
    Idle,
}

/// 进程内延迟任务队列
///
/// 就绪时间最小堆加 Notify 唤醒：入队方推入堆并唤醒执行方，执行方
/// 睡到堆顶任务就绪为止。锁内只做堆操作，不跨 await 持锁。
pub struct InMemoryTaskQueue {
    pending: Mutex<BinaryHeap<Reverse<ScheduledTask>>>,
    notify: Notify,
    seq: AtomicU64,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// 等待并弹出下一个就绪任务
    ///
    /// 堆顶未就绪时睡到其就绪时刻，期间有新任务入队则被唤醒重新检查
    /// （新任务可能排得更早）。队列为空时挂起等待唤醒。
    pub async fn next_ready(&self) -> Task {
        loop {
            let state = {
                let mut pending = self.pending.lock();
                match pending.peek() {
                    None => NextState::Idle,
                    Some(Reverse(scheduled)) => {
                        let now = Utc::now();
                        if scheduled.ready_at <= now {
                            match pending.pop() {
                                Some(Reverse(scheduled)) => NextState::Ready(scheduled.task),
                                None => NextState::Idle,
                            }
                        } else {
                            let wait = (scheduled.ready_at - now).to_std().unwrap_or_default();
                            NextState::Sleep(wait)
                        }
                    }
                }
            };

            match state {
                NextState::Ready(task) => return task,
                NextState::Sleep(wait) => {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.notify.notified() => {}
                    }
                }
                NextState::Idle => self.notify.notified().await,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        // 延迟从入队时刻起算，是执行时间的下界
        let ready_at = Utc::now() + chrono::Duration::seconds(task.delay_seconds as i64);
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);

        debug!(
            task_id = %task.task_id,
            kind = %task.kind,
            tier = %task.tier,
            delay_seconds = task.delay_seconds,
            "任务已入队"
        );

        self.pending.lock().push(Reverse(ScheduledTask {
            ready_at,
            seq,
            task,
        }));
        self.notify.notify_one();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TaskWorker
// ---------------------------------------------------------------------------

/// 任务执行循环
///
/// 使用 `tokio::select!` 同时监听就绪任务和关闭信号：
/// - 任务就绪时调用 handler 处理；handler 返回错误只记录日志而不中断循环，
///   失败任务交由队列运行时的重试策略兜底。
/// - 关闭信号变为 `true` 时退出循环，确保正在执行的 handler 能自然完成。
pub struct TaskWorker {
    queue: std::sync::Arc<InMemoryTaskQueue>,
}

impl TaskWorker {
    pub fn new(queue: std::sync::Arc<InMemoryTaskQueue>) -> Self {
        Self { queue }
    }

    pub async fn start<F, Fut>(self, mut shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(Task) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        info!("任务执行循环已启动");

        loop {
            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("收到关闭信号，任务执行循环退出");
                        break;
                    }
                }

                task = self.queue.next_ready() => {
                    debug!(task_id = %task.task_id, kind = %task.kind, "开始执行任务");

                    if let Err(e) = handler(task).await {
                        error!(error = %e, "任务执行失败");
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------

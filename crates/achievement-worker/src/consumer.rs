//! 队列消费与任务分发
//!
//! 组合 TaskWorker（任务拉取）与 AchievementAwarder（业务处理），
//! 形成完整的消费管道。处理失败只记录日志，由队列运行时的
//! 失败策略决定是否重试。

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use comment_shared::queue::{InMemoryTaskQueue, TaskWorker};

use crate::awarder::AchievementAwarder;

/// 成就检查消费者
pub struct AwardConsumer {
    queue: Arc<InMemoryTaskQueue>,
    awarder: Arc<AchievementAwarder>,
}

impl AwardConsumer {
    pub fn new(queue: Arc<InMemoryTaskQueue>, awarder: Arc<AchievementAwarder>) -> Self {
        Self { queue, awarder }
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!("成就检查消费者已启动");

        let awarder = self.awarder;

        TaskWorker::new(self.queue)
            .start(shutdown, |task| {
                let awarder = &awarder;
                async move {
                    let task_id = task.task_id.clone();
                    if let Err(e) = awarder.handle_task(task).await {
                        error!(error = %e, task_id = %task_id, "处理成就检查任务失败");
                    }
                    Ok(())
                }
            })
            .await;

        info!("成就检查消费者已停止");
    }
}

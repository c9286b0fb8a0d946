//! 事件与通知分发
//!
//! 每次评论动作由这里决定：谁收到调用路径上的同步直接通知，
//! 谁只被延迟的事件生成任务覆盖。同步通知与延迟任务之间没有
//! 顺序保证，可能乱序、重复到达，下游消费者必须容忍。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use comment_shared::error::Result;
use comment_shared::events::{Audience, EventPayload, EventType};
use comment_shared::queue::{Task, TaskKind, TaskQueue};
use comment_shared::users::{User, UserDirectory, UserId};

use crate::audience::AudienceResolver;
use crate::commentable::CommentableHost;
use crate::composer::{ComposeOptions, EventComposer};
use crate::mentions::MentionExtractor;
use crate::model::Comment;
use crate::notify::NotificationDelivery;

/// 分发器
///
/// 组合组装器、受众解析器与提及解析器，向任务队列发出延迟事件，
/// 向投递通道发出同步通知。入队与投递都是即发即忘：失败记录日志后
/// 交由队列/投递基础设施的重试策略兜底，不在这里补偿。
pub struct Dispatcher {
    queue: Arc<dyn TaskQueue>,
    delivery: Arc<dyn NotificationDelivery>,
    directory: Arc<dyn UserDirectory>,
    composer: EventComposer,
    audience: AudienceResolver,
    mentions: MentionExtractor,
    event_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        delivery: Arc<dyn NotificationDelivery>,
        directory: Arc<dyn UserDirectory>,
        event_delay: Duration,
    ) -> Self {
        Self {
            queue,
            delivery,
            directory: directory.clone(),
            composer: EventComposer::new(directory.clone()),
            audience: AudienceResolver::new(),
            mentions: MentionExtractor::new(directory),
            event_delay,
        }
    }

    /// 评论创建后的分发
    ///
    /// 1. 组装 NEW_COMMENT 负载，受众为实体属主，入队一个延迟事件任务；
    /// 2. 除非评论者就是属主，向属主同步投递新评论通知；
    /// 3. 正文解析出提及时：再入队一个受众为全体被提及用户的
    ///    COMMENT_REPLY 延迟任务（一个任务覆盖所有提及），并向每个
    ///    被提及用户同步投递提及通知。
    pub async fn on_comment_created(
        &self,
        comment: &Comment,
        host: &Arc<dyn CommentableHost>,
    ) -> Result<()> {
        let options = ComposeOptions::default();
        let event_type = EventComposer::classify(&options);
        let data = self.composer.compose(comment, host, &options).await?;
        let audience = self.audience.resolve(&event_type, comment, host).await;

        self.enqueue_generate_event(event_type, audience, data.clone())
            .await;

        let Some(author) = self.find_user(comment.author_id).await? else {
            // 作者已从目录消失，无法署名，直接通知全部跳过
            warn!(
                comment_id = comment.id,
                author_id = comment.author_id,
                "评论作者未解析到用户，跳过直接通知"
            );
            return Ok(());
        };

        let owner_id = host.owner_user_id().await;
        if let Some(owner_id) = owner_id
            && owner_id != comment.author_id
            && let Some(owner) = self.find_user(owner_id).await?
        {
            if let Err(e) = self
                .delivery
                .deliver_comment_notification(&owner.username, &author.username, comment.id)
                .await
            {
                warn!(error = %e, recipient = %owner.username, "新评论通知投递失败");
            }
        }

        let mentioned = self.mentions.resolve(&comment.body).await?;
        if !mentioned.is_empty() {
            let mention_audience =
                Audience::users(mentioned.iter().map(|user| user.id).collect());
            self.enqueue_generate_event(EventType::CommentReply, mention_audience, data)
                .await;

            for user in &mentioned {
                if let Err(e) = self
                    .delivery
                    .deliver_comment_reply_notification(&user.username, &author.username, comment.id)
                    .await
                {
                    warn!(error = %e, recipient = %user.username, "提及通知投递失败");
                }
            }
        }

        Ok(())
    }

    /// 点赞创建后的分发
    ///
    /// 只入队一个受众为评论作者的延迟 COMMENT_LIKE 任务，
    /// 点赞不产生同步直接通知。
    pub async fn on_like_created(
        &self,
        comment: &Comment,
        host: &Arc<dyn CommentableHost>,
        liker: &User,
    ) -> Result<()> {
        let options = ComposeOptions::liked_by(liker.username.clone());
        let event_type = EventComposer::classify(&options);
        let data = self.composer.compose(comment, host, &options).await?;
        let audience = self.audience.resolve(&event_type, comment, host).await;

        self.enqueue_generate_event(event_type, audience, data).await;
        Ok(())
    }

    /// 入队延迟事件生成任务
    ///
    /// 即发即忘：入队失败只记录日志，由队列基础设施保障重试，
    /// 不阻断已完成的业务写入。
    async fn enqueue_generate_event(
        &self,
        event_type: EventType,
        audience: Audience,
        data: serde_json::Value,
    ) {
        let payload = EventPayload::new(event_type.clone(), audience, data);
        let args = match serde_json::to_value(&payload) {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, event_type = %event_type, "事件负载序列化失败，任务未入队");
                return;
            }
        };

        let task = Task::new(TaskKind::GenerateEvent, args).with_delay(self.event_delay);

        debug!(
            task_id = %task.task_id,
            event_type = %event_type,
            delay_seconds = task.delay_seconds,
            "入队延迟事件生成任务"
        );

        if let Err(e) = self.queue.enqueue(task).await {
            warn!(error = %e, event_type = %event_type, "事件任务入队失败");
        }
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .directory
            .find_many_by_id(&[id])
            .await?
            .into_iter()
            .next())
    }
}

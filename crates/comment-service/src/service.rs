//! 评论服务编排
//!
//! 对外的唯一入口：创建评论、点赞/取消点赞、按显式排序读取。
//! 所有协作方（存储、用户目录、注册表、队列、投递）都以注入的
//! 抽象组合进来。控制流：计数缓存更新 → 负载组装 → 受众解析 →
//! 分发器发出同步通知与延迟任务。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use validator::Validate;

use comment_shared::config::AppConfig;
use comment_shared::queue::TaskQueue;
use comment_shared::users::{User, UserDirectory, UserId};

use crate::commentable::{CommentableRef, CommentableRegistry};
use crate::dispatcher::Dispatcher;
use crate::error::{CommentServiceError, Result};
use crate::like_counter::LikeCounter;
use crate::mentions::MentionExtractor;
use crate::model::{Comment, CommentId, CommentOrder, Like, NewComment};
use crate::notify::NotificationDelivery;
use crate::store::{CommentStore, LikeStore};

/// 评论服务
pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    likes: Arc<dyn LikeStore>,
    registry: Arc<CommentableRegistry>,
    counter: LikeCounter,
    dispatcher: Dispatcher,
    mentions: MentionExtractor,
    site_base_url: String,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        likes: Arc<dyn LikeStore>,
        directory: Arc<dyn UserDirectory>,
        registry: Arc<CommentableRegistry>,
        queue: Arc<dyn TaskQueue>,
        delivery: Arc<dyn NotificationDelivery>,
        config: &AppConfig,
    ) -> Self {
        let counter = LikeCounter::new(comments.clone(), likes.clone());
        let dispatcher = Dispatcher::new(
            queue,
            delivery,
            directory.clone(),
            Duration::from_secs(config.queue.event_delay_seconds),
        );

        Self {
            comments,
            likes,
            registry,
            counter,
            dispatcher,
            mentions: MentionExtractor::new(directory),
            site_base_url: config.site.base_url.clone(),
        }
    }

    /// 创建评论
    ///
    /// 验证正文 → 持久化 → 宿主回调 → 分发通知与延迟事件。
    pub async fn create(&self, input: NewComment) -> Result<Comment> {
        input
            .validate()
            .map_err(|e| CommentServiceError::InvalidComment(e.to_string()))?;

        let host = self.registry.host_for(&input.commentable).await?;
        let comment = self.comments.insert(input).await?;
        host.on_commented().await;

        info!(
            comment_id = comment.id,
            commentable = %comment.commentable,
            author_id = comment.author_id,
            "评论已创建"
        );

        self.dispatcher.on_comment_created(&comment, &host).await?;
        Ok(comment)
    }

    /// 点赞评论
    ///
    /// 自赞与重复点赞是静默空操作：不落行、不动缓存、不发事件，
    /// 返回 None 而不是错误。成功路径：落行（value 取点赞者当前积分
    /// 快照）→ 计数缓存原子累加 → 宿主回调 → 入队延迟点赞事件。
    pub async fn like(&self, comment_id: CommentId, liker: &User) -> Result<Option<Like>> {
        let comment = self
            .comments
            .get(comment_id)
            .await?
            .ok_or(CommentServiceError::CommentNotFound { comment_id })?;

        if comment.authored_by(liker.id) {
            debug!(comment_id, user_id = liker.id, "点赞自己的评论，跳过");
            return Ok(None);
        }
        if self.likes.exists_active(comment_id, liker.id).await? {
            debug!(comment_id, user_id = liker.id, "已存在活跃点赞，跳过");
            return Ok(None);
        }

        // 存储层唯一约束兜底并发竞争：冲突时同样静默跳过
        let Some(like) = self.likes.create(comment_id, liker.id, liker.score).await? else {
            return Ok(None);
        };

        self.counter.on_like_created(comment_id, like.value).await?;

        let comment = self
            .comments
            .get(comment_id)
            .await?
            .ok_or(CommentServiceError::CommentNotFound { comment_id })?;
        let host = self.registry.host_for(&comment.commentable).await?;
        host.on_commented().await;

        self.dispatcher
            .on_like_created(&comment, &host, liker)
            .await?;
        Ok(Some(like))
    }

    /// 取消点赞
    ///
    /// 没有活跃点赞时是空操作。取消不产生任何事件或通知。
    pub async fn unlike(&self, comment_id: CommentId, user_id: UserId) -> Result<Option<Like>> {
        let comment = self
            .comments
            .get(comment_id)
            .await?
            .ok_or(CommentServiceError::CommentNotFound { comment_id })?;

        let Some(like) = self.likes.find_active(comment_id, user_id).await? else {
            return Ok(None);
        };
        let Some(removed) = self.likes.destroy(like.id).await? else {
            return Ok(None);
        };

        self.counter
            .on_like_removed(comment_id, removed.value)
            .await?;

        let host = self.registry.host_for(&comment.commentable).await?;
        host.on_commented().await;

        Ok(Some(removed))
    }

    /// 用户是否已点赞该评论
    pub async fn liked_by(&self, comment_id: CommentId, user_id: UserId) -> Result<bool> {
        Ok(self.likes.exists_active(comment_id, user_id).await?)
    }

    /// 指定用户名是否被该评论提及
    pub fn is_mentioned(&self, comment: &Comment, username: &str) -> bool {
        self.mentions.is_mentioned(&comment.body, username)
    }

    /// 按显式排序参数读取实体下的评论
    pub async fn list_for_commentable(
        &self,
        commentable: &CommentableRef,
        order: CommentOrder,
    ) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .list_for_commentable(commentable, order)
            .await?)
    }

    /// 跨实体的最新评论摘要
    ///
    /// 每条渲染为 `正文 - {站点}/p/{public_id}`；宿主无法解析或投影
    /// 缺少 public_id 时该字段留空，不中断整个列表。
    pub async fn latest_summaries(&self, count: usize) -> Result<Vec<String>> {
        let mut summaries = Vec::with_capacity(count);
        for comment in self.comments.latest(count).await? {
            let public_id = match self.registry.host_for(&comment.commentable).await {
                Ok(host) => host
                    .to_public_projection()
                    .await
                    .get("public_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_default(),
                Err(e) => {
                    debug!(commentable = %comment.commentable, error = %e, "宿主解析失败，摘要外链留空");
                    String::new()
                }
            };
            summaries.push(format!(
                "{} - {}/p/{}",
                comment.body, self.site_base_url, public_id
            ));
        }
        Ok(summaries)
    }

    /// 运维修复通道：从活跃点赞记录全量重算计数缓存
    pub async fn recount_likes(&self, comment_id: CommentId) -> Result<(i64, i64)> {
        Ok(self.counter.recount(comment_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};

    use comment_shared::error::CommentError;
    use comment_shared::events::{EventPayload, EventType};
    use comment_shared::queue::TaskKind;
    use comment_shared::test_utils::{InMemoryUserDirectory, RecordingTaskQueue, test_user};

    use crate::commentable::{CommentableHost, CommentableResolver};
    use crate::notify::RecordingNotificationDelivery;
    use crate::store::{MemoryCommentStore, MemoryLikeStore};

    /// 由评论存储支撑的测试宿主，on_commented 调用计数可断言
    struct StoreBackedHost {
        commentable: CommentableRef,
        owner: Option<UserId>,
        comments: Arc<MemoryCommentStore>,
        commented: AtomicI64,
    }

    #[async_trait]
    impl CommentableHost for StoreBackedHost {
        async fn owner_user_id(&self) -> Option<UserId> {
            self.owner
        }

        async fn to_public_projection(&self) -> serde_json::Value {
            serde_json::json!({"public_id": "p-7"})
        }

        async fn on_commented(&self) {
            self.commented.fetch_add(1, Ordering::SeqCst);
        }

        async fn comment_count(&self) -> i64 {
            self.comments
                .count_for_commentable(&self.commentable)
                .await
                .unwrap_or(0)
        }
    }

    struct FixedResolver {
        host: Arc<StoreBackedHost>,
    }

    #[async_trait]
    impl CommentableResolver for FixedResolver {
        async fn resolve(
            &self,
            _id: i64,
        ) -> comment_shared::error::Result<Arc<dyn CommentableHost>> {
            Ok(self.host.clone())
        }
    }

    struct Fixture {
        service: CommentService,
        queue: Arc<RecordingTaskQueue>,
        delivery: Arc<RecordingNotificationDelivery>,
        host: Arc<StoreBackedHost>,
        comments: Arc<MemoryCommentStore>,
        likes: Arc<MemoryLikeStore>,
    }

    /// dave(1) 拥有 post/7，erin(2)、carol(3) 是普通用户
    fn fixture(owner: Option<UserId>) -> Fixture {
        let comments = Arc::new(MemoryCommentStore::new());
        let likes = Arc::new(MemoryLikeStore::new());
        let directory = Arc::new(InMemoryUserDirectory::with_users(vec![
            test_user(1, "dave", 50),
            test_user(2, "erin", 30),
            test_user(3, "carol", 20),
        ]));
        let queue = Arc::new(RecordingTaskQueue::new());
        let delivery = Arc::new(RecordingNotificationDelivery::new());

        let host = Arc::new(StoreBackedHost {
            commentable: CommentableRef::new("post", 7),
            owner,
            comments: comments.clone(),
            commented: AtomicI64::new(0),
        });
        let registry = Arc::new(CommentableRegistry::new());
        registry.register("post", Arc::new(FixedResolver { host: host.clone() }));

        let service = CommentService::new(
            comments.clone(),
            likes.clone(),
            directory,
            registry,
            queue.clone(),
            delivery.clone(),
            &AppConfig::default(),
        );

        Fixture {
            service,
            queue,
            delivery,
            host,
            comments,
            likes,
        }
    }

    fn post() -> CommentableRef {
        CommentableRef::new("post", 7)
    }

    #[tokio::test]
    async fn test_create_rejects_short_body() {
        let fx = fixture(Some(1));

        let err = fx
            .service
            .create(NewComment::new(post(), 2, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommentServiceError::InvalidComment(_)));
        assert!(fx.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_create_fires_hook_and_dispatch() {
        let fx = fixture(Some(1));

        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();

        assert_eq!(fx.host.commented.load(Ordering::SeqCst), 1);
        assert_eq!(fx.queue.tasks_of_kind(TaskKind::GenerateEvent).len(), 1);
        assert_eq!(fx.delivery.delivered_to("dave").len(), 1);

        let stored = fx.comments.get(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.body, "写得不错");
    }

    #[tokio::test]
    async fn test_create_unknown_kind_fails() {
        let fx = fixture(Some(1));

        let err = fx
            .service
            .create(NewComment::new(CommentableRef::new("article", 1), 2, "正文"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommentServiceError::Shared(CommentError::UnknownCommentableKind { .. })
        ));
    }

    #[tokio::test]
    async fn test_self_like_is_silent_noop() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();
        let tasks_before = fx.queue.tasks().len();

        // erin 点赞自己的评论：无行、无缓存变更、无事件
        let result = fx
            .service
            .like(comment.id, &test_user(2, "erin", 30))
            .await
            .unwrap();
        assert!(result.is_none());

        let stored = fx.comments.get(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.likes_cache, 0);
        assert_eq!(stored.likes_value_cache, 0);
        assert!(fx.likes.list_for_comment(comment.id).await.unwrap().is_empty());
        assert_eq!(fx.queue.tasks().len(), tasks_before);
    }

    #[tokio::test]
    async fn test_duplicate_like_is_noop() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();

        let dave = test_user(1, "dave", 50);
        assert!(fx.service.like(comment.id, &dave).await.unwrap().is_some());
        assert!(fx.service.like(comment.id, &dave).await.unwrap().is_none());

        let stored = fx.comments.get(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.likes_cache, 1);
        assert_eq!(stored.likes_value_cache, 50);
    }

    #[tokio::test]
    async fn test_like_snapshots_score_and_enqueues_event() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();
        let hooks_before = fx.host.commented.load(Ordering::SeqCst);

        let like = fx
            .service
            .like(comment.id, &test_user(3, "carol", 20))
            .await
            .unwrap()
            .expect("首次点赞应成功");
        assert_eq!(like.value, 20);

        // 计数缓存写入同样触发宿主回调
        assert_eq!(fx.host.commented.load(Ordering::SeqCst), hooks_before + 1);

        let tasks = fx.queue.tasks();
        let payload: EventPayload = tasks.last().unwrap().deserialize_args().unwrap();
        assert_eq!(payload.event_type, EventType::CommentLike);
        assert_eq!(payload.audience.user_ids, vec![2]);
        assert_eq!(payload.data["likes"], 1);
        assert_eq!(payload.data["liker"], "carol");

        // 点赞不产生同步直接通知
        assert!(fx.delivery.delivered_to("erin").is_empty());
    }

    #[tokio::test]
    async fn test_unlike_decrements_without_event() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();

        fx.service
            .like(comment.id, &test_user(3, "carol", 20))
            .await
            .unwrap();
        let tasks_before = fx.queue.tasks().len();

        let removed = fx.service.unlike(comment.id, 3).await.unwrap();
        assert!(removed.is_some());

        let stored = fx.comments.get(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.likes_cache, 0);
        assert_eq!(stored.likes_value_cache, 0);
        assert!(!fx.service.liked_by(comment.id, 3).await.unwrap());
        assert_eq!(fx.queue.tasks().len(), tasks_before);

        // 再次取消是空操作
        assert!(fx.service.unlike(comment.id, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_is_mentioned() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "nice work @carol"))
            .await
            .unwrap();

        assert!(fx.service.is_mentioned(&comment, "carol"));
        assert!(!fx.service.is_mentioned(&comment, "dave"));
    }

    #[tokio::test]
    async fn test_latest_summaries_format() {
        let fx = fixture(Some(1));
        fx.service
            .create(NewComment::new(post(), 2, "第一条评论"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        fx.service
            .create(NewComment::new(post(), 3, "第二条评论"))
            .await
            .unwrap();

        let summaries = fx.service.latest_summaries(5).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0], "第二条评论 - http://localhost:3000/p/p-7");
    }

    #[tokio::test]
    async fn test_recount_repair_path() {
        let fx = fixture(Some(1));
        let comment = fx
            .service
            .create(NewComment::new(post(), 2, "写得不错"))
            .await
            .unwrap();

        // 绕过计数器直接落一条点赞，制造缓存偏差
        fx.likes.create(comment.id, 3, 20).await.unwrap();

        let (count, value) = fx.service.recount_likes(comment.id).await.unwrap();
        assert_eq!((count, value), (1, 20));

        let stored = fx.comments.get(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.likes_cache, 1);
        assert_eq!(stored.likes_value_cache, 20);
    }
}

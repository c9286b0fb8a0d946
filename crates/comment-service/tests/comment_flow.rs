//! 评论分发全链路集成测试
//!
//! 用内存实现装配完整的服务栈，验证一次带提及的评论创建会产生
//! 正确的延迟事件任务与同步通知组合。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use comment_service::commentable::{
    CommentableHost, CommentableRef, CommentableRegistry, CommentableResolver,
};
use comment_service::model::{CommentOrder, NewComment};
use comment_service::notify::{DeliveredKind, RecordingNotificationDelivery};
use comment_service::service::CommentService;
use comment_service::store::{CommentStore, LikeStore, MemoryCommentStore, MemoryLikeStore};
use comment_shared::config::AppConfig;
use comment_shared::error::Result;
use comment_shared::events::{EventPayload, EventType};
use comment_shared::queue::TaskKind;
use comment_shared::test_utils::{InMemoryUserDirectory, RecordingTaskQueue, test_user};
use comment_shared::users::UserId;

/// dave 拥有的测试宿主
struct ProjectHost {
    commentable: CommentableRef,
    owner: Option<UserId>,
    comments: Arc<MemoryCommentStore>,
    commented: AtomicI64,
}

#[async_trait]
impl CommentableHost for ProjectHost {
    async fn owner_user_id(&self) -> Option<UserId> {
        self.owner
    }

    async fn to_public_projection(&self) -> serde_json::Value {
        serde_json::json!({"public_id": "prj-1", "name": "发布页"})
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

struct ProjectResolver {
    host: Arc<ProjectHost>,
}

#[async_trait]
impl CommentableResolver for ProjectResolver {
    async fn resolve(&self, _id: i64) -> Result<Arc<dyn CommentableHost>> {
        Ok(self.host.clone())
    }
}

struct Stack {
    service: CommentService,
    queue: Arc<RecordingTaskQueue>,
    delivery: Arc<RecordingNotificationDelivery>,
    likes: Arc<MemoryLikeStore>,
    comments: Arc<MemoryCommentStore>,
}

/// 装配完整栈：dave(1) 拥有 project/1，erin(2) 与 carol(3) 是普通用户
fn stack() -> Stack {
    let comments = Arc::new(MemoryCommentStore::new());
    let likes = Arc::new(MemoryLikeStore::new());
    let directory = Arc::new(InMemoryUserDirectory::with_users(vec![
        test_user(1, "dave", 50),
        test_user(2, "erin", 30),
        test_user(3, "carol", 20),
    ]));
    let queue = Arc::new(RecordingTaskQueue::new());
    let delivery = Arc::new(RecordingNotificationDelivery::new());

    let host = Arc::new(ProjectHost {
        commentable: CommentableRef::new("project", 1),
        owner: Some(1),
        comments: comments.clone(),
        commented: AtomicI64::new(0),
    });
    let registry = Arc::new(CommentableRegistry::new());
    registry.register("project", Arc::new(ProjectResolver { host }));

    let service = CommentService::new(
        comments.clone(),
        likes.clone(),
        directory,
        registry,
        queue.clone(),
        delivery.clone(),
        &AppConfig::default(),
    );

    Stack {
        service,
        queue,
        delivery,
        likes,
        comments,
    }
}

fn project() -> CommentableRef {
    CommentableRef::new("project", 1)
}

#[tokio::test]
async fn test_mentioned_comment_full_fanout() {
    let stack = stack();

    // erin 在 dave 的实体下评论并提及 carol
    let comment = stack
        .service
        .create(NewComment::new(project(), 2, "nice work @carol"))
        .await
        .unwrap();

    // (a) NEW_COMMENT 延迟任务，受众为属主 dave
    let tasks = stack.queue.tasks_of_kind(TaskKind::GenerateEvent);
    assert_eq!(tasks.len(), 2);

    let new_comment: EventPayload = tasks[0].deserialize_args().unwrap();
    assert_eq!(new_comment.event_type, EventType::NewComment);
    assert_eq!(new_comment.audience.user_ids, vec![1]);
    assert_eq!(tasks[0].delay_seconds, 60);

    // 事件数据：投影合并计数，正文不回显
    assert_eq!(new_comment.data["public_id"], "prj-1");
    assert_eq!(new_comment.data["comments"], 1);
    assert_eq!(new_comment.data["likes"], 0);
    assert_eq!(new_comment.data["user"]["username"], "erin");
    assert_eq!(new_comment.data["body"], serde_json::json!({}));

    // (c) 一个 COMMENT_REPLY 任务覆盖全部被提及用户
    let reply: EventPayload = tasks[1].deserialize_args().unwrap();
    assert_eq!(reply.event_type, EventType::CommentReply);
    assert_eq!(reply.audience.user_ids, vec![3]);

    // (b) dave 收到新评论直接通知；(d) carol 收到提及直接通知
    let to_dave = stack.delivery.delivered_to("dave");
    assert_eq!(to_dave.len(), 1);
    assert_eq!(to_dave[0].kind, DeliveredKind::Comment);
    assert_eq!(to_dave[0].author, "erin");
    assert_eq!(to_dave[0].comment_id, comment.id);

    let to_carol = stack.delivery.delivered_to("carol");
    assert_eq!(to_carol.len(), 1);
    assert_eq!(to_carol[0].kind, DeliveredKind::CommentReply);

    // (e) 作者 erin 没有收到任何通知
    assert!(stack.delivery.delivered_to("erin").is_empty());
}

#[tokio::test]
async fn test_like_then_unlike_keeps_caches_consistent() {
    let stack = stack();

    let comment = stack
        .service
        .create(NewComment::new(project(), 2, "求点赞"))
        .await
        .unwrap();

    stack
        .service
        .like(comment.id, &test_user(1, "dave", 50))
        .await
        .unwrap()
        .expect("dave 首次点赞应成功");
    stack
        .service
        .like(comment.id, &test_user(3, "carol", 20))
        .await
        .unwrap()
        .expect("carol 首次点赞应成功");

    let stored = stack.comments.get(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.likes_cache, 2);
    assert_eq!(stored.likes_value_cache, 70);

    // 点赞事件受众是作者 erin，携带 liker 覆盖
    let like_tasks: Vec<EventPayload> = stack
        .queue
        .tasks_of_kind(TaskKind::GenerateEvent)
        .iter()
        .map(|task| task.deserialize_args().unwrap())
        .filter(|payload: &EventPayload| payload.event_type == EventType::CommentLike)
        .collect();
    assert_eq!(like_tasks.len(), 2);
    assert!(like_tasks.iter().all(|p| p.audience.user_ids == vec![2]));
    assert_eq!(like_tasks[0].data["liker"], "dave");

    stack.service.unlike(comment.id, 1).await.unwrap();

    let stored = stack.comments.get(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.likes_cache, 1);
    assert_eq!(stored.likes_value_cache, 20);

    let active = stack.likes.list_for_comment(comment.id).await.unwrap();
    assert_eq!(active.len() as i64, stored.likes_cache);
    assert_eq!(
        active.iter().map(|l| l.value).sum::<i64>(),
        stored.likes_value_cache
    );
}

#[tokio::test]
async fn test_read_api_orders_are_explicit() {
    let stack = stack();

    let first = stack
        .service
        .create(NewComment::new(project(), 2, "先发的评论"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = stack
        .service
        .create(NewComment::new(project(), 3, "后发的评论"))
        .await
        .unwrap();

    // 先发的评论获得一个赞
    stack
        .service
        .like(first.id, &test_user(1, "dave", 50))
        .await
        .unwrap();

    let top = stack
        .service
        .list_for_commentable(&project(), CommentOrder::TopLiked)
        .await
        .unwrap();
    assert_eq!(top[0].id, first.id);

    let latest = stack
        .service
        .list_for_commentable(&project(), CommentOrder::Latest)
        .await
        .unwrap();
    assert_eq!(latest[0].id, second.id);
}

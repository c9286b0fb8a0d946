//! 评论互动服务
//!
//! 管理挂载在任意可评论实体上的用户评论：维护点赞计数缓存、
//! 识别 @提及、解析事件受众，并向正确的受众分发同步通知与
//! 延迟的事件生成任务。

pub mod audience;
pub mod commentable;
pub mod composer;
pub mod dispatcher;
pub mod error;
pub mod like_counter;
pub mod mentions;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

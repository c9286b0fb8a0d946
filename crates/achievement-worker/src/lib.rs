//! 成就检查服务
//!
//! 消费队列中的成就检查任务：按用户名解析用户，把符号化的徽章
//! 标识解析为具体徽章类型，触发用户的幂等成就检查。

pub mod awarder;
pub mod badges;
pub mod consumer;
pub mod error;

//! @提及解析
//!
//! 从评论正文中提取 `@句柄` 并通过用户目录解析为用户记录。
//! 匹配规则：`@` 后接一个或多个小写字母、数字或下划线；大写字符
//! 会截断匹配。用户名在系统其他位置是否规范为小写尚无定论，
//! 在产品侧确认前保持现有匹配行为不放宽。

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use comment_shared::error::Result;
use comment_shared::users::{User, UserDirectory};

/// 提及解析器
pub struct MentionExtractor {
    directory: Arc<dyn UserDirectory>,
    handle_regex: Regex,
}

impl MentionExtractor {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory,
            handle_regex: Regex::new(r"@([a-z0-9_]+)").unwrap(),
        }
    }

    /// 提取正文中的候选句柄，去重并保持首次出现的顺序
    pub fn extract_handles(&self, body: &str) -> Vec<String> {
        let mut handles: Vec<String> = Vec::new();
        for capture in self.handle_regex.captures_iter(body) {
            let handle = &capture[1];
            if !handles.iter().any(|seen| seen == handle) {
                handles.push(handle.to_string());
            }
        }
        handles
    }

    /// 解析正文中的提及为用户记录
    ///
    /// 无法解析的句柄静默丢弃，不是错误。
    pub async fn resolve(&self, body: &str) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for handle in self.extract_handles(body) {
            match self.directory.find_by_username(&handle).await? {
                Some(user) => users.push(user),
                None => debug!(handle, "提及句柄未解析到用户，跳过"),
            }
        }
        Ok(users)
    }

    /// 指定用户名是否出现在正文的提及中
    pub fn is_mentioned(&self, body: &str, username: &str) -> bool {
        self.extract_handles(body).iter().any(|h| h == username)
    }
}

//! 徽章类型解析
//!
//! 任务参数中的徽章标识可能是符号化名称（SCREAMING_SNAKE_CASE 字符串），
//! 也可能在上游已经解析过；这里提供名称到具体类型的显式映射。
//! 徽章目录与发放逻辑由外部系统持有，本模块只承载解析所需的类型清单。

use serde::{Deserialize, Serialize};

/// 徽章类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeType {
    /// 发表首条评论
    Commenter,
    /// 评论获得点赞
    Notable,
    /// 在评论中为他人解答
    Mentor,
    /// 持续参与讨论
    Conversationalist,
    /// 点赞他人评论
    Philanthropist,
}

impl BadgeType {
    /// 按符号化名称解析徽章类型，未知名称返回 None
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "COMMENTER" => Some(Self::Commenter),
            "NOTABLE" => Some(Self::Notable),
            "MENTOR" => Some(Self::Mentor),
            "CONVERSATIONALIST" => Some(Self::Conversationalist),
            "PHILANTHROPIST" => Some(Self::Philanthropist),
            _ => None,
        }
    }
}

impl std::fmt::Display for BadgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Commenter => "COMMENTER",
            Self::Notable => "NOTABLE",
            Self::Mentor => "MENTOR",
            Self::Conversationalist => "CONVERSATIONALIST",
            Self::Philanthropist => "PHILANTHROPIST",
        };
        write!(f, "{s}")
    }
}

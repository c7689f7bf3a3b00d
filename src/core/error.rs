//! 统一错误处理模块
//!
//! 行为系统范围内的错误类型定义。
//!
//! ## 错误分类
//!
//! - **编写期错误**: `NotAFunction`、`InvalidMember`、`ReservedField`，
//!   在定义行为类时立即失败，属于调用方的 bug，不应重试。
//! - **初始化错误**: 模板实例构造或作者的 `init` 抛出的任何错误，原样传递给宿主，
//!   对该附着实例是致命的。
//! - **调用错误**: 接收者缺失、接收者已释放、重入访问等。
//! - **注册错误**: 重复注册、未知行为、依赖缺失。

use thiserror::Error;

/// 行为系统错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BehaviorError {
    #[error("Only methods can be marked for binding. <{0}> is not a method!")]
    NotAFunction(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Behavior <{behavior}> declares field <{field}>, which is reserved for host context")]
    ReservedField { behavior: String, field: String },

    #[error("Invalid member <{member}> on behavior <{behavior}>: {reason}")]
    InvalidMember {
        behavior: String,
        member: String,
        reason: String,
    },

    #[error("Method <{0}> was invoked without a receiver")]
    MissingReceiver(String),

    #[error("Method <{0}> is bound to an attachment that no longer exists")]
    DetachedReceiver(String),

    #[error("Attachment is already in use while invoking <{0}>")]
    Reentrant(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Type mismatch for <{name}>: expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Behavior already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Unknown behavior: {0}")]
    UnknownBehavior(String),

    #[error("Missing dependency: {0} requires {1}")]
    MissingDependency(String, String),

    #[error("Behavior <{0}> is already attached to this entity")]
    DuplicateAttachment(String),

    #[error("Entity <{0}> does not belong to this scene")]
    UnknownEntity(String),
}

impl BehaviorError {
    /// 便捷构造初始化错误
    pub fn init(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    /// 是否为编写期错误（行为类本身有缺陷）
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            Self::NotAFunction(_) | Self::InvalidMember { .. } | Self::ReservedField { .. }
        )
    }
}

/// 行为系统结果类型别名
pub type BehaviorResult<T> = Result<T, BehaviorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BehaviorError::NotAFunction("someProperty".to_string());
        assert_eq!(
            err.to_string(),
            "Only methods can be marked for binding. <someProperty> is not a method!"
        );
    }

    #[test]
    fn test_authoring_error_classification() {
        assert!(BehaviorError::NotAFunction("x".into()).is_authoring_error());
        assert!(BehaviorError::ReservedField {
            behavior: "sample".into(),
            field: "el".into(),
        }
        .is_authoring_error());
        assert!(!BehaviorError::init("boom").is_authoring_error());
        assert!(!BehaviorError::Reentrant("tick".into()).is_authoring_error());
    }
}

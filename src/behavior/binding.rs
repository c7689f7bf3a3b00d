//! 绑定标记
//!
//! 在编写期标记需要按附着实例重新绑定的方法。标记本身不做绑定，
//! 真正的绑定发生在附着初始化时。

use super::method::Method;
use super::value::Value;
use crate::core::error::{BehaviorError, BehaviorResult};

/// 被标记的成员
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    /// 类方法
    Method(&'a Method),
    /// 实例字段（即使字段值是函数，也不是方法）
    Field(&'a Value),
    /// 不存在的成员
    Missing,
}

/// 标记方法，返回带标记的方法引用
///
/// 成员不是方法时立即返回 `NotAFunction`。
pub fn mark(name: &str, member: Member<'_>) -> BehaviorResult<Method> {
    match member {
        Member::Method(method) => Ok(method.clone().marked()),
        Member::Field(_) | Member::Missing => Err(BehaviorError::NotAFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_method() {
        let method = Method::new("onSceneEvent", |_, _| Ok(Value::Null));
        let marked = mark("onSceneEvent", Member::Method(&method)).unwrap();

        assert!(marked.is_bindable());
        assert!(marked.ptr_eq(&method));
        // 原引用不受影响
        assert!(!method.is_bindable());
    }

    #[test]
    fn test_mark_field_fails() {
        let field = Value::Bool(true);
        assert_eq!(
            mark("property", Member::Field(&field)).unwrap_err(),
            BehaviorError::NotAFunction("property".to_string())
        );
        assert!(matches!(
            mark("missing", Member::Missing),
            Err(BehaviorError::NotAFunction(name)) if name == "missing"
        ));
    }
}

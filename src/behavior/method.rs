//! 方法与可调用值
//!
//! `Method` 是在所有附着实例间共享的函数引用，调用时显式传入接收者；
//! `BoundMethod` 把一个 `Method` 永久固定到某个附着实例上，
//! 因此作为回调（没有接收者）被调用时仍然能访问正确的状态。
//!
//! 接收者是附着实例句柄而不是状态借用：方法执行期间不持有借用，
//! 方法内部触发的回调（事件分发、交出去的绑定方法）可以再次进入同一个附着实例。

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::attachment::{Attachment, AttachmentState};
use super::value::Value;
use crate::core::error::{BehaviorError, BehaviorResult};

/// 方法函数签名：显式接收者 + 位置参数
pub type MethodFn = dyn Fn(&Attachment, &[Value]) -> BehaviorResult<Value>;

/// 共享方法引用
///
/// 克隆只复制引用；绑定标记随引用一起复制。
#[derive(Clone)]
pub struct Method {
    name: Rc<str>,
    func: Rc<MethodFn>,
    bindable: bool,
}

impl Method {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Attachment, &[Value]) -> BehaviorResult<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
            bindable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否带有绑定标记
    pub fn is_bindable(&self) -> bool {
        self.bindable
    }

    /// 设置绑定标记，不做任何绑定
    pub(crate) fn marked(mut self) -> Self {
        self.bindable = true;
        self
    }

    /// 以给定附着实例为接收者调用
    pub fn call(&self, receiver: &Attachment, args: &[Value]) -> BehaviorResult<Value> {
        (self.func)(receiver, args)
    }

    /// 绑定到指定附着实例
    pub fn bind_to(&self, attachment: &Attachment) -> BoundMethod {
        self.bind_weak(attachment.downgrade())
    }

    pub(crate) fn bind_weak(&self, receiver: Weak<RefCell<AttachmentState>>) -> BoundMethod {
        BoundMethod {
            method: self.clone(),
            receiver,
        }
    }

    /// 是否引用同一个函数
    pub fn ptr_eq(&self, other: &Method) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("bindable", &self.bindable)
            .finish()
    }
}

/// 已绑定到某个附着实例的方法
#[derive(Clone)]
pub struct BoundMethod {
    method: Method,
    receiver: Weak<RefCell<AttachmentState>>,
}

impl BoundMethod {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_bound_to(&self, attachment: &Attachment) -> bool {
        Weak::ptr_eq(&self.receiver, &attachment.downgrade())
    }

    /// 无接收者调用，使用绑定的附着实例
    ///
    /// 附着实例已释放时返回 `DetachedReceiver`。
    pub fn invoke(&self, args: &[Value]) -> BehaviorResult<Value> {
        let target = self
            .receiver
            .upgrade()
            .map(Attachment::from_inner)
            .ok_or_else(|| BehaviorError::DetachedReceiver(self.method.name().to_string()))?;
        self.method.call(&target, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.method.name)
            .field("alive", &(self.receiver.strong_count() > 0))
            .finish()
    }
}

/// 可调用值：未绑定方法或已绑定方法
#[derive(Clone, Debug)]
pub enum Callable {
    Method(Method),
    Bound(BoundMethod),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Method(m) => m.name(),
            Callable::Bound(b) => b.method().name(),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Callable::Bound(_))
    }

    /// 作为自由函数调用（例如事件回调）
    ///
    /// 未绑定的方法没有接收者，返回 `MissingReceiver`。
    pub fn invoke(&self, args: &[Value]) -> BehaviorResult<Value> {
        match self {
            Callable::Method(m) => Err(BehaviorError::MissingReceiver(m.name().to_string())),
            Callable::Bound(b) => b.invoke(args),
        }
    }

    /// 以接收者调用；已绑定的方法忽略传入的接收者
    pub fn call(&self, receiver: &Attachment, args: &[Value]) -> BehaviorResult<Value> {
        match self {
            Callable::Method(m) => m.call(receiver, args),
            Callable::Bound(b) => b.invoke(args),
        }
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Method(a), Callable::Method(b)) => a.ptr_eq(b),
            (Callable::Bound(a), Callable::Bound(b)) => {
                a.method.ptr_eq(&b.method) && Weak::ptr_eq(&a.receiver, &b.receiver)
            }
            _ => false,
        }
    }
}

impl From<Method> for Callable {
    fn from(m: Method) -> Self {
        Callable::Method(m)
    }
}

impl From<BoundMethod> for Callable {
    fn from(b: BoundMethod) -> Self {
        Callable::Bound(b)
    }
}

//! 核心宏定义
//!
//! 提供声明字段表的宏，减少样板代码

/// 构造字段表（`Fields`）
///
/// 使用示例:
/// ```rust
/// use game_engine_behavior::{fields, Value};
///
/// let fields = fields! {
///     "count" => 0,
///     "name" => "Alice",
/// };
///
/// assert_eq!(fields["count"], Value::Int(0));
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::behavior::Fields::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::behavior::Fields::new();
        $(
            fields.insert(
                ::std::string::String::from($name),
                $crate::behavior::Value::from($value),
            );
        )+
        fields
    }};
}

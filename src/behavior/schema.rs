//! 行为 schema
//!
//! 字段名 → {类型, 默认值} 的声明式元数据。本模块只负责承载与读取，
//! 校验和类型转换由宿主完成。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::{Fields, Value};

/// 属性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Boolean,
    Int,
    Number,
    String,
    Vec3,
    Array,
    Color,
    Selector,
}

/// 单个属性声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub default: serde_json::Value,
}

impl PropertySchema {
    pub fn new(kind: PropertyType, default: impl Into<serde_json::Value>) -> Self {
        Self {
            kind,
            default: default.into(),
        }
    }

    /// 默认值转换为 `Value`，`vec3` 类型的 `{x, y, z}` 对象转换为向量
    pub fn default_value(&self) -> Value {
        match (self.kind, &self.default) {
            (PropertyType::Vec3, serde_json::Value::Object(map)) => {
                let axis = |key: &str| {
                    map.get(key)
                        .and_then(serde_json::Value::as_f64)
                        .unwrap_or_default() as f32
                };
                Value::Vec3(glam::Vec3::new(axis("x"), axis("y"), axis("z")))
            }
            (PropertyType::Vec3, serde_json::Value::Null) => Value::Vec3(glam::Vec3::ZERO),
            (_, default) => Value::from_json(default),
        }
    }
}

/// 行为 schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    properties: BTreeMap<String, PropertySchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性
    pub fn with(mut self, name: &str, property: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    pub fn insert(&mut self, name: &str, property: PropertySchema) {
        self.properties.insert(name.to_string(), property);
    }

    pub fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertySchema)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 所有属性默认值组成的数据对象
    pub fn default_data(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .map(|(name, property)| (name.clone(), property.default_value()))
                .collect::<Fields>(),
        )
    }

    /// 从JSON字符串解析
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// 从TOML字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

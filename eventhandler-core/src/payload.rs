//! 结构化负载（PayloadBag）
//!
//! 订阅分发中单参数处理器接收的参数：字符串键到标量/字符串值的无序映射。
//! 通过消费式的 `with` 构造，构造完成后不可修改。
//!
use crate::error::EventResult;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 负载中的单个值
///
/// 反序列化时整数必须落在 `i64` 范围内，超出范围的整数被拒绝而不是降级为浮点。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl PayloadValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PayloadValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// 整数值会被放宽为浮点
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PayloadValue::Float(v) => Some(*v),
            PayloadValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PayloadValueVisitor)
    }
}

struct PayloadValueVisitor;

impl<'de> Visitor<'de> for PayloadValueVisitor {
    type Value = PayloadValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a bool, an i64 integer, a float or a string")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(PayloadValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(PayloadValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(PayloadValue::Int)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &"an integer within i64 range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(PayloadValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(PayloadValue::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(PayloadValue::Str(v))
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Bool(v) => write!(f, "{v}"),
            PayloadValue::Int(v) => write!(f, "{v}"),
            PayloadValue::Float(v) => write!(f, "{v}"),
            PayloadValue::Str(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for PayloadValue {
            fn from(v: $t) -> Self {
                PayloadValue::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        PayloadValue::Bool(v)
    }
}

impl From<f32> for PayloadValue {
    fn from(v: f32) -> Self {
        PayloadValue::Float(f64::from(v))
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        PayloadValue::Float(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        PayloadValue::Str(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        PayloadValue::Str(v)
    }
}

/// 结构化负载
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadBag {
    entries: HashMap<String, PayloadValue>,
}

impl PayloadBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个键值并返回新的负载；同名键以后写入者为准
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PayloadValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PayloadValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PayloadValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PayloadValue::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> EventResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// 仅接受扁平对象；嵌套的数组/对象/null 视为格式错误
    pub fn from_json(value: serde_json::Value) -> EventResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl<K, V> FromIterator<(K, V)> for PayloadBag
where
    K: Into<String>,
    V: Into<PayloadValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters() {
        let bag = PayloadBag::new()
            .with("name", "alice")
            .with("count", 3)
            .with("ratio", 0.5)
            .with("ok", true);

        assert_eq!(bag.len(), 4);
        assert_eq!(bag.get_str("name"), Some("alice"));
        assert_eq!(bag.get_i64("count"), Some(3));
        assert_eq!(bag.get_f64("count"), Some(3.0));
        assert_eq!(bag.get_f64("ratio"), Some(0.5));
        assert_eq!(bag.get_bool("ok"), Some(true));
        assert_eq!(bag.get_i64("name"), None);
        assert!(bag.get("missing").is_none());
    }

    #[test]
    fn later_with_overwrites_same_key() {
        let bag = PayloadBag::new().with("k", 1).with("k", "two");
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get_str("k"), Some("two"));
    }

    #[test]
    fn json_conversion() {
        let bag = PayloadBag::from_json(json!({"level": 7, "label": "x", "on": false})).unwrap();
        assert_eq!(bag.get_i64("level"), Some(7));
        assert_eq!(bag.get_str("label"), Some("x"));
        assert_eq!(bag.get_bool("on"), Some(false));
        assert_eq!(bag.to_json().unwrap(), json!({"level": 7, "label": "x", "on": false}));
    }

    #[test]
    fn nested_json_is_rejected() {
        let err = PayloadBag::from_json(json!({"nested": {"a": 1}})).unwrap_err();
        assert!(matches!(err, crate::error::EventError::PayloadFormat { .. }));
    }

    #[test]
    fn out_of_range_integer_is_rejected() {
        let err = PayloadBag::from_json(json!({"big": u64::MAX})).unwrap_err();
        assert!(matches!(err, crate::error::EventError::PayloadFormat { .. }));

        let bag = PayloadBag::from_json(json!({"max": i64::MAX, "min": i64::MIN, "f": 1.5}))
            .unwrap();
        assert_eq!(bag.get_i64("max"), Some(i64::MAX));
        assert_eq!(bag.get_i64("min"), Some(i64::MIN));
        assert_eq!(bag.get("f"), Some(&PayloadValue::Float(1.5)));
    }

    #[test]
    fn collects_from_pairs() {
        let bag: PayloadBag = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(bag.get_i64("b"), Some(2));
        assert_eq!(bag.iter().count(), 2);
    }
}

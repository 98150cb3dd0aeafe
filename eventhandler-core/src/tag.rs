//! 标记（Tag）与被标记目标（Tagged）
//!
//! 一个标记对应一种投递方式，决定单参数处理器允许的参数类型：
//! - [`EventTag`]：延迟队列，参数须为非标量的任意类型；
//! - [`BroadcastTag`]：订阅分发，参数须恰为 [`PayloadBag`](crate::payload::PayloadBag)。
//!
use crate::handler::TaggedMethod;
use crate::signature::{Arity, ParamType};
use std::sync::Arc;

pub trait Tag: Send + Sync + 'static {
    /// 标记名称（用于日志）
    const NAME: &'static str;

    /// 单参数处理器的参数类型约束
    fn accepts(param: &ParamType) -> bool;

    /// 满足约束时得到的调用形态
    fn unary_arity() -> Arity;
}

/// 延迟队列标记
#[derive(Clone, Copy, Debug, Default)]
pub struct EventTag;

impl Tag for EventTag {
    const NAME: &'static str = "event";

    fn accepts(param: &ParamType) -> bool {
        !param.is_primitive()
    }

    fn unary_arity() -> Arity {
        Arity::UnaryObject
    }
}

/// 订阅分发标记
#[derive(Clone, Copy, Debug, Default)]
pub struct BroadcastTag;

impl Tag for BroadcastTag {
    const NAME: &'static str = "broadcast";

    fn accepts(param: &ParamType) -> bool {
        matches!(param, ParamType::PayloadBag)
    }

    fn unary_arity() -> Arity {
        Arity::UnaryPayload
    }
}

/// 拥有被 `T` 标记方法的目标对象
///
/// 通常由 `#[event_handlers]` 宏生成；返回的每个 [`TaggedMethod`] 都持有目标的共享引用。
pub trait Tagged<T: Tag>: Send + Sync + 'static {
    fn tagged_methods(self: Arc<Self>) -> Vec<TaggedMethod>;
}

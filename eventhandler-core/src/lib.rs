//! 事件处理核心库（eventhandler-core）
//!
//! 将目标对象上"被事件名标记的方法"整理为不可变的处理器注册表：
//! - 标记（`tag`）：区分延迟队列（`EventTag`）与订阅分发（`BroadcastTag`）两种投递方式；
//! - 签名（`signature`）：以数据描述方法的返回类型与参数，构建期据此校验；
//! - 处理器（`handler`）：类型擦除后的可调用体，按无参/单参的带标签联合调用；
//! - 注册表（`registry`）：事件名 → 处理器映射，全有或全无地构建；
//! - 负载（`payload`）：订阅分发使用的结构化负载 `PayloadBag`。
//!
//! 本 crate 不依赖任何异步运行时，投递实现见 `eventhandler-dispatch`。
//!
//! 典型用法：
//! 1. 在目标类型的 `impl` 块上使用 `#[event_handlers]`，以 `#[event("..")]`/`#[broadcast("..")]`
//!    标记方法，或通过 `HandlerRegistry::builder()` 显式注册闭包；
//! 2. 调用 `HandlerRegistry::build(Arc::new(target))`，签名不合法时立即得到 `SignatureError`；
//! 3. 将注册表交给分发器。
//!
pub mod error;
pub mod handler;
pub mod payload;
pub mod registry;
pub mod signature;
pub mod tag;

pub use error::{EventError, EventResult, SignatureError, SignatureErrorKind};
pub use handler::{BoxAnySend, HandlerSpec, Invoker, TaggedMethod};
pub use payload::{PayloadBag, PayloadValue};
pub use registry::{DuplicatePolicy, HandlerRegistry, RegistryBuilder};
pub use signature::{Arity, HandlerReturn, MethodSignature, ParamType, ReturnType};
pub use tag::{BroadcastTag, EventTag, Tag, Tagged};

// 允许在本 crate 内部通过 ::eventhandler_core 进行自引用，
// 以便过程宏生成的代码在本 crate 的测试中也能解析到该路径。
extern crate self as eventhandler_core;

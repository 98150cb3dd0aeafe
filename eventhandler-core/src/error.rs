//! 统一错误定义
//!
//! 按发生阶段划分：
//! - 注册期：`Signature`，处理器签名不合法，构建注册表时立即失败；
//! - 发送期：`UnknownEvent`/`MissingPayload`/`PayloadType`，调用方编程错误，同步返回；
//! - 执行期：`HandlerInvocation`，仅在分发边界记录日志后吞掉，不会回传给发送方。
//!
use thiserror::Error;

/// 签名校验失败的具体类别（按校验顺序排列）
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SignatureErrorKind {
    #[error("empty event name")]
    EmptyName,
    #[error("return type other than void")]
    NonVoidReturn,
    #[error("too many parameters")]
    TooManyParameters,
    #[error("invalid parameter type")]
    InvalidParameterType,
    #[error("no invoker bound")]
    Unbound,
    #[error("duplicate event name")]
    DuplicateName,
}

/// 处理器签名错误：只在注册表构建期间产生
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("signature error: method={method}, event={event}, kind={kind}")]
pub struct SignatureError {
    pub method: String,
    pub event: String,
    pub kind: SignatureErrorKind,
}

impl SignatureError {
    pub fn new(method: impl Into<String>, event: impl Into<String>, kind: SignatureErrorKind) -> Self {
        Self {
            method: method.into(),
            event: event.into(),
            kind,
        }
    }
}

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    // --- 注册期 ---
    #[error(transparent)]
    Signature(#[from] SignatureError),

    // --- 发送期 ---
    #[error("unknown event: {name}")]
    UnknownEvent { name: String },
    #[error("payload required: event={event}, expected={expected}")]
    MissingPayload { event: String, expected: &'static str },
    #[error("payload type mismatch: event={event}, expected={expected}")]
    PayloadType { event: String, expected: &'static str },

    // --- 执行期 ---
    #[error("handler invocation error: event={event}, reason={reason}")]
    HandlerInvocation { event: String, reason: String },

    // --- 运行时/传输 ---
    #[error("dispatcher closed")]
    DispatcherClosed,
    #[error("broadcast bus error: {reason}")]
    BroadcastBus { reason: String },
    #[error("spawn error: {reason}")]
    Spawn { reason: String },
    #[error("payload format error: {reason}")]
    PayloadFormat { reason: String },
}

impl EventError {
    pub fn unknown_event(name: impl Into<String>) -> Self {
        Self::UnknownEvent { name: name.into() }
    }

    pub fn broadcast_bus(reason: impl Into<String>) -> Self {
        Self::BroadcastBus {
            reason: reason.into(),
        }
    }

    /// 若为签名错误，返回其类别
    pub fn signature_kind(&self) -> Option<SignatureErrorKind> {
        match self {
            Self::Signature(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::PayloadFormat {
            reason: err.to_string(),
        }
    }
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

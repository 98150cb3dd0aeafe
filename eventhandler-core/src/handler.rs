//! 处理器（Handler）
//!
//! - [`Invoker`]：类型擦除后的可调用体，以带标签联合区分无参/单参，分发时用 `match` 调用；
//! - [`TaggedMethod`]：一条"被标记的方法"：事件名 + 签名描述 + 可调用体；
//! - [`HandlerSpec`]：通过校验后存入注册表的处理器。
//!
use crate::signature::{Arity, HandlerReturn, MethodSignature, ParamType};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

pub type BoxAnySend = Box<dyn Any + Send>;

type NullaryFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

type UnaryFn = Arc<dyn Fn(BoxAnySend) -> anyhow::Result<()> + Send + Sync>;

/// 类型擦除后的处理器调用体
#[derive(Clone)]
pub enum Invoker {
    Nullary(NullaryFn),
    Unary {
        /// 参数的具体类型，发送期据此校验负载
        accepts: TypeId,
        type_name: &'static str,
        call: UnaryFn,
    },
}

impl Invoker {
    pub fn nullary<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        Invoker::Nullary(Arc::new(move || f().into_outcome()))
    }

    pub fn unary<A, F, R>(f: F) -> Self
    where
        A: Any + Send,
        F: Fn(A) -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        Invoker::Unary {
            accepts: TypeId::of::<A>(),
            type_name: type_name::<A>(),
            call: Arc::new(move |boxed: BoxAnySend| match boxed.downcast::<A>() {
                Ok(arg) => f(*arg).into_outcome(),
                Err(_) => Err(anyhow::anyhow!(
                    "payload type mismatch: expected {}",
                    type_name::<A>()
                )),
            }),
        }
    }

    /// 单参处理器期望的负载类型
    pub fn payload_type(&self) -> Option<(TypeId, &'static str)> {
        match self {
            Invoker::Nullary(_) => None,
            Invoker::Unary {
                accepts, type_name, ..
            } => Some((*accepts, type_name)),
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Nullary(_) => f.write_str("Invoker::Nullary"),
            Invoker::Unary { type_name, .. } => write!(f, "Invoker::Unary({type_name})"),
        }
    }
}

/// 被标记的方法
#[derive(Clone, Debug)]
pub struct TaggedMethod {
    event: String,
    signature: MethodSignature,
    invoker: Option<Invoker>,
}

impl TaggedMethod {
    /// 无参处理器
    pub fn nullary<F, R>(method: impl Into<String>, event: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        Self {
            event: event.into(),
            signature: MethodSignature::builder()
                .method(method)
                .returns(R::return_type())
                .build(),
            invoker: Some(Invoker::nullary(f)),
        }
    }

    /// 单参处理器，参数类型 `A` 由 [`ParamType::of`] 分类
    pub fn unary<A, F, R>(method: impl Into<String>, event: impl Into<String>, f: F) -> Self
    where
        A: Any + Send,
        F: Fn(A) -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        Self {
            event: event.into(),
            signature: MethodSignature::builder()
                .method(method)
                .returns(R::return_type())
                .params(vec![ParamType::of::<A>()])
                .build(),
            invoker: Some(Invoker::unary(f)),
        }
    }

    /// 仅有签名描述、没有可调用体的方法
    ///
    /// 用于类型化构造器无法表达的签名（有返回值、多个参数），使其在构建期报告具体的签名错误。
    pub fn describe(event: impl Into<String>, signature: MethodSignature) -> Self {
        Self {
            event: event.into(),
            signature,
            invoker: None,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub(crate) fn into_parts(self) -> (String, MethodSignature, Option<Invoker>) {
        (self.event, self.signature, self.invoker)
    }
}

/// 注册表中的处理器
#[derive(Clone, Debug)]
pub struct HandlerSpec {
    name: String,
    method: String,
    arity: Arity,
    invoker: Invoker,
}

impl HandlerSpec {
    pub(crate) fn new(name: String, method: String, arity: Arity, invoker: Invoker) -> Self {
        Self {
            name,
            method,
            arity,
            invoker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 来源方法名
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// 调用处理器
    ///
    /// 无参处理器忽略负载；单参处理器缺少负载时返回错误。
    pub fn invoke(&self, payload: Option<BoxAnySend>) -> anyhow::Result<()> {
        match (&self.invoker, payload) {
            (Invoker::Nullary(f), _) => f(),
            (Invoker::Unary { call, .. }, Some(arg)) => call(arg),
            (Invoker::Unary { type_name, .. }, None) => {
                Err(anyhow::anyhow!("payload required: expected {type_name}"))
            }
        }
    }
}

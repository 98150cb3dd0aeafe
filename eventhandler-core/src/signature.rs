//! 方法签名描述（MethodSignature）
//!
//! 以数据形式描述被标记方法的"调用约定"：返回类型与参数列表。
//! 注册表构建时据此做校验，分发时不再做任何类型探查。
//!
use crate::payload::PayloadBag;
use crate::tag::Tag;
use crate::error::SignatureErrorKind;
use bon::Builder;
use std::any::{Any, TypeId, type_name};

/// 返回类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnType {
    /// `()`
    Unit,
    /// `Result<(), E>`：无结果，但可能失败
    Fallible,
    /// 其他任何有值的返回类型
    Value(&'static str),
}

impl ReturnType {
    pub fn value<R: ?Sized>() -> Self {
        ReturnType::Value(type_name::<R>())
    }

    /// 是否等价于"无结果"
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnType::Unit | ReturnType::Fallible)
    }
}

/// 参数类型分类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// 标量：bool、char、整数、浮点
    Primitive(&'static str),
    /// 结构化负载 [`PayloadBag`]
    PayloadBag,
    /// 其他任意非标量类型
    Object(&'static str),
}

const PRIMITIVE_NAMES: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64",
];

fn primitive_ids() -> [(TypeId, &'static str); 16] {
    macro_rules! ids {
        ($($t:ty),* $(,)?) => { [$((TypeId::of::<$t>(), stringify!($t))),*] };
    }
    ids![bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64]
}

impl ParamType {
    /// 基于 `TypeId` 精确分类
    pub fn of<T: Any>() -> Self {
        let id = TypeId::of::<T>();
        if id == TypeId::of::<PayloadBag>() {
            return ParamType::PayloadBag;
        }
        match primitive_ids().iter().find(|(pid, _)| *pid == id) {
            Some((_, name)) => ParamType::Primitive(name),
            None => ParamType::Object(type_name::<T>()),
        }
    }

    /// 仅凭类型名分类，适用于无法满足 `'static` 的类型（如引用）
    pub fn named<T: ?Sized>() -> Self {
        let name = type_name::<T>();
        if PRIMITIVE_NAMES.contains(&name) {
            ParamType::Primitive(name)
        } else if name == type_name::<PayloadBag>() {
            ParamType::PayloadBag
        } else {
            ParamType::Object(name)
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, ParamType::Primitive(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamType::Primitive(n) | ParamType::Object(n) => n,
            ParamType::PayloadBag => type_name::<PayloadBag>(),
        }
    }
}

/// 处理器的调用形态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Nullary,
    /// 单个任意对象参数（延迟队列）
    UnaryObject,
    /// 单个 [`PayloadBag`] 参数（订阅分发）
    UnaryPayload,
}

/// 方法签名
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    #[builder(into)]
    method: String,
    #[builder(default = ReturnType::Unit)]
    returns: ReturnType,
    #[builder(default)]
    params: Vec<ParamType>,
}

impl MethodSignature {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn returns(&self) -> ReturnType {
        self.returns
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// 按固定顺序校验，遇到第一个违规即返回：
    /// 返回类型 → 参数个数 → 参数类型（由 `T` 决定约束）
    pub fn validate<T: Tag>(&self) -> Result<Arity, SignatureErrorKind> {
        if !self.returns.is_void() {
            return Err(SignatureErrorKind::NonVoidReturn);
        }

        match self.params.as_slice() {
            [] => Ok(Arity::Nullary),
            [param] => {
                if T::accepts(param) {
                    Ok(T::unary_arity())
                } else {
                    Err(SignatureErrorKind::InvalidParameterType)
                }
            }
            _ => Err(SignatureErrorKind::TooManyParameters),
        }
    }
}

/// 处理器允许的返回类型：`()` 与 `Result<(), E>`
///
/// 有值的返回类型无法实现该 trait，只能经由
/// [`TaggedMethod::describe`](crate::handler::TaggedMethod::describe) 登记，并在构建期被拒绝。
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid handler return type",
    label = "unsupported handler return type",
    note = "handlers must return `()` or `Result<(), E>` where `E: Into<anyhow::Error>` (e.g. `anyhow::Error`, `std::io::Error`)"
)]
pub trait HandlerReturn: 'static {
    fn return_type() -> ReturnType;

    fn into_outcome(self) -> anyhow::Result<()>;
}

impl HandlerReturn for () {
    fn return_type() -> ReturnType {
        ReturnType::Unit
    }

    fn into_outcome(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> HandlerReturn for Result<(), E>
where
    E: Into<anyhow::Error> + 'static,
{
    fn return_type() -> ReturnType {
        ReturnType::Fallible
    }

    fn into_outcome(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

//! 处理器注册表（HandlerRegistry）
//!
//! 从目标对象的被标记方法一次性构建"事件名 → 处理器"映射，构建后不可变，
//! 可由多个分发器以 `Arc` 共享只读访问。
//!
//! 构建是全有或全无的：任一方法签名不合法即中止，不返回部分注册表。
//!
use crate::error::{EventResult, SignatureError, SignatureErrorKind};
use crate::handler::{HandlerSpec, TaggedMethod};
use crate::signature::HandlerReturn;
use crate::tag::{Tag, Tagged};
use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// 重名处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// 报告 `DuplicateName` 并中止构建
    #[default]
    Reject,
    /// 后注册者覆盖先注册者
    Replace,
}

pub struct HandlerRegistry<T: Tag> {
    handlers: HashMap<String, HandlerSpec>,
    _tag: PhantomData<fn() -> T>,
}

impl<T: Tag> HandlerRegistry<T> {
    /// 扫描目标对象的被标记方法构建注册表
    pub fn build<S>(target: Arc<S>) -> EventResult<Self>
    where
        S: Tagged<T>,
    {
        Self::from_methods(<S as Tagged<T>>::tagged_methods(target))
    }

    pub fn builder() -> RegistryBuilder<T> {
        RegistryBuilder::new()
    }

    pub fn from_methods(methods: impl IntoIterator<Item = TaggedMethod>) -> EventResult<Self> {
        Self::from_methods_with(methods, DuplicatePolicy::default())
    }

    pub fn from_methods_with(
        methods: impl IntoIterator<Item = TaggedMethod>,
        duplicates: DuplicatePolicy,
    ) -> EventResult<Self> {
        let mut handlers: HashMap<String, HandlerSpec> = HashMap::new();

        for tagged in methods {
            let (event, signature, invoker) = tagged.into_parts();
            let method = signature.method().to_string();
            let fail = |kind| SignatureError::new(method.clone(), event.clone(), kind);

            if event.is_empty() {
                return Err(fail(SignatureErrorKind::EmptyName).into());
            }

            let arity = signature.validate::<T>().map_err(fail)?;
            let Some(invoker) = invoker else {
                return Err(fail(SignatureErrorKind::Unbound).into());
            };

            debug!(tag = T::NAME, %method, %event, ?arity, "processing tagged method");

            let spec = HandlerSpec::new(event.clone(), method.clone(), arity, invoker);
            match handlers.entry(event.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(spec);
                }
                Entry::Occupied(mut slot) => match duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(fail(SignatureErrorKind::DuplicateName).into());
                    }
                    DuplicatePolicy::Replace => {
                        warn!(
                            tag = T::NAME,
                            event = %slot.key(),
                            replaced = %slot.get().method(),
                            by = %method,
                            "duplicate event name, replacing handler"
                        );
                        slot.insert(spec);
                    }
                },
            }
        }

        Ok(Self {
            handlers,
            _tag: PhantomData,
        })
    }

    pub fn get(&self, name: &str) -> Option<&HandlerSpec> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// 已注册的事件名（无序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T: Tag> fmt::Debug for HandlerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tag", &T::NAME)
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// 显式注册处理器的构建器
pub struct RegistryBuilder<T: Tag> {
    methods: Vec<TaggedMethod>,
    duplicates: DuplicatePolicy,
    _tag: PhantomData<fn() -> T>,
}

impl<T: Tag> RegistryBuilder<T> {
    fn new() -> Self {
        Self {
            methods: Vec::new(),
            duplicates: DuplicatePolicy::default(),
            _tag: PhantomData,
        }
    }

    pub fn nullary<F, R>(self, method: impl Into<String>, event: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        self.method(TaggedMethod::nullary(method, event, f))
    }

    pub fn unary<A, F, R>(self, method: impl Into<String>, event: impl Into<String>, f: F) -> Self
    where
        A: Any + Send,
        F: Fn(A) -> R + Send + Sync + 'static,
        R: HandlerReturn,
    {
        self.method(TaggedMethod::unary(method, event, f))
    }

    pub fn method(mut self, method: TaggedMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// 合并目标对象上被标记的方法
    pub fn target<S: Tagged<T>>(mut self, target: Arc<S>) -> Self {
        self.methods.extend(<S as Tagged<T>>::tagged_methods(target));
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn build(self) -> EventResult<HandlerRegistry<T>> {
        HandlerRegistry::from_methods_with(self.methods, self.duplicates)
    }
}

use proc_macro::TokenStream;

mod event_handlers;
mod utils;

/// 事件处理器宏
/// - 用于固有 `impl` 块，收集其中以 `#[event("name")]` / `#[broadcast("name")]` 标记的方法
/// - 为用到的每种标记生成 `::eventhandler_core::Tagged<EventTag | BroadcastTag>` 实现
/// - 方法须为同步方法，接收者为 `&self` 或无接收者；标记属性在展开后移除
/// - 签名是否合法（返回类型、参数个数、参数类型）由注册表构建期校验
///
/// ```ignore
/// struct Player;
///
/// #[event_handlers]
/// impl Player {
///     #[event("game.tick")]
///     fn on_tick(&self) {}
///
///     #[broadcast("game.score")]
///     fn on_score(&self, bag: PayloadBag) {}
/// }
/// ```
#[proc_macro_attribute]
pub fn event_handlers(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_handlers::expand(attr, item)
}

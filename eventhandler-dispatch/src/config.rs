//! 分发器配置（DispatcherConfig）
//!
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 分发器配置
///
/// 可直接嵌入宿主配置文件（缺省字段取默认值）。
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 分发器名称，用于日志字段与专用线程命名
    #[builder(into, default = DispatcherConfig::DEFAULT_NAME.to_string())]
    pub name: String,
    /// 是否将处理器 panic 视为一次失败的调用（记录后继续），而不是终止分发循环
    #[builder(default = true)]
    pub catch_panics: bool,
}

impl DispatcherConfig {
    pub const DEFAULT_NAME: &'static str = "eventhandler";
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            catch_panics: true,
        }
    }
}

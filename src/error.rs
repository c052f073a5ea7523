use thiserror::Error;

/// 自动化端口错误
///
/// 所有变体都是可恢复的：重试当前步骤一次，之后交给控制器重新驱动会话
#[derive(Debug, Error)]
pub enum PortError {
    /// 页面上找不到元素
    #[error("找不到元素: {selector}")]
    ElementNotFound { selector: String },

    /// 等待元素可见超时
    #[error("等待元素 {selector} 可见超时 ({seconds} 秒)")]
    Timeout { selector: String, seconds: u64 },

    /// 浏览器通信失败（CDP 层面）
    #[error("浏览器操作失败 ({action}): {message}")]
    Browser { action: String, message: String },
}

impl PortError {
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        PortError::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn timeout(selector: impl Into<String>, seconds: u64) -> Self {
        PortError::Timeout {
            selector: selector.into(),
            seconds,
        }
    }

    pub fn browser(action: impl Into<String>, err: impl std::fmt::Display) -> Self {
        PortError::Browser {
            action: action.into(),
            message: err.to_string(),
        }
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, PortError::Timeout { .. })
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("JSON 配置解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// TOML 解析失败
    #[error("TOML 配置解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// 没有任何待选课程
    #[error("配置文件 {path} 中没有任何 CRN")]
    NoClasses { path: String },

    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 会话 / 控制器错误
#[derive(Debug, Error)]
pub enum SnipeError {
    /// 登录失败（致命，整个运行中止）
    #[error("登录失败: {reason}")]
    Authentication { reason: String },

    /// 自动化层错误（可恢复）
    #[error(transparent)]
    Port(#[from] PortError),

    /// 配置错误（仅在启动阶段出现）
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SnipeError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        SnipeError::Authentication {
            reason: reason.into(),
        }
    }

    /// 是否可以通过重新驱动会话来恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SnipeError::Port(_))
    }
}

/// 会话层结果类型
pub type SnipeResult<T> = Result<T, SnipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_are_recoverable() {
        let err: SnipeError = PortError::timeout("#term-go", 10).into();
        assert!(err.is_recoverable());

        let err: SnipeError = PortError::element_not_found("#txt_crn1").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_authentication_is_fatal() {
        let err = SnipeError::authentication("密码错误");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("密码错误"));
    }

    #[test]
    fn test_timeout_display() {
        let err = PortError::timeout("#enterCRNs-tab", 30);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "等待元素 #enterCRNs-tab 可见超时 (30 秒)");
    }
}

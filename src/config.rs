use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置（来自环境变量，启动后不可变）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// 个人信息文件（netid / password / classes）
    pub profile_path: PathBuf,
    /// 注册系统入口
    pub registration_url: String,
    /// 浏览器获取方式
    pub browser: BrowserMode,
    /// 两轮之间的等待策略
    pub retry: RetryPolicy,
    /// 最大轮数，None 表示一直重试直到工作集清空或被取消
    pub max_rounds: Option<usize>,
    /// 每轮允许的最大恢复次数
    pub max_recovery_attempts: usize,
    /// 等待元素可见的超时时间
    pub wait_timeout: Duration,
    /// 点击提交后等待页面刷新错误列表的时间
    pub settle_delay: Duration,
    /// 表单中 CRN 输入框的数量
    pub crn_slots: usize,
    /// 需要人工查看的结果写入的文件
    pub review_file: PathBuf,
    /// 报告输出后保持浏览器打开，直到 Ctrl-C
    pub hold_open: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

/// 浏览器获取方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserMode {
    /// 连接到已经开启调试端口的浏览器
    Connect { port: u16 },
    /// 自行启动浏览器
    Launch {
        executable: Option<PathBuf>,
        headless: bool,
    },
}

/// 等待间隔的增长方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            other => Err(other.to_string()),
        }
    }
}

/// 两轮之间的等待策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub backoff: Backoff,
    /// 指数退避的上限
    pub max_interval: Duration,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: Backoff::Fixed,
            max_interval: interval,
        }
    }

    /// 第 `round` 轮（从 1 开始）结束后的等待时间
    pub fn delay_after(&self, round: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let exponent = round.saturating_sub(1).min(31) as u32;
                self.interval
                    .saturating_mul(2u32.saturating_pow(exponent))
                    .min(self.max_interval.max(self.interval))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            backoff: Backoff::Fixed,
            max_interval: Duration::from_secs(600),
        }
    }
}

/// 页面元素选择器（CSS）
///
/// 默认值对应 Banner 学生注册页面，可在个人信息文件的 `selectors` 中覆盖
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Selectors {
    pub register_link: String,
    pub netid_input: String,
    pub password_input: String,
    pub login_error: String,
    pub term_dropdown: String,
    pub term_result: String,
    pub term_go: String,
    pub enter_crns_tab: String,
    pub crn_form: String,
    /// 第 i 个输入框为 `{crn_input_prefix}{i}`（i 从 1 开始）
    pub crn_input_prefix: String,
    pub add_another_crn: String,
    pub add_crn_button: String,
    pub error_messages: String,
    pub error_dismiss_buttons: String,
    pub notification_anchor: String,
    pub save_button: String,
}

impl Selectors {
    pub fn crn_input(&self, slot: usize) -> String {
        format!("{}{}", self.crn_input_prefix, slot)
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            register_link: "#registerLink".to_string(),
            netid_input: "#netid".to_string(),
            password_input: "#easpass".to_string(),
            login_error: "#errorMessage".to_string(),
            term_dropdown: "#s2id_txt_term".to_string(),
            term_result: ".select2-result".to_string(),
            term_go: "#term-go".to_string(),
            enter_crns_tab: "#enterCRNs-tab".to_string(),
            crn_form: "#tabs-enterCRN".to_string(),
            crn_input_prefix: "#txt_crn".to_string(),
            add_another_crn: "#addAnotherCRN".to_string(),
            add_crn_button: "#addCRNbutton".to_string(),
            error_messages: "ul.error-container a".to_string(),
            error_dismiss_buttons: "ul.error-container button".to_string(),
            notification_anchor: ".notification-center-anchor".to_string(),
            save_button: "#saveButton".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("personal_info.json"),
            registration_url:
                "https://banner.apps.uillinois.edu/StudentRegistrationSSB/?mepCode=1UIUC"
                    .to_string(),
            browser: BrowserMode::Launch {
                executable: None,
                headless: false,
            },
            retry: RetryPolicy::default(),
            max_rounds: None,
            max_recovery_attempts: 3,
            wait_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(1500),
            crn_slots: 10,
            review_file: PathBuf::from("review.txt"),
            hold_open: false,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置（便于测试）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let browser = match lookup("BROWSER_MODE").as_deref().map(str::trim) {
            Some("connect") => BrowserMode::Connect {
                port: parse_var(&lookup, "BROWSER_DEBUG_PORT", 9222u16)?,
            },
            None | Some("") | Some("launch") => BrowserMode::Launch {
                executable: lookup("CHROME_EXECUTABLE")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
                headless: parse_var(&lookup, "HEADLESS", false)?,
            },
            Some(other) => {
                return Err(ConfigError::EnvVarParseFailed {
                    var_name: "BROWSER_MODE".to_string(),
                    value: other.to_string(),
                    expected_type: "connect | launch".to_string(),
                })
            }
        };

        let interval = Duration::from_secs(parse_var(
            &lookup,
            "RETRY_INTERVAL_SECS",
            default.retry.interval.as_secs(),
        )?);
        let retry = RetryPolicy {
            interval,
            backoff: parse_var(&lookup, "RETRY_BACKOFF", Backoff::Fixed)?,
            max_interval: Duration::from_secs(parse_var(
                &lookup,
                "RETRY_MAX_INTERVAL_SECS",
                default.retry.max_interval.as_secs(),
            )?),
        };

        // 0 表示不限制
        let max_rounds = match parse_var(&lookup, "MAX_ROUNDS", 0usize)? {
            0 => None,
            n => Some(n),
        };

        Ok(Self {
            profile_path: lookup("SNIPE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(default.profile_path),
            registration_url: lookup("REGISTRATION_URL").unwrap_or(default.registration_url),
            browser,
            retry,
            max_rounds,
            max_recovery_attempts: parse_var(
                &lookup,
                "MAX_RECOVERY_ATTEMPTS",
                default.max_recovery_attempts,
            )?,
            wait_timeout: Duration::from_secs(parse_var(
                &lookup,
                "WAIT_TIMEOUT_SECS",
                default.wait_timeout.as_secs(),
            )?),
            settle_delay: Duration::from_millis(parse_var(
                &lookup,
                "SETTLE_DELAY_MS",
                default.settle_delay.as_millis() as u64,
            )?),
            crn_slots: parse_var(&lookup, "CRN_SLOTS", default.crn_slots)?.max(1),
            review_file: lookup("REVIEW_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.review_file),
            hold_open: parse_var(&lookup, "HOLD_OPEN", default.hold_open)?,
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", default.verbose_logging)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value: raw.clone(),
            expected_type: std::any::type_name::<T>().to_string(),
        }),
    }
}

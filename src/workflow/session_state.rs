//! 注册会话状态
//!
//! ```text
//! Unauthenticated → Authenticating → AtTermSelect → AtSubmissionForm → Submitted
//!                         ↓                               ↑               │
//!                       Failed                            └───────────────┘
//! ```

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 尚未登录（或页面状态未知，需要重新驱动）
    Unauthenticated,
    /// 已提交凭据，等待登录结果
    Authenticating,
    /// 在学期选择页
    AtTermSelect,
    /// 在 CRN 提交表单
    AtSubmissionForm,
    /// 已提交，尚未读取结果
    Submitted,
    /// 登录失败（致命）
    Failed,
}

impl SessionState {
    /// 终止状态，无法再驱动
    pub fn is_terminal(self) -> bool {
        self == SessionState::Failed
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionState::Unauthenticated => "未登录",
            SessionState::Authenticating => "登录中",
            SessionState::AtTermSelect => "学期选择",
            SessionState::AtSubmissionForm => "CRN 表单",
            SessionState::Submitted => "已提交",
            SessionState::Failed => "失败",
        };
        f.write_str(label)
    }
}

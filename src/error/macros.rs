//! # 错误处理宏

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::AuthError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AuthError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建持久化错误的宏
#[macro_export]
macro_rules! persistence_error {
    ($msg:expr) => {
        $crate::error::AuthError::persistence($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AuthError::persistence(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}

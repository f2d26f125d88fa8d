pub mod config;
pub mod cursor;
pub mod error;
pub mod http;
pub mod monitor;

pub use config::{BilibiliConfig, Config, FeishuConfig};
pub use cursor::{CursorStore, FileCursorStore};
pub use error::{MonitorError, MonitorResult};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use monitor::Monitor;

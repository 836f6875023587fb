//! Web API 层。
//!
//! REST 路由 + 房间级 WebSocket 聊天通道，JWT 认证，
//! 应用层错误到 HTTP 状态码的映射。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

pub use auth::{Claims, JwtService};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;

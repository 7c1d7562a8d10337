//! 客户端 HTTP API
//!
//! 注册、登录、提交表达式和查询结果。除认证两条路由外，
//! `/api/v1/*` 全部要求 Bearer Token。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use auth::AuthConfig;
pub use routes::{create_routes, AppState};

//! # Web API
//!
//! 演示三种服务生命周期、有序中间件管道、JWT 认证、路由级验证以及强类型配置热重载。
//!
//! | 端点 | 说明 |
//! |---|---|
//! | `GET /config` | 启动时的应用设置快照 |
//! | `GET /config-live` | 最新的应用设置 |
//! | `POST /Singleton` | 单例标识 |
//! | `POST /Scoped` | 作用域标识，`name` 必填 |
//! | `POST /Transient` | 瞬时标识，`name` 必填 |
//! | `GET /lifetimes` | 一次请求内的三种标识 |
//! | `GET /users/{id:int}` | 需要认证 |
//! | `POST /users` | 需要认证 |

pub mod routes;
pub mod services;
pub mod settings;
pub mod startup;

pub use routes::User;
pub use services::{IdentifierService, SCOPED_SERVICE, SINGLETON_SERVICE, TRANSIENT_SERVICE};
pub use settings::{AppSettings, JwtSettings};
pub use startup::configure;

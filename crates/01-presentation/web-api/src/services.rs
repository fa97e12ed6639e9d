//! 标识服务
//!
//! 三个实现在构造时各生成一个 UUID，用来观察单例、作用域和瞬时三种生命周期。

use di_abstractions::Capability;
use di_impl::ServiceCollection;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 标识服务
pub trait IdentifierService: Send + Sync {
    /// 构造时生成的标识
    fn get_id(&self) -> &str;
}

macro_rules! identifier_service {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            id: String,
        }

        impl $name {
            pub fn new() -> Self {
                let id = Uuid::new_v4().to_string();
                debug!("创建 {}: {}", stringify!($name), id);
                Self { id }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl IdentifierService for $name {
            fn get_id(&self) -> &str {
                &self.id
            }
        }
    };
}

identifier_service!(
    /// 全局唯一实例
    SingletonService
);
identifier_service!(
    /// 每个请求一个实例
    ScopedService
);
identifier_service!(
    /// 每次解析一个实例
    TransientService
);

pub const SINGLETON_SERVICE: Capability<dyn IdentifierService> =
    Capability::new("SingletonService");
pub const SCOPED_SERVICE: Capability<dyn IdentifierService> = Capability::new("ScopedService");
pub const TRANSIENT_SERVICE: Capability<dyn IdentifierService> =
    Capability::new("TransientService");

/// 注册三个标识服务
pub fn configure_services(services: &mut ServiceCollection) {
    services
        .add_singleton(&SINGLETON_SERVICE, |_| {
            let service: Arc<dyn IdentifierService> = Arc::new(SingletonService::new());
            Ok(service)
        })
        .add_scoped(&SCOPED_SERVICE, |_| {
            let service: Arc<dyn IdentifierService> = Arc::new(ScopedService::new());
            Ok(service)
        })
        .add_transient(&TRANSIENT_SERVICE, |_| {
            let service: Arc<dyn IdentifierService> = Arc::new(TransientService::new());
            Ok(service)
        });
}

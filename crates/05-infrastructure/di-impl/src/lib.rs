//! # 依赖注入具体实现
//!
//! 提供服务集合、服务提供者和请求作用域的具体实现。
//!
//! ```
//! use di_abstractions::Capability;
//! use di_impl::ServiceCollection;
//! use std::sync::Arc;
//!
//! const GREETING: Capability<String> = Capability::new("Greeting");
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(&GREETING, |_| Ok(Arc::new("hello".to_string())));
//! let provider = services.build().unwrap();
//!
//! let scope = provider.open_scope();
//! assert_eq!(scope.resolve(&GREETING).unwrap().as_str(), "hello");
//! ```

pub mod collection;
pub mod provider;
pub mod scope;

pub use collection::ServiceCollection;
pub use provider::ServiceProvider;
pub use scope::ServiceScope;

//! 服务能力标识
//!
//! 能力键是一个静态字符串标签，解析时不依赖运行时类型反射。
//! [`Capability`] 在键之上附带解析结果的 Rust 类型，可以是 trait 对象。

use std::fmt;
use std::marker::PhantomData;

/// 能力键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityKey(&'static str);

impl CapabilityKey {
    /// 创建能力键
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// 能力名称
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 带类型的能力
///
/// 解析后得到 `Arc<T>`。通常声明为常量：
///
/// ```
/// use di_abstractions::Capability;
///
/// trait Clock: Send + Sync {}
/// const CLOCK: Capability<dyn Clock> = Capability::new("Clock");
/// assert_eq!(CLOCK.name(), "Clock");
/// ```
pub struct Capability<T: ?Sized + 'static> {
    key: CapabilityKey,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> Capability<T> {
    /// 创建能力
    pub const fn new(name: &'static str) -> Self {
        Self {
            key: CapabilityKey::new(name),
            _marker: PhantomData,
        }
    }

    /// 能力键
    pub const fn key(&self) -> CapabilityKey {
        self.key
    }

    /// 能力名称
    pub const fn name(&self) -> &'static str {
        self.key.name()
    }

    /// 解析结果的类型名称
    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: ?Sized + 'static> Clone for Capability<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized + 'static> Copy for Capability<T> {}

impl<T: ?Sized + 'static> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("key", &self.key)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: ?Sized + 'static> From<Capability<T>> for CapabilityKey {
    fn from(capability: Capability<T>) -> Self {
        capability.key
    }
}

impl<T: ?Sized + 'static> From<&Capability<T>> for CapabilityKey {
    fn from(capability: &Capability<T>) -> Self {
        capability.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {}

    const GREETER: Capability<dyn Greeter> = Capability::new("Greeter");

    #[test]
    fn capability_exposes_key() {
        let key: CapabilityKey = GREETER.into();
        assert_eq!(key, CapabilityKey::new("Greeter"));
        assert_eq!(key.to_string(), "Greeter");
        assert!(GREETER.type_name().contains("Greeter"));
    }
}

//! 依赖图与循环依赖检测

use crate::capability::CapabilityKey;
use crate::descriptor::ServiceDescriptor;
use infrastructure_common::{DependencyError, Lifetime};
use std::collections::{HashMap, HashSet};

/// 依赖图节点
#[derive(Debug, Clone)]
pub struct DependencyGraphNode {
    /// 能力键
    pub key: CapabilityKey,
    /// 生命周期
    pub lifetime: Lifetime,
    /// 声明的依赖
    pub dependencies: Vec<CapabilityKey>,
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测循环依赖
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError>;

    /// 构建依赖图
    fn build_dependency_graph<'a>(
        &self,
        descriptors: impl IntoIterator<Item = &'a ServiceDescriptor>,
    ) -> Vec<DependencyGraphNode>
    where
        Self: Sized,
    {
        descriptors
            .into_iter()
            .map(|descriptor| DependencyGraphNode {
                key: descriptor.key(),
                lifetime: descriptor.lifetime(),
                dependencies: descriptor.dependencies().to_vec(),
            })
            .collect()
    }
}

/// 默认循环依赖检测器，深度优先搜索
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError> {
        let index: HashMap<CapabilityKey, &DependencyGraphNode> =
            graph.iter().map(|node| (node.key, node)).collect();
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        // 按键排序，保证报告的环稳定
        let mut roots: Vec<_> = graph.iter().map(|node| node.key).collect();
        roots.sort();

        for key in roots {
            if !visited.contains(&key) {
                Self::dfs_check(key, &index, &mut visited, &mut path)?;
            }
        }

        Ok(())
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check(
        current: CapabilityKey,
        index: &HashMap<CapabilityKey, &DependencyGraphNode>,
        visited: &mut HashSet<CapabilityKey>,
        path: &mut Vec<CapabilityKey>,
    ) -> Result<(), DependencyError> {
        if let Some(start) = path.iter().position(|key| *key == current) {
            let chain = path[start..]
                .iter()
                .chain(std::iter::once(&current))
                .map(CapabilityKey::name)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
        }

        if visited.contains(&current) {
            return Ok(());
        }

        path.push(current);
        if let Some(node) = index.get(&current) {
            for dependency in &node.dependencies {
                Self::dfs_check(*dependency, index, visited, path)?;
            }
        }
        path.pop();
        visited.insert(current);

        Ok(())
    }
}

//! 执行器查询

use crate::model::JobGroup;
use std::collections::HashMap;

/// 按 ID 查询执行器，查不到返回 None
pub trait GroupStore: Send + Sync {
    fn load(&self, group_id: i64) -> Option<JobGroup>;
}

/// 内存执行器表（从配置加载）
#[derive(Debug, Clone, Default)]
pub struct MemoryGroupStore {
    groups: HashMap<i64, JobGroup>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: JobGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<JobGroup> for MemoryGroupStore {
    fn from_iter<I: IntoIterator<Item = JobGroup>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().map(|g| (g.id, g)).collect(),
        }
    }
}

impl GroupStore for MemoryGroupStore {
    fn load(&self, group_id: i64) -> Option<JobGroup> {
        self.groups.get(&group_id).cloned()
    }
}

// crates/ap_grid/src/store.rs

//! 单元仓库
//!
//! 槽位式存储：句柄在单元生命周期内稳定，删除产生的空槽
//! 由自由表复用。邻居链接一律通过 [`CellId`] 查仓库，不存在
//! 跨单元的所有权指针，环状邻接因此不构成内存管理问题。

use crate::cell::Cell;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 单元句柄
///
/// 仅在其所属仓库内有效；删除后句柄悬空，由持有方显式擦除。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub usize);

/// 单元仓库
#[derive(Default)]
pub struct CellStore {
    slots: Vec<Option<Cell>>,
    free: Vec<usize>,
    live: usize,
}

impl CellStore {
    /// 创建空仓库
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 预留容量
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// 插入单元，返回稳定句柄
    pub fn insert(&mut self, cell: Cell) -> CellId {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(cell);
            CellId(slot)
        } else {
            self.slots.push(Some(cell));
            CellId(self.slots.len() - 1)
        }
    }

    /// 删除单元，返回其所有权
    pub fn remove(&mut self, id: CellId) -> Option<Cell> {
        let cell = self.slots.get_mut(id.0)?.take();
        if cell.is_some() {
            self.free.push(id.0);
            self.live -= 1;
        }
        cell
    }

    /// 句柄是否存活
    #[inline]
    #[must_use]
    pub fn contains(&self, id: CellId) -> bool {
        self.slots.get(id.0).is_some_and(Option::is_some)
    }

    /// 只读访问
    #[inline]
    #[must_use]
    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// 可变访问
    #[inline]
    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// 存活单元数
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// 是否为空
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// 遍历存活单元
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (CellId(i), c)))
    }
}

impl Index<CellId> for CellStore {
    type Output = Cell;

    fn index(&self, id: CellId) -> &Cell {
        self.get(id)
            .unwrap_or_else(|| panic!("单元句柄 {:?} 已失效", id))
    }
}

impl IndexMut<CellId> for CellStore {
    fn index_mut(&mut self, id: CellId) -> &mut Cell {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("单元句柄 {:?} 已失效", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_geo::Rect;

    fn cell() -> Cell {
        Cell::new(Rect::from_bounds(0.0, 0.0, 1.0, 1.0), vec![[0, 0]], 0, 1)
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = CellStore::new();
        let id = store.insert(cell());
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);
        assert_eq!(store[id].layer, 0);
    }

    #[test]
    fn test_remove_frees_slot() {
        let mut store = CellStore::new();
        let a = store.insert(cell());
        assert!(store.remove(a).is_some());
        assert!(!store.contains(a));
        assert_eq!(store.len(), 0);
        // 空槽复用
        let b = store.insert(cell());
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_double_remove() {
        let mut store = CellStore::new();
        let a = store.insert(cell());
        assert!(store.remove(a).is_some());
        assert!(store.remove(a).is_none());
    }

    #[test]
    fn test_iter_skips_holes() {
        let mut store = CellStore::new();
        let a = store.insert(cell());
        let b = store.insert(cell());
        store.remove(a);
        let ids: Vec<_> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b]);
    }
}

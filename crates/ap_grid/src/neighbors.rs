// crates/ap_grid/src/neighbors.rs

//! 邻居解析
//!
//! 分数覆盖模型：每个面持有一列邻居与覆盖分数，规则网格退化为
//! 单邻居、分数 1 的情形。解析过程：
//!
//! 1. 以 ε 扩张的包围盒查询空间索引得到候选
//! 2. 按层与共享边/共享面积分类到六个面与地面层列表
//! 3. 沿面的正交轴按邻居质心排序
//! 4. 覆盖分数 = 共享段长(或面积) / 本单元面长(或足迹面积)
//! 5. 空面重绑边界哨兵（层 0 的下面为隐式反射）
//!
//! 重建对称地作用于触及的所有单元，邻接对称性由同一几何推导
//! 自然成立。

use crate::cell::{Cell, Face, Neighbor};
use crate::grid::Grid;
use crate::store::CellId;
use ap_foundation::tolerance::{harmonic_mean, GEOM_EPS};
use ap_geo::Rect;

/// 候选单元快照
///
/// 在重建前收集，避免与仓库的可变借用交叠。
struct Candidate {
    id: CellId,
    rect: Rect,
    layer: usize,
    dx: f64,
    dy: f64,
    dz: f64,
    kzz: f64,
    kxxyy: f64,
}

impl Candidate {
    fn of(id: CellId, cell: &Cell) -> Self {
        Self {
            id,
            rect: cell.footprint,
            layer: cell.layer,
            dx: cell.dx,
            dy: cell.dy,
            dz: cell.dz,
            kzz: cell.met.kzz,
            kxxyy: cell.met.kxxyy,
        }
    }
}

/// 构造好的面列表
#[derive(Default)]
struct FaceLists {
    west: Vec<Neighbor>,
    east: Vec<Neighbor>,
    south: Vec<Neighbor>,
    north: Vec<Neighbor>,
    below: Vec<Neighbor>,
    above: Vec<Neighbor>,
    ground_level: Vec<Neighbor>,
}

impl Grid {
    /// 重建单元的全部邻居列表
    ///
    /// 先释放其原有的边界哨兵，再按当前空间索引重新解析。
    pub(crate) fn rebuild_neighbors(&mut self, id: CellId) {
        self.release_boundary_copies(id);

        // 本单元快照
        let me = Candidate::of(id, &self.store[id]);
        let area = me.rect.area();

        // 候选快照（剔除自身；索引只含内部单元）
        let candidates: Vec<Candidate> = self
            .index
            .locate_in_rect(&me.rect.expanded(GEOM_EPS))
            .into_iter()
            .filter(|env| env.id != id)
            .map(|env| Candidate::of(env.id, &self.store[env.id]))
            .collect();

        // 分类（带排序键：面正交轴上的质心坐标）
        let mut west: Vec<(f64, Neighbor)> = Vec::new();
        let mut east: Vec<(f64, Neighbor)> = Vec::new();
        let mut south: Vec<(f64, Neighbor)> = Vec::new();
        let mut north: Vec<(f64, Neighbor)> = Vec::new();
        let mut below: Vec<(f64, Neighbor)> = Vec::new();
        let mut above: Vec<(f64, Neighbor)> = Vec::new();
        let mut ground: Vec<(f64, Neighbor)> = Vec::new();

        for cand in &candidates {
            let centroid = cand.rect.centroid();
            if cand.layer == me.layer {
                let oy = me.rect.overlap_y(&cand.rect);
                let ox = me.rect.overlap_x(&cand.rect);
                if (cand.rect.max.x - me.rect.min.x).abs() <= GEOM_EPS && oy > GEOM_EPS {
                    west.push((
                        centroid.y,
                        Neighbor {
                            id: cand.id,
                            frac: oy / me.dy,
                            dist: 0.5 * (me.dx + cand.dx),
                            diff: harmonic_mean(me.kxxyy, cand.kxxyy),
                        },
                    ));
                } else if (cand.rect.min.x - me.rect.max.x).abs() <= GEOM_EPS && oy > GEOM_EPS {
                    east.push((
                        centroid.y,
                        Neighbor {
                            id: cand.id,
                            frac: oy / me.dy,
                            dist: 0.5 * (me.dx + cand.dx),
                            diff: harmonic_mean(me.kxxyy, cand.kxxyy),
                        },
                    ));
                } else if (cand.rect.max.y - me.rect.min.y).abs() <= GEOM_EPS && ox > GEOM_EPS {
                    south.push((
                        centroid.x,
                        Neighbor {
                            id: cand.id,
                            frac: ox / me.dx,
                            dist: 0.5 * (me.dy + cand.dy),
                            diff: harmonic_mean(me.kxxyy, cand.kxxyy),
                        },
                    ));
                } else if (cand.rect.min.y - me.rect.max.y).abs() <= GEOM_EPS && ox > GEOM_EPS {
                    north.push((
                        centroid.x,
                        Neighbor {
                            id: cand.id,
                            frac: ox / me.dx,
                            dist: 0.5 * (me.dy + cand.dy),
                            diff: harmonic_mean(me.kxxyy, cand.kxxyy),
                        },
                    ));
                }
            } else {
                let oa = me.rect.overlap_area(&cand.rect);
                if oa > GEOM_EPS {
                    if cand.layer + 1 == me.layer {
                        below.push((
                            centroid.x,
                            Neighbor {
                                id: cand.id,
                                frac: oa / area,
                                dist: 0.5 * (me.dz + cand.dz),
                                diff: harmonic_mean(me.kzz, cand.kzz),
                            },
                        ));
                    } else if cand.layer == me.layer + 1 {
                        above.push((
                            centroid.x,
                            Neighbor {
                                id: cand.id,
                                frac: oa / area,
                                dist: 0.5 * (me.dz + cand.dz),
                                diff: harmonic_mean(me.kzz, cand.kzz),
                            },
                        ));
                    }
                    if cand.layer == 0 && me.layer > 0 {
                        ground.push((
                            centroid.x,
                            Neighbor {
                                id: cand.id,
                                frac: oa / area,
                                dist: 0.0,
                                diff: 0.0,
                            },
                        ));
                    }
                }
            }
        }

        let sort_take = |mut v: Vec<(f64, Neighbor)>| -> Vec<Neighbor> {
            v.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            v.into_iter().map(|(_, n)| n).collect()
        };

        let mut lists = FaceLists {
            west: sort_take(west),
            east: sort_take(east),
            south: sort_take(south),
            north: sort_take(north),
            below: sort_take(below),
            above: sort_take(above),
            ground_level: sort_take(ground),
        };

        // 层 0 的地面层邻居是其自身
        if me.layer == 0 {
            lists.ground_level = vec![Neighbor {
                id,
                frac: 1.0,
                dist: 0.0,
                diff: 0.0,
            }];
        }

        // 空面处理: 水平与顶面重绑边界哨兵，底面隐式反射
        if lists.west.is_empty() {
            let n = self.bind_boundary(id, Face::West, me.dx, me.kxxyy);
            lists.west.push(n);
        }
        if lists.east.is_empty() {
            let n = self.bind_boundary(id, Face::East, me.dx, me.kxxyy);
            lists.east.push(n);
        }
        if lists.south.is_empty() {
            let n = self.bind_boundary(id, Face::South, me.dy, me.kxxyy);
            lists.south.push(n);
        }
        if lists.north.is_empty() {
            let n = self.bind_boundary(id, Face::North, me.dy, me.kxxyy);
            lists.north.push(n);
        }
        if lists.above.is_empty() {
            let n = self.bind_boundary(id, Face::Above, me.dz, me.kzz);
            lists.above.push(n);
        }
        if lists.below.is_empty() {
            lists.below.push(Neighbor {
                id,
                frac: 1.0,
                dist: me.dz,
                diff: me.kzz,
            });
        }

        let cell = &mut self.store[id];
        cell.west = lists.west;
        cell.east = lists.east;
        cell.south = lists.south;
        cell.north = lists.north;
        cell.below = lists.below;
        cell.above = lists.above;
        cell.ground_level = lists.ground_level;
    }

    /// 为空面创建边界哨兵并登记到对应的边界集合
    fn bind_boundary(&mut self, id: CellId, face: Face, dist: f64, diff: f64) -> Neighbor {
        let copy = self.store[id].boundary_copy();
        let bid = self.store.insert(copy);
        match face {
            Face::West => self.west_boundary.push(bid),
            Face::East => self.east_boundary.push(bid),
            Face::South => self.south_boundary.push(bid),
            Face::North => self.north_boundary.push(bid),
            Face::Above => self.top_boundary.push(bid),
            Face::Below => {}
        }
        Neighbor {
            id: bid,
            frac: 1.0,
            dist,
            diff,
        }
    }

    /// 释放单元面列表中引用的边界哨兵
    pub(crate) fn release_boundary_copies(&mut self, id: CellId) {
        let mut bids: Vec<CellId> = Vec::new();
        {
            let cell = &self.store[id];
            for face in Face::ALL {
                for n in cell.neighbors(face) {
                    if n.id != id {
                        if let Some(other) = self.store.get(n.id) {
                            if other.boundary {
                                bids.push(n.id);
                            }
                        }
                    }
                }
            }
        }
        for bid in bids {
            self.store.remove(bid);
            self.west_boundary.retain(|&x| x != bid);
            self.east_boundary.retain(|&x| x != bid);
            self.south_boundary.retain(|&x| x != bid);
            self.north_boundary.retain(|&x| x != bid);
            self.top_boundary.retain(|&x| x != bid);
        }
    }

    /// 从引用方的列表中擦除已删除的句柄
    ///
    /// 分数重归一化；被清空的面重绑边界哨兵。删除事件之间
    /// 的瞬态网格由此保持自洽。
    pub(crate) fn scrub_references(&mut self, id: CellId, deleted: &std::collections::BTreeSet<CellId>) {
        let mut empty_faces: Vec<Face> = Vec::new();
        let (dx, dy, dz, kxxyy, kzz, layer) = {
            let c = &self.store[id];
            (c.dx, c.dy, c.dz, c.met.kxxyy, c.met.kzz, c.layer)
        };

        {
            let cell = &mut self.store[id];
            for face in Face::ALL {
                let list = cell.neighbors_mut(face);
                let before = list.len();
                list.retain(|n| !deleted.contains(&n.id));
                if list.len() != before {
                    renormalize(list);
                    if list.is_empty() {
                        empty_faces.push(face);
                    }
                }
            }
            let ground = &mut cell.ground_level;
            let before = ground.len();
            ground.retain(|n| !deleted.contains(&n.id));
            if ground.len() != before {
                renormalize(ground);
            }
        }

        for face in empty_faces {
            let neighbor = match face {
                Face::Below => {
                    if layer == 0 {
                        Neighbor {
                            id,
                            frac: 1.0,
                            dist: dz,
                            diff: kzz,
                        }
                    } else {
                        // 下方暂时无单元: 退化为反射，等待补位后的重建
                        Neighbor {
                            id,
                            frac: 1.0,
                            dist: dz,
                            diff: kzz,
                        }
                    }
                }
                Face::Above => self.bind_boundary(id, Face::Above, dz, kzz),
                Face::West => self.bind_boundary(id, Face::West, dx, kxxyy),
                Face::East => self.bind_boundary(id, Face::East, dx, kxxyy),
                Face::South => self.bind_boundary(id, Face::South, dy, kxxyy),
                Face::North => self.bind_boundary(id, Face::North, dy, kxxyy),
            };
            self.store[id].neighbors_mut(face).push(neighbor);
        }
    }
}

/// 分数重归一化
fn renormalize(list: &mut [Neighbor]) {
    let sum: f64 = list.iter().map(|n| n.frac).sum();
    if sum > 0.0 {
        for n in list.iter_mut() {
            n.frac /= sum;
        }
    }
}

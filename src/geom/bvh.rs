use super::{BBox, Point3, Vec3};

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: BBox,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    const fn leaf(bbox: BBox, start: u32, count: u32) -> Self {
        Self {
            bbox,
            left: u32::MAX,
            right: u32::MAX,
            start,
            count,
        }
    }

    const fn inner(bbox: BBox, left: u32, right: u32) -> Self {
        Self {
            bbox,
            left,
            right,
            start: 0,
            count: 0,
        }
    }

    const fn is_leaf(self) -> bool {
        self.count != 0
    }
}

/// Median-split bounding volume hierarchy over primitive boxes.
///
/// The tree only stores primitive indices; callers keep the primitives and
/// answer the exact intersection test in the `closest_ray_hit` callback.
#[derive(Debug, Clone)]
pub(crate) struct Bvh {
    nodes: Vec<BvhNode>,
    prim_indices: Vec<u32>,
}

impl Bvh {
    const DEFAULT_LEAF_SIZE: usize = 4;

    #[must_use]
    pub(crate) fn build(bboxes: &[BBox]) -> Option<Self> {
        Self::build_with_leaf_size(bboxes, Self::DEFAULT_LEAF_SIZE)
    }

    #[must_use]
    pub(crate) fn build_with_leaf_size(bboxes: &[BBox], leaf_size: usize) -> Option<Self> {
        if bboxes.is_empty() {
            return None;
        }

        let leaf_size = leaf_size.clamp(1, 64);
        let mut bvh = Self {
            nodes: Vec::with_capacity(bboxes.len().saturating_mul(2)),
            prim_indices: (0..(bboxes.len() as u32)).collect(),
        };
        bvh.build_node(bboxes, 0, bboxes.len(), leaf_size);
        Some(bvh)
    }

    #[must_use]
    pub(crate) fn primitive_count(&self) -> usize {
        self.prim_indices.len()
    }

    #[must_use]
    pub(crate) fn bounds(&self) -> Option<BBox> {
        self.nodes.first().map(|node| node.bbox)
    }

    fn build_node(&mut self, bboxes: &[BBox], start: usize, end: usize, leaf_size: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let bbox = self.range_bbox(bboxes, start, end);
        self.nodes.push(BvhNode::leaf(bbox, start as u32, (end - start) as u32));

        let count = end - start;
        if count <= leaf_size {
            return node_index;
        }

        let axis = self.widest_centroid_axis(bboxes, start, end);
        let mid = start + count / 2;
        self.prim_indices[start..end].select_nth_unstable_by(mid - start, |a, b| {
            let ca = axis_component(bboxes[*a as usize].center(), axis);
            let cb = axis_component(bboxes[*b as usize].center(), axis);
            ca.total_cmp(&cb)
        });

        let left = self.build_node(bboxes, start, mid, leaf_size);
        let right = self.build_node(bboxes, mid, end, leaf_size);
        self.nodes[node_index as usize] = BvhNode::inner(bbox, left, right);
        node_index
    }

    fn range_bbox(&self, bboxes: &[BBox], start: usize, end: usize) -> BBox {
        self.prim_indices[(start + 1)..end]
            .iter()
            .fold(bboxes[self.prim_indices[start] as usize], |acc, &idx| {
                acc.union(bboxes[idx as usize])
            })
    }

    fn widest_centroid_axis(&self, bboxes: &[BBox], start: usize, end: usize) -> u8 {
        let first = bboxes[self.prim_indices[start] as usize].center();
        let spread = self.prim_indices[(start + 1)..end]
            .iter()
            .fold(BBox::new(first, first), |acc, &idx| {
                acc.expand_point(bboxes[idx as usize].center())
            });

        let ext = spread.max.sub_point(spread.min);
        if ext.x >= ext.y && ext.x >= ext.z {
            0
        } else if ext.y >= ext.z {
            1
        } else {
            2
        }
    }

    /// Walks the tree front-to-back along the ray and returns the primitive
    /// with the smallest ray parameter reported by `hit_distance`.
    ///
    /// `hit_distance` returns the ray parameter of an exact hit against the
    /// primitive, or `None`. Nodes whose slab entry lies beyond the best hit so
    /// far are skipped.
    pub(crate) fn closest_ray_hit<F>(
        &self,
        origin: Point3,
        dir: Vec3,
        t_min: f64,
        mut hit_distance: F,
    ) -> Option<(usize, f64)>
    where
        F: FnMut(usize) -> Option<f64>,
    {
        let root = self.nodes.first()?;
        let inv_dir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);

        let mut best: Option<(usize, f64)> = None;
        let mut best_t = f64::INFINITY;

        let mut stack: Vec<(u32, f64)> = Vec::with_capacity(64);
        if let Some(entry) = slab_entry(origin, inv_dir, root.bbox, t_min, best_t) {
            stack.push((0, entry));
        }

        while let Some((node_idx, entry)) = stack.pop() {
            if entry > best_t {
                continue;
            }

            let node = self.nodes[node_idx as usize];
            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    let prim = prim as usize;
                    let Some(t) = hit_distance(prim) else {
                        continue;
                    };
                    if !t.is_finite() || t < t_min {
                        continue;
                    }
                    // Ties resolve to the lowest primitive index so results do not
                    // depend on traversal order.
                    let better = match best {
                        None => true,
                        Some((best_prim, _)) => t < best_t || (t == best_t && prim < best_prim),
                    };
                    if better {
                        best_t = t;
                        best = Some((prim, t));
                    }
                }
                continue;
            }

            let left = slab_entry(origin, inv_dir, self.nodes[node.left as usize].bbox, t_min, best_t)
                .map(|t| (node.left, t));
            let right = slab_entry(origin, inv_dir, self.nodes[node.right as usize].bbox, t_min, best_t)
                .map(|t| (node.right, t));

            // Push the farther child first so the nearer one is popped next.
            match (left, right) {
                (Some(l), Some(r)) => {
                    if l.1 <= r.1 {
                        stack.push(r);
                        stack.push(l);
                    } else {
                        stack.push(l);
                        stack.push(r);
                    }
                }
                (Some(only), None) | (None, Some(only)) => stack.push(only),
                (None, None) => {}
            }
        }

        best
    }
}

fn axis_component(p: Point3, axis: u8) -> f64 {
    match axis {
        0 => p.x,
        1 => p.y,
        _ => p.z,
    }
}

/// Ray parameter at which the ray enters `bbox`, clipped to `[t_min, t_max]`.
///
/// Axis-parallel rays produce infinite reciprocals; the comparisons below keep
/// working with IEEE infinities as long as the origin is finite.
fn slab_entry(origin: Point3, inv_dir: Vec3, bbox: BBox, t_min: f64, t_max: f64) -> Option<f64> {
    let mut enter = t_min;
    let mut exit = t_max;

    for (o, inv, lo, hi) in [
        (origin.x, inv_dir.x, bbox.min.x, bbox.max.x),
        (origin.y, inv_dir.y, bbox.min.y, bbox.max.y),
        (origin.z, inv_dir.z, bbox.min.z, bbox.max.z),
    ] {
        if !o.is_finite() {
            return None;
        }
        if inv.is_infinite() {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let mut t0 = (lo - o) * inv;
        let mut t1 = (hi - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        enter = enter.max(t0);
        exit = exit.min(t1);
        if exit < enter {
            return None;
        }
    }

    Some(enter)
}

//! Flat-array bounding volume hierarchy.
//!
//! Nodes live in one contiguous `Vec<BvhNode>`; "pointers" are indices into
//! it. The two children of an internal node are stored next to each other,
//! so a node only records the index of its first child. Leaves reference a
//! contiguous range of the reordered primitive index array.
//!
//! The tree is generic over what a primitive is: it is built from one box
//! per primitive and traversal hands candidate primitive indices to a
//! caller-supplied test. Triangles (bottom level) and mesh instances (top
//! level) share this code.

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Ray, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Maximum primitives per leaf before a split is considered.
pub const LEAF_MAX_SIZE: usize = 2;

/// Number of SAH bins for split evaluation.
const SAH_BINS: usize = 12;

/// Cost ratio: traversal vs primitive intersection.
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECT_COST: f32 = 1.0;

/// Below this centroid extent an axis cannot be split.
const MIN_EXTENT: f32 = 1e-8;

/// Inline capacity of the traversal stack; deeper trees spill to the heap.
const STACK_INLINE: usize = 64;

/// How the builder chooses split positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Binned surface area heuristic
    #[default]
    Sah,
    /// Midpoint of the centroid bounds
    Midpoint,
}

/// A BVH node (32 bytes).
///
/// Internal node: `left_or_first` = index of the left child (right child is
/// `left_or_first + 1`), `count = 0`.
/// Leaf node: `left_or_first` = first entry in the primitive index array,
/// `count` > 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left_or_first: u32,
    pub count: u32,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    fn leaf(bounds: Aabb, first: usize, count: usize) -> Self {
        Self {
            bounds,
            left_or_first: first as u32,
            count: count as u32,
        }
    }

    fn internal(bounds: Aabb, left: usize) -> Self {
        Self {
            bounds,
            left_or_first: left as u32,
            count: 0,
        }
    }
}

/// Build task: node index plus its primitive range (end exclusive).
struct BuildTask {
    node: usize,
    start: usize,
    end: usize,
}

#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::EMPTY,
            count: 0,
        }
    }
}

/// Flat BVH over an arbitrary set of primitive boxes.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    /// Primitive indices, reordered so that every leaf owns a contiguous range
    prim_indices: Vec<u32>,
}

impl Bvh {
    /// Build a tree over `bounds`, one box per primitive.
    ///
    /// An empty slice yields an empty tree that every ray misses.
    pub fn build(bounds: &[Aabb], method: SplitMethod) -> Self {
        let n = bounds.len();
        if n == 0 {
            return Self::default();
        }

        let centroids: Vec<Vec3> = bounds.iter().map(Aabb::centroid).collect();
        let mut prim_indices: Vec<u32> = (0..n as u32).collect();

        // A full binary tree with n leaves has 2n - 1 nodes
        let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * n - 1);
        nodes.push(BvhNode::default());

        let mut stack = vec![BuildTask {
            node: 0,
            start: 0,
            end: n,
        }];

        while let Some(task) = stack.pop() {
            let range = &mut prim_indices[task.start..task.end];
            let count = range.len();

            let node_bounds = range
                .iter()
                .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &bounds[i as usize]));

            if count <= LEAF_MAX_SIZE {
                nodes[task.node] = BvhNode::leaf(node_bounds, task.start, count);
                continue;
            }

            let centroid_bounds =
                Aabb::from_point_iter(range.iter().map(|&i| centroids[i as usize]));
            let axis = centroid_bounds.longest_axis();

            let Some(split) = choose_split(method, range, bounds, &centroids, &centroid_bounds, axis)
            else {
                nodes[task.node] = BvhNode::leaf(node_bounds, task.start, count);
                continue;
            };

            if method == SplitMethod::Sah
                && !split_beats_leaf(split.cost, count, node_bounds.surface_area())
            {
                nodes[task.node] = BvhNode::leaf(node_bounds, task.start, count);
                continue;
            }

            let left_count = partition(range, |&i| centroids[i as usize][axis] < split.position);
            if left_count == 0 || left_count == count {
                nodes[task.node] = BvhNode::leaf(node_bounds, task.start, count);
                continue;
            }

            let left = nodes.len();
            nodes.push(BvhNode::default());
            nodes.push(BvhNode::default());
            nodes[task.node] = BvhNode::internal(node_bounds, left);

            let mid = task.start + left_count;
            stack.push(BuildTask {
                node: left + 1,
                start: mid,
                end: task.end,
            });
            stack.push(BuildTask {
                node: left,
                start: task.start,
                end: mid,
            });
        }

        Self {
            nodes,
            prim_indices,
        }
    }

    /// Recompute every node box from new primitive boxes, keeping the
    /// topology. `bounds` must have the same length as at build time.
    pub fn refit(&mut self, bounds: &[Aabb]) {
        debug_assert_eq!(bounds.len(), self.prim_indices.len());

        // Children are always allocated after their parent
        for index in (0..self.nodes.len()).rev() {
            let node = self.nodes[index];
            let refit = if node.is_leaf() {
                let first = node.left_or_first as usize;
                self.prim_indices[first..first + node.count as usize]
                    .iter()
                    .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &bounds[i as usize]))
            } else {
                let left = node.left_or_first as usize;
                Aabb::surrounding(&self.nodes[left].bounds, &self.nodes[left + 1].bounds)
            };
            self.nodes[index].bounds = refit;
        }
    }

    /// Visit candidate primitives along `ray`, nearest subtree first.
    ///
    /// `test(primitive, closest)` must return `Some(t)` when the primitive is
    /// hit at `t` closer than `closest`. Subtrees whose entry distance is not
    /// closer than the current best are skipped. Returns the closest distance
    /// reported, or `t_max` when nothing was hit.
    pub fn traverse<F>(&self, ray: &Ray, t_min: f32, t_max: f32, mut test: F) -> f32
    where
        F: FnMut(u32, f32) -> Option<f32>,
    {
        let mut closest = t_max;
        let Some(root) = self.nodes.first() else {
            return closest;
        };

        let inv_dir = ray.inv_direction();
        let Some(root_t) = root.bounds.hit_distance(ray, inv_dir, t_min, closest) else {
            return closest;
        };

        let mut stack: SmallVec<[(u32, f32); STACK_INLINE]> = SmallVec::new();
        stack.push((0, root_t));

        while let Some((index, entry)) = stack.pop() {
            if entry > closest {
                continue;
            }

            let node = &self.nodes[index as usize];
            if node.is_leaf() {
                let first = node.left_or_first as usize;
                for &prim in &self.prim_indices[first..first + node.count as usize] {
                    if let Some(t) = test(prim, closest) {
                        closest = closest.min(t);
                    }
                }
                continue;
            }

            let left = node.left_or_first;
            let right = left + 1;
            let t_left = self.nodes[left as usize]
                .bounds
                .hit_distance(ray, inv_dir, t_min, closest);
            let t_right = self.nodes[right as usize]
                .bounds
                .hit_distance(ray, inv_dir, t_min, closest);

            // Push the farther child first so the nearer one is popped next
            match (t_left, t_right) {
                (Some(tl), Some(tr)) if tl <= tr => {
                    stack.push((right, tr));
                    stack.push((left, tl));
                }
                (Some(tl), Some(tr)) => {
                    stack.push((left, tl));
                    stack.push((right, tr));
                }
                (Some(tl), None) => stack.push((left, tl)),
                (None, Some(tr)) => stack.push((right, tr)),
                (None, None) => {}
            }
        }

        closest
    }

    /// Bounds of the whole tree, `EMPTY` when there are no primitives.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.bounds)
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.prim_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Primitive ranges of all leaves, in node order.
    pub fn leaves(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| {
            let first = n.left_or_first as usize;
            &self.prim_indices[first..first + n.count as usize]
        })
    }

    /// Depth of the deepest leaf (root = 1).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                max_depth = max_depth.max(depth);
            } else {
                let left = node.left_or_first as usize;
                stack.push((left, depth + 1));
                stack.push((left + 1, depth + 1));
            }
        }
        max_depth
    }
}

struct Split {
    position: f32,
    /// Sum of `count * area` over both sides
    cost: f32,
}

/// SAH termination: `C_trav + C_isect * cost / area` against `C_isect * count`.
fn split_beats_leaf(cost: f32, count: usize, area: f32) -> bool {
    if area <= 0.0 {
        return true;
    }
    TRAVERSAL_COST + INTERSECT_COST * cost / area < INTERSECT_COST * count as f32
}

/// Pick a split position along `axis`, `None` if the centroids coincide.
fn choose_split(
    method: SplitMethod,
    range: &[u32],
    bounds: &[Aabb],
    centroids: &[Vec3],
    centroid_bounds: &Aabb,
    axis: usize,
) -> Option<Split> {
    let extent = centroid_bounds.axis_interval(axis);
    if extent.size() < MIN_EXTENT {
        return None;
    }

    match method {
        SplitMethod::Midpoint => Some(Split {
            position: 0.5 * (extent.min + extent.max),
            cost: 0.0,
        }),
        SplitMethod::Sah => sah_split(range, bounds, centroids, extent.min, extent.size(), axis),
    }
}

/// Binned SAH along one axis.
fn sah_split(
    range: &[u32],
    bounds: &[Aabb],
    centroids: &[Vec3],
    min: f32,
    extent: f32,
    axis: usize,
) -> Option<Split> {
    let mut bins = [Bin::default(); SAH_BINS];
    let scale = SAH_BINS as f32 / extent;

    for &i in range {
        let bin = (((centroids[i as usize][axis] - min) * scale) as usize).min(SAH_BINS - 1);
        bins[bin].bounds = Aabb::surrounding(&bins[bin].bounds, &bounds[i as usize]);
        bins[bin].count += 1;
    }

    // Left sweep: area and count of everything at or below plane i
    let mut left_area = [0.0f32; SAH_BINS - 1];
    let mut left_count = [0usize; SAH_BINS - 1];
    let mut sweep = Aabb::EMPTY;
    let mut sweep_count = 0;
    for i in 0..SAH_BINS - 1 {
        sweep = Aabb::surrounding(&sweep, &bins[i].bounds);
        sweep_count += bins[i].count;
        left_area[i] = sweep.surface_area();
        left_count[i] = sweep_count;
    }

    let mut best: Option<Split> = None;
    let mut sweep = Aabb::EMPTY;
    let mut sweep_count = 0;
    for i in (1..SAH_BINS).rev() {
        sweep = Aabb::surrounding(&sweep, &bins[i].bounds);
        sweep_count += bins[i].count;
        if left_count[i - 1] == 0 || sweep_count == 0 {
            continue;
        }

        let cost = left_count[i - 1] as f32 * left_area[i - 1]
            + sweep_count as f32 * sweep.surface_area();
        if best.as_ref().map_or(true, |b| cost < b.cost) {
            best = Some(Split {
                position: min + extent * i as f32 / SAH_BINS as f32,
                cost,
            });
        }
    }

    best
}

/// Partition in place. Returns the number of elements satisfying `pred`,
/// which end up at the front.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}

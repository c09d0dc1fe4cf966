//! Bounding volume hierarchy over the committed scene primitives.
//! Built once with surface-area-heuristic splits into a flat node
//! array, then traversed with an explicit stack for every nearest-hit
//! query.

// std
use std::sync::Arc;
// others
use typed_arena::Arena;
// xrt
use crate::core::geometry::{bnd3_union_bnd3, bnd3_union_pnt3};
use crate::core::geometry::{Bounds3f, Point3f, Ray, Vector3f};
use crate::core::scene::ScenePrimitive;
use crate::core::xrt::Float;

#[derive(Debug, Default, Copy, Clone)]
struct BVHPrimitiveInfo {
    primitive_number: usize,
    bounds: Bounds3f,
    centroid: Point3f,
}

impl BVHPrimitiveInfo {
    fn new(primitive_number: usize, bounds: Bounds3f) -> Self {
        BVHPrimitiveInfo {
            primitive_number,
            bounds,
            centroid: bounds.p_min * 0.5 + bounds.p_max * 0.5,
        }
    }
}

#[derive(Default)]
struct BVHBuildNode<'a> {
    bounds: Bounds3f,
    child1: Option<&'a mut BVHBuildNode<'a>>,
    child2: Option<&'a mut BVHBuildNode<'a>>,
    split_axis: u8,
    first_prim_offset: usize,
    n_primitives: usize,
}

impl<'a> BVHBuildNode<'a> {
    fn init_leaf(&mut self, first: usize, n: usize, b: &Bounds3f) {
        self.first_prim_offset = first;
        self.n_primitives = n;
        self.bounds = *b;
        self.child1 = None;
        self.child2 = None;
    }
    fn init_interior(
        &mut self,
        axis: u8,
        c0: &'a mut BVHBuildNode<'a>,
        c1: &'a mut BVHBuildNode<'a>,
    ) {
        self.n_primitives = 0;
        self.bounds = bnd3_union_bnd3(&c0.bounds, &c1.bounds);
        self.child1 = Some(c0);
        self.child2 = Some(c1);
        self.split_axis = axis;
    }
}

#[derive(Debug, Default, Copy, Clone)]
struct BucketInfo {
    count: usize,
    bounds: Bounds3f,
}

#[derive(Debug, Default, Copy, Clone)]
struct LinearBVHNode {
    bounds: Bounds3f,
    // primitive offset for a leaf, second-child offset for an interior
    offset: usize,
    n_primitives: usize,
    axis: u8,
}

#[derive(Debug)]
pub struct BVHAccel {
    pub primitives: Vec<Arc<ScenePrimitive>>,
    nodes: Vec<LinearBVHNode>,
}

impl BVHAccel {
    pub fn new(p: Vec<Arc<ScenePrimitive>>, max_prims_in_node: usize) -> Self {
        let num_prims = p.len();
        if num_prims == 0 {
            return BVHAccel {
                primitives: p,
                nodes: Vec::new(),
            };
        }
        let mut primitive_info = vec![BVHPrimitiveInfo::default(); num_prims];
        for (i, item) in primitive_info.iter_mut().enumerate() {
            *item = BVHPrimitiveInfo::new(i, p[i].world_bound());
        }
        let arena: Arena<BVHBuildNode> = Arena::with_capacity(1024);
        let mut total_nodes: usize = 0;
        let mut ordered_prims: Vec<Arc<ScenePrimitive>> = Vec::with_capacity(num_prims);
        let root = BVHAccel::recursive_build(
            &p,
            max_prims_in_node.min(255),
            &arena,
            &mut primitive_info,
            0,
            num_prims,
            &mut total_nodes,
            &mut ordered_prims,
        );
        let mut nodes = vec![LinearBVHNode::default(); total_nodes];
        let mut offset: usize = 0;
        BVHAccel::flatten_bvh_tree(root, &mut nodes, &mut offset);
        assert_eq!(nodes.len(), total_nodes);
        BVHAccel {
            primitives: ordered_prims,
            nodes,
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        if !self.nodes.is_empty() {
            self.nodes[0].bounds
        } else {
            Bounds3f::default()
        }
    }
    /// Nearest hit over all committed primitives; the winning
    /// primitive commits `t_far`, the normal, and its id into the ray.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let mut hit: bool = false;
        let inv_dir: Vector3f = Vector3f {
            x: 1.0 / ray.d.x,
            y: 1.0 / ray.d.y,
            z: 1.0 / ray.d.z,
        };
        let dir_is_neg: [u8; 3] = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        // follow the ray through the flattened nodes
        let mut to_visit_offset: u32 = 0;
        let mut current_node_index: u32 = 0;
        let mut nodes_to_visit: [u32; 64] = [0_u32; 64];
        loop {
            let node: LinearBVHNode = self.nodes[current_node_index as usize];
            if node.bounds.intersect_p(ray, &inv_dir, dir_is_neg) {
                if node.n_primitives > 0 {
                    for i in 0..node.n_primitives {
                        if self.primitives[node.offset + i].intersect(ray) {
                            hit = true;
                        }
                    }
                    if to_visit_offset == 0_u32 {
                        break;
                    }
                    to_visit_offset -= 1_u32;
                    current_node_index = nodes_to_visit[to_visit_offset as usize];
                } else {
                    // put the far child on the stack, descend the near
                    if dir_is_neg[node.axis as usize] == 1_u8 {
                        nodes_to_visit[to_visit_offset as usize] = current_node_index + 1_u32;
                        to_visit_offset += 1_u32;
                        current_node_index = node.offset as u32;
                    } else {
                        nodes_to_visit[to_visit_offset as usize] = node.offset as u32;
                        to_visit_offset += 1_u32;
                        current_node_index += 1_u32;
                    }
                }
            } else {
                if to_visit_offset == 0_u32 {
                    break;
                }
                to_visit_offset -= 1_u32;
                current_node_index = nodes_to_visit[to_visit_offset as usize];
            }
        }
        hit
    }
    #[allow(clippy::too_many_arguments)]
    fn recursive_build<'a>(
        prims: &[Arc<ScenePrimitive>],
        max_prims_in_node: usize,
        arena: &'a Arena<BVHBuildNode<'a>>,
        primitive_info: &mut Vec<BVHPrimitiveInfo>,
        start: usize,
        end: usize,
        total_nodes: &mut usize,
        ordered_prims: &mut Vec<Arc<ScenePrimitive>>,
    ) -> &'a mut BVHBuildNode<'a> {
        assert_ne!(start, end);
        let node: &mut BVHBuildNode<'a> = arena.alloc(BVHBuildNode::default());
        *total_nodes += 1_usize;
        let mut bounds: Bounds3f = Bounds3f::default();
        for info in primitive_info.iter().take(end).skip(start) {
            bounds = bnd3_union_bnd3(&bounds, &info.bounds);
        }
        let n_primitives: usize = end - start;
        if n_primitives == 1 {
            let first_prim_offset: usize = ordered_prims.len();
            for info in primitive_info.iter().take(end).skip(start) {
                ordered_prims.push(prims[info.primitive_number].clone());
            }
            node.init_leaf(first_prim_offset, n_primitives, &bounds);
            return node;
        }
        // choose a split dimension from the centroid bounds
        let mut centroid_bounds: Bounds3f = Bounds3f::default();
        for info in primitive_info.iter().take(end).skip(start) {
            centroid_bounds = bnd3_union_pnt3(&centroid_bounds, &info.centroid);
        }
        let dim: u8 = centroid_bounds.maximum_extent();
        if centroid_bounds.p_max[dim] == centroid_bounds.p_min[dim] {
            // degenerate centroid spread, nothing to split on
            let first_prim_offset: usize = ordered_prims.len();
            for info in primitive_info.iter().take(end).skip(start) {
                ordered_prims.push(prims[info.primitive_number].clone());
            }
            node.init_leaf(first_prim_offset, n_primitives, &bounds);
            return node;
        }
        let mut mid: usize = (start + end) / 2_usize;
        if n_primitives <= 2 {
            if primitive_info[end - 1].centroid[dim] < primitive_info[start].centroid[dim] {
                primitive_info.swap(start, end - 1);
            }
        } else {
            // surface-area-heuristic split over fixed buckets
            let n_buckets: usize = 12;
            let mut buckets: [BucketInfo; 12] = [BucketInfo::default(); 12];
            for info in primitive_info.iter().take(end).skip(start) {
                let mut b: usize =
                    (n_buckets as Float * centroid_bounds.offset(&info.centroid)[dim]) as usize;
                if b == n_buckets {
                    b = n_buckets - 1;
                }
                buckets[b].count += 1;
                buckets[b].bounds = bnd3_union_bnd3(&buckets[b].bounds, &info.bounds);
            }
            let mut cost: [Float; 11] = [0.0; 11];
            for (i, cost_i) in cost.iter_mut().enumerate() {
                let mut b0: Bounds3f = Bounds3f::default();
                let mut b1: Bounds3f = Bounds3f::default();
                let mut count0: usize = 0;
                let mut count1: usize = 0;
                for j in 0..(i + 1) {
                    b0 = bnd3_union_bnd3(&b0, &buckets[j].bounds);
                    count0 += buckets[j].count;
                }
                for j in (i + 1)..n_buckets {
                    b1 = bnd3_union_bnd3(&b1, &buckets[j].bounds);
                    count1 += buckets[j].count;
                }
                *cost_i = 1.0
                    + (count0 as Float * b0.surface_area()
                        + count1 as Float * b1.surface_area())
                        / bounds.surface_area();
            }
            let mut min_cost: Float = cost[0];
            let mut min_cost_split_bucket: usize = 0;
            for (i, cost_i) in cost.iter().enumerate() {
                if *cost_i < min_cost {
                    min_cost = *cost_i;
                    min_cost_split_bucket = i;
                }
            }
            let leaf_cost: Float = n_primitives as Float;
            if n_primitives > max_prims_in_node || min_cost < leaf_cost {
                let (mut left, mut right): (Vec<BVHPrimitiveInfo>, Vec<BVHPrimitiveInfo>) =
                    primitive_info[start..end].iter().partition(|pi| {
                        let mut b: usize = (n_buckets as Float
                            * centroid_bounds.offset(&pi.centroid)[dim])
                            as usize;
                        if b == n_buckets {
                            b = n_buckets - 1;
                        }
                        b <= min_cost_split_bucket
                    });
                mid = start + left.len();
                let combined_len = left.len() + right.len();
                if combined_len == primitive_info.len() {
                    primitive_info.clear();
                    primitive_info.append(&mut left);
                    primitive_info.append(&mut right);
                } else {
                    primitive_info.splice(start..mid, left.iter().cloned());
                    primitive_info.splice(mid..end, right.iter().cloned());
                }
            } else {
                let first_prim_offset: usize = ordered_prims.len();
                for info in primitive_info.iter().take(end).skip(start) {
                    ordered_prims.push(prims[info.primitive_number].clone());
                }
                node.init_leaf(first_prim_offset, n_primitives, &bounds);
                return node;
            }
        }
        let c0 = BVHAccel::recursive_build(
            prims,
            max_prims_in_node,
            arena,
            primitive_info,
            start,
            mid,
            total_nodes,
            ordered_prims,
        );
        let c1 = BVHAccel::recursive_build(
            prims,
            max_prims_in_node,
            arena,
            primitive_info,
            mid,
            end,
            total_nodes,
            ordered_prims,
        );
        node.init_interior(dim, c0, c1);
        node
    }
    fn flatten_bvh_tree<'a>(
        node: &mut BVHBuildNode<'a>,
        nodes: &mut Vec<LinearBVHNode>,
        offset: &mut usize,
    ) -> usize {
        let my_offset: usize = *offset;
        *offset += 1;
        if node.n_primitives > 0 {
            nodes[my_offset] = LinearBVHNode {
                bounds: node.bounds,
                offset: node.first_prim_offset,
                n_primitives: node.n_primitives,
                axis: 0_u8,
            };
        } else {
            if let Some(ref mut child1) = node.child1 {
                BVHAccel::flatten_bvh_tree(child1, nodes, offset);
            }
            if let Some(ref mut child2) = node.child2 {
                let second_child = BVHAccel::flatten_bvh_tree(child2, nodes, offset);
                nodes[my_offset] = LinearBVHNode {
                    bounds: node.bounds,
                    offset: second_child,
                    n_primitives: 0_usize,
                    axis: node.split_axis,
                };
            }
        }
        my_offset
    }
}

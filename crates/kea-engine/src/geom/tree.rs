use slotmap::SlotMap;

use crate::coords::Vec2;

use super::{Matrix, Transform, TransformId};

/// Upper bound on ancestor walks.
///
/// Parent assignment already rejects cycles; this cap keeps a corrupted chain
/// from recursing without bound.
pub const MAX_HIERARCHY_DEPTH: usize = 256;

/// Arena of transforms linked by non-owning parent handles.
///
/// The tree owns every [`Transform`]; nodes hold [`TransformId`]s. A
/// transform never owns its parent or its children, so removing a transform
/// only detaches the children that pointed at it.
#[derive(Debug, Default)]
pub struct TransformTree {
    transforms: SlotMap<TransformId, Transform>,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transform: Transform) -> TransformId {
        self.transforms.insert(transform)
    }

    /// Removes a transform. Children that referenced it become roots.
    pub fn remove(&mut self, id: TransformId) -> Option<Transform> {
        let removed = self.transforms.remove(id)?;
        for (_, t) in self.transforms.iter_mut() {
            if t.parent() == Some(id) {
                t.set_parent_unchecked(None);
            }
        }
        Some(removed)
    }

    #[inline]
    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.transforms.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: TransformId) -> Option<&mut Transform> {
        self.transforms.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: TransformId) -> bool {
        self.transforms.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Returns true if `candidate` is `start` or one of its ancestors.
    ///
    /// A chain longer than [`MAX_HIERARCHY_DEPTH`] is reported as containing
    /// the candidate so callers refuse to extend it.
    pub fn is_ancestor(&self, candidate: TransformId, start: TransformId) -> bool {
        let mut cursor = Some(start);
        let mut depth = 0;
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                log::warn!("transform chain exceeds {MAX_HIERARCHY_DEPTH} levels; treating as cyclic");
                return true;
            }
            cursor = self.transforms.get(id).and_then(Transform::parent);
        }
        false
    }

    /// Assigns `parent` as the parent of `child`.
    ///
    /// Returns `false` and leaves `child` untouched when either handle is
    /// stale or when the assignment would make `child` its own ancestor.
    pub fn set_parent(&mut self, child: TransformId, parent: Option<TransformId>) -> bool {
        if !self.transforms.contains_key(child) {
            return false;
        }

        if let Some(p) = parent {
            if !self.transforms.contains_key(p) {
                return false;
            }
            if self.is_ancestor(child, p) {
                log::debug!("refusing parent assignment: would create a transform cycle");
                return false;
            }
        }

        if let Some(t) = self.transforms.get_mut(child) {
            t.set_parent_unchecked(parent);
        }
        true
    }

    /// Concatenated matrix of the parent, or `None` for a root.
    pub fn parent_matrix(&mut self, id: TransformId) -> Option<Matrix> {
        let parent = self.transforms.get(id)?.parent()?;
        self.concatenated_matrix(parent)
    }

    /// Resolves the world matrix of `id`: the local matrix composed with every
    /// ancestor that participates in concatenation.
    ///
    /// Rebuilds the local matrix when dirty and unlocked, stores the result as
    /// the cached concatenated matrix and clears the dirty flag.
    pub fn concatenated_matrix(&mut self, id: TransformId) -> Option<Matrix> {
        self.resolve(id, 0)
    }

    fn resolve(&mut self, id: TransformId, depth: usize) -> Option<Matrix> {
        let t = self.transforms.get_mut(id)?;
        if t.is_dirty() && !t.locked() {
            t.rebuild_local();
        }

        let mut m = *t.matrix();
        let parent = if t.ignore_parent() { None } else { t.parent() };

        if let Some(pid) = parent {
            let inherit = self.transforms.get(pid).filter(|p| !p.ignore_child());
            if let Some((ax, ay)) = inherit.map(|p| (p.anchor_x(), p.anchor_y())) {
                if depth >= MAX_HIERARCHY_DEPTH {
                    log::warn!("transform chain exceeds {MAX_HIERARCHY_DEPTH} levels; truncating");
                } else if let Some(pm) = self.resolve(pid, depth + 1) {
                    m.tx -= ax;
                    m.ty -= ay;
                    m.prepend_matrix(&pm);
                }
            }
        }

        let t = self.transforms.get_mut(id)?;
        t.set_concatenated(m);
        Some(m)
    }

    /// World-space position: concatenated translation minus the own anchor.
    pub fn world_position(&mut self, id: TransformId) -> Option<Vec2> {
        let m = self.concatenated_matrix(id)?;
        let t = self.transforms.get(id)?;
        Some(Vec2::new(m.tx - t.anchor_x(), m.ty - t.anchor_y()))
    }

    /// Maps a local point of `id` into world space.
    pub fn transform_point(&mut self, id: TransformId, point: Vec2) -> Option<Vec2> {
        Some(self.concatenated_matrix(id)?.transform_point(point))
    }

    /// Copies components, parent and a clone of the local matrix from `src` to `dst`.
    ///
    /// The parent is assigned through [`set_parent`](Self::set_parent), so a
    /// copy that would create a cycle keeps `dst`'s previous parent. Returns
    /// `false` if either handle is stale.
    pub fn copy_transform(&mut self, dst: TransformId, src: TransformId) -> bool {
        if dst == src {
            return self.transforms.contains_key(src);
        }
        let Some(source) = self.transforms.get(src).cloned() else {
            return false;
        };
        let Some(target) = self.transforms.get_mut(dst) else {
            return false;
        };

        target.set_transform(
            source.x(),
            source.y(),
            source.scale_x(),
            source.scale_y(),
            source.rotation(),
            source.anchor_x(),
            source.anchor_y(),
        );
        target.set_matrix(*source.matrix());

        self.set_parent(dst, source.parent());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(n: usize) -> (TransformTree, Vec<TransformId>) {
        let mut tree = TransformTree::new();
        let ids = (0..n).map(|_| tree.insert(Transform::default())).collect();
        (tree, ids)
    }

    // ── parenting ─────────────────────────────────────────────────────────

    #[test]
    fn self_parent_is_refused() {
        let (mut tree, ids) = tree_with(1);
        assert!(!tree.set_parent(ids[0], Some(ids[0])));
        assert_eq!(tree.get(ids[0]).unwrap().parent(), None);
    }

    #[test]
    fn cycle_through_grandchild_is_refused() {
        let (mut tree, ids) = tree_with(3);
        let (b, c, d) = (ids[0], ids[1], ids[2]);
        assert!(tree.set_parent(c, Some(b)));
        assert!(tree.set_parent(d, Some(c)));

        let previous = tree.get(b).unwrap().parent();
        assert!(!tree.set_parent(b, Some(d)));
        assert_eq!(tree.get(b).unwrap().parent(), previous);
    }

    #[test]
    fn depth_cap_stops_chain_growth() {
        let mut tree = TransformTree::new();
        let ids: Vec<_> = (0..=MAX_HIERARCHY_DEPTH + 1).map(|_| tree.insert(Transform::new(1.0, 0.0))).collect();
        for pair in ids[..=MAX_HIERARCHY_DEPTH].windows(2) {
            assert!(tree.set_parent(pair[1], Some(pair[0])));
        }

        let leaf = ids[MAX_HIERARCHY_DEPTH];
        let extra = ids[MAX_HIERARCHY_DEPTH + 1];
        assert!(!tree.set_parent(extra, Some(leaf)));
        assert_eq!(tree.get(extra).unwrap().parent(), None);

        // Every level of the longest accepted chain still contributes.
        let m = tree.concatenated_matrix(leaf).unwrap();
        assert_eq!(m.tx, (MAX_HIERARCHY_DEPTH + 1) as f32);
    }

    #[test]
    fn reparenting_marks_dirty() {
        let (mut tree, ids) = tree_with(2);
        tree.concatenated_matrix(ids[1]);
        assert!(!tree.get(ids[1]).unwrap().is_dirty());
        tree.set_parent(ids[1], Some(ids[0]));
        assert!(tree.get(ids[1]).unwrap().is_dirty());
    }

    #[test]
    fn stale_parent_is_refused() {
        let (mut tree, ids) = tree_with(2);
        tree.remove(ids[0]);
        assert!(!tree.set_parent(ids[1], Some(ids[0])));
    }

    #[test]
    fn removing_parent_detaches_children() {
        let (mut tree, ids) = tree_with(2);
        tree.set_parent(ids[1], Some(ids[0]));
        tree.remove(ids[0]);
        assert_eq!(tree.get(ids[1]).unwrap().parent(), None);
    }

    #[test]
    fn clearing_parent_is_always_allowed() {
        let (mut tree, ids) = tree_with(2);
        tree.set_parent(ids[1], Some(ids[0]));
        assert!(tree.set_parent(ids[1], None));
        assert_eq!(tree.get(ids[1]).unwrap().parent(), None);
    }

    // ── concatenation ─────────────────────────────────────────────────────

    #[test]
    fn root_concatenated_equals_local() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::with_components(3.0, 4.0, 2.0, 0.5, 0.25, 1.0, 1.0));
        let m = tree.concatenated_matrix(id).unwrap();
        assert_eq!(m, *tree.get(id).unwrap().matrix());
    }

    #[test]
    fn child_inherits_parent_translation() {
        let (mut tree, ids) = tree_with(2);
        tree.get_mut(ids[0]).unwrap().set_position(100.0, 50.0);
        tree.get_mut(ids[1]).unwrap().set_position(10.0, 5.0);
        tree.set_parent(ids[1], Some(ids[0]));
        let m = tree.concatenated_matrix(ids[1]).unwrap();
        assert_eq!((m.tx, m.ty), (110.0, 55.0));
    }

    #[test]
    fn parent_anchor_is_subtracted_before_prepend() {
        let (mut tree, ids) = tree_with(2);
        tree.get_mut(ids[0]).unwrap().set_anchor_x(8.0);
        tree.get_mut(ids[1]).unwrap().set_position(10.0, 0.0);
        tree.set_parent(ids[1], Some(ids[0]));
        let m = tree.concatenated_matrix(ids[1]).unwrap();
        // Parent is identity-with-anchor, so only the anchor offset remains.
        assert_eq!(m.tx, 2.0);
    }

    #[test]
    fn ignore_parent_stops_concatenation() {
        let (mut tree, ids) = tree_with(2);
        tree.get_mut(ids[0]).unwrap().set_position(100.0, 0.0);
        tree.set_parent(ids[1], Some(ids[0]));
        tree.get_mut(ids[1]).unwrap().set_ignore_parent(true);
        assert_eq!(tree.concatenated_matrix(ids[1]).unwrap(), Matrix::IDENTITY);
    }

    #[test]
    fn ignore_child_hides_parent_from_children() {
        let (mut tree, ids) = tree_with(2);
        tree.get_mut(ids[0]).unwrap().set_position(100.0, 0.0);
        tree.get_mut(ids[0]).unwrap().set_ignore_child(true);
        tree.set_parent(ids[1], Some(ids[0]));
        assert_eq!(tree.concatenated_matrix(ids[1]).unwrap(), Matrix::IDENTITY);
    }

    #[test]
    fn resolution_clears_dirty() {
        let (mut tree, ids) = tree_with(1);
        tree.concatenated_matrix(ids[0]);
        assert!(!tree.get(ids[0]).unwrap().is_dirty());
    }

    #[test]
    fn world_position_subtracts_own_anchor() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::with_components(20.0, 30.0, 1.0, 1.0, 0.0, 5.0, 5.0));
        assert_eq!(tree.world_position(id), Some(Vec2::new(15.0, 25.0)));
    }

    #[test]
    fn parent_matrix_of_root_is_none() {
        let (mut tree, ids) = tree_with(1);
        assert!(tree.parent_matrix(ids[0]).is_none());
    }

    // ── copy ──────────────────────────────────────────────────────────────

    #[test]
    fn copy_transform_clones_components_and_parent() {
        let (mut tree, ids) = tree_with(3);
        tree.set_parent(ids[1], Some(ids[0]));
        tree.get_mut(ids[1]).unwrap().set_transform(1.0, 2.0, 3.0, 4.0, 0.5, 6.0, 7.0);
        tree.get_mut(ids[1]).unwrap().set_locked(true);

        assert!(tree.copy_transform(ids[2], ids[1]));
        let copy = tree.get(ids[2]).unwrap();
        let source = tree.get(ids[1]).unwrap();
        assert_eq!(copy.parent(), Some(ids[0]));
        assert_eq!(copy.scale_y(), 4.0);
        assert_eq!(copy.matrix(), source.matrix());
    }

    #[test]
    fn copy_transform_refuses_cyclic_parent() {
        let (mut tree, ids) = tree_with(2);
        // ids[1] is a child of ids[0]; copying ids[1] onto ids[0] would make ids[0] its own parent.
        tree.set_parent(ids[1], Some(ids[0]));
        assert!(tree.copy_transform(ids[0], ids[1]));
        assert_eq!(tree.get(ids[0]).unwrap().parent(), None);
    }
}

use slotmap::SlotMap;

use crate::coords::{Rect, Viewport};
use crate::geom::{Matrix, Transform, TransformTree};
use crate::paint::Color;
use crate::render::SceneError;

use super::{AtlasId, Camera, DrawItem, DrawList, Node, NodeId, NodeKind, Pixel, Sprite, TextureAtlas, TileLayer};

/// Scene container: nodes, their transforms, registered atlases and the
/// ordered top-level members.
///
/// Nodes own only handles. Group membership is mirrored in the transform
/// hierarchy: a member's transform is parented to its group's transform.
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    transforms: TransformTree,
    atlases: SlotMap<AtlasId, TextureAtlas>,
    members: Vec<NodeId>,
    pub camera: Camera,
}

impl Scene {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            transforms: TransformTree::new(),
            atlases: SlotMap::with_key(),
            members: Vec::new(),
            camera: Camera::new(viewport),
        }
    }

    // ── atlases ───────────────────────────────────────────────────────────

    pub fn add_atlas(&mut self, atlas: TextureAtlas) -> AtlasId {
        log::debug!("scene: atlas {:?} with {} cells", atlas.name(), atlas.cells().len());
        self.atlases.insert(atlas)
    }

    #[inline]
    pub fn atlas(&self, id: AtlasId) -> Option<&TextureAtlas> {
        self.atlases.get(id)
    }

    pub fn atlases(&self) -> impl Iterator<Item = (AtlasId, &TextureAtlas)> {
        self.atlases.iter()
    }

    // ── nodes ─────────────────────────────────────────────────────────────

    /// Adds an empty group, either at the top level or inside `parent`.
    pub fn add_group(&mut self, parent: Option<NodeId>, transform: Transform) -> Result<NodeId, SceneError> {
        self.insert_node(parent, transform, NodeKind::Group(Vec::new()))
    }

    pub fn add_sprite(&mut self, parent: Option<NodeId>, transform: Transform, sprite: Sprite) -> Result<NodeId, SceneError> {
        if !self.atlases.contains_key(sprite.atlas) {
            return Err(SceneError::UnknownAtlas);
        }
        self.insert_node(parent, transform, NodeKind::Sprite(sprite))
    }

    pub fn add_pixel(&mut self, parent: Option<NodeId>, transform: Transform, pixel: Pixel) -> Result<NodeId, SceneError> {
        self.insert_node(parent, transform, NodeKind::Pixel(pixel))
    }

    pub fn add_tile_layer(&mut self, parent: Option<NodeId>, transform: Transform, layer: TileLayer) -> Result<NodeId, SceneError> {
        if !self.atlases.contains_key(layer.atlas) {
            return Err(SceneError::UnknownAtlas);
        }
        self.insert_node(parent, transform, NodeKind::TileLayer(layer))
    }

    fn insert_node(&mut self, parent: Option<NodeId>, transform: Transform, kind: NodeKind) -> Result<NodeId, SceneError> {
        if let Some(group) = parent {
            self.expect_group(group)?;
        }

        let transform = self.transforms.insert(transform);
        let id = self.nodes.insert(Node { transform, will_render: true, parent: None, kind });

        match parent {
            Some(group) => self.add_child(group, id)?,
            None => self.members.push(id),
        }
        Ok(id)
    }

    /// Moves `node` to the end of `group`'s members.
    ///
    /// The node's transform is parented to the group's transform. Adding a
    /// group to itself or to one of its descendants is a cycle and leaves the
    /// scene unchanged.
    pub fn add_child(&mut self, group: NodeId, node: NodeId) -> Result<(), SceneError> {
        self.expect_group(group)?;
        let child_transform = self.nodes.get(node).ok_or(SceneError::UnknownNode(node))?.transform;

        if self.is_descendant_or_self(group, node) {
            log::debug!("scene: refusing to add {node:?} into its own subtree");
            return Err(SceneError::Cycle);
        }

        let group_transform = self.nodes[group].transform;
        if !self.transforms.set_parent(child_transform, Some(group_transform)) {
            return Err(SceneError::Cycle);
        }

        self.detach(node);
        if let NodeKind::Group(members) = &mut self.nodes[group].kind {
            members.push(node);
        }
        self.nodes[node].parent = Some(group);
        Ok(())
    }

    /// Moves `node` to the end of the top-level members and clears its transform parent.
    pub fn add_to_root(&mut self, node: NodeId) -> Result<(), SceneError> {
        let transform = self.nodes.get(node).ok_or(SceneError::UnknownNode(node))?.transform;
        self.detach(node);
        self.transforms.set_parent(transform, None);
        self.members.push(node);
        Ok(())
    }

    /// Removes `node` and, for groups, every descendant.
    pub fn remove(&mut self, node: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains_key(node) {
            return Err(SceneError::UnknownNode(node));
        }
        self.detach(node);

        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(removed) = self.nodes.remove(id) {
                self.transforms.remove(removed.transform);
                if let NodeKind::Group(members) = removed.kind {
                    pending.extend(members);
                }
            }
        }
        Ok(())
    }

    pub fn set_will_render(&mut self, node: NodeId, will_render: bool) -> Result<(), SceneError> {
        let n = self.nodes.get_mut(node).ok_or(SceneError::UnknownNode(node))?;
        n.will_render = will_render;
        Ok(())
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Top-level members in draw order.
    #[inline]
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    // ── transforms ────────────────────────────────────────────────────────

    pub fn transform(&self, node: NodeId) -> Option<&Transform> {
        self.transforms.get(self.nodes.get(node)?.transform)
    }

    pub fn transform_mut(&mut self, node: NodeId) -> Option<&mut Transform> {
        let id = self.nodes.get(node)?.transform;
        self.transforms.get_mut(id)
    }

    /// Resolves the node's world matrix.
    pub fn world_matrix(&mut self, node: NodeId) -> Option<Matrix> {
        let id = self.nodes.get(node)?.transform;
        self.transforms.concatenated_matrix(id)
    }

    /// Read-only view of the transform hierarchy. Reparenting goes through
    /// [`add_child`](Self::add_child) and [`add_to_root`](Self::add_to_root)
    /// so group membership and transform parents stay in step.
    #[inline]
    pub fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    // ── per frame ─────────────────────────────────────────────────────────

    /// Advances sprite animations by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for (_, node) in self.nodes.iter_mut() {
            if let NodeKind::Sprite(sprite) = &mut node.kind {
                if let Some(cell) = sprite.animation.as_mut().and_then(|a| a.update(dt)) {
                    sprite.cell_index = cell;
                }
            }
        }
    }

    /// Walks the scene depth-first in member order and records every
    /// renderable leaf with its resolved world matrix.
    ///
    /// Nodes whose will-render flag is false are skipped along with their
    /// subtree. Leaves referencing a missing cell are skipped.
    pub fn build_draw_list(&mut self, list: &mut DrawList) {
        list.clear();

        let mut stack: Vec<NodeId> = self.members.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.will_render {
                continue;
            }

            match &node.kind {
                NodeKind::Group(members) => stack.extend(members.iter().rev().copied()),
                NodeKind::Sprite(sprite) => {
                    let Some(world) = self.transforms.concatenated_matrix(node.transform) else {
                        continue;
                    };
                    let Some(cell) = self.atlases.get(sprite.atlas).and_then(|a| a.cell(sprite.cell_index)) else {
                        log::debug!("scene: sprite {id:?} has no cell {}; skipped", sprite.cell_index);
                        continue;
                    };
                    list.push(DrawItem {
                        node: id,
                        texture: Some(sprite.atlas),
                        world,
                        cell: cell.rect,
                        color: Color::white_alpha(sprite.alpha),
                    });
                }
                NodeKind::Pixel(pixel) => {
                    if pixel.size <= 0.0 {
                        continue;
                    }
                    let Some(world) = self.transforms.concatenated_matrix(node.transform) else {
                        continue;
                    };
                    list.push(DrawItem {
                        node: id,
                        texture: None,
                        world,
                        cell: Rect::new(0.0, 0.0, pixel.size, pixel.size),
                        color: pixel.color,
                    });
                }
                NodeKind::TileLayer(layer) => {
                    let Some(world) = self.transforms.concatenated_matrix(node.transform) else {
                        continue;
                    };
                    let Some(atlas) = self.atlases.get(layer.atlas) else {
                        continue;
                    };
                    for tile in layer.placed_tiles() {
                        let Some(cell) = atlas.cell(tile.cell_index) else {
                            log::debug!("scene: tile cell {} missing from atlas {:?}", tile.cell_index, atlas.name());
                            continue;
                        };
                        let mut m = world;
                        m.append(&Matrix::from_translation(tile.offset.x, tile.offset.y));
                        list.push(DrawItem {
                            node: id,
                            texture: Some(layer.atlas),
                            world: m,
                            cell: cell.rect,
                            color: Color::WHITE,
                        });
                    }
                }
            }
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────

    fn expect_group(&self, id: NodeId) -> Result<(), SceneError> {
        match self.nodes.get(id) {
            None => Err(SceneError::UnknownNode(id)),
            Some(n) if !n.is_group() => Err(SceneError::NotAGroup(id)),
            Some(_) => Ok(()),
        }
    }

    /// True if `candidate` is `root` or lies beneath it.
    fn is_descendant_or_self(&self, candidate: NodeId, root: NodeId) -> bool {
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == root {
                return true;
            }
            cursor = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Unlinks `node` from its group or from the top level. The transform
    /// parent is left for the caller to reassign.
    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get_mut(node).and_then(|n| n.parent.take());
        match parent {
            Some(group) => {
                if let Some(NodeKind::Group(members)) = self.nodes.get_mut(group).map(|g| &mut g.kind) {
                    members.retain(|&m| m != node);
                }
            }
            None => self.members.retain(|&m| m != node),
        }
    }
}

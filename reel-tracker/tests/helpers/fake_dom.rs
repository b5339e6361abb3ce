//! In-memory page document for driving the tracker without a browser

use std::collections::BTreeMap;

use serde_json::Value;

use reel_tracker::{NodeId, OverlayState, PageDom, Rect, Viewport};

#[derive(Debug, Clone, Default)]
struct FakeNode {
    parent: Option<NodeId>,
    connected: bool,
    expandos: Vec<(String, Value)>,
    rect: Option<Rect>,
    resource_url: Option<String>,
    is_player: bool,
    is_host: bool,
    is_control: bool,
    appearance: Option<OverlayState>,
}

/// Tree of fake nodes; ids are handed out in document order
#[derive(Debug)]
pub struct FakeDom {
    nodes: BTreeMap<NodeId, FakeNode>,
    next_id: u64,
    viewport: Viewport,
    pub refuse_inserts: bool,
    pub inserts: usize,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    /// Empty document with a 1280x800 viewport
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
            },
            refuse_inserts: false,
            inserts: 0,
        }
    }

    fn add(&mut self, parent: Option<NodeId>, node: FakeNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            FakeNode {
                parent,
                connected: true,
                ..node
            },
        );
        id
    }

    /// Plain element
    pub fn add_element(&mut self, parent: Option<NodeId>) -> NodeId {
        self.add(parent, FakeNode::default())
    }

    /// Post/reel container; with `with_player` it gets a player child
    pub fn add_host(&mut self, with_player: bool) -> NodeId {
        let host = self.add(
            None,
            FakeNode {
                is_host: true,
                ..FakeNode::default()
            },
        );
        if with_player {
            self.add_player(Some(host), None, None);
        }
        host
    }

    /// Player element with optional geometry and resource url
    pub fn add_player(&mut self, parent: Option<NodeId>, rect: Option<Rect>, url: Option<&str>) -> NodeId {
        self.add(
            parent,
            FakeNode {
                is_player: true,
                rect,
                resource_url: url.map(str::to_string),
                ..FakeNode::default()
            },
        )
    }

    pub fn set_expando(&mut self, node: NodeId, name: &str, value: Value) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.expandos.push((name.to_string(), value));
        }
    }

    /// Detach a node and everything below it
    pub fn remove(&mut self, node: NodeId) {
        let doomed: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| self.is_descendant_or_self(*id, node))
            .collect();
        for id in doomed {
            if let Some(n) = self.nodes.get_mut(&id) {
                n.connected = false;
            }
        }
    }

    /// Simulate a host re-render dropping its control
    pub fn wipe_controls(&mut self, host: NodeId) {
        for n in self.nodes.values_mut() {
            if n.is_control && n.parent == Some(host) {
                n.connected = false;
            }
        }
    }

    /// Connected control inside `host`
    pub fn control_in(&self, host: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.is_control && n.connected && n.parent == Some(host))
            .map(|(id, _)| *id)
    }

    pub fn appearance(&self, control: NodeId) -> Option<OverlayState> {
        self.nodes.get(&control).and_then(|n| n.appearance)
    }

    fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }
}

impl PageDom for FakeDom {
    fn is_connected(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.connected)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn expando_properties(&self, node: NodeId) -> Vec<(String, Value)> {
        self.nodes
            .get(&node)
            .map(|n| n.expandos.clone())
            .unwrap_or_default()
    }

    fn player_elements(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_player && n.connected)
            .map(|(id, _)| *id)
            .collect()
    }

    fn resource_url(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).and_then(|n| n.resource_url.clone())
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.nodes
            .get(&node)
            .filter(|n| n.connected)
            .and_then(|n| n.rect)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn candidate_hosts(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_host && n.connected)
            .map(|(id, _)| *id)
            .collect()
    }

    fn contains_playable(&self, host: NodeId) -> bool {
        self.nodes
            .iter()
            .any(|(id, n)| n.is_player && n.connected && *id != host && self.is_descendant_or_self(*id, host))
    }

    fn has_control(&self, host: NodeId) -> bool {
        self.control_in(host).is_some()
    }

    fn insert_control(&mut self, host: NodeId) -> Option<NodeId> {
        if self.refuse_inserts || !self.is_connected(host) {
            return None;
        }
        self.inserts += 1;
        Some(self.add(
            Some(host),
            FakeNode {
                is_control: true,
                ..FakeNode::default()
            },
        ))
    }

    fn set_control_appearance(&mut self, control: NodeId, state: OverlayState) {
        if let Some(n) = self.nodes.get_mut(&control) {
            n.appearance = Some(state);
        }
    }
}

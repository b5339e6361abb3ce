//! Page document abstraction
//!
//! The tracker never touches a real DOM. Everything it needs from the host
//! page (existence checks, ancestry, framework expando properties, geometry,
//! control insertion) goes through `PageDom`, implemented by the embedding
//! layer and by in-memory fakes in tests.

use serde_json::Value;

use reel_common::events::OverlayState;

/// Opaque handle for one node of the page document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Element bounding box in viewport coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn vertical_center(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Visible viewport size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn vertical_center(&self) -> f64 {
        self.height / 2.0
    }
}

/// Read/write access to the host page document
pub trait PageDom {
    /// Whether the node is still attached to the document
    fn is_connected(&self, node: NodeId) -> bool;

    /// Parent element, if any
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Expando properties the UI framework attached to the node
    /// (enumerable or not), as name/value pairs
    fn expando_properties(&self, node: NodeId) -> Vec<(String, Value)>;

    /// Every player element currently in the document, in document order
    fn player_elements(&self) -> Vec<NodeId>;

    /// Resource URL a player element is playing (its `src`/`currentSrc`)
    fn resource_url(&self, node: NodeId) -> Option<String>;

    /// Bounding box, or `None` when the node is not rendered
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    fn viewport(&self) -> Viewport;

    /// Elements that may need a control (post/reel containers), in document order
    fn candidate_hosts(&self) -> Vec<NodeId>;

    /// Whether the host contains a playable element
    fn contains_playable(&self, host: NodeId) -> bool;

    /// Whether a control is already present inside the host
    fn has_control(&self, host: NodeId) -> bool;

    /// Insert a control for the host; returns the control node
    fn insert_control(&mut self, host: NodeId) -> Option<NodeId>;

    /// Render the control for the given lifecycle state
    fn set_control_appearance(&mut self, control: NodeId, state: OverlayState);
}

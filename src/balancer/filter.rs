use crate::context::RequestMetadata;
use crate::core::Node;

/// Narrows the candidate list before the balancer sees it.
pub trait NodeFilter: Send + Sync {
    fn filter(&self, md: &RequestMetadata, nodes: Vec<Node>) -> Vec<Node>;
}

impl<F> NodeFilter for F
where
    F: Fn(&RequestMetadata, Vec<Node>) -> Vec<Node> + Send + Sync,
{
    fn filter(&self, md: &RequestMetadata, nodes: Vec<Node>) -> Vec<Node> {
        self(md, nodes)
    }
}

/// Keeps the nodes tagged with `color`. Untagged nodes only match the empty color.
pub fn filter_by_color(color: &str, nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .filter(|node| node.color().unwrap_or_default() == color)
        .cloned()
        .collect()
}

/// Filters by the request color, falling back to this process's color.
#[derive(Debug, Clone, Default)]
pub struct ColorFilter {
    default_color: String,
}

impl ColorFilter {
    pub fn new(default_color: impl Into<String>) -> Self {
        Self {
            default_color: default_color.into(),
        }
    }

    pub fn color_for<'a>(&'a self, md: &'a RequestMetadata) -> &'a str {
        md.color().unwrap_or(&self.default_color)
    }
}

impl NodeFilter for ColorFilter {
    fn filter(&self, md: &RequestMetadata, nodes: Vec<Node>) -> Vec<Node> {
        filter_by_color(self.color_for(md), &nodes)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Field name to current value. Values stay untyped strings.
pub type NodeData = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineGraph {
    pub nodes: HashMap<Uuid, NodeInstance>,
    pub edges: Vec<Edge>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeInstance {
    pub id: Uuid,
    /// Registry key of the node kind.
    pub node_type: String,
    pub position: (f32, f32),
    pub data: NodeData,
    #[serde(default)]
    pub z_order: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: String,
    pub source: Uuid,
    pub source_handle: String,
    pub target: Uuid,
    pub target_handle: String,
}

impl Edge {
    pub fn new(source: Uuid, source_handle: &str, target: Uuid, target_handle: &str) -> Self {
        Self {
            id: format!("{}:{}-{}:{}", source, source_handle, target, target_handle),
            source,
            source_handle: source_handle.to_string(),
            target,
            target_handle: target_handle.to_string(),
        }
    }
}

impl PipelineGraph {
    pub fn add_node(&mut self, node_type: &str, position: (f32, f32), z_order: u64) -> Uuid {
        let id = Uuid::new_v4();
        self.nodes.insert(
            id,
            NodeInstance {
                id,
                node_type: node_type.to_string(),
                position,
                data: NodeData::new(),
                z_order,
            },
        );
        id
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: &Uuid) -> Option<NodeInstance> {
        let removed = self.nodes.remove(id)?;
        self.edges.retain(|e| e.source != *id && e.target != *id);
        Some(removed)
    }

    /// Writes a reported field edit into the instance. Returns false when the
    /// node or the value did not change anything.
    pub fn set_field(&mut self, id: &Uuid, field: &str, value: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.data.get(field).map(|v| v.as_str()) == Some(value) {
            return false;
        }
        node.data.insert(field.to_string(), value.to_string());
        true
    }

    /// Adds an edge unless it is a self-loop or already present.
    pub fn connect(&mut self, edge: Edge) -> bool {
        if edge.source == edge.target
            || !self.nodes.contains_key(&edge.source)
            || !self.nodes.contains_key(&edge.target)
            || self.edges.iter().any(|e| e.id == edge.id)
        {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn disconnect(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != edge_id);
        self.edges.len() != before
    }

    /// Nodes sorted back to front.
    pub fn nodes_by_z_order(&self) -> Vec<&NodeInstance> {
        let mut nodes: Vec<_> = self.nodes.values().collect();
        nodes.sort_by_key(|n| (n.z_order, n.id));
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = PipelineGraph::default();
        let a = graph.add_node("customInput", (0.0, 0.0), 0);
        let b = graph.add_node("llm", (300.0, 0.0), 1);
        let c = graph.add_node("customOutput", (600.0, 0.0), 2);
        assert!(graph.connect(Edge::new(a, "value", b, "prompt")));
        assert!(graph.connect(Edge::new(b, "response", c, "value")));

        graph.remove_node(&b);
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_connect_rejects_duplicates_and_self_loops() {
        let mut graph = PipelineGraph::default();
        let a = graph.add_node("text", (0.0, 0.0), 0);
        let b = graph.add_node("uppercase", (300.0, 0.0), 1);
        assert!(graph.connect(Edge::new(a, "output", b, "input")));
        assert!(!graph.connect(Edge::new(a, "output", b, "input")));
        assert!(!graph.connect(Edge::new(a, "output", a, "var:input")));
        assert!(!graph.connect(Edge::new(a, "output", Uuid::new_v4(), "input")));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_set_field() {
        let mut graph = PipelineGraph::default();
        let id = graph.add_node("number", (0.0, 0.0), 0);
        assert!(graph.set_field(&id, "value", "42"));
        assert!(!graph.set_field(&id, "value", "42"));
        assert_eq!(graph.nodes[&id].data["value"], "42");
        assert!(!graph.set_field(&Uuid::new_v4(), "value", "1"));
    }

    #[test]
    fn test_disconnect() {
        let mut graph = PipelineGraph::default();
        let a = graph.add_node("number", (0.0, 0.0), 0);
        let b = graph.add_node("delay", (300.0, 0.0), 1);
        let edge = Edge::new(a, "output", b, "input");
        let id = edge.id.clone();
        graph.connect(edge);
        assert!(graph.disconnect(&id));
        assert!(!graph.disconnect(&id));
    }
}

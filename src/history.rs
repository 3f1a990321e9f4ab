use crate::graph::PipelineGraph;
use std::collections::VecDeque;

#[derive(Clone)]
struct Snapshot {
    graph: PipelineGraph,
    /// Set for field edits; a following edit with the same key replaces
    /// this snapshot instead of stacking a new one.
    merge_key: Option<String>,
}

/// Bounded linear history of graph snapshots. `cursor` indexes the snapshot
/// matching the graph on screen.
#[derive(Clone)]
pub struct UndoStack {
    snapshots: VecDeque<Snapshot>,
    cursor: usize,
    pub max_records: usize,
    /// Cleared by undo/redo so typing after a jump starts a new record.
    merge_open: bool,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_capacity(200)
    }
}

impl UndoStack {
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            max_records: max_records.max(1),
            merge_open: false,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn push(&mut self, graph: &PipelineGraph) {
        self.record(graph, None);
    }

    /// Records a field edit. Consecutive edits with the same `key` collapse
    /// into one snapshot holding the latest graph.
    pub fn push_merged(&mut self, graph: &PipelineGraph, key: &str) {
        self.record(graph, Some(key.to_string()));
    }

    fn record(&mut self, graph: &PipelineGraph, merge_key: Option<String>) {
        let at_top = self.cursor + 1 == self.snapshots.len();
        if self.merge_open && at_top && merge_key.is_some() {
            if let Some(top) = self.snapshots.back_mut() {
                if top.merge_key == merge_key {
                    top.graph = graph.clone();
                    return;
                }
            }
        }

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.merge_open = merge_key.is_some();
        self.snapshots.push_back(Snapshot {
            graph: graph.clone(),
            merge_key,
        });
        while self.snapshots.len() > self.max_records {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
    }

    pub fn undo(&mut self) -> Option<PipelineGraph> {
        let target = self.cursor.checked_sub(1)?;
        self.jump(target)
    }

    pub fn redo(&mut self) -> Option<PipelineGraph> {
        self.jump(self.cursor + 1)
    }

    fn jump(&mut self, target: usize) -> Option<PipelineGraph> {
        let graph = self.snapshots.get(target)?.graph.clone();
        self.cursor = target;
        self.merge_open = false;
        Some(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(count: usize) -> PipelineGraph {
        let mut graph = PipelineGraph::default();
        for i in 0..count {
            graph.add_node("number", (i as f32 * 10.0, 0.0), i as u64);
        }
        graph
    }

    fn typed(text: &str) -> PipelineGraph {
        let mut graph = PipelineGraph::default();
        let id = graph.add_node("text", (0.0, 0.0), 0);
        graph.set_field(&id, "text", text);
        graph
    }

    fn text_of(graph: &PipelineGraph) -> String {
        graph
            .nodes
            .values()
            .next()
            .and_then(|n| n.data.get("text").cloned())
            .unwrap_or_default()
    }

    #[test]
    fn test_undo_redo() {
        let mut stack = UndoStack::default();
        stack.push(&graph_with(0));
        stack.push(&graph_with(1));
        stack.push(&graph_with(2));

        assert_eq!(stack.undo().unwrap().nodes.len(), 1);
        assert_eq!(stack.undo().unwrap().nodes.len(), 0);
        assert!(stack.undo().is_none());
        assert_eq!(stack.redo().unwrap().nodes.len(), 1);
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut stack = UndoStack::default();
        stack.push(&graph_with(0));
        stack.push(&graph_with(1));
        stack.undo();
        stack.push(&graph_with(3));
        assert!(stack.redo().is_none());
        assert_eq!(stack.undo().unwrap().nodes.len(), 0);
    }

    #[test]
    fn test_bounded() {
        let mut stack = UndoStack::with_capacity(2);
        for i in 0..5 {
            stack.push(&graph_with(i));
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo().unwrap().nodes.len(), 3);
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_typing_in_one_field_is_one_record() {
        let mut stack = UndoStack::default();
        stack.push(&typed(""));
        for text in ["h", "he", "hel", "hell", "hello"] {
            stack.push_merged(&typed(text), "n:text");
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(text_of(&stack.undo().unwrap()), "");
        assert_eq!(text_of(&stack.redo().unwrap()), "hello");
    }

    #[test]
    fn test_different_field_or_structure_starts_new_record() {
        let mut stack = UndoStack::default();
        stack.push(&graph_with(0));
        stack.push_merged(&typed("a"), "n:text");
        stack.push_merged(&typed("b"), "n:other");
        stack.push(&graph_with(2));
        stack.push_merged(&typed("c"), "n:other");
        assert_eq!(stack.len(), 5);
    }

    #[test]
    fn test_edit_after_undo_keeps_restore_point() {
        let mut stack = UndoStack::default();
        stack.push(&typed(""));
        stack.push_merged(&typed("ab"), "n:text");
        stack.push_merged(&typed("abc"), "n:text");
        stack.push(&graph_with(3));

        assert_eq!(text_of(&stack.undo().unwrap()), "abc");
        stack.push_merged(&typed("abcd"), "n:text");
        assert!(stack.redo().is_none());
        assert_eq!(text_of(&stack.undo().unwrap()), "abc");
        assert_eq!(text_of(&stack.undo().unwrap()), "");
    }
}

//! Bindings from registry keys to the generic node renderer.
//!
//! Every kind renders through [`NodeRenderer`]. The text-template kind keeps
//! the same shell but shows input ports derived from its `text` field.

use crate::editor::node_renderer::{FieldState, NodeRenderer, NodeView};
use crate::graph::NodeData;
use crate::node_configs::{ConfigError, NodeTypeRegistry, TEXT_FIELD, TEXT_NODE_KEY};
use crate::node_types::NodeSchema;
use crate::variable_ports::derive_input_ports;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum NodeWrapper {
    /// Fields and ports straight from the schema.
    Schema(Arc<NodeSchema>),
    /// Inputs derived from the template in the `text` field.
    TextTemplate(Arc<NodeSchema>),
}

impl NodeWrapper {
    pub fn bind(registry: &NodeTypeRegistry, key: &str) -> Result<Self, ConfigError> {
        let schema = registry.shared(key)?;
        Ok(if key == TEXT_NODE_KEY {
            NodeWrapper::TextTemplate(schema)
        } else {
            NodeWrapper::Schema(schema)
        })
    }

    pub fn schema(&self) -> &NodeSchema {
        match self {
            NodeWrapper::Schema(schema) | NodeWrapper::TextTemplate(schema) => schema,
        }
    }

    /// The view for the given field values. For the text kind the inputs are
    /// recomputed from scratch on every call.
    pub fn view<'a>(&'a self, fields: &FieldState) -> NodeView<'a> {
        match self {
            NodeWrapper::Schema(schema) => NodeView::from_schema(schema),
            NodeWrapper::TextTemplate(schema) => {
                let template = fields.get(TEXT_FIELD).unwrap_or_default();
                NodeView::with_inputs(schema, derive_input_ports(template))
            }
        }
    }

    /// Starts a render session for one instance.
    pub fn renderer<'a>(&'a self, instance_id: Uuid, data: &NodeData) -> NodeRenderer<'a> {
        let fields = FieldState::seed(self.schema(), data);
        let view = self.view(&fields);
        NodeRenderer::new(instance_id, view, fields)
    }
}

/// One wrapper per registered key, bound once at startup.
pub struct NodeBindings {
    wrappers: HashMap<String, NodeWrapper>,
}

impl NodeBindings {
    pub fn bind_all(registry: &NodeTypeRegistry) -> Result<Self, ConfigError> {
        let mut wrappers = HashMap::new();
        for key in registry.keys() {
            wrappers.insert(key.to_string(), NodeWrapper::bind(registry, key)?);
        }
        log::info!("bound {} node types", wrappers.len());
        Ok(Self { wrappers })
    }

    pub fn get(&self, key: &str) -> Result<&NodeWrapper, ConfigError> {
        self.wrappers
            .get(key)
            .ok_or_else(|| ConfigError::UnknownNodeType(key.to_string()))
    }
}

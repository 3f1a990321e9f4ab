//! Built-in node kinds.
//!
//! Each kind is a [`NodeSchema`] keyed by the same string the graph store
//! writes into `NodeInstance::node_type` and the submission payload carries as
//! `type`. The key set is closed; lookups of any other key are configuration
//! errors.

use crate::node_types::{Field, NodeSchema, PortRole};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

pub const TEXT_NODE_KEY: &str = "text";
pub const TEXT_FIELD: &str = "text";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("node type `{key}` declares field `{field}` more than once")]
    DuplicateField { key: String, field: String },
    #[error("node type `{key}` declares {role:?} port `{port}` more than once")]
    DuplicatePort {
        key: String,
        role: PortRole,
        port: String,
    },
    #[error("node type `{0}` is registered twice")]
    DuplicateNodeType(String),
}

pub struct NodeTypeRegistry {
    schemas: HashMap<String, Arc<NodeSchema>>,
    /// Palette order.
    keys: Vec<String>,
}

impl NodeTypeRegistry {
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
            keys: Vec::new(),
        }
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        let mut ret = Self::empty();

        ret.register(
            "customInput",
            NodeSchema::new("Input", "Define input", "Input")
                .field(Field::text("inputName", "Name", "input_1"))
                .field(Field::select("inputType", "Type", &["Text", "File"], "Text"))
                .output("value", 50.0)
                .size(220.0, 120.0),
        )?;

        ret.register(
            "llm",
            NodeSchema::new("LLM", "Language Model", "Function")
                .input("system", 33.0)
                .input("prompt", 66.0)
                .output("response", 50.0)
                .size(200.0, 100.0),
        )?;

        ret.register(
            "customOutput",
            NodeSchema::new("Output", "Define output", "Output")
                .field(Field::text("outputName", "Name", "output_1"))
                .field(Field::select("outputType", "Type", &["Text", "Image"], "Text"))
                .input("value", 50.0)
                .size(220.0, 120.0),
        )?;

        // Inputs are derived from the template at render time.
        ret.register(
            TEXT_NODE_KEY,
            NodeSchema::new("Text", "Text with variables", "String")
                .field(Field::textarea(TEXT_FIELD, "Text", "{{input}}", 3).with_max_rows(8))
                .output("output", 50.0)
                .size(240.0, 140.0),
        )?;

        ret.register(
            "uppercase",
            NodeSchema::new("Uppercase", "Convert to uppercase", "String")
                .field(Field::text("text", "Text", ""))
                .input("input", 50.0)
                .output("output", 50.0)
                .size(200.0, 100.0),
        )?;

        ret.register(
            "concat",
            NodeSchema::new("Concat", "Concatenate strings", "String")
                .field(Field::text("separator", "Separator", ""))
                .input("input1", 33.0)
                .input("input2", 66.0)
                .output("output", 50.0)
                .size(200.0, 120.0),
        )?;

        ret.register(
            "regexReplace",
            NodeSchema::new("Regex Replace", "Replace by regex pattern", "String")
                .field(Field::text("pattern", "Pattern", ""))
                .field(Field::text("replacement", "Replacement", ""))
                .input("input", 50.0)
                .output("output", 50.0)
                .size(220.0, 140.0),
        )?;

        ret.register(
            "number",
            NodeSchema::new("Number", "Number input", "Data")
                .field(Field::text("value", "Value", "0"))
                .output("output", 50.0)
                .size(200.0, 100.0),
        )?;

        ret.register(
            "delay",
            NodeSchema::new("Delay", "Delay execution (ms)", "Time")
                .field(Field::text("milliseconds", "Milliseconds", "1000"))
                .input("input", 50.0)
                .output("output", 50.0)
                .size(220.0, 110.0),
        )?;

        Ok(ret)
    }

    /// Adds a node kind after checking its field names and port ids are unique.
    pub fn register(&mut self, key: &str, mut schema: NodeSchema) -> Result<(), ConfigError> {
        if self.schemas.contains_key(key) {
            return Err(ConfigError::DuplicateNodeType(key.to_string()));
        }

        let mut names = HashSet::new();
        for field in &schema.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    key: key.to_string(),
                    field: field.name.clone(),
                });
            }
        }

        for (role, ports) in [
            (PortRole::Input, &schema.inputs),
            (PortRole::Output, &schema.outputs),
        ] {
            let mut ids = HashSet::new();
            for port in ports {
                if !ids.insert(port.id.as_str()) {
                    return Err(ConfigError::DuplicatePort {
                        key: key.to_string(),
                        role,
                        port: port.id.clone(),
                    });
                }
            }
        }

        schema.normalize_roles();
        self.keys.push(key.to_string());
        self.schemas.insert(key.to_string(), Arc::new(schema));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&NodeSchema> {
        self.schemas.get(key).map(|s| s.as_ref())
    }

    pub fn schema(&self, key: &str) -> Result<&NodeSchema, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownNodeType(key.to_string()))
    }

    /// Shared handle to a schema, for bindings that outlive the borrow.
    pub fn shared(&self, key: &str) -> Result<Arc<NodeSchema>, ConfigError> {
        self.schemas
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownNodeType(key.to_string()))
    }

    /// Registered keys in palette order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

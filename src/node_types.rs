use serde::{Deserialize, Deserializer, Serialize};

/// How a field is edited inside a node body.
///
/// Serialized as `text`, `textarea` or `select`. Any other name falls back to
/// the single-line editor.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    #[default]
    SingleLine,
    MultiLine,
    Enumerated,
}

impl From<String> for FieldKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "textarea" => FieldKind::MultiLine,
            "select" => FieldKind::Enumerated,
            _ => FieldKind::SingleLine,
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::SingleLine => "text",
            FieldKind::MultiLine => "textarea",
            FieldKind::Enumerated => "select",
        }
        .to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, rename = "defaultValue")]
    pub default_value: Option<String>,
    /// Visible rows for multi-line fields.
    #[serde(default)]
    pub rows: Option<usize>,
    /// Upper bound for multi-line fields that grow with their content.
    #[serde(default, rename = "maxRows")]
    pub max_rows: Option<usize>,
}

pub const DEFAULT_TEXTAREA_ROWS: usize = 3;

impl Field {
    pub fn text(name: &str, label: &str, default_value: &str) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::SingleLine,
            options: Vec::new(),
            default_value: Some(default_value.into()),
            rows: None,
            max_rows: None,
        }
    }

    pub fn textarea(name: &str, label: &str, default_value: &str, rows: usize) -> Self {
        Self {
            kind: FieldKind::MultiLine,
            rows: Some(rows),
            ..Self::text(name, label, default_value)
        }
    }

    pub fn select(name: &str, label: &str, options: &[&str], default_value: &str) -> Self {
        Self {
            kind: FieldKind::Enumerated,
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Self::text(name, label, default_value)
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Row count of a multi-line editor holding `value`.
    pub fn visible_rows(&self, value: &str) -> usize {
        let rows = self.rows.unwrap_or(DEFAULT_TEXTAREA_ROWS);
        match self.max_rows {
            Some(max_rows) => value.split('\n').count().clamp(rows, max_rows.max(rows)),
            None => rows,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    #[default]
    Input,
    Output,
}

/// A port's role follows the list it sits in, so it is not part of the
/// serialized form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub id: String,
    #[serde(skip)]
    pub role: PortRole,
    /// Percentage offset down the node edge, 0 to 100.
    pub position: f32,
}

impl Port {
    pub fn input(id: impl Into<String>, position: f32) -> Self {
        Self {
            id: id.into(),
            role: PortRole::Input,
            position,
        }
    }

    pub fn output(id: impl Into<String>, position: f32) -> Self {
        Self {
            id: id.into(),
            role: PortRole::Output,
            position,
        }
    }
}

fn ports_with_role<'de, D>(deserializer: D, role: PortRole) -> Result<Vec<Port>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut ports = Vec::<Port>::deserialize(deserializer)?;
    for port in &mut ports {
        port.role = role;
    }
    Ok(ports)
}

fn input_ports<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Port>, D::Error> {
    ports_with_role(deserializer, PortRole::Input)
}

fn output_ports<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Port>, D::Error> {
    ports_with_role(deserializer, PortRole::Output)
}

fn default_width() -> f32 {
    200.0
}

fn default_min_height() -> f32 {
    80.0
}

/// Declarative description of one node kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSchema {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, deserialize_with = "input_ports")]
    pub inputs: Vec<Port>,
    #[serde(default, deserialize_with = "output_ports")]
    pub outputs: Vec<Port>,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_min_height")]
    pub min_height: f32,
}

impl NodeSchema {
    pub fn new(title: &str, subtitle: &str, category: &str) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            category: category.into(),
            fields: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            width: default_width(),
            min_height: default_min_height(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn input(mut self, id: &str, position: f32) -> Self {
        self.inputs.push(Port::input(id, position));
        self
    }

    pub fn output(mut self, id: &str, position: f32) -> Self {
        self.outputs.push(Port::output(id, position));
        self
    }

    pub fn size(mut self, width: f32, min_height: f32) -> Self {
        self.width = width;
        self.min_height = min_height;
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Re-tags every port with the role of the list holding it.
    pub fn normalize_roles(&mut self) {
        for port in &mut self.inputs {
            port.role = PortRole::Input;
        }
        for port in &mut self.outputs {
            port.role = PortRole::Output;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_deserialize_empty() {
        let schema: NodeSchema = serde_json::from_str(r#"{"title": "Bare"}"#).unwrap();
        assert!(schema.fields.is_empty());
        assert!(schema.inputs.is_empty());
        assert!(schema.outputs.is_empty());
        assert_eq!(schema.width, 200.0);
        assert_eq!(schema.min_height, 80.0);
    }

    #[test]
    fn test_unknown_field_kind_is_single_line() {
        let field: Field =
            serde_json::from_str(r#"{"name": "n", "label": "N", "type": "slider"}"#).unwrap();
        assert_eq!(field.kind, FieldKind::SingleLine);
        assert!(field.options.is_empty());
    }

    #[test]
    fn test_field_kind_names() {
        let field = Field::select("t", "T", &["A", "B"], "A");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "select");
        assert_eq!(json["defaultValue"], "A");
        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, FieldKind::Enumerated);
    }

    #[test]
    fn test_visible_rows() {
        let fixed = Field::textarea("t", "T", "", 3);
        assert_eq!(fixed.visible_rows("a\nb\nc\nd\ne"), 3);

        let growing = Field::textarea("t", "T", "", 3).with_max_rows(8);
        assert_eq!(growing.visible_rows(""), 3);
        assert_eq!(growing.visible_rows("1\n2\n3\n4\n5"), 5);
        assert_eq!(growing.visible_rows(&"x\n".repeat(20)), 8);
    }

    #[test]
    fn test_trailing_newline_adds_a_row() {
        let growing = Field::textarea("t", "T", "", 3).with_max_rows(8);
        assert_eq!(growing.visible_rows("1\n2\n3\n4"), 4);
        assert_eq!(growing.visible_rows("1\n2\n3\n4\n"), 5);
    }

    #[test]
    fn test_port_role_follows_list() {
        let schema: NodeSchema =
            serde_json::from_str(r#"{"outputs": [{"id": "value", "position": 50}]}"#).unwrap();
        assert_eq!(schema.outputs, vec![Port::output("value", 50.0)]);
        assert!(schema.inputs.is_empty());

        let schema: NodeSchema = serde_json::from_str(
            r#"{"title": "T", "inputs": [{"id": "in", "role": "output", "position": 50}]}"#,
        )
        .unwrap();
        assert_eq!(schema.inputs[0].role, PortRole::Input);

        let json = serde_json::to_value(&schema).unwrap();
        assert!(json["inputs"][0].get("role").is_none());
    }

    #[test]
    fn test_normalize_roles() {
        let mut schema = NodeSchema::new("T", "", "");
        schema.inputs.push(Port::output("in", 50.0));
        schema.normalize_roles();
        assert_eq!(schema.inputs[0].role, PortRole::Input);
    }
}

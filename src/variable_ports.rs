//! Input ports derived from `{{variable}}` markers in a text template.
//!
//! The port set is a pure function of the template text: distinct names,
//! sorted by code point, evenly spaced down the left edge. Port ids are
//! `var:<name>` so edges keyed by port id survive edits that leave the
//! variable itself untouched.

use crate::node_types::Port;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const VARIABLE_PORT_PREFIX: &str = "var:";

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z_$][A-Za-z0-9_$]*)\}\}").expect("variable pattern is valid")
    })
}

/// Distinct variable names referenced in `text`, in ascending order.
pub fn extract_variables(text: &str) -> Vec<String> {
    variable_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Evenly spaced positions (percent) for `count` ports, with margin at both ends.
pub fn layout_positions(count: usize) -> Vec<f32> {
    let slots = (count + 1) as f32;
    (0..count).map(|k| (k + 1) as f32 * 100.0 / slots).collect()
}

pub fn port_id(variable: &str) -> String {
    format!("{}{}", VARIABLE_PORT_PREFIX, variable)
}

/// Input ports for a text template.
pub fn derive_input_ports(text: &str) -> Vec<Port> {
    let variables = extract_variables(text);
    let positions = layout_positions(variables.len());
    variables
        .iter()
        .zip(positions)
        .map(|(name, position)| Port::input(port_id(name), position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_dedup_and_layout() {
        let ports = derive_input_ports("{{a}} {{a}} {{b}}");
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].id, "var:a");
        assert_eq!(ports[1].id, "var:b");
        assert!(approx(ports[0].position, 100.0 / 3.0));
        assert!(approx(ports[1].position, 200.0 / 3.0));
    }

    #[test]
    fn test_lexicographic_order() {
        let ports = derive_input_ports("{{z}} {{a}}");
        let ids: Vec<_> = ports.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["var:a", "var:z"]);
    }

    #[test]
    fn test_code_point_order() {
        // Uppercase, `$` and `_` sort by code point, not case-insensitively.
        assert_eq!(
            extract_variables("{{b}} {{_x}} {{B}} {{$y}}"),
            vec!["$y", "B", "_x", "b"]
        );
    }

    #[test]
    fn test_no_variables() {
        assert!(derive_input_ports("no variables here").is_empty());
        assert!(derive_input_ports("").is_empty());
        assert!(layout_positions(0).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let text = "Hello {{name}}, you are {{age}} years old. {{name}}!";
        assert_eq!(derive_input_ports(text), derive_input_ports(text));
    }

    #[test]
    fn test_stable_across_unrelated_edits() {
        let before = derive_input_ports("Dear {{user}}, see {{link}}");
        let after = derive_input_ports("{{link}} is ready, {{user}}. Regards");
        assert_eq!(before, after);
    }

    #[test]
    fn test_malformed_markers_ignored() {
        let text = "{{}} {{ spaced }} {{1abc}} {single} {{open {{a-b}} {{ok}}";
        assert_eq!(extract_variables(text), vec!["ok"]);
    }

    #[test]
    fn test_identifier_characters() {
        assert_eq!(
            extract_variables("{{$root}} {{_tmp9}} {{camelCase}}"),
            vec!["$root", "_tmp9", "camelCase"]
        );
    }

    #[test]
    fn test_nested_braces() {
        // The inner marker still matches inside extra braces.
        assert_eq!(extract_variables("{{{x}}}"), vec!["x"]);
    }

    #[test]
    fn test_positions_evenly_spaced() {
        let positions = layout_positions(4);
        let expected = [20.0, 40.0, 60.0, 80.0];
        for (got, want) in positions.iter().zip(expected) {
            assert!(approx(*got, want));
        }
        assert!(approx(layout_positions(1)[0], 50.0));
    }
}

//! CSS extractor: selector blocks with their declarations.
//!
//! Consecutive lines are grouped until a closing brace appears, one selector
//! entity is emitted per group, and scanning resumes after the consumed
//! block so a span is never re-entered.

use std::collections::BTreeMap;

use super::Extraction;
use super::regexes::*;
use crate::detect::Language;
use crate::types::{EntityKind, EntityNode, PropValue};

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Css);
    let lines: Vec<&str> = content.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        // Accumulate until the block closes (or the file ends).
        let mut j = i;
        let mut joined = lines[i].to_string();
        while j + 1 < lines.len() && !joined.contains('}') {
            j += 1;
            joined.push(' ');
            joined.push_str(lines[j]);
        }

        let selector = regex_css_selector_block()
            .captures(&joined)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        let Some(selector) = selector else {
            i += 1;
            continue;
        };

        let end = lines
            .iter()
            .enumerate()
            .skip(i)
            .find(|(_, l)| l.contains('}'))
            .map(|(k, _)| k)
            .unwrap_or(j);

        let mut props: BTreeMap<String, String> = BTreeMap::new();
        for line in &lines[i..=end.min(lines.len() - 1)] {
            for caps in regex_css_property().captures_iter(line) {
                let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                props.insert(name.to_string(), value.to_string());
            }
        }

        let mut node = EntityNode::new(selector, EntityKind::Selector, i + 1).with_end(end + 1);
        node.properties
            .insert("css_properties".to_string(), PropValue::Table(props));
        out.entities.push_root(node);

        i = end + 1;
    }

    out
}

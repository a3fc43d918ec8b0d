//! HTML extractor: single-pass regex scan, no scope spans except forms.
//!
//! Local `<script src>` and `<link href>` references become imports so that
//! pages get dependency edges onto their scripts and stylesheets; absolute
//! `http(s)://` and protocol-relative URLs are external and skipped.

use super::regexes::*;
use super::{Extraction, path_stem};
use crate::detect::Language;
use crate::types::{EntityKind, EntityNode};

fn is_absolute_url(target: &str) -> bool {
    target.starts_with("http") || target.starts_with("//")
}

fn basename(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or(target)
}

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Html);
    let lines: Vec<&str> = content.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = regex_html_title().captures(line) {
            let title = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            out.entities
                .push_root(EntityNode::new(title, EntityKind::Title, i + 1).with_end(i + 1));
            break;
        }
    }

    for (i, line) in lines.iter().enumerate() {
        for caps in regex_html_script_src().captures_iter(line) {
            let src = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if is_absolute_url(src) {
                continue;
            }
            out.raw_imports.push(src.to_string());
            out.push_dependency(path_stem(src));
            if src.contains('/') {
                let mut node =
                    EntityNode::new(basename(src), EntityKind::Script, i + 1).with_end(i + 1);
                node.set_prop("path", src);
                out.entities.push_root(node);
            }
        }
        for caps in regex_html_link_href().captures_iter(line) {
            let href = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if is_absolute_url(href) {
                continue;
            }
            out.raw_imports.push(href.to_string());
            out.push_dependency(path_stem(href));
            if href.contains(".css") {
                let mut node =
                    EntityNode::new(basename(href), EntityKind::Stylesheet, i + 1).with_end(i + 1);
                node.set_prop("path", href);
                out.entities.push_root(node);
            }
        }
    }

    for (i, line) in lines.iter().enumerate() {
        if !line.contains("<form") {
            continue;
        }
        if let Some(caps) = regex_html_form().captures(line) {
            let name = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| format!("form_{}", i + 1));
            let end = lines
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, l)| l.contains("</form>"))
                .map(|(j, _)| j + 1)
                .unwrap_or(lines.len());
            out.entities
                .push_root(EntityNode::new(name, EntityKind::Form, i + 1).with_end(end));
        }
    }

    for (i, line) in lines.iter().enumerate() {
        for caps in regex_html_div_id().captures_iter(line) {
            let id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            out.entities
                .push_root(EntityNode::new(id, EntityKind::Div, i + 1));
        }
    }

    out
}

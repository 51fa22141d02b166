//! Text presentation of the admin panel and inference console. The panel
//! and console hand over plain view structs; nothing here talks to the API.

use crate::inference::InferenceView;
use crate::models::types::{LoadedModel, ModelId, RegistryEntry, Timestamp};
use crate::preferences::Theme;
use std::fmt::Write;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdminView {
    pub registry: Vec<RegistryEntry>,
    pub loaded: Vec<LoadedModel>,
    pub names: Vec<String>,
    pub selected_name: String,
    pub versions: Vec<u32>,
    pub selected_version: Option<u32>,
    pub version_enabled: bool,
    pub set_default: bool,
    pub can_submit: bool,
    pub busy: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowAction {
    SetActive { name: String, version: u32 },
    Delete(ModelId),
}

/// Default rows carry no actions.
pub fn row_actions(model: &LoadedModel) -> Vec<RowAction> {
    if model.is_default {
        return Vec::new();
    }
    vec![
        RowAction::SetActive {
            name: model.name.clone(),
            version: model.version,
        },
        RowAction::Delete(model.model_id.clone()),
    ]
}

/// (css class, label) of the status badge.
pub fn status_badge(model: &LoadedModel) -> (&'static str, &'static str) {
    if model.is_default {
        ("status-active", "Active")
    } else {
        ("status-inactive", "Inactive")
    }
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.0.format("%d %b %Y, %H:%M:%S").to_string()
}

pub fn render_header(title: &str, theme: Theme) -> String {
    format!("{title}  [{} {}]\n", theme.icon(), theme)
}

pub fn render_registry_table(entries: &[RegistryEntry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.name.clone(),
                e.latest_version.to_string(),
                format_timestamp(&e.latest_version_creation),
            ]
        })
        .collect();
    render_table(&["Name", "Latest version", "Created"], &rows)
}

pub fn render_loaded_table(models: &[LoadedModel]) -> String {
    let rows: Vec<Vec<String>> = models
        .iter()
        .map(|m| {
            let marker = if m.is_default { "*" } else { " " };
            let actions = row_actions(m)
                .iter()
                .map(|a| match a {
                    RowAction::SetActive { .. } => "activate".to_string(),
                    RowAction::Delete(_) => "delete".to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                format!("{marker}{}", m.name),
                m.version.to_string(),
                format_timestamp(&m.creation),
                status_badge(m).1.to_string(),
                m.model_id.to_string(),
                actions,
            ]
        })
        .collect();
    render_table(
        &["Name", "Version", "Created", "Status", "Model id", "Actions"],
        &rows,
    )
}

pub fn render_download_form(view: &AdminView) -> String {
    let mut out = String::new();
    let names = if view.names.is_empty() {
        "(none)".to_string()
    } else {
        view.names.join(", ")
    };
    let _ = writeln!(out, "Downloadable models: {names}");

    if !view.selected_name.is_empty() {
        let versions = if view.version_enabled {
            view.versions
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "(none left)".to_string()
        };
        let _ = writeln!(out, "Versions of {}: {versions}", view.selected_name);
    }
    out
}

pub fn render_inference(view: &InferenceView) -> String {
    let mut out = String::new();
    if let Some(error) = &view.error {
        let _ = writeln!(out, "error: {error}");
    }
    if let Some(sentiment) = view.result {
        let _ = writeln!(out, "{}", sentiment.label());
    }
    if let Some(latency) = view.latency_text() {
        let _ = writeln!(out, "{latency}");
    }
    out
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    push_row(&mut out, widths.iter().map(|w| "-".repeat(*w)), &widths);
    if rows.is_empty() {
        out.push_str("(empty)\n");
    }
    for row in rows {
        push_row(&mut out, row.iter().cloned(), &widths);
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let line = cells
        .zip(widths.iter().copied())
        .map(|(cell, w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Sentiment;

    fn model(is_default: bool) -> LoadedModel {
        LoadedModel {
            model_id: ModelId::from("abc"),
            name: "bert".into(),
            version: 2,
            creation: Timestamp::parse("2024-03-04 05:06:07").unwrap(),
            is_default,
        }
    }

    #[test]
    fn default_row_is_active_without_actions() {
        let m = model(true);
        assert_eq!(status_badge(&m), ("status-active", "Active"));
        assert!(row_actions(&m).is_empty());
    }

    #[test]
    fn inactive_row_offers_activate_and_delete() {
        let m = model(false);
        assert_eq!(status_badge(&m).1, "Inactive");
        assert_eq!(
            row_actions(&m),
            vec![
                RowAction::SetActive {
                    name: "bert".into(),
                    version: 2
                },
                RowAction::Delete(ModelId::from("abc")),
            ]
        );
    }

    #[test]
    fn loaded_table_lists_rows() {
        let table = render_loaded_table(&[model(true), model(false)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[2].starts_with("*bert"));
        assert!(lines[3].ends_with("activate, delete"));
    }

    #[test]
    fn empty_table_says_so() {
        assert!(render_registry_table(&[]).contains("(empty)"));
    }

    #[test]
    fn inference_error_hides_result() {
        let view = InferenceView {
            error: Some("boom".into()),
            ..InferenceView::default()
        };
        assert_eq!(render_inference(&view), "error: boom\n");

        let ok = InferenceView {
            result: Some(Sentiment::Positive),
            latency_ms: Some(12),
            error: None,
        };
        assert_eq!(render_inference(&ok), "POSITIVE\nLatency: 12 ms\n");
    }
}

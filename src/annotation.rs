//! Inline annotations and the surface that displays them

use std::path::Path;

use async_trait::async_trait;

use crate::manifest::{DependencyLocation, TextRange};
use crate::version::compare::DifferenceKind;
use crate::version::resolver::DependencyReport;

/// One inline indicator attached to a dependency entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub range: TextRange,
    pub hover_text: String,
    /// Text rendered after the entry
    pub label: String,
    pub color: &'static str,
    pub kind: DifferenceKind,
}

/// Label colour for a difference kind
pub fn palette_color(kind: DifferenceKind) -> &'static str {
    match kind {
        DifferenceKind::Major => "#d03050",
        DifferenceKind::Minor => "#f0a020",
        DifferenceKind::Patch => "#18a058",
        DifferenceKind::None => "#2080f0",
        DifferenceKind::Invalid => "#999",
    }
}

fn label_text(kind: DifferenceKind, latest_version: &str) -> String {
    if kind.is_update() {
        format!("Update available: {}", latest_version)
    } else if kind == DifferenceKind::None {
        format!("Up to date: {}", latest_version)
    } else {
        format!("Latest: {}", latest_version)
    }
}

/// Build one annotation per located entry whose dependency is in the report
pub fn build_annotations(
    report: &DependencyReport,
    locations: &[DependencyLocation],
) -> Vec<Annotation> {
    locations
        .iter()
        .filter_map(|location| {
            let status = report.get(&location.name)?;
            let kind = status.version_difference;
            let text = label_text(kind, &status.latest_version);
            Some(Annotation {
                range: location.range,
                hover_text: text.clone(),
                label: text,
                color: palette_color(kind),
                kind,
            })
        })
        .collect()
}

/// Where annotations end up being displayed
#[async_trait]
pub trait AnnotationSurface: Send + Sync {
    /// Clear every annotation shown for `path`, then show `annotations`
    async fn replace_annotations(&self, path: &Path, annotations: Vec<Annotation>);
}

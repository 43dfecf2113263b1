//! Mode B: rewrite a portable calendar file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use chrono_tz::Tz;
use cike_core::{Aggregator, NormalizedEvent};
use serde::Serialize;
use tracing::info;

use crate::error::{ProviderError, ProviderResult};
use crate::ics::render_calendar;

/// Events selected for export.
#[derive(Debug, Clone, Default)]
pub struct ExportPlan {
    /// Events to write, first occurrence of each presentation key.
    pub events: Vec<NormalizedEvent>,
    /// Events dropped as presentation duplicates.
    pub duplicates: usize,
}

/// Deduplicates on the presentation key, which ignores any decoration a
/// title already carries.
pub fn plan_export(events: &[NormalizedEvent]) -> ExportPlan {
    let mut aggregator = Aggregator::new();
    aggregator.extend(events.iter().cloned());
    ExportPlan {
        duplicates: aggregator.duplicates(),
        events: aggregator.into_events(),
    }
}

/// Outcome of a Mode B run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// The calendar file that was replaced.
    pub path: PathBuf,
    /// VEVENTs in the file.
    pub written: usize,
    /// Events dropped as presentation duplicates.
    pub duplicates: usize,
}

/// Writes `events` to `path`, replacing the previous file.
///
/// The calendar is written to a sibling temporary file first and renamed
/// over the target, so readers never see a partial file.
pub async fn export_to_file(
    events: &[NormalizedEvent],
    path: &Path,
    tz: &Tz,
) -> ProviderResult<ExportReport> {
    let plan = plan_export(events);
    let text = render_calendar(&plan.events, tz, Utc::now());

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, text).await.map_err(|e| {
        ProviderError::io(format!("failed to write {}: {}", tmp.display(), e)).with_source(e)
    })?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(
            ProviderError::io(format!("failed to replace {}: {}", path.display(), e))
                .with_source(e),
        );
    }

    info!(
        path = %path.display(),
        written = plan.events.len(),
        duplicates = plan.duplicates,
        "calendar file written"
    );
    Ok(ExportReport {
        path: path.to_path_buf(),
        written: plan.events.len(),
        duplicates: plan.duplicates,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "calendar.ics".into());
    name.push(".tmp");
    path.with_file_name(name)
}

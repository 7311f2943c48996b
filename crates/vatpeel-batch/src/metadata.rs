//! Filename and folder conventions of the acquisition tooling.
//!
//! Layer logs are named `autolog_L{start}-L{end}.csv`; condition folders
//! follow `{fluid}_{gap}mm_{label...}` with an optional trailing lift
//! speed in um/s, e.g. `Water_1mm_SteppedCone_BPAGDA_1000`.

use std::path::Path;

use vatpeel_core::LayerMetadata;

/// Extracts the inclusive layer range from an autolog file name.
///
/// `autolog_L100-L105.csv` yields `(100, 105)`; a single layer may appear
/// as `autolog_L100.csv`. Returns `None` when no `L{number}` marker is
/// present.
#[must_use]
pub fn layer_range_from_filename(path: &Path) -> Option<(i64, i64)> {
    let stem = path.file_stem()?.to_str()?;
    let after = stem.splitn(2, 'L').nth(1)?;
    let mut parts = after.split('-');
    let start: i64 = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    let end = parts
        .next()
        .and_then(|p| {
            p.trim_start_matches('L')
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse::<i64>()
                .ok()
        })
        .unwrap_or(start);
    Some((start, end.max(start)))
}

/// Parses a condition-folder name into experiment metadata.
///
/// The first underscore-separated part is the fluid label, the second is
/// the gap label when it ends in `mm`, and a trailing all-digit part is
/// the commanded lift speed in um/s.
#[must_use]
pub fn condition_from_folder(folder_name: &str) -> LayerMetadata {
    let parts: Vec<&str> = folder_name.split('_').collect();
    let mut metadata = LayerMetadata::default();

    if let Some(fluid) = parts.first() {
        if !fluid.is_empty() {
            metadata.fluid_tag = Some((*fluid).to_string());
        }
    }
    if let Some(gap) = parts.get(1) {
        if gap.ends_with("mm") && gap.len() > 2 {
            metadata.gap_tag = Some((*gap).to_string());
        }
    }
    if parts.len() > 2 {
        if let Some(last) = parts.last() {
            if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) {
                metadata.step_speed_um_per_s = last.parse().ok();
            }
        }
    }
    metadata
}

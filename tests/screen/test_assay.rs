//! Assay statistics and normalization from a merged plate layout

use approx::assert_relative_eq;
use screensol::plate::PlateFormat;
use screensol::prelude::*;

const MERGED: &str = "\
# plate 1, layout merged with reader output
Well,Status,Signal,Area
A1,Positive,9,1.0
A2,Positive,10,1.0
A3,Positive,11,
B1,Negative,1.5,2.0
B2,Negative,2,2.0
B3,Negative,2.5,2.0
C1,Sample,4,3.0
C2,Sample,5,3.0
C3,Sample,6,3.0
D1,Reference,1000,9.0
";

fn records() -> Vec<WellRecord> {
    Table::from_reader(MERGED.as_bytes())
        .unwrap()
        .well_records(&["Signal", "Area"])
        .unwrap()
}

#[test]
fn control_quality_of_a_plate() {
    let outcome = summarize(&records(), "Signal").unwrap();
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let summary = outcome.value;

    let sample = summary.group(Status::Sample).unwrap();
    assert_eq!(sample.count, 3);
    assert_relative_eq!(sample.mean, 5.0);
    assert!(summary.group(Status::Reference).is_none());

    let controls = summary.controls.as_ref().unwrap();
    assert_relative_eq!(controls.z_factor.unwrap(), 0.4375, epsilon = 1e-12);
    assert_relative_eq!(controls.signal_to_background.unwrap(), 5.0, epsilon = 1e-12);

    let mut buffer = Vec::new();
    write_csv(&mut buffer, &summary.rows()).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("feature,status,count,mean,std,var,z_factor,sb")
    );
    assert!(lines.next().unwrap().starts_with("Signal,Sample,3,5.0,1.0,1.0,"));
}

#[test]
fn features_are_summarized_independently() {
    let results = summarize_features(
        &records(),
        &["Signal", "Area", "Viability"],
        &AssayOptions::default().with_threads(3),
    );
    assert_eq!(results.len(), 3);

    // identical control values give zero spread but a defined separation
    let area = results[1].as_ref().unwrap();
    let positive = area.value.group(Status::Positive).unwrap();
    assert_eq!(positive.count, 2);
    assert_relative_eq!(positive.std.unwrap(), 0.0);
    let controls = area.value.controls.as_ref().unwrap();
    assert_relative_eq!(controls.z_factor.unwrap(), 1.0);
    assert_relative_eq!(controls.signal_to_background.unwrap(), 0.5);

    assert_eq!(
        results[2].as_ref().unwrap_err(),
        &ScreenError::InputSchema {
            table: "well".into(),
            column: "Viability".into()
        }
    );
}

#[test]
fn normalized_column_is_added_to_every_row() {
    let records = records();
    let outcome = normalize_z(&records, "Signal").unwrap();
    assert!(outcome.is_clean());
    let norm = outcome.value;
    assert_relative_eq!(norm.sample_mean.unwrap(), 5.0);
    assert_relative_eq!(norm.sample_std.unwrap(), 1.0);

    let applied = norm.apply(&records);
    assert_eq!(applied.len(), records.len());
    assert_relative_eq!(applied[1].feature("Signal_norm").unwrap(), 5.0);
    assert_relative_eq!(applied[3].feature("Signal_norm").unwrap(), -3.5);
    assert_relative_eq!(applied[9].feature("Signal_norm").unwrap(), 995.0);
    assert_eq!(applied[0].feature("Signal"), Some(9.0));
}

#[test]
fn constant_samples_cannot_be_normalized() {
    let outcome = normalize_z(&records(), "Area").unwrap();
    assert!(outcome.value.values.iter().all(|v| v.normalized.is_none()));
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(matches!(
        &outcome.diagnostics[0],
        Diagnostic::NumericDegenerate { entity, .. } if entity == "Area"
    ));
}

#[test]
fn plate_view_of_a_full_layout() {
    let records: Vec<WellRecord> = PlateFormat::new(16, 24)
        .wells()
        .into_iter()
        .enumerate()
        .map(|(i, well)| {
            let status = if well.starts_with('P') {
                Status::Negative
            } else {
                Status::Sample
            };
            WellRecord::new(well, status).with_feature("Signal", (i % 4) as f64)
        })
        .collect();

    let outcome = PlateGrid::from_records(&records, "Signal", &PlateFormats::default()).unwrap();
    assert!(outcome.is_clean());
    let grid = outcome.value;
    assert_eq!(grid.format, PlateFormat::new(16, 24));
    assert_eq!(grid.values[[0, 3]], Some(3.0));
    assert_eq!(grid.values[[15, 0]], Some(0.0));
    assert_relative_eq!(grid.center.unwrap(), 1.5);
}

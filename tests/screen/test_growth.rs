//! Growth scoring and curve QC from plate-reader tables

use approx::assert_relative_eq;
use screensol::growth::InvalidReason;
use screensol::prelude::*;

// A1 grows normally, A2 starts too high, A10 collapses late
const READER: &str = "\
Time,A1,A2,A10
0,0.05,0.30,0.05
1,0.06,0.33,0.06
2,0.08,0.36,0.08
3,0.11,0.40,0.11
4,0.15,0.43,0.15
5,0.20,0.45,0.20
6,0.26,0.46,0.10
7,0.30,0.47,0.09
";

const LAYOUT: &str = "\
Well,Status
A1,Sample
A2,Sample
A10,Negative
";

#[test]
fn scores_and_filters_a_plate() {
    let reader = Table::from_reader(READER.as_bytes()).unwrap();
    let layout = Table::from_reader(LAYOUT.as_bytes()).unwrap();

    let scored = score_growth(&reader.time_series_wide().unwrap(), &GrowthOptions::default());
    assert!(scored.is_clean());
    let wells: Vec<&str> = scored.value.iter().map(|s| s.curve.well.as_str()).collect();
    assert_eq!(wells, vec!["A1", "A2", "A10"]);

    let a1 = &scored.value[0].score;
    let max_rate = scored.value[0].curve.rates.iter().flatten().copied().fold(0.0, f64::max);
    assert_relative_eq!(a1.gscore.unwrap(), (0.30 - 0.05) + 0.25 * max_rate, epsilon = 1e-12);

    let curves: Vec<_> = scored.value.iter().map(|s| s.curve.clone()).collect();
    let qc = filter_curves(&curves, &layout.statuses().unwrap(), &CurveQcOptions::default());
    let results: Vec<String> = qc.value.iter().map(|r| r.result.to_string()).collect();
    assert_eq!(results, vec!["Sample", "Invalid_sample", "Invalid_sample"]);
    assert_eq!(qc.value[1].reason, Some(InvalidReason::HighInitialOd));
    assert_eq!(qc.value[2].reason, Some(InvalidReason::LateDrop));
    assert_eq!(qc.value[2].min_rate_index, Some(6));
    assert_eq!(qc.diagnostics.len(), 2);

    let mut buffer = Vec::new();
    write_csv(&mut buffer, &qc.value).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.lines().nth(2).unwrap().starts_with("A2,Invalid_sample,HighInitialOd"));
}

#[test]
fn long_format_points_feed_the_same_scorer() {
    let mut table = Table::new(["Well", "Time", "OD"]);
    for (t, od) in [(3.0, 0.3), (0.0, 0.1), (2.0, 0.4), (1.0, 0.2)] {
        table
            .push_row(["B7".to_string(), t.to_string(), od.to_string()])
            .unwrap();
    }
    let scored = score_growth(&table.time_series().unwrap(), &GrowthOptions::default());
    assert_relative_eq!(scored.value[0].score.gscore.unwrap(), 0.55, epsilon = 1e-12);

    let points = scored.value[0].curve.points();
    assert_eq!(points.len(), 4);
    assert_relative_eq!(points[3].growth_rate.unwrap(), -0.25, epsilon = 1e-12);
}

#[test]
fn gscores_reshape_onto_the_plate() {
    let wells = PlateFormats::default().lookup(96).unwrap();
    let values: Vec<(String, f64)> = order_wells(
        (1..=12)
            .flat_map(|c| ('A'..='H').map(move |r| format!("{r}{c}")))
            .collect::<Vec<_>>(),
    )
    .into_iter()
    .enumerate()
    .map(|(i, w)| (w, i as f64))
    .collect();
    assert_eq!(values.len(), wells.wells);

    let grid = PlateFormats::default().reshape(&values).unwrap();
    assert_eq!(grid.dim(), (8, 12));
    assert_eq!(grid[[0, 1]], 1.0);
    assert_eq!(grid[[1, 0]], 12.0);

    let too_few = &values[..90];
    assert_eq!(
        PlateFormats::default().reshape(too_few),
        Err(ScreenError::UnknownPlateFormat { wells: 90 })
    );
}

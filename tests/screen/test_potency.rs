//! Dose-response fitting through the public API

use std::collections::BTreeMap;
use std::time::Duration;

use approx::assert_relative_eq;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use screensol::potency::{ll4, Ll4Params};
use screensol::prelude::*;

const DOSES_PER_SERIES: usize = 12;

/// Half-log dilution series from 0.01 to ~3000 µM with noisy replicates
fn synthetic_compound(id: &str, truth: &Ll4Params, sd: f64, seed: u64) -> Vec<DoseResponseObservation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sd).unwrap();
    let mut rows = Vec::new();
    for i in 0..DOSES_PER_SERIES {
        let dose = 10f64.powf(-2.0 + 0.5 * i as f64);
        for _ in 0..3 {
            rows.push(DoseResponseObservation::new(
                id,
                dose,
                ll4(dose, truth) + noise.sample(&mut rng),
            ));
        }
    }
    rows
}

#[test]
fn recovers_known_parameters_from_noisy_replicates() {
    let truth = Ll4Params::new(1.2, 5.0, 95.0, 10.0);
    let obs = synthetic_compound("cmpd-1", &truth, 0.5, 7);

    let outcome = fit_dose_response(&obs, &FitOptions::default());
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.value.len(), 1);

    let fit = &outcome.value[0];
    assert_eq!(fit.compound_id, "cmpd-1");
    assert_eq!(fit.n, DOSES_PER_SERIES);
    assert_relative_eq!(fit.hill_slope, truth.b, max_relative = 0.05);
    assert_relative_eq!(fit.ec50, truth.e, max_relative = 0.05);
    assert_relative_eq!(fit.min_response, truth.c, epsilon = 1.0);
    assert_relative_eq!(fit.max_response, truth.d, epsilon = 1.0);
    assert!(fit.r_squared.unwrap() > 0.999);
    assert_relative_eq!(fit.ec50_response(), fit.predict(fit.ec50), epsilon = 1e-9);
}

#[test]
fn increasing_curves_fit_up_to_asymptote_swap() {
    // (b, c, d) and (-b, d, c) describe the same curve
    let truth = Ll4Params::new(-1.5, 2.0, 40.0, 0.5);
    let obs = synthetic_compound("agonist", &truth, 0.1, 11);

    let outcome = fit_dose_response(&obs, &FitOptions::default().with_threads(2));
    let fit = &outcome.value[0];
    assert_relative_eq!(fit.hill_slope.abs(), 1.5, max_relative = 0.05);
    assert_relative_eq!(fit.ec50, truth.e, max_relative = 0.05);
    let low = fit.min_response.min(fit.max_response);
    let high = fit.min_response.max(fit.max_response);
    assert_relative_eq!(low, 2.0, epsilon = 0.5);
    assert_relative_eq!(high, 40.0, epsilon = 0.5);
    assert_relative_eq!(fit.predict(100.0), ll4(100.0, &truth), epsilon = 0.5);
}

#[test]
fn failed_compounds_do_not_abort_the_batch() {
    let truth = Ll4Params::new(1.0, 10.0, 80.0, 3.0);
    let mut obs = synthetic_compound("good", &truth, 0.2, 3);
    obs.extend([
        DoseResponseObservation::new("sparse", 1.0, 50.0),
        DoseResponseObservation::new("sparse", 2.0, 40.0),
        DoseResponseObservation::new("sparse", 4.0, 30.0),
        DoseResponseObservation::new("sparse", 0.0, 90.0),
    ]);

    let outcome = fit_dose_response(&obs, &FitOptions::default());
    let ids: Vec<&str> = outcome.value.iter().map(|f| f.compound_id.as_str()).collect();
    assert_eq!(ids, vec!["good"]);

    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::DroppedRows { count: 1, .. })));
    let failure = outcome
        .diagnostics
        .iter()
        .find_map(|d| d.as_error())
        .unwrap();
    assert_eq!(
        failure,
        ScreenError::FitConvergence {
            compound: "sparse".into(),
            failure: FitFailure::InsufficientData {
                groups: 3,
                required: 4
            }
        }
    );
}

#[test]
fn timeouts_yield_an_empty_result_set() {
    let truth = Ll4Params::new(1.0, 10.0, 80.0, 3.0);
    let mut obs = synthetic_compound("a", &truth, 0.2, 1);
    obs.extend(synthetic_compound("b", &truth, 0.2, 2));

    let options = FitOptions::default().with_timeout(Some(Duration::ZERO));
    let outcome = fit_dose_response(&obs, &options);
    assert!(outcome.value.is_empty());
    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome.diagnostics.iter().all(|d| matches!(
        d,
        Diagnostic::FitFailed {
            failure: FitFailure::Timeout { .. },
            ..
        }
    )));
}

#[test]
fn pruned_tail_is_excluded_from_the_fit() {
    // rising response that collapses at the two highest doses
    let truth = Ll4Params::new(-1.0, 1.0, 100.0, 2.0);
    let mut obs = synthetic_compound("cytotoxic", &truth, 0.1, 5);
    for row in obs.iter_mut() {
        if row.dose > 500.0 {
            row.response = 5.0;
        }
    }

    let options = FitOptions::default();
    let grouped = aggregate(&obs, options.unit_factor);
    let pruned: BTreeMap<String, _> = grouped
        .value
        .iter()
        .map(|(id, groups)| (id.clone(), prune_groups(groups, &PruneOptions::default())))
        .collect();
    assert_eq!(pruned["cytotoxic"].len(), DOSES_PER_SERIES - 2);

    let outcome = fit_groups(&pruned, &options);
    let fit = &outcome.value[0];
    assert_eq!(fit.n, DOSES_PER_SERIES - 2);
    assert_relative_eq!(fit.ec50, truth.e, max_relative = 0.05);

    let kept = prune_all(&obs, &PruneOptions::default());
    assert_eq!(kept.len(), (DOSES_PER_SERIES - 2) * 3);
}

#[test]
fn fits_serialize_as_csv() {
    let truth = Ll4Params::new(1.0, 10.0, 80.0, 3.0);
    let obs = synthetic_compound("c", &truth, 0.2, 9);
    let outcome = fit_dose_response(&obs, &FitOptions::default());

    let mut buffer = Vec::new();
    write_csv(&mut buffer, &outcome.value).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.starts_with(
        "compound_id,hill_slope,min_response,max_response,ec50,residuals,r_squared,n,iterations"
    ));
    assert_eq!(text.lines().count(), 2);
}

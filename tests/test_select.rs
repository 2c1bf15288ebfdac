mod common;
use common::noisy;
use ndarray::{arr1, Ix4};
use std::collections::BTreeSet;
use tfpower::select::{clip, collapse, subset, subset_electrodes, subset_trials};
use tfpower::{Dim, NanPolicy, TfError, TrialId};

#[test]
fn subset_commutes() {
    let a = noisy((3, 4, 6, 5));
    let trial_preds: [&dyn Fn(TrialId) -> bool; 3] =
        [&|id: TrialId| id % 2 == 0, &|id: TrialId| id > 4, &|id: TrialId| id == 3];
    let elec_preds: [&dyn Fn(&str) -> bool; 3] =
        [
            &|n: &str| n.ends_with('1'),
            &|n: &str| n != "E3",
            &|n: &str| n == "E5" || n == "E2",
        ];

    for tp in trial_preds {
        for ep in elec_preds {
            let trials_first = subset(&subset(&a, Some(tp), None).unwrap(), None, Some(ep)).unwrap();
            let elecs_first = subset(&subset(&a, None, Some(ep)).unwrap(), Some(tp), None).unwrap();
            let both = subset(&a, Some(tp), Some(ep)).unwrap();
            assert_eq!(trials_first, elecs_first);
            assert_eq!(trials_first, both);
        }
    }
}

#[test]
fn subset_leaves_input_untouched() {
    let a = noisy((2, 3, 4, 2));
    let before = a.clone();
    let s = subset_electrodes(&a, &["E2"]).unwrap();
    assert_eq!(s.shape(), &[2, 3, 4, 1]);
    assert_eq!(a, before);
}

#[test]
fn empty_trial_selection_fails() {
    let a = noisy((2, 3, 4, 2));
    let err = subset(&a, Some(&|id: TrialId| id > 100), None).unwrap_err();
    assert_eq!(err, TfError::EmptySelection(Dim::Trial));

    let none: BTreeSet<TrialId> = BTreeSet::new();
    assert_eq!(subset_trials(&a, &none).unwrap_err(), TfError::EmptySelection(Dim::Trial));
}

#[test]
fn empty_selection_checked_before_other_axis() {
    let a = noisy((2, 3, 4, 2));
    let err = subset(&a, Some(&|_: TrialId| true), Some(&|_: &str| false)).unwrap_err();
    assert_eq!(err, TfError::EmptySelection(Dim::Electrode));
}

#[test]
fn subset_on_collapsed_array_reports_missing_axis() {
    let a = noisy((2, 3, 4, 2));
    let ft = collapse(&a, &[Dim::Frequency, Dim::Time], NanPolicy::Propagate).unwrap();
    let err = subset(&ft, Some(&|_: TrialId| true), None).unwrap_err();
    assert_eq!(err, TfError::MissingAxis(Dim::Trial));
}

#[test]
fn collapse_shape_law_matches_brute_force() {
    let a = noisy((3, 5, 4, 2));
    let out = collapse(&a, &[Dim::Time, Dim::Frequency], NanPolicy::Propagate).unwrap();
    assert_eq!(out.shape(), &[5, 3]);
    assert_eq!(out.dims(), vec![Dim::Time, Dim::Frequency]);

    let raw = a.data().view().into_dimensionality::<Ix4>().unwrap();
    let (n_f, n_t, n_r, n_e) = raw.dim();
    for t in 0..n_t {
        for f in 0..n_f {
            let mut sum = 0.0;
            let mut count = 0usize;
            for r in 0..n_r {
                for e in 0..n_e {
                    sum += raw[[f, t, r, e]];
                    count += 1;
                }
            }
            approx::assert_abs_diff_eq!(out.data()[[t, f]], sum / count as f64, epsilon = 1e-12);
        }
    }
    assert_eq!(out.axis(Dim::Time).unwrap(), a.axis(Dim::Time).unwrap());
}

#[test]
fn collapse_over_trials_only() {
    let a = noisy((3, 5, 4, 2));
    let out = collapse(&a, &[Dim::Electrode, Dim::Frequency, Dim::Time], NanPolicy::Propagate).unwrap();
    assert_eq!(out.shape(), &[2, 3, 5]);
    let raw = a.data().view().into_dimensionality::<Ix4>().unwrap();
    let want = (0..4).map(|r| raw[[2, 1, r, 1]]).sum::<f64>() / 4.0;
    approx::assert_abs_diff_eq!(out.data()[[1, 2, 1]], want, epsilon = 1e-12);
}

#[test]
fn collapse_unknown_keep_axis_fails() {
    let a = noisy((2, 3, 4, 2));
    let ft = collapse(&a, &[Dim::Frequency, Dim::Time], NanPolicy::Propagate).unwrap();
    let err = collapse(&ft, &[Dim::Electrode], NanPolicy::Propagate).unwrap_err();
    assert_eq!(err, TfError::MissingAxis(Dim::Electrode));
}

#[test]
fn clip_boundary_rules() {
    let x = arr1(&[-13.0, 13.0, 13.0001, -13.5, 5.0]);
    let y = clip(&x, -13.0, 13.0);
    assert_eq!(y.to_vec(), vec![-13.0, 13.0, 13.0, -13.0, 5.0]);
}

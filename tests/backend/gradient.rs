use acqopt::prelude::*;

fn quick() -> GradientConfig {
    GradientConfig {
        num_restarts: 6,
        raw_samples: 96,
        max_iters: 120,
        learning_rate: 0.05,
        ..GradientConfig::default()
    }
}

#[test]
fn enumerates_categories_and_climbs_within_each() {
    let space = ParameterSpace::new(vec![
        Parameter::categorical("kind", ["low", "mid", "high"]).unwrap(),
        Parameter::continuous("x", 0.0, 2.0).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(quick())
        .save_history(true)
        .seed(5)
        .build()
        .unwrap();

    // Relaxed layout: [low, mid, high, x / 2]; peak at kind = mid, x = 1.5.
    let acqf = Pointwise(|x: &[f64]| 0.5 * x[1] - (x[3] - 0.75).powi(2));
    let report = optimizer
        .optimize_with_report(&acqf, &KnownConstraints::new(), &[])
        .unwrap();

    let best = &report.batch[0];
    assert_eq!(best.get("kind"), Some(&ParamValue::from("mid")));
    let x = best.get("x").and_then(ParamValue::as_f64).unwrap();
    assert!((x - 1.5).abs() < 0.05, "x = {x}");

    let history = report.history.unwrap();
    assert!(!history.is_empty());
    assert!(history.len() <= 120);
    assert!(history.records.windows(2).all(|w| w[0].generation < w[1].generation));
    assert!(history.best_objective().unwrap() < -0.45);
}

#[test]
fn fully_categorical_space_is_scored_exhaustively() {
    let space = ParameterSpace::new(vec![
        Parameter::categorical("a", ["p", "q", "r"]).unwrap(),
        Parameter::categorical("b", ["u", "v"]).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .batch_size(3)
        .seed(1)
        .build()
        .unwrap();

    // Relaxed layout: [p, q, r, u, v].
    let acqf = Pointwise(|x: &[f64]| x[1] * 3.0 + x[2] * 2.0 + x[4]);
    let report = optimizer
        .optimize_with_report(&acqf, &KnownConstraints::new(), &[])
        .unwrap();

    assert_eq!(report.n_candidates, 6);
    assert_eq!(report.n_evals, 6);
    let picked: Vec<(String, String)> = report
        .batch
        .iter()
        .map(|v| (v.values()[0].to_string(), v.values()[1].to_string()))
        .collect();
    assert_eq!(
        picked,
        vec![
            ("q".to_owned(), "v".to_owned()),
            ("q".to_owned(), "u".to_owned()),
            ("r".to_owned(), "v".to_owned()),
        ]
    );
}

#[test]
fn relaxes_categoricals_above_the_enumeration_limit() {
    let space = ParameterSpace::new(vec![
        Parameter::categorical("c", ["a", "b", "c"]).unwrap(),
        Parameter::continuous("x", 0.0, 1.0).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(GradientConfig {
            max_categorical_combinations: 1,
            ..quick()
        })
        .seed(3)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| x[2] - 0.1 * x[3]);
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].get("c"), Some(&ParamValue::from("c")));
}

#[test]
fn descriptor_categoricals_decode_to_nearest_option() {
    let space = ParameterSpace::new(vec![
        Parameter::categorical("solvent", ["water", "ethanol", "hexane"])
            .unwrap()
            .with_descriptors(vec![vec![80.0], vec![25.0], vec![2.0]])
            .unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(quick())
        .seed(8)
        .build()
        .unwrap();

    // Polarity peak between hexane and ethanol, closer to ethanol.
    let acqf = Pointwise(|x: &[f64]| -(x[0] - 0.25).powi(2));
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
    assert_eq!(batch[0].get("solvent"), Some(&ParamValue::from("ethanol")));
}

#[test]
fn discrete_parameters_snap_to_options_and_skip_measured_points() {
    let space = ParameterSpace::new(vec![
        Parameter::discrete("n", [1.0, 2.0, 4.0, 8.0, 16.0]).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(quick())
        .batch_size(2)
        .seed(4)
        .build()
        .unwrap();

    // Relaxed column is (n - 1) / 15; peak at n = 8, then 4, 2, 1, 16.
    let acqf = Pointwise(|x: &[f64]| -(x[0] - 7.0 / 15.0).abs());
    let measured = vec![vec![ParamValue::Float(8.0)]];
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &measured).unwrap();

    let picked: Vec<f64> = batch.iter().map(|v| v.values()[0].as_f64().unwrap()).collect();
    assert_eq!(picked, vec![4.0, 2.0]);
}

#[cfg(feature = "sobol")]
#[test]
fn sobol_starts_reach_the_peak() {
    let space = ParameterSpace::new(vec![
        Parameter::continuous("x", 0.0, 1.0).unwrap(),
        Parameter::continuous("y", 0.0, 1.0).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(GradientConfig {
            init: StartInit::Sobol,
            ..quick()
        })
        .seed(2)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| -((x[0] - 0.7).powi(2) + (x[1] - 0.2).powi(2)));
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
    let x = crate::floats(batch[0].values());
    assert!(crate::distance(&x, &[0.7, 0.2]) < 0.05, "{x:?}");
}

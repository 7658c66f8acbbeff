use acqopt::prelude::*;

fn two_reals() -> ParameterSpace {
    ParameterSpace::new(vec![
        Parameter::continuous("x", 0.0, 10.0).unwrap(),
        Parameter::continuous("y", 0.0, 10.0).unwrap(),
    ])
    .unwrap()
}

#[test]
fn converges_to_the_constrained_boundary() {
    let optimizer = AcquisitionOptimizer::builder(two_reals())
        .backend(BackendKind::Genetic)
        .pop_size(30)
        .max_generations(40)
        .seed(17)
        .build()
        .unwrap();

    // Unconstrained peak at raw (8, 5); x is capped at 6.
    let acqf = Pointwise(|x: &[f64]| -((x[0] - 0.8).powi(2) + (x[1] - 0.5).powi(2)));
    let constraints = KnownConstraints::new().with(|p: &[ParamValue]| p[0].as_f64().is_some_and(|x| x <= 6.0));
    let batch = optimizer.optimize(&acqf, &constraints, &[]).unwrap();

    let best = crate::floats(batch[0].values());
    assert!(best[0] <= 6.0);
    assert!(best[0] > 5.5, "x = {}", best[0]);
    assert!((best[1] - 5.0).abs() < 0.5, "y = {}", best[1]);
}

#[test]
fn history_has_one_record_per_generation() {
    let optimizer = AcquisitionOptimizer::builder(two_reals())
        .backend(BackendKind::Genetic)
        .pop_size(12)
        .max_generations(10)
        .save_history(true)
        .verbose(true)
        .seed(3)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| x[0] * x[1]);
    let report = optimizer
        .optimize_with_report(&acqf, &KnownConstraints::new(), &[])
        .unwrap();
    let history = report.history.unwrap();

    assert_eq!(history.len(), 11);
    assert_eq!(history.records[0].generation, 0);
    assert_eq!(history.records[0].n_evals, 12);
    assert!(history.records.iter().all(|r| r.population_size == 12));
    assert!(history.records.iter().all(|r| r.n_feasible == 12));
    // Elitist survival never loses the best member.
    assert!(
        history
            .records
            .windows(2)
            .all(|w| w[1].best_objective <= w[0].best_objective)
    );
}

#[test]
fn evaluation_budget_bounds_the_search() {
    let optimizer = AcquisitionOptimizer::builder(two_reals())
        .backend(BackendKind::Genetic)
        .pop_size(20)
        .max_evaluations(100)
        .seed(21)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| x[0]);
    let report = optimizer
        .optimize_with_report(&acqf, &KnownConstraints::new(), &[])
        .unwrap();
    assert!((100..120).contains(&report.n_evals), "{}", report.n_evals);
    assert!(report.history.is_none());
}

#[test]
fn small_discrete_space_still_yields_distinct_points() {
    let space = ParameterSpace::new(vec![
        Parameter::discrete("a", [1.0, 2.0, 3.0]).unwrap(),
        Parameter::categorical("b", ["x", "y", "z"]).unwrap(),
    ])
    .unwrap();
    // Nine combinations, fewer than the population size.
    let optimizer = AcquisitionOptimizer::builder(space)
        .backend(BackendKind::Genetic)
        .pop_size(12)
        .max_generations(5)
        .batch_size(4)
        .seed(8)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| x[0] + x[3]);
    let measured = vec![vec![ParamValue::Float(3.0), ParamValue::from("z")]];
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &measured).unwrap();

    assert_eq!(batch.len(), 4);
    for (i, p) in batch.iter().enumerate() {
        assert_ne!(p.values(), measured[0].as_slice());
        assert!(batch[i + 1..].iter().all(|q| q != p));
    }
    // Relaxed layout: [(a - 1) / 2, x, y, z]; the best unmeasured point is (2, z).
    assert_eq!(batch[0].to_array(), vec![ParamValue::Float(2.0), ParamValue::from("z")]);
}

#[test]
fn violation_count_penalty_keeps_batches_feasible() {
    let space = ParameterSpace::new(vec![
        Parameter::discrete("a", [0.0, 1.0, 2.0, 3.0]).unwrap(),
        Parameter::discrete("b", [0.0, 1.0, 2.0, 3.0]).unwrap(),
    ])
    .unwrap();
    let constraints = KnownConstraints::new()
        .with(|p: &[ParamValue]| p[0].as_f64() != Some(3.0))
        .with(|p: &[ParamValue]| p[1].as_f64() != Some(3.0));
    let optimizer = AcquisitionOptimizer::builder(space)
        .backend(BackendKind::Genetic)
        .pop_size(10)
        .max_generations(10)
        .batch_size(2)
        .penalty(PenaltyPolicy::ViolationCount { scale: 1.0 })
        .seed(5)
        .build()
        .unwrap();

    let acqf = Pointwise(|x: &[f64]| x[0] + x[1]);
    let batch = optimizer.optimize(&acqf, &constraints, &[]).unwrap();
    assert_eq!(batch.len(), 2);
    for p in &batch {
        assert!(constraints.is_feasible(p));
    }
    assert_eq!(batch[0].to_array(), vec![ParamValue::Float(2.0), ParamValue::Float(2.0)]);
}

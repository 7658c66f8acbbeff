use acqopt::prelude::*;

use crate::{distance, floats};

fn respects_box_constraint(p: &[ParamValue]) -> bool {
    let x = floats(p);
    !(x[0] > 0.8 || x[2] > 0.9 || x[2] / x[1] < 0.1)
}

#[test]
fn sequential_gradient_proposals_stay_feasible_and_distinct() {
    let space = ParameterSpace::new(vec![
        Parameter::continuous("param0", 0.0, 1.0).unwrap(),
        Parameter::continuous("param1", 0.0, 1.0).unwrap(),
        Parameter::continuous("param2", 0.0, 1.0).unwrap(),
    ])
    .unwrap();
    let constraints = KnownConstraints::new().with(respects_box_constraint);

    // Initial design: 5 random feasible points.
    let mut rng = fastrand::Rng::with_seed(2024);
    let mut measured: Vec<Vec<ParamValue>> = Vec::new();
    while measured.len() < 5 {
        let p = space.sample_random(&mut rng);
        if constraints.is_satisfied(&p) {
            measured.push(p);
        }
    }

    let optimizer = AcquisitionOptimizer::builder(space)
        .gradient(GradientConfig {
            num_restarts: 4,
            raw_samples: 128,
            max_iters: 60,
            ..GradientConfig::default()
        })
        .seed(7)
        .build()
        .unwrap();

    for _ in 0..4 {
        // Exploration-only acquisition: distance to the nearest measured point.
        let observed: Vec<Vec<f64>> = measured.iter().map(|p| floats(p)).collect();
        let acqf = Pointwise(move |x: &[f64]| {
            observed
                .iter()
                .map(|o| distance(x, o))
                .fold(f64::INFINITY, f64::min)
        });
        let batch = optimizer.optimize(&acqf, &constraints, &measured).unwrap();
        assert_eq!(batch.len(), 1);
        measured.push(batch[0].to_array());
    }

    assert_eq!(measured.len(), 9);
    for p in &measured {
        assert!(respects_box_constraint(p), "infeasible point {p:?}");
    }
    for (i, a) in measured.iter().enumerate() {
        for b in &measured[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn mixed_population_batch_is_distinct_and_feasible() {
    let space = ParameterSpace::new(vec![
        Parameter::categorical("catalyst", ["a", "b", "c"]).unwrap(),
        Parameter::discrete("d1", [0.0, 1.0, 2.0, 3.0, 4.0]).unwrap(),
        Parameter::discrete("d2", [0.0, 1.0, 2.0, 3.0, 4.0]).unwrap(),
    ])
    .unwrap();
    let rule = |p: &[ParamValue]| {
        p[0].as_str() != Some("c") && p[1].as_f64().unwrap() + p[2].as_f64().unwrap() <= 6.0
    };
    let constraints = KnownConstraints::new().with(rule);
    // Relaxed layout: [a, b, c, d1 / 4, d2 / 4]. The unconstrained optimum
    // is infeasible; the feasible one is (a, 4, 2).
    let acqf = Pointwise(|x: &[f64]| 0.1 * x[0] + 2.0 * x[2] + x[3] + 0.9 * x[4]);
    let measured = vec![vec![
        ParamValue::from("b"),
        ParamValue::Float(2.0),
        ParamValue::Float(4.0),
    ]];

    for backend in [BackendKind::Genetic, BackendKind::GenericPopulation] {
        let optimizer = AcquisitionOptimizer::builder(space.clone())
            .backend(backend)
            .pop_size(20)
            .max_generations(25)
            .batch_size(3)
            .seed(99)
            .build()
            .unwrap();
        let batch = optimizer.optimize(&acqf, &constraints, &measured).unwrap();

        // Duplicate elimination keeps both populations distinct.
        assert_eq!(batch.len(), 3, "{backend}");
        for (i, p) in batch.iter().enumerate() {
            assert!(rule(p.values()), "{backend}: infeasible {p}");
            assert_ne!(p.values(), measured[0].as_slice());
            for q in &batch[i + 1..] {
                assert_ne!(p, q);
            }
        }
    }
}

#[test]
fn batch_not_smaller_than_population_fails_at_construction() {
    let space = ParameterSpace::new(vec![Parameter::continuous("x", 0.0, 1.0).unwrap()]).unwrap();
    for backend in [BackendKind::Genetic, BackendKind::GenericPopulation] {
        let err = AcquisitionOptimizer::builder(space.clone())
            .backend(backend)
            .pop_size(8)
            .batch_size(8)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BatchSizeExceedsPopulation {
                batch_size: 8,
                pop_size: 8
            }
        ));
    }
}

#[test]
fn identical_seeds_give_identical_proposals() {
    let space = ParameterSpace::new(vec![
        Parameter::continuous("x", -1.0, 1.0).unwrap(),
        Parameter::discrete("n", [1.0, 2.0, 4.0, 8.0]).unwrap(),
        Parameter::categorical("mode", ["fast", "slow"]).unwrap(),
    ])
    .unwrap();
    let acqf = Pointwise(|x: &[f64]| (6.0 * x[0]).sin() + x[1] * x[3]);

    for backend in [
        BackendKind::Gradient,
        BackendKind::Genetic,
        BackendKind::GenericPopulation,
    ] {
        let run = || {
            let optimizer = AcquisitionOptimizer::builder(space.clone())
                .backend(backend)
                .pop_size(16)
                .max_generations(10)
                .gradient(GradientConfig {
                    num_restarts: 3,
                    raw_samples: 32,
                    max_iters: 20,
                    ..GradientConfig::default()
                })
                .batch_size(2)
                .seed(1234)
                .build()
                .unwrap();
            let first = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
            let second = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
            (first, second)
        };
        assert_eq!(run(), run(), "{backend} is not reproducible");
    }
}

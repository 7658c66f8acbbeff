use std::sync::Arc;

use acqopt::prelude::*;
use acqopt::search::{
    AcquisitionProblem, Evaluation, Individual, evaluate_population, sort_population,
};
use acqopt::variable::{ChoiceDomain, IndexDomain, RealDomain};

/// Uniform random search over the problem's variables.
struct RandomSearch {
    pop_size: usize,
}

impl PopulationAlgorithm for RandomSearch {
    fn name(&self) -> &'static str {
        "random-search"
    }

    fn minimize(
        &self,
        problem: &dyn Problem,
        _termination: Termination,
        rng: &mut fastrand::Rng,
        observer: &mut dyn FnMut(usize, &[Individual]),
    ) -> acqopt::Result<Vec<Individual>> {
        let genomes: Vec<Vec<Gene>> = (0..self.pop_size)
            .map(|_| {
                problem
                    .variables()
                    .iter()
                    .map(|v| match v {
                        Variable::Real(RealDomain { low, high }) => Gene::Real(low + rng.f64() * (high - low)),
                        Variable::Index(IndexDomain { n_values }) => Gene::Index(rng.usize(..*n_values)),
                        Variable::Choice(ChoiceDomain { n_choices }) => Gene::Choice(rng.usize(..*n_choices)),
                    })
                    .collect()
            })
            .collect();
        let mut population = evaluate_population(problem, genomes)?;
        sort_population(&mut population);
        observer(0, &population);
        Ok(population)
    }
}

/// Sphere in `dims` dimensions centered at `center`.
struct Sphere {
    variables: Vec<Variable>,
    center: f64,
}

impl Problem for Sphere {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn n_constraints(&self) -> usize {
        0
    }

    fn evaluate(&self, genomes: &[Vec<Gene>]) -> acqopt::Result<Evaluation> {
        let objectives = genomes
            .iter()
            .map(|g| {
                g.iter()
                    .map(|gene| match gene {
                        Gene::Real(v) => (v - self.center).powi(2),
                        Gene::Index(i) | Gene::Choice(i) => *i as f64,
                    })
                    .sum()
            })
            .collect();
        Ok(Evaluation {
            objectives,
            constraints: None,
        })
    }
}

fn sphere(dims: usize) -> Sphere {
    Sphere {
        variables: vec![Variable::Real(RealDomain { low: -5.0, high: 5.0 }); dims],
        center: 1.5,
    }
}

#[test]
fn differential_evolution_strategies_minimize_a_sphere() {
    let problem = sphere(3);
    for strategy in [
        DifferentialEvolutionStrategy::Rand1,
        DifferentialEvolutionStrategy::Best1,
        DifferentialEvolutionStrategy::CurrentToBest1,
    ] {
        let de = DifferentialEvolution::new(20).with_config(DifferentialEvolutionConfig {
            strategy,
            ..DifferentialEvolutionConfig::default()
        });
        let mut rng = fastrand::Rng::with_seed(10);
        let population = de
            .minimize(
                &problem,
                Termination::Generations(120),
                &mut rng,
                &mut |_: usize, _: &[Individual]| {},
            )
            .unwrap();
        assert_eq!(population.len(), 20);
        assert!(
            population[0].objective < 5e-2,
            "{strategy:?}: {}",
            population[0].objective
        );
    }
}

#[test]
fn generic_backend_runs_differential_evolution_by_default() {
    let space = ParameterSpace::new(vec![
        Parameter::continuous("x", -2.0, 2.0).unwrap(),
        Parameter::discrete("k", [0.0, 1.0, 2.0, 3.0]).unwrap(),
        Parameter::categorical("arm", ["left", "right"]).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .backend(BackendKind::GenericPopulation)
        .pop_size(24)
        .max_generations(60)
        .batch_size(2)
        .seed(13)
        .build()
        .unwrap();
    assert_eq!(optimizer.config().algorithm, AlgorithmKind::DifferentialEvolution);

    // Relaxed layout: [(x + 2) / 4, k / 3, left, right]; peak at x = 1, k = 2, right.
    let acqf = Pointwise(|x: &[f64]| -(x[0] - 0.75).powi(2) - (x[1] - 2.0 / 3.0).abs() + x[3]);
    let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();

    assert!(!batch.is_empty());
    let best = &batch[0];
    assert_eq!(best.get("k"), Some(&ParamValue::Float(2.0)));
    assert_eq!(best.get("arm"), Some(&ParamValue::from("right")));
    let x = best.get("x").and_then(ParamValue::as_f64).unwrap();
    assert!((x - 1.0).abs() < 0.1, "x = {x}");
}

#[test]
fn custom_algorithms_plug_into_the_facade() {
    let space = ParameterSpace::new(vec![
        Parameter::continuous("x", 0.0, 1.0).unwrap(),
        Parameter::categorical("c", ["a", "b", "c"]).unwrap(),
    ])
    .unwrap();
    let optimizer = AcquisitionOptimizer::builder(space)
        .custom_algorithm(RandomSearch { pop_size: 50 })
        .pop_size(50)
        .batch_size(5)
        .save_history(true)
        .seed(1)
        .build()
        .unwrap();
    assert_eq!(optimizer.config().backend, BackendKind::GenericPopulation);

    let acqf = Pointwise(|x: &[f64]| x[0]);
    let constraints = KnownConstraints::new().with(|p: &[ParamValue]| p[1].as_str() != Some("b"));
    let report = optimizer.optimize_with_report(&acqf, &constraints, &[]).unwrap();

    assert_eq!(report.n_candidates, 50);
    assert_eq!(report.n_evals, 50);
    assert_eq!(report.batch.len(), 5);
    assert!(report.batch.iter().all(|p| constraints.is_feasible(p)));
    let xs: Vec<f64> = report.batch.iter().map(|p| p.values()[0].as_f64().unwrap()).collect();
    assert!(xs.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(report.history.unwrap().len(), 1);
}

#[test]
fn acquisition_problem_negates_scores_and_reports_margins() {
    let space = Arc::new(
        ParameterSpace::new(vec![
            Parameter::continuous("x", 0.0, 4.0).unwrap(),
            Parameter::categorical("c", ["a", "b"]).unwrap(),
        ])
        .unwrap(),
    );
    let encoder = Encoder::new(space);
    let acqf = Pointwise(|x: &[f64]| 10.0 * x[0] + x[2]);
    let objective = acqopt::acquisition::MinimizationObjective::new(&acqf, 4);
    let constraints = KnownConstraints::new().with(|p: &[ParamValue]| p[1].as_str() == Some("a"));
    let problem = AcquisitionProblem::new(&encoder, &objective, &constraints);

    assert_eq!(problem.variables().len(), 2);
    assert_eq!(problem.n_constraints(), 1);

    let evaluation = problem
        .evaluate(&[
            vec![Gene::Real(2.0), Gene::Choice(0)],
            vec![Gene::Real(4.0), Gene::Choice(1)],
        ])
        .unwrap();
    assert_eq!(evaluation.objectives, vec![-5.0, -11.0]);
    assert_eq!(evaluation.constraints, Some(vec![-2.0, 2.0]));
    assert_eq!(problem.n_evals(), 2);

    let decoded = problem.decode(&[Gene::Real(4.0), Gene::Choice(1)]).unwrap();
    assert_eq!(decoded.get("c"), Some(&ParamValue::from("b")));

    let strict = AcquisitionProblem::new(&encoder, &objective, &constraints)
        .with_policy(PenaltyPolicy::ViolationCount { scale: 3.0 });
    let evaluation = strict
        .evaluate(&[vec![Gene::Real(0.0), Gene::Choice(1)]])
        .unwrap();
    assert_eq!(evaluation.constraints, Some(vec![3.0]));
}

#[test]
fn problem_errors_propagate_out_of_the_algorithm() {
    let problem = sphere(2);
    let genomes = vec![vec![Gene::Real(0.0), Gene::Real(0.0)]];
    let population = evaluate_population(&problem, genomes).unwrap();
    assert_eq!(population[0].objective, 4.5);
    assert!(population[0].is_feasible());

    struct Broken;
    impl Problem for Broken {
        fn variables(&self) -> &[Variable] {
            &[]
        }
        fn n_constraints(&self) -> usize {
            0
        }
        fn evaluate(&self, _genomes: &[Vec<Gene>]) -> acqopt::Result<Evaluation> {
            Ok(Evaluation {
                objectives: Vec::new(),
                constraints: None,
            })
        }
    }
    let err = GeneticAlgorithm::new(4)
        .minimize(
            &Broken,
            Termination::Generations(1),
            &mut fastrand::Rng::with_seed(0),
            &mut |_: usize, _: &[Individual]| {},
        )
        .unwrap_err();
    assert!(matches!(err, Error::AcquisitionShape { .. }));
}

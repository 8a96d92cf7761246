//!
//! End to end inference on simulated ribosome profiling reads
//!
#[macro_use]
extern crate approx;

use riboem::inference::{CodonInference, InferenceParams};
use riboem::matrix::ReadObservation;
use riboem::mocks::{mock_fixed_model, mock_profile_model, sim_reads};
use riboem::orf::OrfIndex;
use riboem::region::{Region, Strand};
use test_case::test_case;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test_case(1)]
#[test_case(7)]
#[test_case(42)]
fn recovers_simulated_sites(seed: u64) {
    init();
    // strong site at 100, weak site at 130
    let sites = [(100, 8.0), (130, 2.0)];
    let reads = sim_reads(&sites, 200, seed);
    let inference = CodonInference::new(vec![mock_profile_model()], InferenceParams::default());
    let result = inference.infer(Strand::Plus, &reads).unwrap();
    println!("em: {}", result.em);
    println!("regularization: {}", result.regularization.unwrap());

    let total: f64 = result.codons.iter().map(|c| c.total_activity).sum();
    assert_abs_diff_eq!(total, 200.0, epsilon = 1e-6);

    let best = result
        .codons
        .iter()
        .max_by(|a, b| a.total_activity.partial_cmp(&b.total_activity).unwrap())
        .unwrap();
    assert_eq!(best.region, Region::new(100, 103));
    assert!(best.total_activity > 120.0);

    let weak = result
        .codons
        .iter()
        .find(|c| c.region == Region::new(130, 133))
        .expect("weak site must survive");
    assert!(weak.total_activity > 10.0);

    for c in result.codons.iter() {
        assert!(c.goodness.is_finite());
        assert_eq!(c.activity.len(), 1);
    }
}

#[test]
fn leading_mismatch_reads_use_the_shifted_profile() {
    init();
    // a mismatch read one base upstream lands on the same codon
    let reads = vec![
        ReadObservation::new(Region::new(88, 116), false, vec![6.0]),
        ReadObservation::new(Region::new(87, 115), true, vec![4.0]),
    ];
    let inference = CodonInference::new(
        vec![mock_profile_model()],
        InferenceParams::without_regularization(),
    );
    let result = inference.infer(Strand::Plus, &reads).unwrap();
    let best = result
        .codons
        .iter()
        .max_by(|a, b| a.total_activity.partial_cmp(&b.total_activity).unwrap())
        .unwrap();
    assert_eq!(best.region, Region::new(100, 103));
    assert!(best.total_activity > 6.0);
}

#[test]
fn fixed_offset_rule_is_unambiguous() {
    init();
    let reads = vec![
        ReadObservation::new(Region::new(88, 116), false, vec![3.0]),
        ReadObservation::new(Region::new(91, 119), false, vec![5.0]),
    ];
    let inference = CodonInference::new(vec![mock_fixed_model()], InferenceParams::default());
    let result = inference.infer(Strand::Plus, &reads).unwrap();
    // offset 12: codons at 100 and 103, no ambiguity to resolve
    assert_eq!(result.codons.len(), 2);
    assert_eq!(result.em.iterations, 2);
    let by_region = |start: usize| {
        result
            .codons
            .iter()
            .find(|c| c.region == Region::new(start, start + 3))
            .unwrap()
            .total_activity
    };
    assert_abs_diff_eq!(by_region(100), 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(by_region(103), 5.0, epsilon = 1e-9);
}

#[test]
fn orf_filter_confines_codons_to_frame() {
    init();
    let sites = [(100, 5.0)];
    let reads = sim_reads(&sites, 100, 3);
    let orf: OrfIndex = vec![Region::new(91, 151)].into_iter().collect();
    let inference = CodonInference::new(vec![mock_profile_model()], InferenceParams::default())
        .with_orf_index(orf);
    let result = inference.infer(Strand::Plus, &reads).unwrap();
    for c in result.codons.iter() {
        assert_eq!((c.start() - 91) % 3, 0);
    }
    // site 100 is in frame of the interval starting at 91
    let best = result
        .codons
        .iter()
        .max_by(|a, b| a.total_activity.partial_cmp(&b.total_activity).unwrap())
        .unwrap();
    assert_eq!(best.region, Region::new(100, 103));
}

#[test]
fn joint_multi_condition_inference() {
    init();
    // condition 0 occupies the site at 100, condition 1 the site at 130,
    // condition 2 stays empty
    let mut reads = Vec::new();
    for obs in sim_reads(&[(100, 1.0)], 60, 11) {
        reads.push(ReadObservation::new(
            obs.region,
            obs.leading_mismatch,
            vec![1.0, 0.0, 0.0],
        ));
    }
    for obs in sim_reads(&[(130, 1.0)], 30, 12) {
        reads.push(ReadObservation::new(
            obs.region,
            obs.leading_mismatch,
            vec![0.0, 1.0, 0.0],
        ));
    }
    let models = vec![
        mock_profile_model(),
        mock_profile_model(),
        mock_profile_model(),
    ];
    let inference = CodonInference::new(models, InferenceParams::default());
    let result = inference.infer(Strand::Plus, &reads).unwrap();

    let site0 = result
        .codons
        .iter()
        .find(|c| c.region == Region::new(100, 103))
        .unwrap();
    let site1 = result
        .codons
        .iter()
        .find(|c| c.region == Region::new(130, 133))
        .unwrap();
    assert!(site0.activity[0] > 40.0);
    assert_abs_diff_eq!(site0.activity[1], 0.0, epsilon = 1e-9);
    assert!(site1.activity[1] > 20.0);
    assert_abs_diff_eq!(site1.activity[0], 0.0, epsilon = 1e-9);
    for c in result.codons.iter() {
        assert_abs_diff_eq!(c.activity[2], 0.0, epsilon = 1e-9);
    }
}

#[test]
fn minus_strand_windows_mirror_plus_strand() {
    init();
    // a minus strand read reports its codon from the 3' end
    let reads = vec![ReadObservation::new(Region::new(100, 128), false, vec![5.0])];
    let inference = CodonInference::new(
        vec![mock_profile_model()],
        InferenceParams::without_regularization(),
    );
    let result = inference.infer(Strand::Minus, &reads).unwrap();
    let regions: Vec<Region> = result.codons.iter().map(|c| c.region).collect();
    // offsets 11, 12, 13 reflected from 128
    assert_eq!(
        regions,
        vec![
            Region::new(112, 115),
            Region::new(113, 116),
            Region::new(114, 117)
        ]
    );
}

#[test]
fn windowed_parallel_inference() {
    init();
    let inference = CodonInference::new(vec![mock_profile_model()], InferenceParams::default());
    let windows: Vec<(Region, Strand, Vec<ReadObservation>)> = (0..4)
        .map(|i| {
            let base = 1000 * i;
            (
                Region::new(base, base + 200),
                Strand::Plus,
                sim_reads(&[(base + 100, 2.0)], 40, i as u64),
            )
        })
        .collect();
    let results = inference.infer_all(&windows);
    for result in results.iter() {
        let result = result.as_ref().unwrap();
        let best = result
            .codons
            .iter()
            .max_by(|a, b| a.total_activity.partial_cmp(&b.total_activity).unwrap())
            .unwrap();
        // window relative: the site sits at offset 100 of every window
        assert_eq!(best.region, Region::new(100, 103));
    }
}

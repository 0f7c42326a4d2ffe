use super::*;
use crate::events::*;
use crate::Arbitrary;
use crate::Distance;
use std::sync::Arc;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.)
}

/// events confined to a small patch so every ground distance stays
/// below the unit cutoff radius
fn boxed(n: usize) -> Event<2> {
    Event::from(
        (0..n)
            .map(|_| {
                (
                    rand::random::<f64>(),
                    [
                        0.35 * rand::random::<f64>(),
                        0.35 * rand::random::<f64>(),
                    ],
                )
            })
            .collect::<Vec<_>>(),
    )
}

#[test]
fn is_symmetric_even_with_unequal_totals() {
    let mut emd = EMD::<_, 2>::new(Euclidean);
    for _ in 0..8 {
        let lhs = Event::<2>::random();
        let rhs = Event::<2>::random();
        let ab = emd.compute(&lhs, &rhs).unwrap();
        let ba = emd.compute(&rhs, &lhs).unwrap();
        assert!(close(ab, ba));
    }
}

#[test]
fn vanishes_between_an_event_and_itself() {
    let mut emd = EMD::<_, 2>::new(Euclidean);
    for _ in 0..4 {
        let event = Event::<2>::random();
        assert!(close(emd.compute(&event, &event).unwrap(), 0.));
    }
}

#[test]
fn balancing_always_satisfies_the_solver() {
    // any imbalance that survived assembly would come back SupplyMismatch
    use crate::transport::Status;
    let mut emd = EMD::<_, 2>::new(Euclidean);
    for _ in 0..16 {
        let lhs = Event::<2>::random();
        let rhs = boxed(3);
        emd.compute(&lhs, &rhs).unwrap();
        assert_eq!(emd.status(), Status::Success);
        assert_ne!(emd.side(), Side::Neither);
    }
}

#[test]
fn respects_the_triangle_inequality_at_unit_beta() {
    // a genuine metric needs equal totals and beta one
    let mut emd = EMD::<_, 2>::new(Euclidean);
    for _ in 0..8 {
        let a = Event::<2>::random().normalized();
        let b = Event::<2>::random().normalized();
        let c = Event::<2>::random().normalized();
        let ab = emd.compute(&a, &b).unwrap();
        let bc = emd.compute(&b, &c).unwrap();
        let ac = emd.compute(&a, &c).unwrap();
        assert!(ac <= ab + bc + 1e-9);
    }
}

#[test]
fn normalized_values_stay_in_the_unit_interval() {
    let config = Config {
        norm: true,
        ..Config::default()
    };
    for beta in [1., 2.] {
        let config = Config { beta, ..config.clone() };
        let mut emd = EMD::<_, 2>::from((Euclidean, config));
        for _ in 0..8 {
            let lhs = boxed(6);
            let rhs = boxed(9);
            let value = emd.compute(&lhs, &rhs).unwrap();
            assert!(0. <= value && value <= 1.);
        }
    }
}

#[test]
fn pairwise_matches_single_computations() {
    let events = (0..6).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::new(Euclidean).threads(2);
    driver.compute(events.clone()).unwrap();
    let mut single = EMD::<_, 2>::new(Euclidean);
    for i in 0..events.len() {
        for j in 0..i {
            let expected = single.compute(&events[i], &events[j]).unwrap();
            assert_eq!(driver.emd(i, j), expected);
            assert_eq!(driver.emd(j, i), expected);
        }
    }
}

#[test]
fn storage_layouts_agree() {
    let events = (0..5).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut flattened = Pairwise::new(Euclidean).storage(Storage::FlattenedSymmetric);
    let mut full = Pairwise::new(Euclidean).storage(Storage::Full);
    let mut mirrored = Pairwise::new(Euclidean).storage(Storage::FullSymmetric);
    flattened.compute(events.clone()).unwrap();
    full.compute(events.clone()).unwrap();
    mirrored.compute(events.clone()).unwrap();
    for i in 0..events.len() {
        for j in 0..events.len() {
            assert_eq!(flattened.emd(i, j), full.emd(i, j));
            assert_eq!(full.emd(i, j), mirrored.emd(i, j));
            assert_eq!(full.emd(i, j), full.emd(j, i));
        }
        assert_eq!(full.emd(i, i), 0.);
    }
}

#[test]
fn cross_sweeps_match_single_computations() {
    let lhs = (0..3).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let rhs = (0..4).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::new(Euclidean).storage(Storage::Full);
    driver.compute_cross(lhs.clone(), rhs.clone()).unwrap();
    assert_eq!(driver.neva(), 3);
    assert_eq!(driver.nevb(), 4);
    assert_eq!(driver.pairs(), 12);
    let mut single = EMD::<_, 2>::new(Euclidean);
    for i in 0..lhs.len() {
        for j in 0..rhs.len() {
            let expected = single.compute(&lhs[i], &rhs[j]).unwrap();
            assert_eq!(driver.emd(i, j), expected);
        }
    }
}

#[test]
fn tagging_counts_failures_and_completes() {
    // a zero pivot cap fails every nonempty pair deterministically
    let config = Config {
        n_iter_max: 0,
        ..Config::default()
    };
    let events = (0..4).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::from((Euclidean, config)).on_error(OnError::Tag);
    driver.compute(events).unwrap();
    assert!(driver.done());
    assert_eq!(driver.failures(), driver.pairs());
    assert!(driver.emds().iter().all(|v| v.is_nan()));
    assert_eq!(driver.min(), Distance::INFINITY);
}

#[test]
fn aborting_surfaces_the_failing_pair() {
    let config = Config {
        n_iter_max: 0,
        ..Config::default()
    };
    let events = (0..4).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::from((Euclidean, config));
    let error = driver.compute(events).unwrap_err();
    assert_eq!(error.status(), Some(crate::transport::Status::MaxIterReached));
    assert!(matches!(error, Error::Solver { pair: Some(_), .. }));
    assert!(!driver.done());
}

#[test]
fn external_storage_streams_every_value() {
    let events = (0..5).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let histogram = Arc::new(Histogram::new(8, 0., 4.));
    let mut driver = Pairwise::new(Euclidean)
        .storage(Storage::External)
        .handler(Arc::clone(&histogram));
    driver.compute(events).unwrap();
    assert_eq!(driver.pairs(), 10);
    assert_eq!(histogram.total(), 10.);
    assert!(driver.emds().is_empty());
}

#[test]
fn rejects_invalid_mode_combinations() {
    let events = (0..3).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::new(Euclidean).storage(Storage::FlattenedSymmetric);
    let error = driver.compute_cross(events.clone(), events.clone()).unwrap_err();
    assert!(matches!(error, Error::Mode(_)));
    let mut driver = Pairwise::new(Euclidean).storage(Storage::External);
    let error = driver.compute(events.clone()).unwrap_err();
    assert!(matches!(error, Error::Mode(_)));
    let mut driver = Pairwise::new(Euclidean).handler(Histogram::new(2, 0., 1.));
    let error = driver.compute(events.clone()).unwrap_err();
    assert!(matches!(error, Error::Mode(_)));
}

#[test]
fn preprocessors_run_once_per_event() {
    // translated copies of one shape collapse to zero once centered
    let shape = vec![(1., [0., 0.]), (2., [1., 0.]), (1., [0., 1.])];
    let events = (0..4)
        .map(|k| {
            let dx = k as f64 * 10.;
            Event::from(
                shape
                    .iter()
                    .map(|(w, [x, y])| (*w, [x + dx, y - dx]))
                    .collect::<Vec<_>>(),
            )
        })
        .collect::<Vec<_>>();
    let mut driver = Pairwise::new(Euclidean).preprocess(Center);
    driver.compute(events).unwrap();
    assert!(driver.emds().iter().all(|v| v.abs() < 1e-9));
}

#[test]
fn min_and_max_scan_stored_values() {
    let events = vec![
        Event::from(vec![(1., [0.])]),
        Event::from(vec![(1., [1.])]),
        Event::from(vec![(1., [3.])]),
    ];
    let config = Config {
        r: 10.,
        ..Config::default()
    };
    let mut driver = Pairwise::from((Euclidean, config));
    driver.compute(events).unwrap();
    assert!(close(driver.min(), 1.));
    assert!(close(driver.max(), 3.));
    assert!(close(driver.emd(2, 1), 2.));
}

#[test]
fn chains_into_external_distances() {
    // the emds of one sweep become the ground distances of a coarser
    // problem over the same collection
    let events = (0..4).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    let mut driver = Pairwise::new(Euclidean);
    driver.compute(events).unwrap();
    let externals = Externals::triangular(4, driver.emds().to_vec()).unwrap();
    let mut emd = EMD::<_, 0>::new(externals);
    let value = emd.compute_weighted(&[1., 0., 0., 0.], &[0., 0., 0., 1.]).unwrap();
    assert_eq!(value, driver.emd(0, 3));
}

#[test]
fn drivers_reset_between_sweeps() {
    let mut driver = Pairwise::new(Euclidean);
    let first = (0..5).map(|_| Event::<2>::random()).collect::<Vec<_>>();
    driver.compute(first).unwrap();
    assert_eq!(driver.pairs(), 10);
    let second = vec![
        Event::from(vec![(1., [0., 0.])]),
        Event::from(vec![(1., [1., 0.])]),
    ];
    driver.compute(second).unwrap();
    assert_eq!(driver.pairs(), 1);
    assert_eq!(driver.emds().len(), 1);
    assert!(close(driver.emd(1, 0), 1.));
}

#[test]
fn saves_a_readable_dump() {
    use byteorder::LittleEndian;
    use byteorder::ReadBytesExt;
    use std::io::Read;
    let events = vec![
        Event::from(vec![(1., [0.])]),
        Event::from(vec![(1., [1.])]),
        Event::from(vec![(1., [3.])]),
    ];
    let config = Config {
        r: 10.,
        ..Config::default()
    };
    let mut driver = Pairwise::from((Euclidean, config));
    driver.compute(events).unwrap();
    let path = std::env::temp_dir().join(format!("emds.{}.bin", std::process::id()));
    let path = path.to_str().expect("utf8 temp path");
    driver.save(path);
    let ref mut file = std::fs::File::open(path).expect("dump exists");
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).expect("magic");
    assert_eq!(&magic, b"EMDS");
    assert_eq!(file.read_u8().expect("tag"), 2);
    assert_eq!(file.read_u64::<LittleEndian>().expect("neva"), 3);
    assert_eq!(file.read_u64::<LittleEndian>().expect("nevb"), 3);
    assert_eq!(file.read_u64::<LittleEndian>().expect("length"), 3);
    for expected in driver.emds() {
        let value = file.read_f64::<LittleEndian>().expect("value");
        assert_eq!(value, *expected);
    }
    let mut rest = Vec::new();
    file.read_to_end(&mut rest).expect("eof");
    assert!(rest.is_empty());
    std::fs::remove_file(path).expect("cleanup");
}

//! Integration tests for the similarity pipeline.
//!
//! These run the loader, matrix builder, engine, store and query together
//! on small but realistic exports.

use data_loader::{InteractionLog, ProductId, UserId};
use similarity::{
    Execution, SimilarityError, UserFeatureMatrix, compute_similarity, store, top_similar,
    top_similar_excluding_self, train, train_with,
};
use std::sync::Arc;
use std::thread;

const SCENARIO: &str = r#"{
    "views": { "u1": { "p1": { "viewCount": 5 } } },
    "purchases": {},
    "ratings": {
        "u1": { "p1": { "rating": 4 } },
        "u2": { "p1": { "rating": 1 } }
    }
}"#;

/// A shop with 60 users and 25 products; users 50.. only carry zero ratings
fn shop_export() -> String {
    let mut views = Vec::new();
    let mut purchases = Vec::new();
    let mut ratings = Vec::new();

    for user in 0..60u64 {
        let mut user_views = Vec::new();
        let mut user_purchases = Vec::new();
        let mut user_ratings = Vec::new();

        for product in 0..25u64 {
            let seed = (user * 31 + product * 17) % 29;
            if seed % 3 == 0 {
                user_views.push(format!(r#""{product}": {{ "viewCount": {} }}"#, seed + 1));
            }
            if seed % 7 == 0 {
                user_purchases.push(format!(r#""{product}": {{ "purchaseCount": {} }}"#, seed % 4));
            }
            if seed % 5 == 0 {
                // Users 50.. only leave zero ratings, so they end up with zero vectors
                let rating = if user >= 50 { 0.0 } else { (seed / 5) as f64 + 1.0 };
                user_ratings.push(format!(r#""{product}": {{ "rating": {rating} }}"#));
            }
        }

        if user < 50 {
            views.push(format!(r#""{user}": {{ {} }}"#, user_views.join(", ")));
            purchases.push(format!(r#""{user}": {{ {} }}"#, user_purchases.join(", ")));
        }
        ratings.push(format!(r#""{user}": {{ {} }}"#, user_ratings.join(", ")));
    }

    format!(
        r#"{{ "views": {{ {} }}, "purchases": {{ {} }}, "ratings": {{ {} }} }}"#,
        views.join(", "),
        purchases.join(", "),
        ratings.join(", ")
    )
}

#[test]
fn test_worked_example() {
    let log = InteractionLog::from_json_str(SCENARIO).unwrap();
    let matrix = UserFeatureMatrix::from_log(&log).unwrap();

    assert_eq!(matrix.user_count(), 2);
    assert_eq!(matrix.product_count(), 1);
    assert_eq!(matrix.users(), &[UserId::new("u1"), UserId::new("u2")]);
    assert_eq!(matrix.products(), &[ProductId::new("p1")]);
    assert_eq!(matrix.user_vector(0).unwrap(), vec![5.0, 0.0, 4.0]);
    assert_eq!(matrix.user_vector(1).unwrap(), vec![0.0, 0.0, 1.0]);

    let sim = compute_similarity(&matrix);
    let expected = 4.0 / 41.0_f64.sqrt();
    assert!((sim.get(0, 1).unwrap() - expected).abs() < 1e-12);
    assert!((sim.get(0, 1).unwrap() - 0.6247).abs() < 1e-4);
    assert_eq!(sim.get(0, 1).unwrap(), sim.get(1, 0).unwrap());
    assert_eq!(sim.get(0, 0).unwrap(), 1.0);
    assert_eq!(sim.get(1, 1).unwrap(), 1.0);

    assert_eq!(top_similar(&sim, 1, 10).unwrap(), vec![1, 0]);
    assert_eq!(top_similar_excluding_self(&sim, 1, 10).unwrap(), vec![0]);
}

#[test]
fn test_all_empty_inputs() {
    let log = InteractionLog::from_json_str(r#"{ "views": null, "purchases": null, "ratings": null }"#)
        .unwrap();
    let matrix = UserFeatureMatrix::from_log(&log).unwrap();
    assert_eq!(matrix.user_count(), 0);
    assert_eq!(matrix.product_count(), 0);

    let sim = compute_similarity(&matrix);
    assert!(sim.is_empty());
    for index in [0, 1, 100] {
        assert!(matches!(
            top_similar(&sim, index, 10),
            Err(SimilarityError::EmptyModel)
        ));
    }
}

#[test]
fn test_every_observed_pair_appears_once() {
    let log = InteractionLog::from_json_str(&shop_export()).unwrap();
    let matrix = UserFeatureMatrix::from_log(&log).unwrap();

    let records = log.records();
    let mut users: Vec<&UserId> = records.iter().map(|r| r.user()).collect();
    let mut products: Vec<&ProductId> = records.iter().map(|r| r.product()).collect();
    users.sort();
    users.dedup();
    products.sort();
    products.dedup();

    // Union of ids across the logs, in natural order
    assert_eq!(matrix.users().iter().collect::<Vec<_>>(), users);
    assert_eq!(matrix.products().iter().collect::<Vec<_>>(), products);

    // Each record's value lands in its own cell
    for (user, products) in log.views() {
        let row = matrix.user_position(user).unwrap();
        for (product, &count) in products {
            let col = matrix.product_position(product).unwrap();
            assert_eq!(matrix.cell(row, col).unwrap().view_count, count);
        }
    }
    for (user, products) in log.purchases() {
        let row = matrix.user_position(user).unwrap();
        for (product, &count) in products {
            let col = matrix.product_position(product).unwrap();
            assert_eq!(matrix.cell(row, col).unwrap().purchase_count, count);
        }
    }
    for (user, products) in log.ratings() {
        let row = matrix.user_position(user).unwrap();
        for (product, &rating) in products {
            let col = matrix.product_position(product).unwrap();
            assert_eq!(matrix.cell(row, col).unwrap().rating, rating);
        }
    }
}

#[test]
fn test_similarity_properties_on_shop() {
    let log = InteractionLog::from_json_str(&shop_export()).unwrap();
    let artifact = train(&log).unwrap();
    let sim = artifact.similarity();
    let n = sim.len();
    assert_eq!(n, 60);

    for i in 0..n {
        let zero_row = i >= 50;
        for j in 0..n {
            let value = sim.get(i, j).unwrap();
            assert_eq!(value, sim.get(j, i).unwrap(), "asymmetric at ({i}, {j})");
            assert!((-1.0..=1.0).contains(&value));
            if zero_row || j >= 50 {
                assert_eq!(value, 0.0, "zero-vector pair ({i}, {j}) must be 0");
            }
        }
        if !zero_row {
            assert_eq!(sim.get(i, i).unwrap(), 1.0);
        }
    }
}

#[test]
fn test_top_n_ordering_on_shop() {
    let log = InteractionLog::from_json_str(&shop_export()).unwrap();
    let artifact = train(&log).unwrap();
    let sim = artifact.similarity();

    for user in [0, 17, 49, 55] {
        for n in [0, 1, 5, 60, 500] {
            let top = top_similar(sim, user, n).unwrap();
            assert_eq!(top.len(), n.min(sim.len()));

            let row = sim.row(user).unwrap();
            for pair in top.windows(2) {
                let (a, b) = (row[pair[0]], row[pair[1]]);
                assert!(a > b || (a == b && pair[0] < pair[1]));
            }
        }
    }

    assert!(matches!(
        top_similar(sim, 60, 5),
        Err(SimilarityError::InvalidIndex { index: 60, len: 60 })
    ));
    assert!(matches!(
        sim.checked_index(-3),
        Err(SimilarityError::InvalidIndex { index: -3, .. })
    ));
}

#[test]
fn test_training_is_deterministic() {
    let export = shop_export();
    let first = train_with(&InteractionLog::from_json_str(&export).unwrap(), Execution::Sequential)
        .unwrap();
    let second = train_with(&InteractionLog::from_json_str(&export).unwrap(), Execution::Parallel)
        .unwrap();

    assert_eq!(first.users(), second.users());
    let bits = |values: &[f64]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(
        bits(first.similarity().values()),
        bits(second.similarity().values())
    );
}

#[test]
fn test_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    for export in [SCENARIO.to_string(), shop_export(), "{}".to_string()] {
        let artifact = train(&InteractionLog::from_json_str(&export).unwrap()).unwrap();
        let path = dir.path().join("recommendation_model.bin");

        store::save(&artifact, &path).unwrap();
        let loaded = store::load(&path).unwrap();
        assert_eq!(loaded, artifact);
    }
}

#[test]
fn test_concurrent_readers_share_one_model() {
    let log = InteractionLog::from_json_str(&shop_export()).unwrap();
    let artifact = Arc::new(train(&log).unwrap());

    let expected: Vec<Vec<usize>> = (0..artifact.user_count())
        .map(|user| top_similar(artifact.similarity(), user, 10).unwrap())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let artifact = Arc::clone(&artifact);
            thread::spawn(move || {
                (0..artifact.user_count())
                    .filter(|user| user % 8 == worker)
                    .map(|user| (user, top_similar(artifact.similarity(), user, 10).unwrap()))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for (user, top) in handle.join().unwrap() {
            assert_eq!(top, expected[user]);
        }
    }
}

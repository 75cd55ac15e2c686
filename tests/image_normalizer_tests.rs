//! Integration coverage for the image normalizer (C1): deterministic
//! sampling indices and decode-failure passthrough.

use homescan_core::domain::Image;
use homescan_core::normalize::image::{
    classification_sample_indices, normalize, sample_for_checklist, sample_for_classification,
};

#[test]
fn sample_indices_match_the_declared_formula_for_ten_images() {
    // n=10, k=4 -> {0, 3, 6, 9}
    let indices = classification_sample_indices(10, 4);
    assert_eq!(indices, vec![0, 3, 6, 9]);
}

#[test]
fn sample_indices_return_everything_when_n_is_at_or_below_k() {
    assert_eq!(classification_sample_indices(3, 4), vec![0, 1, 2]);
    assert_eq!(classification_sample_indices(4, 4), vec![0, 1, 2, 3]);
}

#[test]
fn sample_indices_collapse_duplicates_for_small_n_above_k() {
    // n=5, k=4 -> {0, 1, 3, 4} (floor(5/3)=1, floor(10/3)=3)
    let indices = classification_sample_indices(5, 4);
    assert_eq!(indices, vec![0, 1, 3, 4]);
}

fn fake_images(n: usize) -> Vec<Image> {
    (0..n)
        .map(|i| Image::new(format!("not-a-real-image-{i}").into_bytes(), Some("kitchen".to_string()), i))
        .collect()
}

#[test]
fn normalize_passes_through_undecodable_bytes_unchanged() {
    let bytes = b"definitely not an image";
    let out = normalize(bytes, 512, 80);
    assert_eq!(out, bytes);
}

#[test]
fn sample_for_classification_picks_the_deterministic_subset() {
    let images = fake_images(10);
    let sampled = sample_for_classification(&images, 4, 512, 80);

    assert_eq!(sampled.len(), 4);
    let origins: Vec<usize> = sampled.iter().map(|i| i.origin_index).collect();
    assert_eq!(origins, vec![0, 3, 6, 9]);
}

#[test]
fn sample_for_classification_returns_all_when_fewer_than_k() {
    let images = fake_images(2);
    let sampled = sample_for_classification(&images, 4, 512, 80);
    assert_eq!(sampled.len(), 2);
}

#[test]
fn sample_for_checklist_takes_the_first_k_in_order() {
    let images = fake_images(10);
    let sampled = sample_for_checklist(&images, 3, 512, 80);

    let origins: Vec<usize> = sampled.iter().map(|i| i.origin_index).collect();
    assert_eq!(origins, vec![0, 1, 2]);
}

#[test]
fn sample_for_checklist_returns_all_when_fewer_than_k() {
    let images = fake_images(2);
    let sampled = sample_for_checklist(&images, 5, 512, 80);
    assert_eq!(sampled.len(), 2);
}

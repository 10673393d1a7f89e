//! Extraction plus interpolation through the facade.

use forcing_io::{
    read_field, read_points, ForcingError, GeometryModel, InterpolationMethod, OpenOptions,
    ReaderConfig, SurfexFile, VariableDescriptor, WeightCache,
};
use test_utils::{assert_approx_eq, assert_values_eq, scratch_dir, slot_blocks, CardDeckBuilder};

/// 2x2 regular grid over the unit square holding `1 + 2 lon + 3 lat`.
fn unit_square(dir: &std::path::Path) -> std::path::PathBuf {
    CardDeckBuilder::new()
        .lonlat_reg((0.0, 0.0, 1.0, 1.0), 2, 2)
        .floats("SST", &[1.0, 3.0, 4.0, 6.0])
        .tile_floats("NATURE", "TG1", &slot_blocks(4, 2))
        .write(dir, "PGD.txt")
        .unwrap()
}

fn targets() -> GeometryModel {
    GeometryModel::points(vec![0.5, 0.25], vec![0.5, 0.75]).unwrap()
}

#[test]
fn test_linear_points() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new()).unwrap();

    let (field, interpolator) = file
        .points(
            &VariableDescriptor::new("SST"),
            &targets(),
            InterpolationMethod::Linear,
            None,
        )
        .unwrap();
    assert_eq!(field.shape(), (1, 2));
    assert_approx_eq!(field.values()[[0, 0]], 3.5, 1e-12);
    assert_approx_eq!(field.values()[[0, 1]], 3.75, 1e-12);
    assert!(interpolator.flagged_points().is_empty());
    assert_eq!(interpolator.source().npoints(), 4);
}

#[test]
fn test_patch_blocks_are_remapped_independently() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new()).unwrap();

    let var = VariableDescriptor::new("TG1").with_tile("NATURE");
    let (field, _) = file
        .points(&var, &targets(), InterpolationMethod::Linear, None)
        .unwrap();
    assert_eq!(field.shape(), (1, 4));
    // block b holds 100 b + k on the 2x2 grid
    assert_approx_eq!(field.values()[[0, 0]], 1.5, 1e-12);
    assert_approx_eq!(field.values()[[0, 2]], 101.5, 1e-12);
}

#[test]
fn test_weight_cache_reuse() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new()).unwrap();
    let mut cache = WeightCache::new(ReaderConfig::default().weight_cache_entries);
    let var = VariableDescriptor::new("SST");

    let (first, _) = file
        .points(&var, &targets(), InterpolationMethod::Linear, Some(&mut cache))
        .unwrap();
    let (second, _) = file
        .points(&var, &targets(), InterpolationMethod::Linear, Some(&mut cache))
        .unwrap();
    assert!(first.same_values(&second));

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(cache.len(), 1);

    file.points(&var, &targets(), InterpolationMethod::Nearest, Some(&mut cache))
        .unwrap();
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_nearest_and_identity_on_own_grid() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new()).unwrap();
    let own = file.geometry().clone();
    let var = VariableDescriptor::new("SST");

    let (nearest, _) = file
        .points(&var, &own, InterpolationMethod::Nearest, None)
        .unwrap();
    assert_values_eq!(nearest.values(), [1.0, 3.0, 4.0, 6.0]);

    let (identity, _) = file
        .points(&var, &own, InterpolationMethod::Identity, None)
        .unwrap();
    assert!(identity.same_values(&nearest));

    let err = file
        .points(&var, &targets(), InterpolationMethod::Identity, None)
        .unwrap_err();
    assert!(matches!(err, ForcingError::GeometryMismatch(_)));
}

#[test]
fn test_outside_targets_are_flagged() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new()).unwrap();

    let outside = GeometryModel::points(vec![0.5, 5.0], vec![0.5, 5.0]).unwrap();
    let (field, interpolator) = file
        .points(
            &VariableDescriptor::new("SST"),
            &outside,
            InterpolationMethod::Linear,
            None,
        )
        .unwrap();
    assert_eq!(interpolator.flagged_points(), &[1]);
    assert_approx_eq!(field.values()[[0, 0]], 3.5, 1e-12);
    assert_eq!(field.values()[[0, 1]], 6.0);
}

#[test]
fn test_one_shot_helpers() {
    let dir = scratch_dir().unwrap();
    let path = unit_square(dir.path());
    let var = VariableDescriptor::new("SST");

    let (field, geometry) = read_field(&path, OpenOptions::new(), &var).unwrap();
    assert_eq!(geometry.npoints(), 4);
    assert_values_eq!(field.values(), [1.0, 3.0, 4.0, 6.0]);

    let mut cache = WeightCache::new(4);
    let (points, _) = read_points(
        &path,
        OpenOptions::new(),
        &var,
        &targets(),
        InterpolationMethod::Linear,
        Some(&mut cache),
    )
    .unwrap();
    assert_eq!(points.shape(), (1, 2));
    assert_eq!(cache.stats().misses, 1);

    let err = read_field(&path, OpenOptions::new(), &VariableDescriptor::new("NOPE")).unwrap_err();
    assert!(matches!(err, ForcingError::VariableNotFound(_)));
}

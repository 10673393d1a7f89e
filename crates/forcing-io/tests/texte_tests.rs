//! Fixed-width time-series text files.

use chrono::{DateTime, Duration, TimeZone, Utc};
use forcing_io::{
    ContainerFormat, ContentKind, ForcingError, GeometryModel, OpenOptions, SurfexFile,
    VariableDescriptor,
};
use test_utils::{assert_values_eq, encoded_rows, scratch_dir, write_texte};

fn basetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

fn two_points() -> GeometryModel {
    GeometryModel::points(vec![5.0, 6.0], vec![60.0, 61.0]).unwrap()
}

/// Two rows of two points by two patches, three values per line.
fn texte_file(dir: &std::path::Path) -> std::path::PathBuf {
    write_texte(dir, "ISBA_T2M.TXT", &encoded_rows(2, 4), 3).unwrap()
}

fn t2m() -> VariableDescriptor {
    VariableDescriptor::new("T2M")
        .with_patches(vec![0, 1])
        .with_basetime(basetime())
        .with_interval(Duration::hours(1))
}

#[test]
fn test_reads_all_rows() {
    let dir = scratch_dir().unwrap();
    let path = texte_file(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new().geometry(two_points())).unwrap();
    assert_eq!(file.kind(), ContentKind::TimeSeries);
    assert_eq!(file.format(), ContainerFormat::FixedWidthTimeSeries);

    let (field, _) = file.field(&t2m()).unwrap();
    assert_eq!(field.shape(), (2, 4));
    assert_eq!(
        field.times(),
        &[basetime() + Duration::hours(1), basetime() + Duration::hours(2)]
    );
    assert_values_eq!(field.values(), encoded_rows(2, 4).concat());
}

#[test]
fn test_filters_by_stamp() {
    let dir = scratch_dir().unwrap();
    let path = texte_file(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new().geometry(two_points())).unwrap();

    let var = t2m().with_valid_time(basetime() + Duration::hours(2));
    let (field, _) = file.field(&var).unwrap();
    assert_eq!(field.shape(), (1, 4));
    assert_values_eq!(field.values(), [1000.0, 1001.0, 1002.0, 1003.0]);

    // The file is rewound between reads
    let (again, _) = file.field(&var).unwrap();
    assert!(again.same_values(&field));

    let var = t2m().with_valid_time(basetime() + Duration::hours(5));
    let err = file.field(&var).unwrap_err();
    assert!(matches!(err, ForcingError::TimeNotFound(_)));
}

#[test]
fn test_row_must_end_a_line() {
    let dir = scratch_dir().unwrap();
    let path = texte_file(dir.path());
    let mut file = SurfexFile::open(&path, OpenOptions::new().geometry(two_points())).unwrap();

    // One patch gives a width of 2, but the first line holds 3 values
    let var = t2m().with_patches(vec![0]);
    let err = file.field(&var).unwrap_err();
    assert!(matches!(
        err,
        ForcingError::RowLengthMismatch {
            row_len: 2,
            line: 1,
            remaining: 1
        }
    ));
}

#[test]
fn test_requires_time_basis_and_geometry() {
    let dir = scratch_dir().unwrap();
    let path = texte_file(dir.path());

    let err = SurfexFile::open(&path, OpenOptions::new()).unwrap_err();
    assert!(matches!(err, ForcingError::MissingGeometry(_)));

    let mut file = SurfexFile::open(&path, OpenOptions::new().geometry(two_points())).unwrap();
    let var = VariableDescriptor::new("T2M").with_patches(vec![0, 1]);
    let err = file.field(&var).unwrap_err();
    assert!(matches!(err, ForcingError::MissingTimeBasis(_)));
}

#[test]
fn test_bad_token() {
    let dir = scratch_dir().unwrap();
    let path = dir.path().join("ISBA_T2M.TXT");
    std::fs::write(&path, "1.0 abc\n").unwrap();

    let mut file = SurfexFile::open(&path, OpenOptions::new().geometry(two_points())).unwrap();
    let var = VariableDescriptor::new("T2M")
        .with_basetime(basetime())
        .with_interval(Duration::hours(1));
    let err = file.field(&var).unwrap_err();
    assert!(matches!(err, ForcingError::TypeConversion { .. }));
}

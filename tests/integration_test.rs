use std::fs;
use std::path::{Path, PathBuf};

use specprep::{
    extract_spectrum_from_fits, preprocess_folder, FileOutcome, FitsLayout, JoinPair, JoinPoints,
    PrepErrorKind, ProcessOptions,
};
use tempfile::TempDir;

const BLOCK: usize = 2880;

/// Helper to build an 80 byte header card
fn card(s: &str) -> [u8; 80] {
    let mut buf = [b' '; 80];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    buf
}

fn push_header(out: &mut Vec<u8>, cards: &[String]) {
    for c in cards {
        out.extend(card(c));
    }
    out.extend(card("END"));
    while out.len() % BLOCK != 0 {
        out.push(b' ');
    }
}

/// One-row binary table holding `values` as a single vector cell, the way
/// SCAM files store a whole spectrum.
fn push_vector_table(out: &mut Vec<u8>, extname: &str, column: &str, values: &[f64]) {
    push_header(
        out,
        &[
            "XTENSION= 'BINTABLE'".into(),
            "BITPIX  =                    8".into(),
            "NAXIS   =                    2".into(),
            format!("NAXIS1  = {:>20}", 8 * values.len()),
            "NAXIS2  =                    1".into(),
            "PCOUNT  =                    0".into(),
            "GCOUNT  =                    1".into(),
            "TFIELDS =                    1".into(),
            format!("TTYPE1  = '{column}'"),
            format!("TFORM1  = '{}D'", values.len()),
            format!("EXTNAME = '{extname}'"),
        ],
    );
    for v in values {
        out.extend(v.to_be_bytes());
    }
    while out.len() % BLOCK != 0 {
        out.push(0);
    }
}

fn scam_bytes(wavelength: &[f64], reflectance: &[f64]) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(
        &mut out,
        &[
            "SIMPLE  =                    T".into(),
            "BITPIX  =                    8".into(),
            "NAXIS   =                    0".into(),
            "EXTEND  =                    T".into(),
        ],
    );
    push_vector_table(&mut out, "Spectra", "I_F_Atm", reflectance);
    push_vector_table(&mut out, "Wavelength", "Wavelength (um)", wavelength);
    out
}

fn asd_text(rows: &[(f64, f64)]) -> String {
    let mut s = String::from("ASD spectrum file\nintegration time: 17\n\nWavelength\tleaf.asd\n");
    for (x, y) in rows {
        s.push_str(&format!("{x}\t{y}\n"));
    }
    s
}

fn read_csv_rows(path: &Path) -> Vec<(f64, f64)> {
    let text = fs::read_to_string(path).expect("csv readable");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x,y"), "header of {}", path.display());
    lines
        .map(|l| {
            let (x, y) = l.split_once(',').expect("two columns");
            (x.parse().unwrap(), y.parse().unwrap())
        })
        .collect()
}

/// Creates `<tmp>/raw` and returns (tmp guard, raw dir)
fn raw_dir() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("raw");
    fs::create_dir(&raw).unwrap();
    (tmp, raw)
}

fn outcome_of<'a>(report: &'a specprep::ProcessReport, name: &str) -> &'a FileOutcome {
    &report
        .files
        .iter()
        .find(|f| f.input.file_name().and_then(|n| n.to_str()) == Some(name))
        .unwrap_or_else(|| panic!("{name} missing from report"))
        .outcome
}

#[test]
fn test_extract_scam_spectrum() {
    let (_tmp, raw) = raw_dir();
    let path = raw.join("scam_0001.fits");
    fs::write(&path, scam_bytes(&[0.4, 0.5, 0.6], &[0.11, 0.12, 0.13])).unwrap();

    let df = extract_spectrum_from_fits(&path, &FitsLayout::default()).unwrap();
    assert_eq!(df.shape(), (3, 2));
    let x: Vec<f64> = df.column("x").unwrap().f64().unwrap().into_no_null_iter().collect();
    let y: Vec<f64> = df.column("y").unwrap().f64().unwrap().into_no_null_iter().collect();
    assert_eq!(x, vec![0.4, 0.5, 0.6]);
    assert_eq!(y, vec![0.11, 0.12, 0.13]);
}

#[test]
fn test_extract_scam_errors() {
    let (_tmp, raw) = raw_dir();
    let path = raw.join("scam.fits");
    fs::write(&path, scam_bytes(&[0.4, 0.5], &[0.1])).unwrap();
    let err = extract_spectrum_from_fits(&path, &FitsLayout::default()).unwrap_err();
    assert_eq!(err.kind(), PrepErrorKind::Validation);

    let layout = FitsLayout {
        spectra_extension: "Radiance".into(),
        ..FitsLayout::default()
    };
    let err = extract_spectrum_from_fits(&path, &layout).unwrap_err();
    assert_eq!(err.kind(), PrepErrorKind::Fits);
    assert!(err.to_string().contains("Radiance"));

    let missing = raw.join("absent.fits");
    let err = extract_spectrum_from_fits(&missing, &FitsLayout::default()).unwrap_err();
    assert_eq!(err.kind(), PrepErrorKind::NotFound);
}

#[test]
fn test_process_folder() {
    let (tmp, raw) = raw_dir();
    fs::write(raw.join("scam_0001.fits"), scam_bytes(&[0.4, 0.5], &[0.2, 0.3])).unwrap();
    let rows = [
        (999.0, 1.0),
        (1000.0, 1.0),
        (1001.0, 3.0),
        (1800.0, 3.0),
        (1801.0, 2.0),
        (1802.0, 2.0),
    ];
    fs::write(raw.join("leaf_00001.asd.txt"), asd_text(&rows)).unwrap();
    fs::write(raw.join("notes.md"), "field notes").unwrap();
    fs::create_dir(raw.join("old")).unwrap();

    let report = preprocess_folder(&raw, &ProcessOptions::default()).unwrap();
    let out_dir = tmp.path().join("raw_processed");
    assert_eq!(report.output_dir, out_dir);
    assert!(out_dir.is_dir());
    assert_eq!(report.files.len(), 4);
    assert_eq!(report.converted(), 2);
    assert_eq!(report.skipped(), 2);
    assert!(!report.has_failures());
    assert_eq!(outcome_of(&report, "notes.md"), &FileOutcome::SkippedUnrecognized);
    assert_eq!(outcome_of(&report, "old"), &FileOutcome::SkippedUnrecognized);

    assert_eq!(
        read_csv_rows(&out_dir.join("scam_0001.csv")),
        vec![(0.4, 0.2), (0.5, 0.3)]
    );
    let corrected = read_csv_rows(&out_dir.join("leaf_00001.asd.csv"));
    assert!(corrected.iter().all(|(_, y)| *y == 1.0), "{corrected:?}");
    assert_eq!(corrected.len(), rows.len());
}

#[test]
fn test_existing_outputs_are_kept_unless_overwrite() {
    let (tmp, raw) = raw_dir();
    fs::write(raw.join("leaf.txt"), asd_text(&[(350.0, 0.5)])).unwrap();
    let out_dir = tmp.path().join("raw_processed");
    fs::create_dir(&out_dir).unwrap();
    fs::write(out_dir.join("leaf.csv"), "keep me").unwrap();

    let options = ProcessOptions {
        correct_txt_offsets: false,
        ..ProcessOptions::default()
    };
    let report = preprocess_folder(&raw, &options).unwrap();
    assert!(matches!(
        outcome_of(&report, "leaf.txt"),
        FileOutcome::SkippedExisting { .. }
    ));
    assert_eq!(fs::read_to_string(out_dir.join("leaf.csv")).unwrap(), "keep me");

    let options = ProcessOptions {
        overwrite: true,
        ..options
    };
    let report = preprocess_folder(&raw, &options).unwrap();
    assert_eq!(report.converted(), 1);
    assert_eq!(read_csv_rows(&out_dir.join("leaf.csv")), vec![(350.0, 0.5)]);
}

#[test]
fn test_one_bad_file_does_not_stop_the_run() {
    let (tmp, raw) = raw_dir();
    fs::write(raw.join("broken.fits"), b"not a fits file at all").unwrap();
    // No samples at the join wavelengths, so correction fails.
    fs::write(raw.join("short.asd.txt"), asd_text(&[(350.0, 0.5), (351.0, 0.6)])).unwrap();
    fs::write(raw.join("ok.fits"), scam_bytes(&[1.0], &[2.0])).unwrap();

    let options = ProcessOptions {
        jobs: Some(1),
        ..ProcessOptions::default()
    };
    let report = preprocess_folder(&raw, &options).unwrap();
    assert_eq!(report.failed(), 2);
    assert_eq!(report.converted(), 1);
    assert!(tmp.path().join("raw_processed/ok.csv").is_file());
    assert!(!tmp.path().join("raw_processed/broken.csv").exists());
    match outcome_of(&report, "short.asd.txt") {
        FileOutcome::Failed { error } => assert!(error.contains("1001"), "{error}"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_same_stem_collision() {
    let (tmp, raw) = raw_dir();
    fs::write(raw.join("a.fits"), scam_bytes(&[1.0], &[2.0])).unwrap();
    fs::write(raw.join("a.txt"), asd_text(&[(350.0, 0.5)])).unwrap();

    let report = preprocess_folder(&raw, &ProcessOptions::default()).unwrap();
    assert!(matches!(outcome_of(&report, "a.fits"), FileOutcome::Converted { .. }));
    assert!(matches!(outcome_of(&report, "a.txt"), FileOutcome::Failed { .. }));
    assert_eq!(
        read_csv_rows(&tmp.path().join("raw_processed/a.csv")),
        vec![(1.0, 2.0)]
    );
}

#[test]
fn test_custom_joins_and_suffix() {
    let (tmp, raw) = raw_dir();
    let rows = [(10.0, 0.0), (11.0, 5.0), (20.0, 5.0), (21.0, 1.0)];
    fs::write(raw.join("leaf.txt"), asd_text(&rows)).unwrap();
    let options = ProcessOptions {
        joins: JoinPoints {
            join1: JoinPair(10.0, 11.0),
            join2: JoinPair(20.0, 21.0),
        },
        output_suffix: "_qt".into(),
        ..ProcessOptions::default()
    };
    let report = preprocess_folder(&raw, &options).unwrap();
    assert_eq!(report.converted(), 1);
    let out = read_csv_rows(&tmp.path().join("raw_qt/leaf.csv"));
    assert_eq!(out, vec![(10.0, 0.0), (11.0, 0.0), (20.0, 0.0), (21.0, 0.0)]);
}

#[test]
fn test_error_handling() {
    let tmp = TempDir::new().unwrap();
    let err = preprocess_folder(&tmp.path().join("nope"), &ProcessOptions::default()).unwrap_err();
    assert_eq!(err.kind(), PrepErrorKind::NotFound);

    let file = tmp.path().join("file.txt");
    fs::write(&file, "").unwrap();
    let err = preprocess_folder(&file, &ProcessOptions::default()).unwrap_err();
    assert_eq!(err.kind(), PrepErrorKind::Validation);
}

#[test]
fn test_corrupt_table_size_fails_only_that_file() {
    let (tmp, raw) = raw_dir();
    let mut corrupt = Vec::new();
    push_header(
        &mut corrupt,
        &[
            "SIMPLE  =                    T".into(),
            "BITPIX  =                    8".into(),
            "NAXIS   =                    0".into(),
        ],
    );
    push_header(
        &mut corrupt,
        &[
            "XTENSION= 'BINTABLE'".into(),
            "BITPIX  =                    8".into(),
            "NAXIS   =                    2".into(),
            "NAXIS1  =                    8".into(),
            "NAXIS2  =  4611686018427387904".into(),
            "PCOUNT  =                    0".into(),
            "GCOUNT  =                    1".into(),
            "TFIELDS =                    1".into(),
            "TTYPE1  = 'I_F_Atm'".into(),
            "TFORM1  = '1D'".into(),
            "EXTNAME = 'Spectra'".into(),
        ],
    );
    corrupt.extend([0u8; BLOCK]);
    fs::write(raw.join("corrupt.fits"), corrupt).unwrap();
    fs::write(raw.join("good.txt"), asd_text(&[(350.0, 0.5)])).unwrap();

    let options = ProcessOptions {
        correct_txt_offsets: false,
        jobs: Some(1),
        ..ProcessOptions::default()
    };
    let report = preprocess_folder(&raw, &options).unwrap();
    assert!(matches!(outcome_of(&report, "corrupt.fits"), FileOutcome::Failed { .. }));
    assert!(matches!(outcome_of(&report, "good.txt"), FileOutcome::Converted { .. }));
    assert!(!tmp.path().join("raw_processed/corrupt.csv").exists());
}

#[test]
fn test_null_cells_become_empty_fields() {
    let (tmp, raw) = raw_dir();
    let text = asd_text(&[(350.0, 0.5)]) + "351\tnan\n";
    fs::write(raw.join("leaf.txt"), text).unwrap();
    let options = ProcessOptions {
        correct_txt_offsets: false,
        ..ProcessOptions::default()
    };
    preprocess_folder(&raw, &options).unwrap();
    let csv = fs::read_to_string(tmp.path().join("raw_processed/leaf.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[2].starts_with("351") && lines[2].ends_with(','), "{csv}");
}

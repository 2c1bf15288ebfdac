mod common;
use common::{noisy, synthetic, temp_path};
use tfpower::io::{read_power, read_trial_table, write_heatmap, write_power, SafetensorsSource, StWriter};
use tfpower::{
    collapse, Axis, Dim, Heatmap, LoadRequest, NanPolicy, SpectrogramRepository, TfArray, TfError,
    ValueRange,
};

#[test]
fn power_file_reads_back() {
    let path = temp_path("power_roundtrip.safetensors");
    let a = noisy((3, 5, 4, 2));
    write_power(&path, &a).unwrap();
    let b = read_power(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(a, b);
}

#[test]
fn safetensors_source_applies_request() {
    let path = temp_path("power_request.safetensors");
    write_power(&path, &noisy((3, 5, 4, 2))).unwrap();
    let source = SafetensorsSource::new(&path);
    let req = LoadRequest {
        electrodes: Some(vec!["E2".into()]),
        time_window: Some((-0.1, 0.1)),
        frequencies: Some(vec![8.0]),
    };
    let repo = SpectrogramRepository::load(&source, &req).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(repo.shape(), &[1, 3, 4, 1]);
    assert_eq!(repo.electrodes(), &["E2"]);
}

#[test]
fn missing_file_is_data_unavailable() {
    let source = SafetensorsSource::new(temp_path("does_not_exist.safetensors"));
    let err = SpectrogramRepository::load(&source, &LoadRequest::default()).unwrap_err();
    assert!(matches!(err, TfError::DataUnavailable(_)), "got {err:?}");
}

#[test]
fn f32_power_is_widened() {
    let path = temp_path("power_f32.safetensors");
    let mut w = StWriter::new();
    w.add_f32("power", &[1.0, 2.0, 3.0, 4.0], &[1, 2, 2, 1]);
    w.add_f32("freqs", &[10.0], &[1]);
    w.add_f32("times", &[0.0, 0.5], &[2]);
    w.add_i64("trials", &[7, 9], &[2]);
    w.add_text("electrodes", &["RAM1".to_string()]);
    w.write(&path).unwrap();

    let a = read_power(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(a.shape(), &[1, 2, 2, 1]);
    assert_eq!(a.data()[[0, 1, 0, 0]], 3.0);
    assert_eq!(a.axis(Dim::Trial).unwrap().as_trials().unwrap(), &[7, 9]);
}

#[test]
fn power_without_trials_key_rejected() {
    let path = temp_path("power_no_trials.safetensors");
    let mut w = StWriter::new();
    w.add_f64("power", &[1.0], &[1, 1, 1, 1]);
    w.add_f64("freqs", &[10.0], &[1]);
    w.add_f64("times", &[0.0], &[1]);
    w.add_text("electrodes", &["A".to_string()]);
    w.write(&path).unwrap();
    let err = read_power(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("trials"));
}

#[test]
fn trial_table_keeps_covariates() {
    let path = temp_path("trials.csv");
    std::fs::write(&path, "Trial,Condition,Block,RT\n1,face,1,0.43\n2,house,1,0.51\n3,face,2,0.38\n")
        .unwrap();
    let idx = read_trial_table(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(idx.len(), 3);
    assert_eq!(idx.condition_of(2), Some("house"));
    assert_eq!(idx.covariate(3, "RT"), Some("0.38"));
    assert_eq!(idx.covariate(3, "Condition"), None);
}

#[test]
fn trial_table_without_condition_column_is_unavailable() {
    let path = temp_path("trials_no_condition.csv");
    std::fs::write(&path, "Trial,Label\n1,face\n").unwrap();
    let err = read_trial_table(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err.downcast_ref::<TfError>(), Some(TfError::DataUnavailable(_))));
}

#[test]
fn trial_table_duplicate_ids_rejected() {
    let path = temp_path("trials_dup.csv");
    std::fs::write(&path, "Trial,Condition\n4,a\n4,b\n").unwrap();
    let err = read_trial_table(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert_eq!(err.downcast_ref::<TfError>(), Some(&TfError::DuplicateTrial(4)));
}

#[test]
fn heatmap_file_has_expected_keys() {
    let path = temp_path("heatmap.safetensors");
    let ft = collapse(&noisy((3, 5, 4, 2)), &[Dim::Frequency, Dim::Time], NanPolicy::Propagate).unwrap();
    let hm = Heatmap::from_array(&ft, ValueRange::Symmetric).unwrap();
    write_heatmap(&path, &hm).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    for key in ["heatmap", "rows", "cols", "zlim", "row_dim", "col_dim"] {
        assert!(header.get(key).is_some(), "missing {key}");
    }
    assert_eq!(header["heatmap"]["shape"], serde_json::json!([3, 5]));
}

#[test]
fn oversized_header_length_is_data_unavailable() {
    let path = temp_path("power_huge_header.safetensors");
    let mut bytes = u64::MAX.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{}");
    std::fs::write(&path, &bytes).unwrap();

    let err = SpectrogramRepository::load(&SafetensorsSource::new(&path), &LoadRequest::default())
        .unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, TfError::DataUnavailable(_)), "got {err:?}");
}

#[test]
fn oversized_data_offsets_rejected() {
    let path = temp_path("power_huge_offsets.safetensors");
    let header = format!(
        r#"{{"power":{{"dtype":"F64","shape":[1,1,1,1],"data_offsets":[{},{}]}}}}"#,
        u64::MAX - 4,
        u64::MAX
    );
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header.as_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let err = read_power(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("data_offsets"), "got {err:#}");
}

#[test]
fn empty_electrode_name_not_written() {
    let path = temp_path("power_empty_name.safetensors");
    let a = synthetic((1, 2, 2, 2), |_, _, _, _| 1.0);
    let named = TfArray::new(
        a.data().clone(),
        vec![
            a.axes()[0].clone(),
            a.axes()[1].clone(),
            a.axes()[2].clone(),
            Axis::electrode(vec!["LA1".into(), String::new()]),
        ],
    )
    .unwrap();
    let err = write_power(&path, &named).unwrap_err();
    assert!(format!("{err:#}").contains("empty"), "got {err:#}");
    assert!(!path.exists());
}

#[test]
fn empty_name_in_file_reported() {
    let path = temp_path("power_blank_electrode.safetensors");
    let mut w = StWriter::new();
    w.add_f64("power", &[1.0, 2.0], &[1, 1, 1, 2]);
    w.add_f64("freqs", &[10.0], &[1]);
    w.add_f64("times", &[0.0], &[1]);
    w.add_i64("trials", &[1], &[1]);
    w.add_text("electrodes", &["LA1".to_string(), String::new()]);
    w.write(&path).unwrap();

    let err = read_power(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("electrodes"), "got {err:#}");
}

#[test]
fn repeated_trial_ids_in_file_are_data_unavailable() {
    let path = temp_path("power_dup_trials.safetensors");
    let mut w = StWriter::new();
    w.add_f64("power", &[1.0, 2.0], &[1, 1, 2, 1]);
    w.add_f64("freqs", &[10.0], &[1]);
    w.add_f64("times", &[0.0], &[1]);
    w.add_i64("trials", &[3, 3], &[2]);
    w.add_text("electrodes", &["LA1".to_string()]);
    w.write(&path).unwrap();

    let err = SpectrogramRepository::load(&SafetensorsSource::new(&path), &LoadRequest::default())
        .unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, TfError::DataUnavailable(_)), "got {err:?}");
}

#[test]
fn inverted_load_window_is_data_unavailable() {
    let path = temp_path("power_inverted_window.safetensors");
    write_power(&path, &noisy((2, 5, 2, 1))).unwrap();
    let req = LoadRequest { time_window: Some((0.1, -0.1)), ..Default::default() };
    let err = SpectrogramRepository::load(&SafetensorsSource::new(&path), &req).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, TfError::DataUnavailable(_)), "got {err:?}");
}

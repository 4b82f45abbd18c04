use pedestrian_annotator::logging;

#[test]
fn debug_records_reach_the_log_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logs").join("pedestrian_detection.log");

    logging::init("warn", Some(&path)).expect("install logger");
    log::debug!("loaded detector for run 41");
    log::info!("wrote 12 frames");
    log::logger().flush();

    let contents = std::fs::read_to_string(&path).expect("log file");
    assert!(contents.contains("loaded detector for run 41"));
    assert!(contents.contains("wrote 12 frames"));
    assert!(contents.contains("DEBUG"));
}

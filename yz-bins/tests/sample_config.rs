use yz_core::{EngineRunner, RunnerState};

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/engine.toml");

#[test]
fn test_sample_config_builds() {
    let catalog = yz_bins::common::linked_modules().unwrap();
    let mut runner = EngineRunner::new(catalog);
    runner.init(SAMPLE).unwrap();
    runner.config().unwrap();

    assert_eq!(runner.env().name, "sim-paper");
    assert_eq!(runner.parsers().ids(), vec!["SIM1".to_string()]);
    assert_eq!(runner.traders().ids(), vec!["PAPER1".to_string()]);
    assert_eq!(runner.executers().ids(), vec!["DIRECT1".to_string()]);

    runner.shutdown().unwrap();
    assert_eq!(runner.state(), RunnerState::Stopped);
}

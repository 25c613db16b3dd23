use super::*;

#[test]
fn test_evaluation_from() {
    let err: TransformError = EvaluationError::DivisionByZero.into();
    assert!(err.is_evaluation());
    assert_eq!(err.to_string(), "evaluation failed: division by zero");
}

#[test]
fn test_config_helper() {
    let err = TransformError::config("missing expression");
    assert!(matches!(err, TransformError::Config(ref m) if m == "missing expression"));
    assert!(!err.is_evaluation());
}

#[test]
fn test_incomplete_display() {
    let err = TransformError::Incomplete {
        target: "memory_util".into(),
        resources: vec!["vm-1".into(), "vm-2".into()],
    };
    assert_eq!(
        err.to_string(),
        "memory_util: 2 resource(s) incomplete at flush: [vm-1, vm-2]"
    );
}

#[test]
fn test_stage_error_display() {
    let err = StageError {
        stage: "arithmetic",
        position: 1,
        error: TransformError::failed("boom"),
    };
    assert_eq!(err.to_string(), "stage 1 (arithmetic): transform failed: boom");
}

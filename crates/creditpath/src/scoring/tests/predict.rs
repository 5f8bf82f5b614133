use super::common::*;
use std::sync::Arc;

use crate::scoring::artifacts::{
    ArtifactBundle, ArtifactKind, ArtifactLoadError, ArtifactManifest, ClassLabel,
};
use crate::scoring::predict::{DefaultClassSource, InferenceError, InferenceStage};
use crate::scoring::preprocess::FeaturePreprocessor;
use crate::scoring::{ClassificationResult, ProbabilityPredictor};

fn predict_with(bundle: &ArtifactBundle) -> Result<ClassificationResult, InferenceError> {
    let vector = FeaturePreprocessor::default()
        .prepare(&sample_record(), bundle)
        .expect("valid record prepares");
    ProbabilityPredictor::new().predict(&vector, bundle)
}

#[test]
fn reports_probability_of_the_detected_default_class() {
    let bundle = fixed_bundle(0.3);
    let result = predict_with(&bundle).expect("prediction succeeds");

    assert!((result.probability - 0.3).abs() < 1e-12);
    assert_eq!(result.default_label, "Charged Off");
    assert_eq!(result.default_index, 1);
    assert_eq!(result.class_probabilities.len(), 2);
    assert!((result.class_probabilities["Fully Paid"] - 0.7).abs() < 1e-12);
    assert!((result.class_probabilities["Charged Off"] - 0.3).abs() < 1e-12);
}

#[test]
fn default_class_is_found_when_listed_first() {
    let bundle = bundle_with(
        FixedClassifier {
            classes: vec![
                ClassLabel::Text("Charged Off".to_string()),
                ClassLabel::Text("Fully Paid".to_string()),
            ],
            probabilities: vec![0.35, 0.65],
            width: FEATURES.len(),
        },
        ArtifactManifest::default(),
    );

    let result = predict_with(&bundle).expect("prediction succeeds");

    assert_eq!(bundle.default_class().source, DefaultClassSource::KnownLabel);
    assert_eq!(result.default_index, 0);
    assert!((result.probability - 0.35).abs() < 1e-12);
}

#[test]
fn pinned_default_label_overrides_detection() {
    let bundle = bundle_with(
        FixedClassifier {
            classes: vec![
                ClassLabel::Text("good".to_string()),
                ClassLabel::Text("risky".to_string()),
            ],
            probabilities: vec![0.6, 0.4],
            width: FEATURES.len(),
        },
        ArtifactManifest {
            default_label: Some("risky".to_string()),
            ..ArtifactManifest::default()
        },
    );

    assert_eq!(bundle.default_class().source, DefaultClassSource::Pinned);
    let result = predict_with(&bundle).expect("prediction succeeds");
    assert_eq!(result.default_label, "risky");
    assert!((result.probability - 0.4).abs() < 1e-12);
}

#[test]
fn unknown_pinned_label_fails_bundle_assembly() {
    let outcome = ArtifactBundle::from_parts(
        Arc::new(FixedClassifier::defaulting_with(0.2)),
        identity_scaler(FEATURES.len()),
        feature_names(),
        sub_grade_table(),
        ArtifactManifest {
            default_label: Some("Written Off".to_string()),
            ..ArtifactManifest::default()
        },
    );

    match outcome {
        Err(ArtifactLoadError::DefaultClass(_)) => {}
        other => panic!("expected default class error, got {other:?}"),
    }
}

#[test]
fn structurally_broken_classifier_fails_bundle_assembly() {
    let mut model = sub_grade_logistic();
    model.intercepts.push(0.0);

    let outcome = ArtifactBundle::from_parts(
        Arc::new(model),
        identity_scaler(FEATURES.len()),
        feature_names(),
        sub_grade_table(),
        ArtifactManifest::default(),
    );

    match outcome {
        Err(ArtifactLoadError::Invalid { artifact, reason }) => {
            assert_eq!(artifact, ArtifactKind::Classifier);
            assert!(reason.contains("intercepts"), "{reason}");
        }
        other => panic!("expected invalid classifier, got {other:?}"),
    }
}

#[test]
fn logistic_model_matches_the_closed_form() {
    let bundle = bundle_with(sub_grade_logistic(), ArtifactManifest::default());
    let result = predict_with(&bundle).expect("prediction succeeds");

    // B3 encodes to 8 and the intercept is -8.
    assert!((result.probability - 0.5).abs() < 1e-12);
    assert_eq!(result.default_label, "1");
}

#[test]
fn worse_sub_grades_score_higher_under_the_logistic_fixture() {
    let bundle = bundle_with(sub_grade_logistic(), ArtifactManifest::default());
    let preprocessor = FeaturePreprocessor::default();
    let predictor = ProbabilityPredictor::new();

    let mut previous = f64::NEG_INFINITY;
    for label in ["A1", "A5", "B3", "C2", "D4", "F1", "G5"] {
        let mut record = sample_record();
        record.sub_grade = label.to_string();
        let vector = preprocessor.prepare(&record, &bundle).expect("prepares");
        let probability = predictor
            .predict(&vector, &bundle)
            .expect("prediction succeeds")
            .probability;
        assert!((0.0..=1.0).contains(&probability));
        assert!(probability > previous, "{label} should score above its predecessor");
        previous = probability;
    }
}

#[test]
fn identical_inputs_produce_identical_outputs() {
    let bundle = bundle_with(sub_grade_logistic(), ArtifactManifest::default());
    let first = predict_with(&bundle).expect("prediction succeeds");
    let second = predict_with(&bundle).expect("prediction succeeds");
    assert_eq!(first, second);
}

#[test]
fn dimension_mismatch_is_an_inference_error() {
    let bundle = bundle_with(MisreportingClassifier::new(), ArtifactManifest::default());

    match predict_with(&bundle) {
        Err(InferenceError::DimensionMismatch {
            stage,
            expected,
            found,
        }) => {
            assert_eq!(stage, InferenceStage::Classifier);
            assert_eq!(expected, 3);
            assert_eq!(found, FEATURES.len());
        }
        other => panic!("expected dimension mismatch, got {other:?}"),
    }
}

#[test]
fn malformed_distributions_are_rejected() {
    let summing_wrong = bundle_with(
        FixedClassifier {
            classes: default_paid_classes(),
            probabilities: vec![0.5, 0.6],
            width: FEATURES.len(),
        },
        ArtifactManifest::default(),
    );
    match predict_with(&summing_wrong) {
        Err(InferenceError::InvalidDistribution { sum }) => assert!((sum - 1.1).abs() < 1e-9),
        other => panic!("expected invalid distribution, got {other:?}"),
    }

    let non_finite = bundle_with(
        FixedClassifier {
            classes: default_paid_classes(),
            probabilities: vec![f64::NAN, 0.5],
            width: FEATURES.len(),
        },
        ArtifactManifest::default(),
    );
    assert_eq!(predict_with(&non_finite), Err(InferenceError::NonFiniteOutput));

    let short = bundle_with(
        FixedClassifier {
            classes: default_paid_classes(),
            probabilities: vec![1.0],
            width: FEATURES.len(),
        },
        ArtifactManifest::default(),
    );
    assert_eq!(
        predict_with(&short),
        Err(InferenceError::ClassCountMismatch {
            expected: 2,
            found: 1
        })
    );
}

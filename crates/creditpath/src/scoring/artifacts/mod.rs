//! Trained artifacts required for inference, loaded once at startup.

mod classifier;
mod scaler;
mod subgrade;

pub use classifier::{
    ClassLabel, Classifier, ClassifierArtifact, LogisticModel, Tree, TreeEnsemble, TreeNode,
};
pub use scaler::StandardScaler;
pub use subgrade::SubGradeTable;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::decision::RiskTierThresholds;
use super::predict::{resolve_default_class, DefaultClass, DefaultClassError, DefaultClassSource};

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURES_FILE: &str = "features.json";
pub const SUB_GRADE_FILE: &str = "sub_grade_mapping.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    FeatureList,
    SubGradeTable,
    Manifest,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::FeatureList => "feature list",
            ArtifactKind::SubGradeTable => "sub-grade table",
            ArtifactKind::Manifest => "manifest",
        };
        f.write_str(label)
    }
}

/// Fatal startup error: the service must not accept scoring requests after one of these.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("{artifact} artifact not found at {}", path.display())]
    Missing { artifact: ArtifactKind, path: PathBuf },
    #[error("failed to read {artifact} artifact at {}: {source}", path.display())]
    Io {
        artifact: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{artifact} artifact at {} is malformed: {source}", path.display())]
    Malformed {
        artifact: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{artifact} artifact is invalid: {reason}")]
    Invalid {
        artifact: ArtifactKind,
        reason: String,
    },
    #[error("unable to resolve the default class: {0}")]
    DefaultClass(#[from] DefaultClassError),
}

/// Optional deployment metadata pinned next to the trained artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    #[serde(default = "default_model_version")]
    pub model_version: String,
    /// Overrides automatic default-class resolution.
    #[serde(default)]
    pub default_label: Option<String>,
    /// Tier cut points calibrated for this model.
    #[serde(default)]
    pub tier_thresholds: Option<RiskTierThresholds>,
}

fn default_model_version() -> String {
    "unversioned".to_string()
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self {
            model_version: default_model_version(),
            default_label: None,
            tier_thresholds: None,
        }
    }
}

/// Immutable set of everything inference needs. Built once, then shared behind `Arc`.
#[derive(Debug)]
pub struct ArtifactBundle {
    classifier: Arc<dyn Classifier>,
    scaler: StandardScaler,
    feature_names: Arc<[String]>,
    sub_grades: SubGradeTable,
    manifest: ArtifactManifest,
    default_class: DefaultClass,
}

impl ArtifactBundle {
    /// Cross-check the artifacts against each other and resolve the default class.
    pub fn from_parts(
        classifier: Arc<dyn Classifier>,
        scaler: StandardScaler,
        feature_names: Vec<String>,
        sub_grades: SubGradeTable,
        manifest: ArtifactManifest,
    ) -> Result<Self, ArtifactLoadError> {
        let invalid = |artifact, reason: String| ArtifactLoadError::Invalid { artifact, reason };

        classifier
            .validate()
            .map_err(|reason| invalid(ArtifactKind::Classifier, reason))?;

        if feature_names.is_empty() {
            return Err(invalid(
                ArtifactKind::FeatureList,
                "feature list is empty".to_string(),
            ));
        }
        if let Some(duplicate) = first_duplicate(&feature_names) {
            return Err(invalid(
                ArtifactKind::FeatureList,
                format!("feature '{duplicate}' appears more than once"),
            ));
        }

        scaler
            .validate()
            .map_err(|reason| invalid(ArtifactKind::Scaler, reason))?;
        if scaler.n_features() != feature_names.len() {
            return Err(invalid(
                ArtifactKind::Scaler,
                format!(
                    "scaler expects {} features but the feature list has {}",
                    scaler.n_features(),
                    feature_names.len()
                ),
            ));
        }
        if classifier.n_features() != feature_names.len() {
            return Err(invalid(
                ArtifactKind::Classifier,
                format!(
                    "classifier expects {} features but the feature list has {}",
                    classifier.n_features(),
                    feature_names.len()
                ),
            ));
        }

        let mut labels = HashSet::new();
        if let Some(duplicate) = classifier
            .classes()
            .iter()
            .map(ToString::to_string)
            .find(|label| !labels.insert(label.clone()))
        {
            return Err(invalid(
                ArtifactKind::Classifier,
                format!("class label '{duplicate}' is not unique once stringified"),
            ));
        }

        if sub_grades.is_empty() {
            return Err(invalid(
                ArtifactKind::SubGradeTable,
                "sub-grade table is empty".to_string(),
            ));
        }

        let default_class =
            resolve_default_class(classifier.classes(), manifest.default_label.as_deref())?;
        if default_class.source == DefaultClassSource::Positional {
            warn!(
                label = %default_class.label,
                index = default_class.index,
                "no class label names the default outcome; using positional fallback"
            );
        }

        Ok(Self {
            classifier,
            scaler,
            feature_names: feature_names.into(),
            sub_grades,
            manifest,
            default_class,
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Canonical training-time feature order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub(crate) fn shared_feature_names(&self) -> Arc<[String]> {
        Arc::clone(&self.feature_names)
    }

    pub fn sub_grades(&self) -> &SubGradeTable {
        &self.sub_grades
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn model_version(&self) -> &str {
        &self.manifest.model_version
    }

    pub fn default_class(&self) -> &DefaultClass {
        &self.default_class
    }
}

/// Reads the artifact documents from a directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and validate all artifacts. Either every artifact is usable or an error is returned.
    pub fn load(&self) -> Result<ArtifactBundle, ArtifactLoadError> {
        let classifier: ClassifierArtifact =
            read_json(ArtifactKind::Classifier, &self.dir.join(CLASSIFIER_FILE))?;

        let scaler: StandardScaler = read_json(ArtifactKind::Scaler, &self.dir.join(SCALER_FILE))?;
        let feature_names: Vec<String> =
            read_json(ArtifactKind::FeatureList, &self.dir.join(FEATURES_FILE))?;
        let sub_grades: SubGradeTable =
            read_json(ArtifactKind::SubGradeTable, &self.dir.join(SUB_GRADE_FILE))?;

        let manifest_path = self.dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            read_json(ArtifactKind::Manifest, &manifest_path)?
        } else {
            ArtifactManifest::default()
        };

        let bundle = ArtifactBundle::from_parts(
            Arc::new(classifier),
            scaler,
            feature_names,
            sub_grades,
            manifest,
        )?;

        info!(
            dir = %self.dir.display(),
            model_version = %bundle.model_version(),
            features = bundle.feature_names().len(),
            classes = bundle.classifier().classes().len(),
            sub_grades = bundle.sub_grades().len(),
            default_label = %bundle.default_class().label,
            "loaded scoring artifacts"
        );

        Ok(bundle)
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .find(|name| !seen.insert(*name))
}

fn read_json<T: DeserializeOwned>(
    artifact: ArtifactKind,
    path: &Path,
) -> Result<T, ArtifactLoadError> {
    if !path.exists() {
        return Err(ArtifactLoadError::Missing {
            artifact,
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| ArtifactLoadError::Io {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Malformed {
        artifact,
        path: path.to_path_buf(),
        source,
    })
}

//! GitHub Actions 测试矩阵：由 ubuntu-versions.yml 生成

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::{Result, VerifyError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UbuntuVersions {
    #[serde(default)]
    pub supported_versions: Vec<VersionEntry>,
    #[serde(default)]
    pub upcoming_versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    #[serde(default)]
    pub lts: Option<String>,
    #[serde(default)]
    pub image_offer: Option<String>,
    #[serde(default)]
    pub image_sku: Option<String>,
    pub python: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pre_release_image: Option<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub offer: String,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    pub ubuntu_version: String,
    pub ubuntu_lts: String,
    pub image_offer: String,
    pub image_sku: String,
    pub python_expected: String,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    pub include: Vec<MatrixEntry>,
}

pub fn load(path: &Path) -> Result<UbuntuVersions> {
    if !path.exists() {
        return Err(VerifyError::Config(format!("{} not found", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Only `active` supported versions may fail the build; upcoming ones never do.
pub fn generate(cfg: &UbuntuVersions, include_upcoming: bool) -> Result<Matrix> {
    let mut include = Vec::new();

    for v in &cfg.supported_versions {
        include.push(MatrixEntry {
            ubuntu_version: v.version.clone(),
            ubuntu_lts: v.lts.clone().unwrap_or_else(|| v.version.clone()),
            image_offer: required(&v.image_offer, "image_offer", &v.version)?,
            image_sku: required(&v.image_sku, "image_sku", &v.version)?,
            python_expected: v.python.clone(),
            continue_on_error: v.status.as_deref() != Some("active"),
        });
    }

    if include_upcoming {
        for v in &cfg.upcoming_versions {
            let (image_offer, image_sku) = match &v.pre_release_image {
                Some(img) => (img.offer.clone(), img.sku.clone()),
                None => (
                    required(&v.image_offer, "image_offer", &v.version)?,
                    required(&v.image_sku, "image_sku", &v.version)?,
                ),
            };
            include.push(MatrixEntry {
                ubuntu_version: v.version.clone(),
                ubuntu_lts: v.lts.clone().unwrap_or_else(|| v.version.clone()),
                image_offer,
                image_sku,
                python_expected: v.python.clone(),
                continue_on_error: true,
            });
        }
    }

    Ok(Matrix { include })
}

fn required(field: &Option<String>, name: &str, version: &str) -> Result<String> {
    field
        .clone()
        .ok_or_else(|| VerifyError::Parse(format!("version {}: missing {}", version, name)))
}

/// Compact JSON, the form `fromJSON()` in a workflow expects.
pub fn run_matrix(path: &Path, include_upcoming: bool) -> Result<()> {
    let cfg = load(path)?;
    let matrix = generate(&cfg, include_upcoming)?;
    tracing::info!(entries = matrix.include.len(), "matrix generated");
    println!("{}", serde_json::to_string(&matrix)?);
    Ok(())
}

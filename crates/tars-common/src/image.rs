use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Account hosting the managed deep-learning container images.
pub const DLC_ACCOUNT: &str = "763104351884";

pub const HF_INFERENCE_REPOSITORY: &str = "huggingface-pytorch-inference";

/// Regions the catalog has known image tags for.
pub const KNOWN_REGIONS: [&str; 3] = ["us-east-1", "us-west-2", "eu-west-1"];

/// Tag built with transformers 4.37 (cannot load Qwen2.5-VL models).
pub const TAG_TRANSFORMERS_4_37: &str = "2.1.0-transformers4.37.0-gpu-py310-cu118-ubuntu20.04";

/// Tag built with transformers 4.44.
pub const TAG_TRANSFORMERS_4_44: &str = "2.1.0-transformers4.44.0-gpu-py310-cu121-ubuntu20.04";

/// Newer tags worth trying when the defaults are too old.
pub const CANDIDATE_TAGS: [&str; 3] = [
    "2.1.0-transformers4.40.0-gpu-py310-cu118-ubuntu20.04",
    "2.2.0-transformers4.41.0-gpu-py310-cu121-ubuntu20.04",
    "2.3.0-transformers4.42.0-gpu-py310-cu121-ubuntu20.04",
];

/// Dotted numeric version, compared component-wise (missing parts are 0,
/// so "4.40" equals "4.40.0").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version(pub Vec<u32>);

impl Version {
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Option<Vec<u32>> = s
            .trim_end_matches('.')
            .split('.')
            .map(|p| p.parse().ok())
            .collect();
        parts.filter(|p| !p.is_empty()).map(Version)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// A parsed container image reference: `registry/repository:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
}

impl ContainerImage {
    pub fn parse(reference: &str) -> Self {
        let (registry, rest) = match reference.split_once('/') {
            Some((head, tail)) if head.contains('.') || head.contains(':') => {
                (Some(head.to_string()), tail)
            }
            _ => (None, reference),
        };
        // A ':' after the last '/' separates the tag.
        let (repository, tag) = match rest.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), Some(tag.to_string())),
            _ => (rest.to_string(), None),
        };
        Self {
            registry,
            repository,
            tag,
        }
    }

    /// Transformers version baked into the tag, e.g. `...-transformers4.44.0-...`.
    pub fn transformers_version(&self) -> Option<Version> {
        self.tag.as_deref().and_then(transformers_version_from_tag)
    }
}

impl fmt::Display for ContainerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(r) = &self.registry {
            write!(f, "{r}/")?;
        }
        f.write_str(&self.repository)?;
        if let Some(t) = &self.tag {
            write!(f, ":{t}")?;
        }
        Ok(())
    }
}

pub fn transformers_version_from_tag(tag: &str) -> Option<Version> {
    let start = tag.find("transformers")? + "transformers".len();
    let digits: String = tag[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Version::parse(&digits)
}

pub fn registry_host(region: &str) -> String {
    format!("{DLC_ACCOUNT}.dkr.ecr.{region}.amazonaws.com")
}

/// Region the catalog will actually use; unknown regions fall back to us-east-1.
pub fn catalog_region(region: &str) -> &str {
    if KNOWN_REGIONS.contains(&region) {
        region
    } else {
        KNOWN_REGIONS[0]
    }
}

/// Hugging Face inference image for `region` with the given tag.
pub fn hf_inference_image(region: &str, tag: &str) -> String {
    format!(
        "{}/{}:{}",
        registry_host(catalog_region(region)),
        HF_INFERENCE_REPOSITORY,
        tag
    )
}

/// Default image: the transformers 4.44 build, which loads Qwen2.5-VL.
pub fn default_image(region: &str) -> String {
    hf_inference_image(region, TAG_TRANSFORMERS_4_44)
}

/// Candidate image URIs for every known region, newest tags last.
pub fn candidate_images() -> Vec<(String, String)> {
    let mut out = Vec::new();
    for region in KNOWN_REGIONS {
        for tag in CANDIDATE_TAGS {
            out.push((region.to_string(), hf_inference_image(region, tag)));
        }
    }
    out
}

/// Architectures that only load on containers newer than the default 4.37 build.
pub const KNOWN_ARCHITECTURES: [&str; 1] = ["qwen2_5_vl"];

/// Runtime requirement of a model family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequirement {
    /// Architecture name the container must recognise, e.g. "qwen2_5_vl".
    pub architecture: &'static str,
    pub min_transformers: Version,
}

/// Look up what a hub model needs from its serving container.
pub fn requirement_for(model_id: &str) -> Option<ModelRequirement> {
    let lower = model_id.to_lowercase();
    if lower.contains("ui-tars") || lower.contains("qwen2.5-vl") || lower.contains("qwen2_5_vl") {
        return Some(ModelRequirement {
            architecture: KNOWN_ARCHITECTURES[0],
            min_transformers: Version(vec![4, 40, 0]),
        });
    }
    None
}

use tars_common::image::requirement_for;
use tars_common::{ContainerImage, Version};

/// Whether a serving image can load a model, decided before any platform
/// resource is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    /// Nothing known about the model's requirements.
    NoRequirement,
    Compatible {
        required: Version,
        found: Version,
    },
    Incompatible {
        architecture: String,
        required: Version,
        found: Version,
    },
    /// The image tag carries no transformers version (e.g. a custom build).
    Unknown {
        architecture: String,
        required: Version,
    },
}

impl Compatibility {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Incompatible { .. })
    }
}

pub fn check_image(model_id: &str, image: &str) -> Compatibility {
    let Some(req) = requirement_for(model_id) else {
        return Compatibility::NoRequirement;
    };
    match ContainerImage::parse(image).transformers_version() {
        None => Compatibility::Unknown {
            architecture: req.architecture.to_string(),
            required: req.min_transformers,
        },
        Some(found) if found >= req.min_transformers => Compatibility::Compatible {
            required: req.min_transformers,
            found,
        },
        Some(found) => Compatibility::Incompatible {
            architecture: req.architecture.to_string(),
            required: req.min_transformers,
            found,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tars_common::image::{hf_inference_image, TAG_TRANSFORMERS_4_37, TAG_TRANSFORMERS_4_44};

    const UI_TARS: &str = "ByteDance-Seed/UI-TARS-1.5-7B";

    #[test]
    fn test_old_container_is_blocking() {
        let c = check_image(UI_TARS, &hf_inference_image("us-east-1", TAG_TRANSFORMERS_4_37));
        assert!(c.is_blocking());
        match c {
            Compatibility::Incompatible { architecture, found, .. } => {
                assert_eq!(architecture, "qwen2_5_vl");
                assert_eq!(found.to_string(), "4.37.0");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_new_container_is_compatible() {
        let c = check_image(UI_TARS, &hf_inference_image("eu-west-1", TAG_TRANSFORMERS_4_44));
        assert!(matches!(c, Compatibility::Compatible { .. }));
    }

    #[test]
    fn test_custom_container_is_unknown_but_not_blocking() {
        let c = check_image(UI_TARS, "123.dkr.ecr.us-east-1.amazonaws.com/ui-tars-custom:latest");
        assert!(matches!(c, Compatibility::Unknown { .. }));
        assert!(!c.is_blocking());
    }

    #[test]
    fn test_model_without_requirement() {
        let c = check_image(
            "Salesforce/blip2-opt-2.7b",
            &hf_inference_image("us-east-1", TAG_TRANSFORMERS_4_37),
        );
        assert_eq!(c, Compatibility::NoRequirement);
    }
}

//! Machine image references and the default Azure alias tables

use crate::model::{ImageReferenceModel, Plan};
use leo_cloud::{Aliases, CloudError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// `<user>@<publisher>:<offer>:<sku>:<version>[:#plan]`
static IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^@]+)@([^:]+):([^:]+):([^:]+):([^:]+)(:?(#plan)?)$")
        .expect("image pattern is valid")
});

/// Marketplace image plus the login user baked into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub user: String,
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
    /// Whether the image needs a purchase plan
    pub plan: bool,
}

impl ImageReference {
    pub fn parse(image: &str) -> Result<Self> {
        let captures = IMAGE_PATTERN
            .captures(image)
            .ok_or_else(|| CloudError::InvalidImage(image.to_string()))?;

        Ok(Self {
            user: captures[1].to_string(),
            publisher: captures[2].to_string(),
            offer: captures[3].to_string(),
            sku: captures[4].to_string(),
            version: captures[5].to_string(),
            plan: captures.get(7).is_some(),
        })
    }

    pub fn model(&self) -> ImageReferenceModel {
        ImageReferenceModel {
            publisher: self.publisher.clone(),
            offer: self.offer.clone(),
            sku: self.sku.clone(),
            version: self.version.clone(),
        }
    }

    /// Purchase plan, only for images marked `#plan`
    pub fn purchase_plan(&self) -> Option<Plan> {
        self.plan.then(|| Plan {
            publisher: self.publisher.clone(),
            product: self.offer.clone(),
            name: self.sku.clone(),
        })
    }
}

/// Built-in image and machine aliases
pub fn azure_aliases() -> Aliases {
    Aliases::new()
        .with_image(
            "ubuntu",
            "ubuntu@Canonical:0001-com-ubuntu-server-focal:20_04-lts:latest",
        )
        .with_image("nvidia", "ubuntu@microsoft-dsvm:ubuntu-2004:2004-gen2:latest")
        .with_machine("s", "Standard_B1s")
        .with_machine("m", "Standard_F8s_v2")
        .with_machine("l", "Standard_F32s_v2")
        .with_machine("xl", "Standard_F64s_v2")
        .with_machine("m+t4", "Standard_NC4as_T4_v3")
        .with_machine("m+k80", "Standard_NC6")
        .with_machine("l+k80", "Standard_NC12")
        .with_machine("xl+k80", "Standard_NC24")
        .with_machine("m+v100", "Standard_NC6s_v3")
        .with_machine("l+v100", "Standard_NC12s_v3")
        .with_machine("xl+v100", "Standard_NC24s_v3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let image = ImageReference::parse("ubuntu@Canonical:UbuntuServer:18.04-LTS:latest").unwrap();
        assert_eq!(image.user, "ubuntu");
        assert_eq!(image.publisher, "Canonical");
        assert_eq!(image.offer, "UbuntuServer");
        assert_eq!(image.sku, "18.04-LTS");
        assert_eq!(image.version, "latest");
        assert!(!image.plan);
        assert!(image.purchase_plan().is_none());
    }

    #[test]
    fn test_parse_focal_image() {
        let image =
            ImageReference::parse("ubuntu@Canonical:0001-com-ubuntu-server-focal:20_04-lts:latest")
                .unwrap();
        assert_eq!(image.user, "ubuntu");
        assert_eq!(image.publisher, "Canonical");
        assert_eq!(image.offer, "0001-com-ubuntu-server-focal");
        assert_eq!(image.sku, "20_04-lts");
        assert_eq!(image.version, "latest");
        assert!(!image.plan);
    }

    #[test]
    fn test_parse_image_with_plan() {
        let image = ImageReference::parse("user@publisher:offer:sku:1.0.0:#plan").unwrap();
        assert!(image.plan);

        let plan = image.purchase_plan().unwrap();
        assert_eq!(plan.publisher, "publisher");
        assert_eq!(plan.product, "offer");
        assert_eq!(plan.name, "sku");
    }

    #[test]
    fn test_parse_image_rejects_malformed() {
        for image in [
            "Canonical:UbuntuServer:18.04-LTS:latest",
            "Canonical:0001-com-ubuntu-server-focal:20_04-lts:latest",
            "ubuntu@Canonical:UbuntuServer:latest",
            "ubuntu",
            "",
        ] {
            assert!(
                matches!(ImageReference::parse(image), Err(CloudError::InvalidImage(_))),
                "{image} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_aliases_parse() {
        let aliases = azure_aliases();
        for image in aliases.images.values() {
            assert!(ImageReference::parse(image).is_ok(), "{image}");
        }
        assert_eq!(aliases.resolve_machine("m"), "Standard_F8s_v2");
        assert_eq!(aliases.resolve_machine("xl+v100"), "Standard_NC24s_v3");
    }
}

//! `[site]` section configuration.
//!
//! Site-wide metadata exposed to every template as `site`.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in oxen.toml - site metadata.
///
/// # Example
/// ```toml
/// [site]
/// name = "Garden"
/// url = "https://notes.example.com"
/// author = "Sam"
/// license_name = "CC BY-SA 4.0"
/// license_url = "https://creativecommons.org/licenses/by-sa/4.0/"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Site name shown in page titles and headers.
    #[serde(default = "defaults::site::name")]
    #[educe(Default = defaults::site::name())]
    pub name: String,

    /// Public base URL. Overridden with the local address by `serve`.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub author: String,

    /// Default description for `<meta name="description">`.
    #[serde(default)]
    pub description: String,

    /// Image used for social previews when a page has none.
    #[serde(default)]
    pub default_image: String,

    #[serde(default)]
    pub license_name: String,

    #[serde(default)]
    pub license_url: String,

    /// BCP 47 language code for `<html lang>`.
    #[serde(default = "defaults::site::language")]
    #[educe(Default = defaults::site::language())]
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_site_config_full() {
        let config = r#"
            [site]
            name = "Garden"
            url = "https://notes.example.com"
            author = "Sam"
            default_image = "/img/card.png"
            license_name = "CC BY-SA 4.0"
            license_url = "https://creativecommons.org/licenses/by-sa/4.0/"
            language = "de"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.site.name, "Garden");
        assert_eq!(config.site.url.as_deref(), Some("https://notes.example.com"));
        assert_eq!(config.site.author, "Sam");
        assert_eq!(config.site.default_image, "/img/card.png");
        assert_eq!(config.site.license_name, "CC BY-SA 4.0");
        assert_eq!(config.site.language, "de");
    }

    #[test]
    fn test_site_config_defaults() {
        let config: SiteConfig = toml::from_str("[site]\n").unwrap();

        assert_eq!(config.site.name, "My Notes");
        assert_eq!(config.site.url, None);
        assert_eq!(config.site.author, "");
        assert_eq!(config.site.language, "en");
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<SiteConfig, _> = toml::from_str("[site]\ntitle = \"x\"\n");

        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn test_site_config_unicode() {
        let config: SiteConfig = toml::from_str("[site]\nname = \"Zettel 🗒\"\nauthor = \"René\"\n").unwrap();

        assert_eq!(config.site.name, "Zettel 🗒");
        assert_eq!(config.site.author, "René");
    }
}

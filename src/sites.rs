//! Site registry loading.
//!
//! The list of monitored sites is owned outside this service and handed to
//! us as a TOML file of `[[site]]` entries. This module is the boundary: it
//! parses the file, rejects malformed registries, and offers lookups. All
//! other modules receive `&[Site]` rather than reading the file themselves.

use crate::model::{ConfigError, Site};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    site: Vec<Site>,
}

/// Parse a registry from TOML text and validate it.
pub fn parse_sites(text: &str) -> Result<Vec<Site>, ConfigError> {
    let registry: RegistryFile =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_sites(&registry.site)?;
    Ok(registry.site)
}

/// Load and validate the registry at `path`.
pub fn load_sites(path: impl AsRef<Path>) -> Result<Vec<Site>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_sites(&text)
}

/// Reject registries the engine cannot work with: duplicate ids, empty
/// ids or names, coordinates outside WGS84 bounds, negative capacity.
pub fn validate_sites(sites: &[Site]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for site in sites {
        if site.id.trim().is_empty() || site.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "site entry with empty id or name (id='{}')",
                site.id
            )));
        }
        if !seen.insert(site.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate site id '{}'", site.id)));
        }
        if !(-90.0..=90.0).contains(&site.latitude) || !(-180.0..=180.0).contains(&site.longitude) {
            return Err(ConfigError::Invalid(format!(
                "site '{}' has out-of-range coordinates ({}, {})",
                site.id, site.latitude, site.longitude
            )));
        }
        if site.capacity < 0.0 || !site.capacity.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "site '{}' has invalid capacity {}",
                site.id, site.capacity
            )));
        }
    }
    Ok(())
}

/// Looks up a site by id. Returns `None` if not found.
pub fn find_site<'a>(sites: &'a [Site], id: &str) -> Option<&'a Site> {
    sites.iter().find(|s| s.id == id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SITES: &str = r#"
        [[site]]
        id = "tehri"
        name = "Tehri"
        state = "Uttarakhand"
        latitude = 30.378
        longitude = 78.483
        capacity = 86.0
        river = "Bhagirathi"

        [[site]]
        id = "idukki"
        name = "Idukki"
        state = "Kerala"
        latitude = 9.841
        longitude = 76.970
        capacity = 70.5
        river = "Periyar"
    "#;

    #[test]
    fn test_parse_sites_keeps_registry_order() {
        let sites = parse_sites(TWO_SITES).expect("registry should parse");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, "tehri");
        assert_eq!(sites[1].river, "Periyar");
    }

    #[test]
    fn test_empty_registry_is_valid() {
        assert!(parse_sites("").expect("empty file is an empty registry").is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doubled = format!("{}\n{}", TWO_SITES, TWO_SITES);
        let result = parse_sites(&doubled);
        assert!(
            matches!(result, Err(ConfigError::Invalid(ref msg)) if msg.contains("duplicate")),
            "duplicate ids should be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let bad = TWO_SITES.replace("30.378", "130.378");
        assert!(matches!(parse_sites(&bad), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_find_site_returns_correct_entry() {
        let sites = parse_sites(TWO_SITES).unwrap();
        let site = find_site(&sites, "idukki").expect("Idukki should be in registry");
        assert_eq!(site.name, "Idukki");
        assert!(find_site(&sites, "bhakra-nangal").is_none());
    }

    #[test]
    fn test_bundled_registry_loads_and_covers_fifty_plus_sites() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/sites.toml");
        let sites = load_sites(path).expect("bundled sites.toml should be valid");
        assert!(sites.len() >= 50, "expected 50+ sites, got {}", sites.len());
        assert!(sites.iter().all(|s| !s.state.is_empty()));
    }

    #[test]
    fn test_missing_registry_is_io_error() {
        assert!(matches!(
            load_sites("/no/such/sites.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}

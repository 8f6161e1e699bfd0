//! Spatial reference resolution
//!
//! Every descriptor a caller can hand us (a bare identifier, an Esri-style
//! object, an `"EPSG:n"` string, or a WKT definition) is folded onto a
//! [`CanonicalSr`]. Identifiers are checked against the registry so an
//! unknown code fails here and not in the middle of a projection. WKT is
//! kept verbatim; the transform provider reports definitions it cannot use.

use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::{CanonicalSr, SpatialReference, SpatialReferenceObject};
use proj::Proj;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Identifier registry with alias folding.
///
/// A handful of common references and the Esri/legacy aliases for Web
/// Mercator are built in; every other code is looked up in the PROJ
/// database.
#[derive(Debug)]
pub struct ReferenceRegistry {
    names: HashMap<u32, &'static str>,
    aliases: HashMap<u32, u32>,
}

impl ReferenceRegistry {
    fn builtin() -> Self {
        let names = HashMap::from([
            (4326, "WGS 84"),
            (4269, "NAD83"),
            (4258, "ETRS89"),
            (3857, "WGS 84 / Pseudo-Mercator"),
        ]);
        // Esri and legacy codes for Web Mercator
        let aliases = [102100, 102113, 900913, 3785].into_iter().map(|alias| (alias, 3857)).collect();
        Self { names, aliases }
    }

    /// Canonical identifier for a code, following aliases
    pub fn canonical_wkid(&self, wkid: u32) -> Option<u32> {
        let wkid = self.aliases.get(&wkid).copied().unwrap_or(wkid);
        (self.names.contains_key(&wkid) || proj_knows(wkid)).then_some(wkid)
    }

    /// Display name of a built-in reference
    pub fn name(&self, wkid: u32) -> Option<&'static str> {
        self.aliases.get(&wkid).or(Some(&wkid)).and_then(|canonical| self.names.get(canonical)).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn proj_knows(wkid: u32) -> bool {
    Proj::new(&format!("EPSG:{}", wkid)).is_ok()
}

static REGISTRY: LazyLock<ReferenceRegistry> = LazyLock::new(ReferenceRegistry::builtin);

/// The process-wide registry
pub fn registry() -> &'static ReferenceRegistry {
    &REGISTRY
}

/// Look up a code, following aliases
pub fn lookup(wkid: u32) -> Option<CanonicalSr> {
    REGISTRY.canonical_wkid(wkid).map(CanonicalSr::Wkid)
}

/// Resolve a descriptor to its canonical key.
///
/// Object members are consulted in the order `latestWkid`, `wkid`, `epsg`,
/// `wkt`; the first one present wins.
pub fn resolve(descriptor: &SpatialReference) -> Result<CanonicalSr> {
    match descriptor {
        SpatialReference::Wkid(wkid) => resolve_wkid(*wkid, descriptor),
        SpatialReference::Object(obj) => resolve_object(obj, descriptor),
        SpatialReference::Text(text) => resolve_text(text, descriptor),
    }
}

fn resolve_object(obj: &SpatialReferenceObject, descriptor: &SpatialReference) -> Result<CanonicalSr> {
    if let Some(wkid) = obj.latest_wkid.or(obj.wkid).or(obj.epsg) {
        return resolve_wkid(wkid, descriptor);
    }
    match &obj.wkt {
        Some(wkt) => resolve_wkt(wkt),
        None => Err(GeosiftError::unknown_reference(descriptor.to_string())),
    }
}

fn resolve_text(text: &str, descriptor: &SpatialReference) -> Result<CanonicalSr> {
    let trimmed = text.trim();
    let code = trimmed
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
        .map(|_| trimmed[5..].trim())
        .unwrap_or(trimmed);

    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        let wkid = code
            .parse::<u32>()
            .map_err(|_| GeosiftError::unknown_reference(descriptor.to_string()))?;
        return resolve_wkid(wkid, descriptor);
    }

    resolve_wkt(trimmed)
}

fn resolve_wkid(wkid: u32, descriptor: &SpatialReference) -> Result<CanonicalSr> {
    lookup(wkid).ok_or_else(|| GeosiftError::unknown_reference(descriptor.to_string()))
}

/// WKT is its own identity; only text that cannot be a definition at all fails
fn resolve_wkt(wkt: &str) -> Result<CanonicalSr> {
    let wkt = wkt.trim();
    let keyword_len = wkt.find(['[', '(']).unwrap_or(0);
    if keyword_len == 0 || !wkt[..keyword_len].bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(GeosiftError::unknown_reference(wkt));
    }
    debug!("Using WKT spatial reference {}", &wkt[..keyword_len]);
    Ok(CanonicalSr::Wkt(wkt.to_string()))
}

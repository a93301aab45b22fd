//! Site Registry
//!
//! The ordered collection of [`Site`] rules. Insertion order is kept for
//! display, while matching always goes through [`SiteRegistry::search`] and
//! [`SiteRegistry::best_match`].
//!
//! The registry is a plain value rebuilt from the persisted state on every
//! request (see [`crate::state::mutate`]); nothing here caches across calls.

use serde::{Deserialize, Serialize};

use crate::error::{Error, StoreError, ValidationError};
use crate::site::Site;
use crate::state::StateStore;
use crate::style::validate_styles;
use crate::url::{clean_url, derive_sibling_pattern, normalize};

/// Ordered site rules. Serializes as a plain array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    /// Read the registry from a state store.
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(store.load()?.sites)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn into_sites(self) -> Vec<Site> {
        self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.sites.iter().position(|site| site.url == url)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a new enabled rule for `url`.
    ///
    /// With `include_siblings` the rule covers the URL's whole directory.
    pub fn add(&mut self, url: &str, include_siblings: bool) -> Result<&Site, Error> {
        let mut url = normalize(url)?;
        if include_siblings {
            url = derive_sibling_pattern(&url);
        }

        if self.position(&url).is_some() {
            return Err(Error::Duplicate(url));
        }

        log::debug!("adding site {url}");
        self.sites.push(Site::new(url));
        let last = self.sites.len() - 1;
        Ok(&self.sites[last])
    }

    /// Replace the rule stored under `url`, keeping its position.
    ///
    /// `url` is first looked up exactly as given, then normalized. A
    /// `new_site.url` equal to the stored pattern is kept verbatim.
    pub fn update(&mut self, url: &str, mut new_site: Site) -> Result<&Site, Error> {
        let index = match self.position(url) {
            Some(index) => index,
            None => {
                let url = normalize(url)?;
                self.position(&url).ok_or(Error::NotFound(url))?
            }
        };
        let url = self.sites[index].url.clone();

        if new_site.url != url {
            new_site.url = normalize(&new_site.url)?;
        }
        validate_styles(&new_site.styles)?;

        let collides = self
            .sites
            .iter()
            .enumerate()
            .any(|(i, site)| i != index && site.url == new_site.url);
        if collides {
            return Err(Error::Duplicate(new_site.url));
        }

        log::debug!("updating site {url} -> {}", new_site.url);
        self.sites[index] = new_site;
        Ok(&self.sites[index])
    }

    /// Delete the rule stored under `url`.
    ///
    /// `url` is first looked up exactly as given, then in its cleaned form.
    pub fn remove(&mut self, url: &str) -> Result<Site, Error> {
        if url.trim().is_empty() {
            return Err(ValidationError::MissingUrl.into());
        }

        let index = self
            .position(url)
            .or_else(|| self.position(&clean_url(url)))
            .ok_or_else(|| Error::NotFound(url.to_string()))?;

        log::debug!("removing site {}", self.sites[index].url);
        Ok(self.sites.remove(index))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Exact lookup by stored pattern.
    pub fn get(&self, url: &str) -> Option<&Site> {
        self.sites.iter().find(|site| site.url == url)
    }

    /// All rules matching `url`, shortest pattern first.
    ///
    /// The last element is the best match. Equal lengths keep insertion order.
    pub fn search(&self, url: &str) -> Vec<&Site> {
        let mut found: Vec<&Site> = self.sites.iter().filter(|site| site.matches_url(url)).collect();
        found.sort_by_key(|site| site.url.len());
        found
    }

    /// The most specific (longest) matching rule.
    ///
    /// Same element as `search(url).last()`.
    pub fn best_match(&self, url: &str) -> Option<&Site> {
        self.sites
            .iter()
            .filter(|site| site.matches_url(url))
            .max_by_key(|site| site.url.len())
    }
}

impl From<Vec<Site>> for SiteRegistry {
    fn from(sites: Vec<Site>) -> Self {
        Self::new(sites)
    }
}

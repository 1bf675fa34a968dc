use xmltree::{Element, XMLNode};

use crate::error::Result;
use crate::job::Job;

/// Memoized view of the job's `config.xml`.
///
/// Fetched lazily on first access and parsed lazily on first structured
/// access. A successful write-back replaces the whole cache with the
/// serialized round-trip; there is no incremental patching and no
/// confirmatory re-fetch. A failed write-back leaves the cache untouched.
pub(crate) enum ConfigCache {
    Unloaded,
    Fetched { raw: String },
    Parsed { raw: String, tree: Element },
}

impl ConfigCache {
    fn raw(&self) -> Option<&str> {
        match self {
            ConfigCache::Unloaded => None,
            ConfigCache::Fetched { raw } | ConfigCache::Parsed { raw, .. } => Some(raw),
        }
    }
}

impl Job {
    fn config_url(&self) -> Result<url::Url> {
        Ok(self.base_url().join("config.xml")?)
    }

    /// Raw `config.xml` text, fetched once per session. Later calls return
    /// the memoized text; use [`reload_config`](Job::reload_config) to force
    /// a re-fetch.
    pub fn config_xml(&mut self) -> Result<&str> {
        if self.config.raw().is_none() {
            self.reload_config()?;
        }
        // Loaded by the branch above.
        match self.config.raw() {
            Some(raw) => Ok(raw),
            None => unreachable!("config cache still unloaded after reload"),
        }
    }

    /// Discards any cached config state and re-fetches the raw text.
    pub fn reload_config(&mut self) -> Result<()> {
        let raw = self.server().transport().get(self.config_url()?.as_str())?;
        self.config = ConfigCache::Fetched { raw };
        Ok(())
    }

    /// Parsed config tree, parsing once and memoizing until the next
    /// write-back or reload.
    pub fn config_document(&mut self) -> Result<&Element> {
        self.config_xml()?;
        if matches!(self.config, ConfigCache::Fetched { .. }) {
            let ConfigCache::Fetched { raw } =
                std::mem::replace(&mut self.config, ConfigCache::Unloaded)
            else {
                unreachable!()
            };
            match Element::parse(raw.as_bytes()) {
                Ok(tree) => self.config = ConfigCache::Parsed { raw, tree },
                Err(e) => {
                    // Keep the raw text around so the caller can inspect it.
                    self.config = ConfigCache::Fetched { raw };
                    return Err(e.into());
                }
            }
        }
        match &self.config {
            ConfigCache::Parsed { tree, .. } => Ok(tree),
            _ => unreachable!("config cache not parsed after parse step"),
        }
    }

    /// Replaces the job's configuration on the server with `tree`.
    ///
    /// Serializes the tree, POSTs it to the config endpoint, and on success
    /// memoizes the round-tripped document. A transport failure propagates
    /// unchanged and the previously cached document stays in place.
    pub fn update_config(&mut self, tree: Element) -> Result<()> {
        let mut buf = Vec::new();
        tree.write(&mut buf)?;
        let raw = String::from_utf8_lossy(&buf).into_owned();
        self.server()
            .transport()
            .post(self.config_url()?.as_str(), &raw)?;
        let tree = Element::parse(raw.as_bytes())?;
        self.config = ConfigCache::Parsed { raw, tree };
        Ok(())
    }
}

/// Collects every element reachable from `el` along `path`, in document
/// order. Mirrors an ElementTree `findall` over a fixed child-name path.
pub(crate) fn find_all<'a>(el: &'a Element, path: &[&str]) -> Vec<&'a Element> {
    let Some((head, rest)) = path.split_first() else {
        return vec![el];
    };
    el.children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(|child| child.name == *head)
        .flat_map(|child| find_all(child, rest))
        .collect()
}

/// Mutable twin of [`find_all`].
pub(crate) fn find_all_mut<'a>(el: &'a mut Element, path: &[&str]) -> Vec<&'a mut Element> {
    let Some((head, rest)) = path.split_first() else {
        return vec![el];
    };
    let mut found = Vec::new();
    for child in el.children.iter_mut().filter_map(XMLNode::as_mut_element) {
        if child.name == *head {
            found.extend(find_all_mut(child, rest));
        }
    }
    found
}

/// Replaces an element's text content.
pub(crate) fn set_text(el: &mut Element, value: &str) {
    el.children.retain(|node| !matches!(node, XMLNode::Text(_)));
    el.children.push(XMLNode::Text(value.to_string()));
}

/// An element's text content, empty when it has none.
pub(crate) fn text_of(el: &Element) -> String {
    el.get_text().map(|t| t.into_owned()).unwrap_or_default()
}

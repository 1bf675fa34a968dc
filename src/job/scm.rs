use crate::error::{Error, Result};
use crate::job::config::{find_all, find_all_mut, set_text, text_of};
use crate::job::Job;

/// The source-control system a job checks out from.
///
/// Derived from the `class` attribute of the config document's `scm` node,
/// never stored: classification, extraction and mutation all recompute it
/// from the same document, so they can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmKind {
    Subversion,
    Git,
    Mercurial,
    /// The server's explicit "no SCM" marker (`hudson.scm.NullSCM`).
    NoneConfigured,
}

type XmlPath = &'static [&'static str];

const SVN_URLS: XmlPath = &[
    "scm",
    "locations",
    "hudson.scm.SubversionSCM_-ModuleLocation",
    "remote",
];
const GIT_URLS: XmlPath = &[
    "scm",
    "userRemoteConfigs",
    "hudson.plugins.git.UserRemoteConfig",
    "url",
];
const HG_URLS: XmlPath = &["scm", "source"];
const GIT_BRANCHES: XmlPath = &["scm", "branches", "hudson.plugins.git.BranchSpec", "name"];
const HG_BRANCHES: XmlPath = &["scm", "branch"];

impl ScmKind {
    fn from_class(class: &str) -> Option<ScmKind> {
        match class {
            "hudson.scm.SubversionSCM" => Some(ScmKind::Subversion),
            "hudson.plugins.git.GitSCM" => Some(ScmKind::Git),
            "hudson.plugins.mercurial.MercurialSCM" => Some(ScmKind::Mercurial),
            "hudson.scm.NullSCM" => Some(ScmKind::NoneConfigured),
            _ => None,
        }
    }

    /// Where this kind keeps its checkout URLs in the config document.
    /// Total over the enum; `None` means the kind has no URL locations.
    fn url_path(self) -> Option<XmlPath> {
        match self {
            ScmKind::Subversion => Some(SVN_URLS),
            ScmKind::Git => Some(GIT_URLS),
            ScmKind::Mercurial => Some(HG_URLS),
            ScmKind::NoneConfigured => None,
        }
    }

    /// Where this kind keeps its branch names. Subversion has no branch
    /// concept, so its entry is empty rather than an error.
    fn branch_path(self) -> Option<XmlPath> {
        match self {
            ScmKind::Subversion => None,
            ScmKind::Git => Some(GIT_BRANCHES),
            ScmKind::Mercurial => Some(HG_BRANCHES),
            ScmKind::NoneConfigured => None,
        }
    }
}

/// Selects which extraction rule a mutation targets.
#[derive(Clone, Copy)]
enum ScmField {
    Url,
    Branch,
}

impl ScmField {
    fn path(self, kind: ScmKind) -> Option<XmlPath> {
        match self {
            ScmField::Url => kind.url_path(),
            ScmField::Branch => kind.branch_path(),
        }
    }
}

impl Job {
    /// Classifies the configured SCM.
    ///
    /// Required before any URL/branch operation. An unrecognized class name
    /// is [`Error::UnsupportedScm`]; a document whose SCM block is the
    /// explicit null marker (or is missing entirely) is
    /// [`Error::ScmNotConfigured`].
    pub fn scm_kind(&mut self) -> Result<ScmKind> {
        let name = self.name().to_string();
        let document = self.config_document()?;
        let class = document
            .get_child("scm")
            .and_then(|scm| scm.attributes.get("class"))
            .cloned()
            .ok_or_else(|| Error::ScmNotConfigured(name.clone()))?;
        match ScmKind::from_class(&class) {
            Some(ScmKind::NoneConfigured) => Err(Error::ScmNotConfigured(name)),
            Some(kind) => Ok(kind),
            None => Err(Error::UnsupportedScm { class, job: name }),
        }
    }

    fn scm_texts(&mut self, field: ScmField) -> Result<Vec<String>> {
        let kind = self.scm_kind()?;
        let Some(path) = field.path(kind) else {
            return Ok(Vec::new());
        };
        let document = self.config_document()?;
        Ok(find_all(document, path).into_iter().map(text_of).collect())
    }

    /// The configured checkout URL(s), in document order. Some SCMs allow
    /// several per job.
    pub fn scm_urls(&mut self) -> Result<Vec<String>> {
        self.scm_texts(ScmField::Url)
    }

    /// The configured branch name(s), in document order. Empty for SCM kinds
    /// with no branch concept and for jobs with none configured.
    pub fn scm_branches(&mut self) -> Result<Vec<String>> {
        self.scm_texts(ScmField::Branch)
    }

    fn set_scm_text(&mut self, field: ScmField, new_value: &str, old_value: Option<&str>) -> Result<()> {
        let kind = self.scm_kind()?;
        let Some(path) = field.path(kind) else {
            return Ok(());
        };
        let mut tree = self.config_document()?.clone();
        let nodes = find_all_mut(&mut tree, path);
        let mut touched = false;
        match old_value {
            // First-match-wins when the caller does not disambiguate.
            None => {
                if let Some(first) = nodes.into_iter().next() {
                    set_text(first, new_value);
                    touched = true;
                }
            }
            Some(old) => {
                for node in nodes {
                    if text_of(node) == old {
                        set_text(node, new_value);
                        touched = true;
                    }
                }
            }
        }
        // Nothing matched: silent no-op, no write-back.
        if touched {
            self.update_config(tree)?;
        }
        Ok(())
    }

    /// Rewrites the job's checkout URL and writes the config back.
    ///
    /// Without `old_url`, the first configured URL is replaced. With it,
    /// every URL whose current text equals `old_url` is replaced, and the
    /// config is written back only if at least one matched.
    pub fn set_scm_url(&mut self, new_url: &str, old_url: Option<&str>) -> Result<()> {
        self.set_scm_text(ScmField::Url, new_url, old_url)
    }

    /// Same replacement policy as [`set_scm_url`](Job::set_scm_url), applied
    /// to the branch rule.
    pub fn set_scm_branch(&mut self, new_branch: &str, old_branch: Option<&str>) -> Result<()> {
        self.set_scm_text(ScmField::Branch, new_branch, old_branch)
    }
}

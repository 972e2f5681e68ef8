use std::fmt;

/// Placeholder tag the daemon reports for untagged images.
pub const NONE_TAG: &str = "<none>:<none>";
/// Placeholder digest the daemon reports for images without a digest.
pub const NONE_DIGEST: &str = "<none>@<none>";

const SHORT_ID_LEN: usize = 12;

/// An image as seen in one inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    /// Empty when the image is the root of its lineage.
    pub parent_id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    /// Creation time in unix seconds.
    pub created: i64,
}

impl Image {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            repo_tags: Vec::new(),
            repo_digests: Vec::new(),
            created,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repo_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_digests<I, S>(mut self, digests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repo_digests = digests.into_iter().map(Into::into).collect();
        self
    }

    /// Tags other than the `<none>:<none>` placeholder.
    pub fn real_tags(&self) -> impl Iterator<Item = &str> {
        self.repo_tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !tag.is_empty() && *tag != NONE_TAG)
    }

    /// Digests other than the `<none>@<none>` placeholder.
    pub fn real_digests(&self) -> impl Iterator<Item = &str> {
        self.repo_digests
            .iter()
            .map(String::as_str)
            .filter(|digest| !digest.is_empty() && *digest != NONE_DIGEST)
    }

    pub fn has_tags(&self) -> bool {
        self.real_tags().next().is_some()
    }

    pub fn has_digests(&self) -> bool {
        self.real_digests().next().is_some()
    }

    /// An image carrying neither a real tag nor a real digest.
    pub fn is_dangling(&self) -> bool {
        !self.has_tags() && !self.has_digests()
    }

    pub fn is_orphan(&self) -> bool {
        self.parent_id.is_empty()
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn short_parent_id(&self) -> &str {
        short_id(&self.parent_id)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.real_tags().collect();
        if tags.is_empty() {
            write!(f, "{} (<none>)", self.short_id())
        } else {
            write!(f, "{} ({})", self.short_id(), tags.join(","))
        }
    }
}

/// Strips the `sha256:` prefix and truncates to the usual short form.
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// A container and the image it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// Image id as reported by the container listing; may be empty.
    pub image_id: String,
}

impl Container {
    pub fn new(id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
        }
    }
}

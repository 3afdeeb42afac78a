//! Story loaders.
//!
//! The tree builder and the embedder obtain story text through
//! [`StoryLoader`]. Two loaders ship with the engine: an in-memory map and a
//! capability-scoped directory.

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use thiserror::Error;

/// Error raised when story text cannot be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// No story exists at the path.
    #[error("story `{path}` not found")]
    NotFound {
        /// Requested path.
        path: String,
    },
    /// The story root could not be opened.
    #[error("failed to open story directory `{root}`: {source}")]
    OpenRoot {
        /// Directory path.
        root: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading the story failed.
    #[error("failed to read story `{path}`: {source}")]
    Io {
        /// Requested path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Source of story text keyed by path.
pub trait StoryLoader: Send + Sync {
    /// Load the text of the story at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the story is missing or unreadable.
    fn load_story_text(&self, path: &str) -> Result<String, LoadError>;
}

/// Stories held in memory.
///
/// # Examples
///
/// ```
/// use storyline::{InMemoryStories, StoryLoader};
///
/// let stories = InMemoryStories::new().with("a.story", "Scenario: s1");
/// assert_eq!(stories.load_story_text("a.story").ok().as_deref(), Some("Scenario: s1"));
/// assert!(stories.load_story_text("b.story").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStories {
    stories: BTreeMap<String, String>,
}

impl InMemoryStories {
    /// No stories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `path`, replacing any earlier text.
    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.stories.insert(path.into(), text.into());
    }

    /// Store `text` under `path`, builder style.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Stored paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.stories.keys().map(String::as_str)
    }
}

impl<P: Into<String>, T: Into<String>> FromIterator<(P, T)> for InMemoryStories {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        Self {
            stories: iter
                .into_iter()
                .map(|(path, text)| (path.into(), text.into()))
                .collect(),
        }
    }
}

impl StoryLoader for InMemoryStories {
    fn load_story_text(&self, path: &str) -> Result<String, LoadError> {
        self.stories
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_string(),
            })
    }
}

/// Stories read from a directory capability.
///
/// Story paths are resolved relative to the directory and cannot escape it.
#[derive(Debug)]
pub struct LoadFromDirectory {
    root: Dir,
    display: Utf8PathBuf,
}

impl LoadFromDirectory {
    /// Open `root` with ambient authority.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::OpenRoot`] when the directory cannot be opened.
    pub fn open(root: impl AsRef<Utf8Path>) -> Result<Self, LoadError> {
        let root = root.as_ref();
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(|source| {
            LoadError::OpenRoot {
                root: root.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::from_dir(dir, root))
    }

    /// Wrap an already opened directory; `display` names it in logs.
    #[must_use]
    pub fn from_dir(root: Dir, display: impl AsRef<Utf8Path>) -> Self {
        Self {
            root,
            display: display.as_ref().to_path_buf(),
        }
    }

    /// Path the directory was opened from.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        &self.display
    }
}

impl StoryLoader for LoadFromDirectory {
    fn load_story_text(&self, path: &str) -> Result<String, LoadError> {
        self.root.read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_string(),
                }
            } else {
                LoadError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }
}

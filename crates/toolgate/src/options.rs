//! Configuration options and builder for the permission service
//!
//! [`PermissionOptions`] configures a [`PermissionService`](crate::permissions::PermissionService):
//! the directory relative request paths are resolved against, and how many
//! events each subscriber may have buffered before new ones are dropped.
//!
//! # Example
//!
//! ```
//! use toolgate::options::PermissionOptions;
//!
//! let options = PermissionOptions::builder()
//!     .working_directory("/srv/project")
//!     .event_buffer(128)
//!     .build();
//! assert_eq!(options.event_buffer, 128);
//! ```
//!
//! # Builder Pattern
//!
//! All fields have sensible defaults. Options are only validated when the
//! service is constructed, so building never fails.

use std::path::PathBuf;

use crate::pubsub::DEFAULT_BUFFER;

/// Configuration for a permission service
///
/// # Example
///
/// ```
/// use toolgate::options::PermissionOptions;
///
/// let options = PermissionOptions::default();
/// assert!(options.working_directory.is_none());
/// assert_eq!(options.event_buffer, 64);
/// ```
#[derive(Debug, Clone)]
pub struct PermissionOptions {
    /// Base directory for relative request paths
    ///
    /// Must be absolute. `None` uses the process working directory at the
    /// time the service is constructed.
    pub working_directory: Option<PathBuf>,

    /// Per-subscriber event channel capacity (must be greater than zero)
    pub event_buffer: usize,
}

impl Default for PermissionOptions {
    fn default() -> Self {
        Self {
            working_directory: None,
            event_buffer: DEFAULT_BUFFER,
        }
    }
}

impl PermissionOptions {
    /// Create a new options builder
    ///
    /// # Example
    ///
    /// ```
    /// use toolgate::options::PermissionOptions;
    ///
    /// let options = PermissionOptions::builder()
    ///     .event_buffer(8)
    ///     .build();
    /// ```
    pub fn builder() -> PermissionOptionsBuilder {
        PermissionOptionsBuilder::default()
    }
}

/// Builder for [`PermissionOptions`]
#[derive(Debug, Default)]
pub struct PermissionOptionsBuilder {
    inner: PermissionOptions,
}

impl PermissionOptionsBuilder {
    /// Set the base directory for relative request paths
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.working_directory = Some(path.into());
        self
    }

    /// Set the per-subscriber event buffer size
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.inner.event_buffer = capacity;
        self
    }

    /// Build the options
    pub fn build(self) -> PermissionOptions {
        self.inner
    }
}

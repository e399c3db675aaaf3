//! Well-known names and defaults shared across the crate.

/// Name used for the user agent and default file names.
pub const APP_NAME: &str = "build-acd";

/// Default collection registry.
pub const DEFAULT_GALAXY_URL: &str = "https://galaxy.ansible.com/";

/// Default package index hosting the base platform.
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/";

/// Package whose latest release is the base platform version.
pub const DEFAULT_BASE_PACKAGE: &str = "ansible-base";

/// Default per-request deadline, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default cap on the number of version pages followed for one collection.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Stem for build/deps files when no pieces file name is available.
pub const DEFAULT_FILE_BASE: &str = "acd";

/// Reserved manifest key holding the `major.minor` release series.
pub const ACD_VERSION_KEY: &str = "_acd_version";

/// Reserved manifest key holding the base platform version.
pub const BASE_VERSION_KEY: &str = "_ansible_base_version";

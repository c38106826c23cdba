//! Browser-driven downloads of air quality data.
//!
//! - [`Orchestrator`]: per-target session state machine with bounded steps
//! - [`SiteAdapter`] implementations for the city archive ([`ArchiveSite`])
//!   and the satellite portal ([`PortalSite`])
//! - [`DownloadWatch`]: detection of the finished file in the download directory
//! - [`BatchDriver`]: sequential, failure-isolating runs over many targets

pub mod adapter;
pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod sites;
pub mod target;
pub mod watch;

pub use adapter::{SiteAdapter, Timeouts};
pub use batch::{BatchDriver, BatchEntry, BatchReport};
pub use error::{FetchError, FetchState, FetchStep};
pub use orchestrator::{DownloadResult, DownloadedFile, Orchestrator};
pub use sites::{ArchiveSite, PortalSite};
pub use target::{DownloadTarget, PollutantKind, PortalQuery, PortalWindow, Site, TargetSource, portal_targets};
pub use watch::{DownloadWatch, rename_no_clobber};

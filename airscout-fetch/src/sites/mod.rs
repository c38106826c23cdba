//! Adapters for the two supported download sites.

mod archive;
mod portal;

pub use archive::ArchiveSite;
pub use portal::PortalSite;

use crate::error::FetchError;
use url::Url;

fn parse_base(base_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(base_url)
        .map_err(|e| FetchError::InvalidInput(format!("base url {base_url:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidInput(format!(
            "base url {base_url:?} cannot carry a fragment route"
        )));
    }
    Ok(url)
}

//! Global site data handle.
//!
//! Lock-free reads via `ArcSwap`; the whole value is swapped when
//! `site.yaml` is (re)loaded.

use super::SiteData;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

static SITE: LazyLock<ArcSwap<SiteData>> =
    LazyLock::new(|| ArcSwap::from_pointee(SiteData::default()));

/// Get the current site data (cheap, lock-free).
#[inline]
pub fn site() -> Arc<SiteData> {
    SITE.load_full()
}

/// Replace the global site data wholesale.
pub fn replace_site(data: SiteData) {
    SITE.store(Arc::new(data));
}

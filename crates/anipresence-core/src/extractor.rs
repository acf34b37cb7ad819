//! Per-service eligibility checks and product identity reads.

use crate::page::Page;
use crate::service::{Selectors, ServiceDescriptor, ServiceKind};

/// Genre label the sites use for anime.
const ANIME_GENRE: &str = "アニメ";

/// Provider label of official live broadcasts.
const OFFICIAL_PROVIDER: &str = "公式";

/// Content that passed the service's checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligible {
    pub product: String,
}

/// Extractor variant for a supported service.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Channel videos; the product is the channel name.
    Nicovideo(Selectors),
    /// Official live broadcasts tagged as anime.
    Nicolive(Selectors),
    /// Episodes whose detail page lists an anime genre.
    PrimeVideo(Selectors),
}

impl Extractor {
    pub fn for_service(service: &ServiceDescriptor) -> Self {
        let selectors = service.selectors.clone();
        match service.kind {
            ServiceKind::Nicovideo => Self::Nicovideo(selectors),
            ServiceKind::Nicolive => Self::Nicolive(selectors),
            ServiceKind::PrimeVideo => Self::PrimeVideo(selectors),
        }
    }

    pub fn selectors(&self) -> &Selectors {
        match self {
            Self::Nicovideo(s) | Self::Nicolive(s) | Self::PrimeVideo(s) => s,
        }
    }

    /// Run the service's checks. `None` means the page must be left alone.
    pub fn check_eligibility<P: Page>(&self, page: &P) -> Option<Eligible> {
        let sel = self.selectors();
        let eligible = match self {
            Self::Nicovideo(_) => page
                .text(&sel.classification)
                .is_some_and(|genre| genre.trim() == ANIME_GENRE),
            Self::Nicolive(_) => {
                let tagged = page
                    .texts(&sel.classification)
                    .iter()
                    .any(|tag| tag.contains(ANIME_GENRE));
                let official = sel
                    .provider
                    .as_deref()
                    .and_then(|p| page.text(p))
                    .is_some_and(|label| label.trim() == OFFICIAL_PROVIDER);
                tagged && official
            }
            Self::PrimeVideo(_) => page
                .texts(&sel.classification)
                .iter()
                .map(|g| g.trim())
                .any(|g| g.contains(ANIME_GENRE) || g.eq_ignore_ascii_case("anime")),
        };
        if !eligible {
            tracing::debug!(extractor = ?self.kind(), "Content not eligible");
            return None;
        }

        // A missing channel link also means the video is not channel-sourced.
        let product = read_trimmed(page, &sel.product)?;
        Some(Eligible { product })
    }

    /// Subtree whose changes signal an in-place episode switch.
    pub fn identity_root(&self) -> Option<&str> {
        self.selectors().identity_root.as_deref()
    }

    /// Re-read the product after the identity root changed.
    pub fn refresh_identity<P: Page>(&self, page: &P) -> Option<String> {
        let sel = self.selectors();
        match self {
            Self::Nicovideo(_) | Self::Nicolive(_) => read_trimmed(page, &sel.product),
            // The player overlay carries the title of whatever episode is loaded.
            Self::PrimeVideo(_) => sel
                .identity_root
                .as_deref()
                .and_then(|root| read_trimmed(page, root))
                .or_else(|| read_trimmed(page, &sel.product)),
        }
    }

    fn kind(&self) -> ServiceKind {
        match self {
            Self::Nicovideo(_) => ServiceKind::Nicovideo,
            Self::Nicolive(_) => ServiceKind::Nicolive,
            Self::PrimeVideo(_) => ServiceKind::PrimeVideo,
        }
    }
}

fn read_trimmed<P: Page>(page: &P, selector: &str) -> Option<String> {
    let text = page.text(selector)?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

//! Listing catalog
//!
//! Holds provider listings in memory and attaches geocoded locations when a
//! listing is created or edited. Search consumes listings through
//! [`ListingSource`] only.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::geocoding::{GeocodeError, Geocoder};
use crate::models::{Listing, ListingDraft, Location, Profile, Skill};
use crate::store::LocationStore;
use crate::{Result, SkillshopError};

const MAX_LOCATION_TEXT_LEN: usize = 120;
const MAX_SKILL_NAME_LEN: usize = 100;

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Active listings, newest first
    async fn active_listings(&self) -> anyhow::Result<Vec<Listing>>;
}

/// Newest first; equal timestamps fall back to the higher id first
fn newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// In-memory listing table
#[derive(Default)]
pub struct ListingCatalog {
    listings: RwLock<Vec<Listing>>,
}

impl ListingCatalog {
    #[must_use]
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings),
        }
    }

    /// Load listings from a JSON array file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read listings file: {}", path.display()))?;
        let listings: Vec<Listing> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse listings file: {}", path.display()))?;
        info!("Loaded {} listings from {}", listings.len(), path.display());
        Ok(Self::new(listings))
    }

    pub async fn get(&self, id: u64) -> Option<Listing> {
        self.listings.read().await.iter().find(|l| l.id == id).cloned()
    }

    /// Existing skill spelling matching `name` ignoring case, if any
    async fn canonical_skill(&self, name: &str) -> Skill {
        let lowered = name.to_lowercase();
        self.listings
            .read()
            .await
            .iter()
            .find(|l| l.skill.name.to_lowercase() == lowered)
            .map(|l| l.skill.clone())
            .unwrap_or_else(|| Skill::new(name))
    }

    async fn insert(&self, mut listing: Listing) -> Listing {
        let mut listings = self.listings.write().await;
        listing.id = listings.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        listings.push(listing.clone());
        listing
    }

    async fn replace(&self, listing: Listing) -> Result<Listing> {
        let mut listings = self.listings.write().await;
        let slot = listings
            .iter_mut()
            .find(|l| l.id == listing.id)
            .ok_or_else(|| SkillshopError::not_found(format!("Listing {} not found", listing.id)))?;
        *slot = listing.clone();
        Ok(listing)
    }
}

#[async_trait]
impl ListingSource for ListingCatalog {
    async fn active_listings(&self) -> anyhow::Result<Vec<Listing>> {
        let mut active: Vec<Listing> = self
            .listings
            .read()
            .await
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect();
        newest_first(&mut active);
        Ok(active)
    }
}

/// Creates and edits listings, resolving their location text on the way in
#[derive(Clone)]
pub struct ListingService {
    catalog: Arc<ListingCatalog>,
    geocoder: Arc<dyn Geocoder>,
    store: Arc<dyn LocationStore>,
}

impl ListingService {
    pub fn new(
        catalog: Arc<ListingCatalog>,
        geocoder: Arc<dyn Geocoder>,
        store: Arc<dyn LocationStore>,
    ) -> Self {
        Self {
            catalog,
            geocoder,
            store,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<ListingCatalog> {
        &self.catalog
    }

    /// A single listing as shown to searchers; inactive listings are hidden
    pub async fn active_listing(&self, listing_id: u64) -> Result<Listing> {
        self.catalog
            .get(listing_id)
            .await
            .filter(|l| l.is_active)
            .ok_or_else(|| SkillshopError::not_found(format!("Listing {listing_id} not found")))
    }

    #[instrument(skip(self, profile, draft), fields(profile_id = profile.id))]
    pub async fn create_listing(&self, profile: &Profile, draft: ListingDraft) -> Result<Listing> {
        if !profile.is_provider {
            return Err(SkillshopError::permission_denied(format!(
                "Profile {} is not a provider",
                profile.id
            )));
        }

        let skill_name = validate_skill(&draft.skill)?;
        let location = self.resolve_location(&draft.location_text).await?;
        let skill = self.catalog.canonical_skill(skill_name).await;

        let listing = self
            .catalog
            .insert(Listing {
                id: 0,
                provider_id: profile.id,
                skill,
                description: draft.description,
                price: draft.price,
                is_active: draft.is_active,
                location: Some(location),
                created_at: Utc::now(),
            })
            .await;

        info!("Created listing {} for provider {}", listing.id, profile.id);
        Ok(listing)
    }

    #[instrument(skip(self, profile, draft), fields(profile_id = profile.id))]
    pub async fn edit_listing(
        &self,
        listing_id: u64,
        profile: &Profile,
        draft: ListingDraft,
    ) -> Result<Listing> {
        let existing = self
            .catalog
            .get(listing_id)
            .await
            .ok_or_else(|| SkillshopError::not_found(format!("Listing {listing_id} not found")))?;

        if existing.provider_id != profile.id {
            return Err(SkillshopError::permission_denied(format!(
                "Profile {} does not own listing {}",
                profile.id, listing_id
            )));
        }

        let skill_name = validate_skill(&draft.skill)?;
        let location = self.resolve_location(&draft.location_text).await?;
        let skill = self.catalog.canonical_skill(skill_name).await;

        let updated = self
            .catalog
            .replace(Listing {
                skill,
                description: draft.description,
                price: draft.price,
                is_active: draft.is_active,
                location: Some(location),
                ..existing
            })
            .await?;

        info!("Updated listing {}", updated.id);
        Ok(updated)
    }

    /// Geocode listing location text and store (or reuse) the named location
    async fn resolve_location(&self, location_text: &str) -> Result<Location> {
        let text = location_text.trim();
        if text.is_empty() {
            return Err(SkillshopError::validation("Enter a town/city or postcode"));
        }
        if text.chars().count() > MAX_LOCATION_TEXT_LEN {
            return Err(SkillshopError::validation(format!(
                "Location must be at most {MAX_LOCATION_TEXT_LEN} characters"
            )));
        }

        let coordinates = match self.geocoder.resolve(text).await {
            Ok(coordinates) => coordinates,
            Err(GeocodeError::NoMatch { .. }) => {
                debug!("No geocoding match for listing location '{}'", text);
                return Err(SkillshopError::location_not_found(text));
            }
            Err(err @ GeocodeError::Unavailable { .. }) => {
                warn!("Geocoding failed for listing location '{}': {}", text, err);
                return Err(SkillshopError::location_not_found(text));
            }
        };

        Ok(self.store.get_or_create(text, coordinates).await?)
    }
}

fn validate_skill(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SkillshopError::validation("Please select a skill"));
    }
    if name.chars().count() > MAX_SKILL_NAME_LEN {
        return Err(SkillshopError::validation(format!(
            "Skill name must be at most {MAX_SKILL_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::store::InMemoryLocationStore;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    struct FixedGeocoder(HashMap<&'static str, Coordinates>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn resolve(&self, text: &str) -> std::result::Result<Coordinates, GeocodeError> {
            self.0.get(text).copied().ok_or(GeocodeError::NoMatch {
                query: text.to_string(),
            })
        }
    }

    const PROVIDER: Profile = Profile {
        id: 1,
        is_provider: true,
    };
    const SEEKER: Profile = Profile {
        id: 2,
        is_provider: false,
    };

    fn service() -> (ListingService, Arc<InMemoryLocationStore>) {
        let geocoder = FixedGeocoder(HashMap::from([
            ("Leeds", Coordinates::new(53.7996, -1.5491)),
            ("leeds", Coordinates::new(1.0, 1.0)),
            ("York", Coordinates::new(53.9590, -1.0815)),
        ]));
        let store = Arc::new(InMemoryLocationStore::new());
        let service = ListingService::new(
            Arc::new(ListingCatalog::default()),
            Arc::new(geocoder),
            store.clone(),
        );
        (service, store)
    }

    fn draft(skill: &str, location: &str) -> ListingDraft {
        ListingDraft {
            skill: skill.to_string(),
            description: "Weekly sessions".to_string(),
            price: 20.0,
            is_active: true,
            location_text: location.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_listing_attaches_location() {
        let (service, store) = service();
        let listing = service
            .create_listing(&PROVIDER, draft("Guitar", " Leeds "))
            .await
            .unwrap();

        assert_eq!(listing.id, 1);
        assert_eq!(listing.provider_id, PROVIDER.id);
        let location = listing.location.unwrap();
        assert_eq!(location.name, "Leeds");
        assert_eq!(location.coordinates(), Coordinates::new(53.7996, -1.5491));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_active_listing_hides_inactive_and_missing() {
        let (service, _) = service();
        let shown = service
            .create_listing(&PROVIDER, draft("Guitar", "Leeds"))
            .await
            .unwrap();
        let mut hidden = draft("Drums", "Leeds");
        hidden.is_active = false;
        let hidden = service.create_listing(&PROVIDER, hidden).await.unwrap();

        assert_eq!(service.active_listing(shown.id).await.unwrap(), shown);
        for id in [hidden.id, 99] {
            let err = service.active_listing(id).await.unwrap_err();
            assert!(matches!(err, SkillshopError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_create_listing_requires_provider() {
        let (service, _) = service();
        let err = service
            .create_listing(&SEEKER, draft("Guitar", "Leeds"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_create_listing_unknown_place() {
        let (service, store) = service();
        let err = service
            .create_listing(&PROVIDER, draft("Guitar", "Atlantis"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::LocationNotFound { .. }));
        assert_eq!(
            err.user_message(),
            "Could not find that location. Try a postcode or full town/city name."
        );
        assert!(store.is_empty().await);
        assert!(service.catalog().active_listings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_listing_validates_input() {
        let (service, _) = service();
        let err = service
            .create_listing(&PROVIDER, draft("  ", "Leeds"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::Validation { .. }));

        let err = service
            .create_listing(&PROVIDER, draft("Guitar", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::Validation { .. }));

        let long = "x".repeat(121);
        let err = service
            .create_listing(&PROVIDER, draft("Guitar", &long))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_second_listing_reuses_stored_location() {
        let (service, store) = service();
        let first = service
            .create_listing(&PROVIDER, draft("Guitar", "Leeds"))
            .await
            .unwrap();
        // Geocoder answers differently for the lowercase spelling
        let second = service
            .create_listing(&PROVIDER, draft("Piano", "leeds"))
            .await
            .unwrap();

        assert_eq!(first.location, second.location);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_skill_reused_case_insensitively() {
        let (service, _) = service();
        service
            .create_listing(&PROVIDER, draft("Guitar Lessons", "Leeds"))
            .await
            .unwrap();
        let second = service
            .create_listing(&PROVIDER, draft("guitar lessons", "York"))
            .await
            .unwrap();
        assert_eq!(second.skill.name, "Guitar Lessons");
    }

    #[tokio::test]
    async fn test_edit_listing_owner_only() {
        let (service, _) = service();
        let listing = service
            .create_listing(&PROVIDER, draft("Guitar", "Leeds"))
            .await
            .unwrap();

        let other_provider = Profile {
            id: 9,
            is_provider: true,
        };
        let err = service
            .edit_listing(listing.id, &other_provider, draft("Guitar", "York"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::PermissionDenied { .. }));

        let updated = service
            .edit_listing(listing.id, &PROVIDER, draft("Guitar", "York"))
            .await
            .unwrap();
        assert_eq!(updated.id, listing.id);
        assert_eq!(updated.provider_id, PROVIDER.id);
        assert_eq!(updated.created_at, listing.created_at);
        assert_eq!(updated.location.unwrap().name, "York");
    }

    #[tokio::test]
    async fn test_edit_missing_listing() {
        let (service, _) = service();
        let err = service
            .edit_listing(42, &PROVIDER, draft("Guitar", "Leeds"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillshopError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_active_listings_newest_first() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let listing = |id: u64, offset_days: i64, active: bool| Listing {
            id,
            provider_id: 1,
            skill: Skill::new("Yoga"),
            description: String::new(),
            price: 10.0,
            is_active: active,
            location: None,
            created_at: base + Duration::days(offset_days),
        };
        let catalog = ListingCatalog::new(vec![
            listing(1, 0, true),
            listing(2, 5, true),
            listing(3, 9, false),
            listing(4, 5, true),
        ]);

        let ids: Vec<u64> = catalog
            .active_listings()
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![4, 2, 1]);
    }
}

//! Business logic services

pub mod availability;
pub mod booking_number;
pub mod bookings;
pub mod catalog;
pub mod gift_cards;
pub mod schedules;

use std::sync::Arc;

use crate::{config::BookingConfig, error::AppResult, repository::Store};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub availability: availability::AvailabilityService,
    pub bookings: bookings::BookingsService,
    store: Arc<dyn Store>,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn Store>, booking_config: &BookingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            availability: availability::AvailabilityService::new(store.clone()),
            bookings: bookings::BookingsService::new(store.clone(), booking_config),
            store,
        }
    }

    /// Check that the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

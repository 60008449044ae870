//! Catalog service for bookable services

use std::sync::Arc;

use crate::{error::AppResult, models::Service, repository::Store};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Active services, popular ones first, then by name
    pub async fn list_available_services(&self) -> AppResult<Vec<Service>> {
        let mut services = self.store.list_active_services().await?;
        services.sort_by(|a, b| b.is_popular.cmp(&a.is_popular).then_with(|| a.name.cmp(&b.name)));
        Ok(services)
    }
}

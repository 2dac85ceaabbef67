//! Resource catalog: the halls that can be booked.

use crate::error::{DomainError, Result, TargetType};
use crate::types::{NewResource, Resource};
use certifytrack_core::ids::ResourceId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Lookup table of bookable resources.
#[derive(Debug, Default)]
pub struct ResourceCatalog {
    resources: RwLock<HashMap<ResourceId, Resource>>,
}

impl ResourceCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for an empty code or name, zero
    /// capacity, or a code already in use.
    pub async fn register(&self, new_resource: NewResource) -> Result<Resource> {
        let code = new_resource.code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::Validation(
                "resource code cannot be empty".to_string(),
            ));
        }
        if new_resource.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "resource name cannot be empty".to_string(),
            ));
        }
        if new_resource.capacity == 0 {
            return Err(DomainError::Validation(
                "resource capacity must be greater than zero".to_string(),
            ));
        }

        let mut resources = self.resources.write().await;
        if resources.values().any(|r| r.code.eq_ignore_ascii_case(&code)) {
            return Err(DomainError::Validation(format!(
                "resource code '{code}' is already in use"
            )));
        }

        let resource = Resource {
            id: ResourceId::new(),
            code,
            name: new_resource.name,
            capacity: new_resource.capacity,
            location: new_resource.location,
            is_available: true,
        };
        resources.insert(resource.id, resource.clone());
        tracing::info!(resource_id = %resource.id, code = %resource.code, "Resource registered");
        Ok(resource)
    }

    /// Look up a resource.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown id.
    pub async fn get(&self, id: ResourceId) -> Result<Resource> {
        self.resources
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(TargetType::Resource, id))
    }

    /// All resources, ordered by code.
    pub async fn list(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self.resources.read().await.values().cloned().collect();
        resources.sort_by(|a, b| a.code.cmp(&b.code));
        resources
    }

    /// Take a resource out of service.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown id.
    pub async fn withdraw(&self, id: ResourceId) -> Result<Resource> {
        self.set_available(id, false).await
    }

    /// Put a withdrawn resource back into service.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown id.
    pub async fn restore(&self, id: ResourceId) -> Result<Resource> {
        self.set_available(id, true).await
    }

    async fn set_available(&self, id: ResourceId, available: bool) -> Result<Resource> {
        let mut resources = self.resources.write().await;
        let resource = resources
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(TargetType::Resource, id))?;
        resource.is_available = available;
        tracing::info!(resource_id = %id, available, "Resource availability changed");
        Ok(resource.clone())
    }
}

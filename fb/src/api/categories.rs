//! Category endpoints

use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest, Category, Method};

pub struct CategoriesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> CategoriesApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ApiError> {
        debug!("CategoriesApi::list: called");
        self.client.call(ApiRequest::new(Method::Get, "/categories/")).await
    }
}

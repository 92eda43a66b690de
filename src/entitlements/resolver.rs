use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::provider::EntitlementProvider;
use crate::error::{CoreError, Result};
use crate::models::{Company, Product, Section, User};
use crate::search::{SearchParams, SearchQuery};

/// Apply the seat rule to a company's product assignments
///
/// An assignment with zero seats covers every user of the company;
/// otherwise the user must be named on the product directly. Disabled
/// products and assignments pointing at the wrong section drop out.
pub fn entitled_products(
    user: &User,
    company: &Company,
    products_by_id: &HashMap<Uuid, Product>,
    section: Section,
) -> Vec<Product> {
    company
        .section_products(section)
        .filter(|assignment| assignment.seats == 0 || user.products.contains(&assignment.product_id))
        .filter_map(|assignment| products_by_id.get(&assignment.product_id))
        .filter(|product| product.is_enabled && product.section == section)
        .cloned()
        .collect()
}

/// Resolves who is searching and what they may see
///
/// The output is a compile context carrying the acting account, its
/// company and the narrowed product scope. Every search and topic match
/// starts here.
pub struct EntitlementResolver {
    provider: Arc<dyn EntitlementProvider>,
}

impl EntitlementResolver {
    pub fn new(provider: Arc<dyn EntitlementProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the acting account and its product scope for one request
    pub async fn prepare(
        &self,
        section: Section,
        user_id: &Uuid,
        params: SearchParams,
    ) -> Result<SearchQuery> {
        let requester = self
            .provider
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User not found: {}", user_id)))?;
        if !requester.is_enabled {
            return Err(CoreError::Forbidden("User account is disabled".to_string()));
        }

        // Operators may run the request in another account's scope
        let user = match params
            .impersonate
            .filter(|target| requester.is_admin() && *target != requester.id)
        {
            Some(target) => match self.provider.get_user(&target).await? {
                Some(target_user) => {
                    debug!(operator = %requester.id, target = %target_user.id, "running in impersonated scope");
                    target_user
                }
                None => {
                    debug!(operator = %requester.id, %target, "impersonation target not found, keeping operator scope");
                    requester
                }
            },
            None => requester,
        };
        let is_admin = user.is_admin();

        let company = match user.company {
            Some(company_id) => self.provider.get_company(&company_id).await?,
            None => None,
        };
        if let Some(company) = &company {
            if !company.is_enabled {
                return Err(CoreError::Forbidden("Company account is disabled".to_string()));
            }
        }

        let products = self
            .resolve_products(section, &user, company.as_ref(), is_admin, &params)
            .await?;

        debug!(
            section = %section,
            user = %user.id,
            is_admin,
            products = products.len(),
            "resolved search scope"
        );

        let mut query = SearchQuery::new(section, params)
            .with_user(user)
            .with_admin(is_admin)
            .with_products(products);
        if let Some(company) = company {
            query = query.with_company(company);
        }
        Ok(query)
    }

    /// Narrow the section's products to what this account may see
    ///
    /// An empty result for an operator means no product restriction at
    /// all, so operators without an explicit product or navigation
    /// short-circuit to the unrestricted scope.
    async fn resolve_products(
        &self,
        section: Section,
        user: &User,
        company: Option<&Company>,
        is_admin: bool,
        params: &SearchParams,
    ) -> Result<Vec<Product>> {
        if is_admin && params.product.is_none() && params.navigation.is_empty() {
            return Ok(Vec::new());
        }

        let mut products = if is_admin {
            self.provider.get_section_products(section).await?
        } else {
            let company = company.ok_or_else(|| {
                CoreError::Forbidden("User is not assigned to a company".to_string())
            })?;
            let ids: Vec<Uuid> = company
                .section_products(section)
                .map(|assignment| assignment.product_id)
                .collect();
            let by_id: HashMap<Uuid, Product> = self
                .provider
                .get_products(&ids)
                .await?
                .into_iter()
                .map(|product| (product.id, product))
                .collect();
            entitled_products(user, company, &by_id, section)
        };

        if let Some(product_id) = params.product {
            if !products.iter().any(|p| p.id == product_id) {
                return Err(CoreError::NotFound(format!("Product not found: {}", product_id)));
            }
            products.retain(|p| p.id == product_id);
        }

        if !params.navigation.is_empty() {
            products.retain(|p| p.matches_navigation(&params.navigation));
        }

        if products.is_empty() && !is_admin {
            return Err(CoreError::Forbidden(
                "User has no products for this section".to_string(),
            ));
        }

        Ok(products)
    }
}

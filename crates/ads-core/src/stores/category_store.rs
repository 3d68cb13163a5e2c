use std::sync::Arc;

use ads_domain::{Category, CategoryKind, DEFAULT_CATEGORY_COLOR};
use tracing::{debug, info};

use crate::aggregation::compare_labels;
use crate::backend::CategoryInput;
use crate::session::ApiClient;
use crate::validation::validate_category;
use crate::{CoreError, CoreResult};

pub struct CategoryStore {
    api: Arc<ApiClient>,
    categories: Vec<Category>,
    defaults: Vec<Category>,
    loaded: bool,
}

impl CategoryStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            categories: Vec::new(),
            defaults: Vec::new(),
            loaded: false,
        }
    }

    pub fn fetch(&mut self) -> CoreResult<()> {
        let mut categories = self
            .api
            .call(|backend, ctx| backend.list_categories(ctx, None))?;
        let mut defaults = self.api.call(|backend, ctx| backend.default_categories(ctx))?;
        categories.sort_by(|a, b| compare_labels(&a.name, &b.name));
        defaults.sort_by(|a, b| compare_labels(&a.name, &b.name));
        debug!(
            count = categories.len(),
            defaults = defaults.len(),
            "categories fetched"
        );
        self.categories = categories;
        self.defaults = defaults;
        self.loaded = true;
        Ok(())
    }

    pub fn ensure_loaded(&mut self) -> CoreResult<()> {
        if self.loaded {
            return Ok(());
        }
        self.fetch()
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn defaults(&self) -> &[Category] {
        &self.defaults
    }

    pub fn by_kind(&self, kind: CategoryKind) -> Vec<&Category> {
        self.categories.iter().filter(|c| c.kind == kind).collect()
    }

    /// Case-insensitive lookup within one kind.
    pub fn find_by_name(&self, kind: CategoryKind, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.kind == kind && c.name.trim().eq_ignore_ascii_case(name))
    }

    pub fn create(&mut self, input: CategoryInput) -> CoreResult<Category> {
        let input = checked(input)?;
        let created = self
            .api
            .call(|backend, ctx| backend.create_category(ctx, &input))?;
        info!(category = %created.name, kind = %created.kind, "category created");
        self.categories.push(created.clone());
        self.categories
            .sort_by(|a, b| compare_labels(&a.name, &b.name));
        Ok(created)
    }

    pub fn update(&mut self, id: &str, input: CategoryInput) -> CoreResult<Category> {
        self.ensure_custom(id)?;
        let input = checked(input)?;
        let updated = self
            .api
            .call(|backend, ctx| backend.update_category(ctx, id, &input))?;
        info!(category = %updated.name, "category updated");
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// The backend refuses categories still used by a report.
    pub fn delete(&mut self, id: &str) -> CoreResult<()> {
        self.ensure_custom(id)?;
        self.api.call(|backend, ctx| backend.delete_category(ctx, id))?;
        info!(category = %id, "category deleted");
        self.categories.retain(|c| c.id != id);
        Ok(())
    }

    fn ensure_custom(&self, id: &str) -> CoreResult<()> {
        let known = self
            .categories
            .iter()
            .chain(self.defaults.iter())
            .find(|c| c.id == id);
        match known {
            Some(category) if !category.is_editable() => Err(CoreError::InvalidOperation(
                format!("la categoria predefinita {} non è modificabile", category.name),
            )),
            _ => Ok(()),
        }
    }
}

fn checked(mut input: CategoryInput) -> CoreResult<CategoryInput> {
    input.name = input.name.trim().to_string();
    input.description = input
        .description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    if input.color.trim().is_empty() {
        input.color = DEFAULT_CATEGORY_COLOR.to_string();
    }
    validate_category(&input.name, &input.color, input.description.as_deref())
        .into_result()
        .map_err(CoreError::Validation)?;
    Ok(input)
}

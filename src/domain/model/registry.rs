//! ModelRegistry for mapping route names to EntityModel implementations.

use crate::domain::model::catalog::CATALOG;
use crate::domain::model::EntityModel;
use std::collections::HashMap;
use std::sync::Arc;

/// A registry that maps entity names to their models, preserving registration order
/// (which is also DDL order).
pub struct ModelRegistry {
    order: Vec<Arc<dyn EntityModel>>,
    models: HashMap<String, Arc<dyn EntityModel>>,
}

impl ModelRegistry {
    /// Creates a new empty ModelRegistry.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            models: HashMap::new(),
        }
    }

    /// Registry preloaded with every entity in the catalog.
    pub fn with_catalog() -> Self {
        let mut reg = Self::new();
        for model in CATALOG {
            reg.register(**model);
        }
        reg
    }

    /// Registers a model under its own name. Re-registering a name replaces the model in place.
    pub fn register<M: EntityModel + 'static>(&mut self, model: M) {
        let name = model.name().to_string();
        let model: Arc<dyn EntityModel> = Arc::new(model);
        match self.order.iter().position(|m| m.name() == name) {
            Some(idx) => self.order[idx] = model.clone(),
            None => self.order.push(model.clone()),
        }
        self.models.insert(name, model);
    }

    /// Retrieves a model by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn EntityModel>> {
        self.models.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn list_models(&self) -> Vec<String> {
        self.order.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<dyn EntityModel>> {
        self.order.iter()
    }

    /// DDL statements in dependency order; child tables follow their parent.
    pub fn get_all_create_table_sql(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for model in &self.order {
            out.push(model.get_create_table_sql());
            if let Some(child) = model.children() {
                out.push(child.create_table_sql);
            }
        }
        out
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_registered_in_order() {
        let reg = ModelRegistry::with_catalog();
        let names = reg.list_models();
        assert_eq!(names.first().map(String::as_str), Some("users"));
        assert!(names.contains(&"orders".to_string()));
        assert!(reg.get(" Orders ").is_some());
        assert!(reg.get("order_details").is_none());
    }

    #[test]
    fn child_ddl_follows_parent() {
        let reg = ModelRegistry::with_catalog();
        let ddl = reg.get_all_create_table_sql();
        let orders = ddl.iter().position(|s| s.contains("TABLE IF NOT EXISTS orders ")).unwrap();
        let details = ddl
            .iter()
            .position(|s| s.contains("TABLE IF NOT EXISTS order_details "))
            .unwrap();
        assert_eq!(details, orders + 1);
    }
}

use std::collections::HashMap;

use crate::categories::{
    DockerTarget, HomebrewTarget, OldDownloadsTarget, PathTarget, ProjectCacheTarget,
    SystemCacheTarget,
};
use crate::config::{Category, Config, Method};
use crate::error::ConfigError;
use crate::platform::Platform;
use crate::target::Target;

pub const SYSTEM_CACHE_ID: &str = "system-cache";

type BuiltinFactory = fn(Category, Platform) -> Box<dyn Target>;

fn homebrew(category: Category, platform: Platform) -> Box<dyn Target> {
    Box::new(HomebrewTarget::new(category, platform))
}

fn docker(category: Category, platform: Platform) -> Box<dyn Target> {
    Box::new(DockerTarget::new(category, platform))
}

fn old_downloads(category: Category, platform: Platform) -> Box<dyn Target> {
    Box::new(OldDownloadsTarget::new(category, platform))
}

fn project_caches(category: Category, platform: Platform) -> Box<dyn Target> {
    Box::new(ProjectCacheTarget::new(category, platform))
}

/// Targets for `method: builtin` categories, keyed by category id.
const BUILTIN_FACTORIES: &[(&str, BuiltinFactory)] = &[
    ("homebrew", homebrew),
    ("docker", docker),
    ("old-downloads", old_downloads),
    ("project-caches", project_caches),
];

pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN_FACTORIES.iter().map(|(id, _)| *id)
}

/// Category id to target, in registration order.
#[derive(Default)]
pub struct Registry {
    targets: HashMap<String, Box<dyn Target>>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an id twice replaces the earlier target.
    pub fn register(&mut self, target: Box<dyn Target>) {
        let id = target.category().id.clone();
        if self.targets.insert(id.clone(), target).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Target> {
        self.targets.get(id).map(|t| t.as_ref())
    }

    pub fn all(&self) -> Vec<&dyn Target> {
        self.order.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn available(&self) -> Vec<&dyn Target> {
        self.all().into_iter().filter(|t| t.is_available()).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("targets", &self.order).finish()
    }
}

/// One target per catalog category.
pub fn default_registry(config: &Config, platform: &Platform) -> Result<Registry, ConfigError> {
    let mut registry = Registry::new();

    for category in &config.categories {
        let target: Box<dyn Target> = if category.id == SYSTEM_CACHE_ID {
            let others: Vec<String> = config
                .categories
                .iter()
                .filter(|c| c.id != category.id)
                .flat_map(|c| c.paths.iter().cloned())
                .collect();
            Box::new(SystemCacheTarget::new(category.clone(), platform.clone(), &others))
        } else if category.method == Method::Builtin {
            let factory = BUILTIN_FACTORIES
                .iter()
                .find(|(id, _)| *id == category.id)
                .map(|(_, factory)| *factory)
                .ok_or_else(|| ConfigError::UnknownBuiltin(category.id.clone()))?;
            factory(category.clone(), platform.clone())
        } else {
            Box::new(PathTarget::new(category.clone(), platform.clone()))
        };
        registry.register(target);
    }

    tracing::debug!("Registered {} targets", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{platform, StubRunner, StubTrash};
    use std::path::Path;

    fn stub_platform() -> Platform {
        platform(StubRunner::new(), StubTrash::default(), Path::new("/nonexistent-home"))
    }

    #[test]
    fn default_registry_covers_the_embedded_catalog() {
        let config = Config::load().unwrap();
        let registry = default_registry(&config, &stub_platform()).unwrap();

        assert_eq!(registry.len(), config.categories.len());
        for id in builtin_ids() {
            let target = registry.get(id).unwrap();
            assert!(target.as_builtin().is_some(), "{id} should clean itself");
        }
        assert!(registry.get(SYSTEM_CACHE_ID).unwrap().as_builtin().is_none());
        assert!(registry.get("npm-cache").unwrap().as_builtin().is_none());
    }

    #[test]
    fn unknown_builtin_id_is_a_config_error() {
        let config = Config {
            groups: Vec::new(),
            categories: vec![Category::new("mystery", "Mystery", Method::Builtin)],
        };
        assert!(matches!(
            default_registry(&config, &stub_platform()),
            Err(ConfigError::UnknownBuiltin(id)) if id == "mystery"
        ));
    }

    #[test]
    fn register_overwrites_and_keeps_order() {
        let mut registry = Registry::new();
        let p = stub_platform();
        registry.register(Box::new(PathTarget::new(Category::new("a", "A", Method::Trash), p.clone())));
        registry.register(Box::new(PathTarget::new(Category::new("b", "B", Method::Trash), p.clone())));
        registry.register(Box::new(PathTarget::new(Category::new("a", "A2", Method::Trash), p)));

        let names: Vec<&str> = registry.all().iter().map(|t| t.category().name.as_str()).collect();
        assert_eq!(names, vec!["A2", "B"]);
        assert!(registry.get("c").is_none());
        // No paths and no check command: nothing is available.
        assert!(registry.available().is_empty());
    }
}

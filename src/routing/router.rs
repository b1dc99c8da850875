//! Route lookup.

use crate::config::RouteConfig;

/// A compiled route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub path_prefix: String,
    pub backend_group: String,
    pub priority: u32,
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes, ordering them for first-match lookup.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = configs
            .iter()
            .map(|c| Route {
                name: c.name.clone(),
                path_prefix: c.path_prefix.clone().unwrap_or_default(),
                backend_group: c.backend_group.clone(),
                priority: c.priority,
            })
            .collect();

        // Stable sort keeps config order among equals
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.path_prefix.len().cmp(&a.path_prefix.len()))
        });

        Self { routes }
    }

    /// First route whose prefix matches `path`.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| path.starts_with(&r.path_prefix))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

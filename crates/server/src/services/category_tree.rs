//! Cached category tree for the storefront.
//!
//! All categories are loaded with one query and kept in a `moka` cache
//! (5-minute TTL). Every admin write to categories calls
//! [`CategoryTree::invalidate`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use shoply_core::CategoryId;

use crate::db::{CategoryRepository, RepositoryError};
use crate::models::{Category, CategoryDetail, CategoryNode, CategoryRef};

const ALL_KEY: &str = "all";

/// Cache of the full category list.
#[derive(Clone)]
pub struct CategoryTree {
    cache: Cache<&'static str, Arc<Vec<Category>>>,
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// All categories, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading from the database fails.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(categories) = self.cache.get(ALL_KEY).await {
            debug!("Cache hit for category tree");
            return Ok(categories);
        }

        let categories = Arc::new(CategoryRepository::new(pool).list_all().await?);
        self.cache.insert(ALL_KEY, Arc::clone(&categories)).await;
        Ok(categories)
    }

    /// Drop the cached list after a category write.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Category tree cache invalidated");
    }
}

/// Nest categories under their parents, siblings sorted by `order` then id.
///
/// Categories whose parent is missing are treated as roots.
#[must_use]
pub fn build_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let ids: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<CategoryId>, Vec<&Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|p| ids.contains(p));
        children.entry(parent).or_default().push(category);
    }
    for group in children.values_mut() {
        group.sort_by_key(|c| (c.order, c.id));
    }

    let mut visited = HashSet::new();
    nodes_for(None, &children, &mut visited)
}

fn nodes_for(
    parent: Option<CategoryId>,
    children: &HashMap<Option<CategoryId>, Vec<&Category>>,
    visited: &mut HashSet<CategoryId>,
) -> Vec<CategoryNode> {
    let Some(group) = children.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(group.len());
    for category in group {
        if !visited.insert(category.id) {
            continue;
        }
        nodes.push(CategoryNode {
            category: (*category).clone(),
            children: nodes_for(Some(category.id), children, visited),
        });
    }
    nodes
}

/// Ancestors of `id` from the root down to its parent.
#[must_use]
pub fn breadcrumbs(categories: &[Category], id: CategoryId) -> Vec<CategoryRef> {
    let by_id: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let mut trail = Vec::new();
    let mut visited = HashSet::from([id]);

    let mut current = by_id.get(&id).and_then(|c| c.parent_id);
    while let Some(parent_id) = current {
        if !visited.insert(parent_id) {
            break;
        }
        let Some(parent) = by_id.get(&parent_id) else {
            break;
        };
        trail.push(CategoryRef::from(*parent));
        current = parent.parent_id;
    }

    trail.reverse();
    trail
}

/// Storefront detail for the category with `slug`.
#[must_use]
pub fn detail(categories: &[Category], slug: &str) -> Option<CategoryDetail> {
    let category = categories.iter().find(|c| c.slug == slug)?;

    let mut children: Vec<Category> = categories
        .iter()
        .filter(|c| c.parent_id == Some(category.id))
        .cloned()
        .collect();
    children.sort_by_key(|c| (c.order, c.id));

    Some(CategoryDetail {
        breadcrumbs: breadcrumbs(categories, category.id),
        category: category.clone(),
        children,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn category(id: i32, parent: Option<i32>, order: i32) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            description: None,
            image_url: None,
            parent_id: parent.map(CategoryId::new),
            order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids(nodes: &[CategoryNode]) -> Vec<i32> {
        nodes.iter().map(|n| n.category.id.as_i32()).collect()
    }

    #[test]
    fn test_build_tree_nests_and_sorts() {
        let categories = vec![
            category(1, None, 1),
            category(2, None, 0),
            category(3, Some(1), 5),
            category(4, Some(1), 2),
            category(5, Some(4), 0),
        ];

        let tree = build_tree(&categories);
        assert_eq!(ids(&tree), vec![2, 1]);

        let clothing = tree.iter().find(|n| n.category.id.as_i32() == 1);
        let clothing = clothing.map(|n| n.children.as_slice()).unwrap_or_default();
        assert_eq!(ids(clothing), vec![4, 3]);
        assert_eq!(clothing.first().map(|n| ids(&n.children)), Some(vec![5]));
    }

    #[test]
    fn test_build_tree_orphans_become_roots() {
        let tree = build_tree(&[category(1, None, 0), category(2, Some(99), 0)]);
        assert_eq!(ids(&tree), vec![1, 2]);
    }

    #[test]
    fn test_build_tree_skips_corrupt_cycle() {
        // 1 -> 2 -> 1 has no root and is left out rather than recursing forever.
        let tree = build_tree(&[category(1, Some(2), 0), category(2, Some(1), 0)]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_build_tree_places_each_category_once() {
        fn count(nodes: &[CategoryNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }

        let categories = vec![
            category(1, None, 0),
            category(2, None, 1),
            category(3, Some(1), 0),
            category(4, Some(1), 1),
            category(5, Some(3), 0),
            category(6, Some(2), 0),
            category(7, Some(6), 0),
        ];
        let tree = build_tree(&categories);
        assert_eq!(count(&tree), categories.len());

        let second = tree.iter().find(|n| n.category.id.as_i32() == 2);
        let depth: Vec<i32> = second
            .and_then(|n| n.children.first())
            .map(|n| ids(&n.children))
            .unwrap_or_default();
        assert_eq!(depth, vec![7]);
    }

    #[test]
    fn test_breadcrumbs_root_first() {
        let categories = vec![
            category(1, None, 0),
            category(2, Some(1), 0),
            category(3, Some(2), 0),
        ];
        let trail: Vec<i32> = breadcrumbs(&categories, CategoryId::new(3))
            .iter()
            .map(|c| c.id.as_i32())
            .collect();
        assert_eq!(trail, vec![1, 2]);
        assert!(breadcrumbs(&categories, CategoryId::new(1)).is_empty());
    }

    #[test]
    fn test_breadcrumbs_terminates_on_cycle() {
        let categories = vec![category(1, Some(2), 0), category(2, Some(1), 0)];
        let trail = breadcrumbs(&categories, CategoryId::new(1));
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_detail_by_slug() {
        let categories = vec![
            category(1, None, 0),
            category(2, Some(1), 1),
            category(3, Some(1), 0),
        ];
        let detail = detail(&categories, "category-1");
        let detail = detail.as_ref();
        assert_eq!(
            detail.map(|d| d.children.iter().map(|c| c.id.as_i32()).collect::<Vec<_>>()),
            Some(vec![3, 2])
        );
        assert_eq!(detail.map(|d| d.breadcrumbs.len()), Some(0));
        assert!(super::detail(&categories, "missing").is_none());
    }
}

// src/recipe/graph.rs

//! Dependency DFS, cycle detection, reverse-topological install order (C7 §4.7 step 2)

use super::cache::RecipeCache;
use crate::error::{Error, Result};

/// Reverse-topological install order for `root` and its transitive
/// dependencies: dependencies before dependents, each name appearing once.
pub fn install_order(cache: &RecipeCache, root: &str) -> Result<Vec<String>> {
    let mut order = Vec::new();
    let mut visited = std::collections::HashSet::new();
    let mut stack = Vec::new();
    visit(cache, root, &mut visited, &mut stack, &mut order)?;
    Ok(order)
}

fn visit(
    cache: &RecipeCache,
    name: &str,
    visited: &mut std::collections::HashSet<String>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    if order.contains(&name.to_string()) {
        return Ok(());
    }
    if stack.contains(&name.to_string()) {
        let mut path = stack.clone();
        path.push(name.to_string());
        return Err(Error::CyclicDependency { path });
    }

    stack.push(name.to_string());
    let recipe = cache.load(name)?;
    for dep in &recipe.metadata.dependencies {
        visit(cache, dep, visited, stack, order)?;
    }
    stack.pop();

    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}

//! Reachability between tree roots through portfolio references.
//!
//! References are treated as undirected edges between the roots of their
//! endpoints: a reference in either direction couples the two trees. A new
//! reference is refused when its target root is already reachable from its
//! source root. The graph is rebuilt from the reference table on every check.

use std::collections::{HashMap, HashSet, VecDeque};

use sea_orm::{ConnectionTrait, DbErr};
use uuid::Uuid;

use crate::collaborators::{Clock, UuidFactory};
use crate::db::references as references_db;
use crate::error::{PortfolioError, Result};
use crate::models::{portfolio, portfolio_reference};

#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    adjacency: HashMap<Uuid, HashSet<Uuid>>,
}

impl ReferenceGraph {
    /// Build from `(source_root, target_root)` pairs; each pair becomes an
    /// edge in both directions.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut adjacency: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (source, target) in pairs {
            adjacency.entry(source).or_default().insert(target);
            adjacency.entry(target).or_default().insert(source);
        }
        Self { adjacency }
    }

    /// Load every portfolio-to-portfolio reference. Application references
    /// never take part.
    pub async fn load<C: ConnectionTrait>(db: &C) -> std::result::Result<Self, DbErr> {
        Ok(Self::from_pairs(references_db::select_root_pairs(db).await?))
    }

    /// Every root transitively connected to `root_uuid`, excluding itself.
    pub fn reachable_from(&self, root_uuid: Uuid) -> HashSet<Uuid> {
        let mut visited = HashSet::from([root_uuid]);
        let mut queue = VecDeque::from([root_uuid]);

        while let Some(current) = queue.pop_front() {
            let Some(neighbours) = self.adjacency.get(&current) else {
                continue;
            };
            for &next in neighbours {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        visited.remove(&root_uuid);
        visited
    }
}

/// Roots reachable from `root_uuid` through any chain of references.
pub async fn compute_reachable_roots<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<HashSet<Uuid>> {
    let graph = ReferenceGraph::load(db).await?;
    Ok(graph.reachable_from(root_uuid))
}

/// Reject a reference from `source`'s tree to `target`'s tree when it would
/// couple a tree with itself.
pub async fn check_reference_to_portfolio<C: ConnectionTrait>(
    db: &C,
    source: &portfolio::Model,
    target: &portfolio::Model,
) -> Result<()> {
    if source.root_uuid == target.root_uuid {
        return Err(PortfolioError::invalid_reference(
            &source.key,
            &target.key,
            "both portfolios belong to the same tree",
        ));
    }

    let reachable = compute_reachable_roots(db, source.root_uuid).await?;
    tracing::debug!(
        source = %source.key,
        reachable = reachable.len(),
        "Computed roots reachable through references"
    );
    if reachable.contains(&target.root_uuid) {
        return Err(PortfolioError::invalid_reference(
            &source.key,
            &target.key,
            format!(
                "tree {} is already connected to tree {} through existing references",
                target.root_uuid, source.root_uuid
            ),
        ));
    }

    Ok(())
}

/// Validate then persist a reference from `source` to portfolio `target`.
pub async fn add_reference_to_portfolio<C: ConnectionTrait>(
    db: &C,
    uuids: &dyn UuidFactory,
    clock: &dyn Clock,
    source: &portfolio::Model,
    target: &portfolio::Model,
) -> Result<portfolio_reference::Model> {
    check_reference_to_portfolio(db, source, target).await?;

    let reference = references_db::insert_reference(
        db,
        uuids.new_uuid(),
        source.uuid,
        target.uuid,
        None,
        clock.now(),
    )
    .await?;

    Ok(reference)
}

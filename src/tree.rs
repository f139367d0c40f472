//! In-memory view of one portfolio tree: the flat node set keyed by uuid
//! plus a derived `parent -> children` index.

use std::collections::{HashMap, HashSet, VecDeque};

use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::db::portfolio as portfolio_db;
use crate::error::{PortfolioError, Result};
use crate::models::portfolio;

#[derive(Debug, Clone)]
pub struct PortfolioTree {
    root_uuid: Uuid,
    nodes: HashMap<Uuid, portfolio::Model>,
    /// Children in load order (creation order), so traversals are stable.
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl PortfolioTree {
    /// Load and validate the tree rooted at `root_uuid`.
    pub async fn load<C: ConnectionTrait>(db: &C, root_uuid: Uuid) -> Result<Self> {
        let nodes = portfolio_db::select_tree(db, root_uuid).await?;
        if nodes.is_empty() {
            return Err(PortfolioError::not_found("portfolio tree", root_uuid.to_string()));
        }
        Self::from_nodes(root_uuid, nodes)
    }

    /// Build the index from an already loaded node set.
    ///
    /// Fails with an integrity error when a node breaks root identity, when
    /// its parent is not part of the tree, or when some node cannot be
    /// reached from the root (a parent cycle).
    pub fn from_nodes(root_uuid: Uuid, rows: Vec<portfolio::Model>) -> Result<Self> {
        let mut nodes = HashMap::with_capacity(rows.len());
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        for node in rows {
            if node.root_uuid != root_uuid {
                return Err(PortfolioError::integrity(format!(
                    "portfolio '{}' belongs to root {} but was loaded for root {root_uuid}",
                    node.key, node.root_uuid
                )));
            }
            node.check_root_identity()
                .map_err(|e| PortfolioError::integrity(e.to_string()))?;
            if let Some(parent) = node.parent_uuid {
                children.entry(parent).or_default().push(node.uuid);
            }
            nodes.insert(node.uuid, node);
        }

        if !nodes.contains_key(&root_uuid) {
            return Err(PortfolioError::integrity(format!(
                "root portfolio {root_uuid} is missing from its own tree"
            )));
        }
        if let Some(orphan) = children.keys().find(|parent| !nodes.contains_key(parent)) {
            return Err(PortfolioError::integrity(format!(
                "portfolio tree {root_uuid} has children of unknown parent {orphan}"
            )));
        }

        let tree = Self {
            root_uuid,
            nodes,
            children,
        };

        let reached = tree.subtree_uuids(root_uuid)?.len();
        if reached != tree.nodes.len() {
            return Err(PortfolioError::integrity(format!(
                "portfolio tree {root_uuid} has {} nodes unreachable from its root",
                tree.nodes.len() - reached
            )));
        }

        Ok(tree)
    }

    pub fn root_uuid(&self) -> Uuid {
        self.root_uuid
    }

    pub fn root(&self) -> &portfolio::Model {
        &self.nodes[&self.root_uuid]
    }

    pub fn get(&self, uuid: Uuid) -> Option<&portfolio::Model> {
        self.nodes.get(&uuid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.nodes.contains_key(&uuid)
    }

    pub fn children(&self, uuid: Uuid) -> &[Uuid] {
        self.children.get(&uuid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node of the tree, root first, in level order.
    pub fn level_order(&self) -> Result<Vec<&portfolio::Model>> {
        self.subtree(self.root_uuid)
    }

    /// `uuid` followed by all of its descendants in level order.
    pub fn subtree(&self, uuid: Uuid) -> Result<Vec<&portfolio::Model>> {
        Ok(self
            .subtree_uuids(uuid)?
            .into_iter()
            .map(|id| &self.nodes[&id])
            .collect())
    }

    /// Descendants of `uuid` in level order, `uuid` itself excluded.
    pub fn descendants(&self, uuid: Uuid) -> Result<Vec<&portfolio::Model>> {
        let mut subtree = self.subtree(uuid)?;
        subtree.remove(0);
        Ok(subtree)
    }

    /// Breadth-first walk over the child index. A uuid showing up twice means
    /// the persisted parent links are not a tree.
    pub fn subtree_uuids(&self, uuid: Uuid) -> Result<Vec<Uuid>> {
        if !self.nodes.contains_key(&uuid) {
            return Err(PortfolioError::not_found("portfolio", uuid.to_string()));
        }

        let mut visited = HashSet::from([uuid]);
        let mut ordered = vec![uuid];
        let mut queue = VecDeque::from([uuid]);

        while let Some(current) = queue.pop_front() {
            for &child in self.children(current) {
                if !visited.insert(child) {
                    return Err(PortfolioError::integrity(format!(
                        "portfolio {child} reached twice while walking tree {}",
                        self.root_uuid
                    )));
                }
                ordered.push(child);
                queue.push_back(child);
            }
        }

        Ok(ordered)
    }

    pub fn iter(&self) -> impl Iterator<Item = &portfolio::Model> {
        self.nodes.values()
    }
}

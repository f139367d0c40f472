//! End-to-end behaviour of `PortfolioService` against in-memory SQLite.
//!
//! Run with: `cargo test --test portfolio_service_test`
mod common;

use std::collections::BTreeSet;

use common::{AuditEvent, setup};
use portfolio_engine::db::components;
use portfolio_engine::models::portfolio::{CreatePortfolio, SelectionMode, UpdatePortfolio};
use portfolio_engine::models::portfolio_reference::TargetKind;
use portfolio_engine::{ErrorKind, PortfolioError};

// ── Hierarchy ──

#[tokio::test]
async fn test_child_inherits_root_and_parent() {
    let ctx = setup().await;
    let svc = &ctx.service;

    let r = svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    let c = svc.create_child("R", CreatePortfolio::new("C", "Child")).await.unwrap();

    assert!(r.is_root());
    assert_eq!(r.root_uuid, r.uuid);
    assert_eq!(r.selection_mode, SelectionMode::None);
    assert_eq!(c.root_uuid, r.uuid);
    assert_eq!(c.parent_uuid, Some(r.uuid));
    assert!(!c.is_root());
    assert_eq!(c.qualifier(), "SUBVIEW");

    assert_eq!(
        ctx.audit.events(),
        vec![AuditEvent::Create("R".into()), AuditEvent::Create("C".into())]
    );
}

#[tokio::test]
async fn test_root_identity_holds_for_every_node() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("A", "A")).await.unwrap();
    svc.create_child("A", CreatePortfolio::new("A1", "A1")).await.unwrap();
    svc.create_root(CreatePortfolio::new("Q", "Other")).await.unwrap();

    let tree = svc.tree("A1").await.unwrap();
    assert_eq!(tree.len(), 3);
    for p in tree.iter() {
        assert_eq!(p.is_root(), p.parent_uuid.is_none());
        assert_eq!(p.is_root(), p.uuid == p.root_uuid);
    }

    let roots: Vec<String> = svc.roots().await.unwrap().into_iter().map(|p| p.key).collect();
    assert_eq!(roots, vec!["R", "Q"]);
}

#[tokio::test]
async fn test_create_rejects_blank_and_duplicate_keys() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();

    let blank = svc.create_root(CreatePortfolio::new("  ", "Blank")).await.unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::InvalidArgument);

    let nameless = svc.create_root(CreatePortfolio::new("N", "")).await.unwrap_err();
    assert_eq!(nameless.kind(), ErrorKind::InvalidArgument);

    let dup = svc.create_child("R", CreatePortfolio::new("R", "Again")).await.unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::InvalidArgument);

    let clash = svc.create_root(CreatePortfolio::new("proj1", "Clash")).await.unwrap_err();
    assert_eq!(clash.kind(), ErrorKind::InvalidArgument);

    let orphan = svc.create_child("missing", CreatePortfolio::new("X", "X")).await.unwrap_err();
    assert_eq!(orphan.kind(), ErrorKind::NotFound);

    assert_eq!(svc.roots().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_details() {
    let ctx = setup().await;
    let svc = &ctx.service;
    let r = svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    ctx.audit.clear();

    let updated = svc
        .update_details(
            "R",
            UpdatePortfolio {
                name: Some("Renamed".into()),
                description: Some("All the things".into()),
                is_private: Some(false),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.uuid, r.uuid);
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.description.as_deref(), Some("All the things"));
    assert!(!updated.is_private);
    assert!(updated.updated_at > r.updated_at);
    assert_eq!(updated.created_at, r.created_at);
    assert_eq!(ctx.audit.events(), vec![AuditEvent::Update("R".into())]);

    let err = svc
        .update_details("R", UpdatePortfolio { name: Some(" ".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(svc.get_by_key("R").await.unwrap().name, "Renamed");
}

// ── Manual selection ──

#[tokio::test]
async fn test_project_selected_once_per_tree() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;

    let r = svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("C", "Child")).await.unwrap();
    svc.update_selection_mode("R", "MANUAL", None).await.unwrap();

    let selection = svc.append_project("R", "proj1").await.unwrap();
    assert_eq!(selection.portfolio_key, "R");
    assert_eq!(selection.project_key, "proj1");
    assert!(selection.main_branch_uuid.is_some());

    let err = svc.append_project("C", "proj1").await.unwrap_err();
    match err {
        PortfolioError::AlreadySelected { project_key, holder } => {
            assert_eq!(project_key, "proj1");
            assert_eq!(holder.as_deref(), Some("R"));
        }
        other => panic!("expected AlreadySelected, got {other:?}"),
    }

    let again = svc.append_project("R", "proj1").await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::AlreadySelected);

    let in_tree = svc.projects_in_hierarchy("C").await.unwrap();
    assert_eq!(in_tree.len(), 1);
    assert_eq!(in_tree[0].portfolio_uuid, r.uuid);
}

#[tokio::test]
async fn test_project_can_be_selected_in_unrelated_tree() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;

    svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();
    svc.create_child("R1", CreatePortfolio::new("P1", "Sub one")).await.unwrap();
    svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();
    for key in ["R1", "P1", "R2"] {
        svc.update_selection_mode(key, "manual", None).await.unwrap();
    }

    svc.append_project("P1", "proj1").await.unwrap();

    let err = svc.append_project("R1", "proj1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadySelected);

    let other = svc.append_project("R2", "proj1").await.unwrap();
    assert_eq!(other.portfolio_key, "R2");
}

#[tokio::test]
async fn test_append_requires_manual_mode_and_a_project() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;
    ctx.application("app1").await;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();

    let err = svc.append_project("R", "proj1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    svc.update_selection_mode("R", "MANUAL", None).await.unwrap();
    let err = svc.append_project("R", "app1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = svc.append_project("R", "nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_remove_project_and_branches() {
    let ctx = setup().await;
    let svc = &ctx.service;
    let proj = ctx.project("proj1").await;
    let feature = ctx.branch(&proj, "feature").await;
    ctx.branch(&proj, "release").await;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.update_selection_mode("R", "MANUAL", None).await.unwrap();
    svc.append_project("R", "proj1").await.unwrap();

    let selection = svc.add_project_branch("R", "proj1", "feature").await.unwrap();
    assert_eq!(selection.branch_uuids, BTreeSet::from([feature.uuid]));

    let again = svc.add_project_branch("R", "proj1", "feature").await.unwrap();
    assert_eq!(again.branch_uuids.len(), 1);

    let both = svc.add_project_branch("R", "proj1", "release").await.unwrap();
    assert_eq!(both.branch_uuids.len(), 2);

    let err = svc.add_project_branch("R", "proj1", "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(svc.remove_project_branch("R", "proj1", "release").await.unwrap());
    assert!(!svc.remove_project_branch("R", "proj1", "release").await.unwrap());
    let remaining = svc.portfolio_projects("R").await.unwrap();
    assert_eq!(remaining[0].branch_uuids, BTreeSet::from([feature.uuid]));

    assert!(svc.remove_project("R", "proj1").await.unwrap());
    assert!(!svc.remove_project("R", "proj1").await.unwrap());
    assert!(svc.portfolio_projects("R").await.unwrap().is_empty());

    let err = svc.add_project_branch("R", "proj1", "feature").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Selection mode ──

#[tokio::test]
async fn test_rest_is_exclusive_within_tree() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.update_selection_mode("R", "REST", None).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("D", "Sibling")).await.unwrap();
    ctx.audit.clear();

    let outcome = svc.update_selection_mode("D", "REST", None).await.unwrap();
    assert_eq!(outcome.portfolio.selection_mode, SelectionMode::Rest);
    assert_eq!(outcome.reset.len(), 1);
    assert_eq!(outcome.reset[0].key, "R");

    let r = svc.get_by_key("R").await.unwrap();
    assert_eq!(r.selection_mode, SelectionMode::None);
    assert_eq!(r.selection_expression, None);
    assert_eq!(svc.get_by_key("D").await.unwrap().selection_mode, SelectionMode::Rest);

    let tree = svc.tree("R").await.unwrap();
    let rest: Vec<_> = tree.iter().filter(|p| p.selection_mode == SelectionMode::Rest).collect();
    assert_eq!(rest.len(), 1);

    assert_eq!(
        ctx.audit.events(),
        vec![AuditEvent::Update("R".into()), AuditEvent::Update("D".into())]
    );
}

#[tokio::test]
async fn test_rest_in_another_tree_is_left_alone() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();
    svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();
    svc.update_selection_mode("R1", "REST", None).await.unwrap();
    svc.update_selection_mode("R2", "REST", None).await.unwrap();

    assert_eq!(svc.get_by_key("R1").await.unwrap().selection_mode, SelectionMode::Rest);
    assert_eq!(svc.get_by_key("R2").await.unwrap().selection_mode, SelectionMode::Rest);

    // Re-applying REST to the holder itself is not a reset.
    let outcome = svc.update_selection_mode("R1", "REST", None).await.unwrap();
    assert!(outcome.reset.is_empty());
}

#[tokio::test]
async fn test_leaving_manual_clears_selections() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;
    ctx.project("proj2").await;

    svc.create_root(CreatePortfolio::new("P", "Manual")).await.unwrap();
    svc.update_selection_mode("P", "MANUAL", None).await.unwrap();
    svc.append_project("P", "proj1").await.unwrap();
    svc.append_project("P", "proj2").await.unwrap();
    assert_eq!(svc.portfolio_projects("P").await.unwrap().len(), 2);

    let outcome = svc.update_selection_mode("P", "TAGS", Some("java,go")).await.unwrap();
    assert_eq!(outcome.cleared_projects, 2);
    assert_eq!(outcome.portfolio.selection_mode, SelectionMode::Tags);
    assert_eq!(outcome.portfolio.selection_expression.as_deref(), Some("java,go"));
    assert!(svc.portfolio_projects("P").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_mode_changes_nothing() {
    let ctx = setup().await;
    let svc = &ctx.service;
    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.update_selection_mode("R", "REGEXP", Some("^core-.*")).await.unwrap();
    ctx.audit.clear();
    ctx.refresh.clear();

    let err = svc.update_selection_mode("R", "SOMETIMES", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = svc.update_selection_mode("R", "TAGS", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = svc.update_selection_mode("missing", "NONE", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let r = svc.get_by_key("R").await.unwrap();
    assert_eq!(r.selection_mode, SelectionMode::Regexp);
    assert_eq!(r.selection_expression.as_deref(), Some("^core-.*"));
    assert!(ctx.audit.events().is_empty());
    assert!(ctx.refresh.calls().is_empty());
}

// ── References ──

#[tokio::test]
async fn test_reference_cycle_between_roots_rejected() {
    let ctx = setup().await;
    let svc = &ctx.service;

    let r2 = svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();
    let r1 = svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();

    let reference = svc.add_reference_to_portfolio("R1", "R2").await.unwrap();
    assert_eq!(reference.source_uuid, r1.uuid);
    assert_eq!(reference.target_uuid, r2.uuid);
    assert_eq!(reference.target_root_uuid, Some(r2.uuid));
    assert_eq!(reference.target_kind, TargetKind::Portfolio);

    let err = svc.add_reference_to_portfolio("R2", "R1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidReference);
}

#[tokio::test]
async fn test_transitive_reference_chain_rejected() {
    let ctx = setup().await;
    let svc = &ctx.service;

    for key in ["A", "B", "C", "D"] {
        svc.create_root(CreatePortfolio::new(key, key)).await.unwrap();
    }
    svc.create_child("A", CreatePortfolio::new("A1", "Sub A")).await.unwrap();
    svc.create_child("C", CreatePortfolio::new("C1", "Sub C")).await.unwrap();

    svc.add_reference_to_portfolio("A", "B").await.unwrap();
    svc.add_reference_to_portfolio("B", "C1").await.unwrap();

    let err = svc.add_reference_to_portfolio("C1", "A1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidReference);

    let err = svc.add_reference_to_portfolio("B", "A").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidReference);

    svc.add_reference_to_portfolio("A1", "D").await.unwrap();
}

#[tokio::test]
async fn test_reference_within_same_tree_rejected() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("S", "Sub")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("T", "Sub")).await.unwrap();

    for (source, target) in [("S", "T"), ("R", "S"), ("S", "R"), ("R", "R")] {
        let err = svc.add_reference_to_portfolio(source, target).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidReference, "{source} -> {target}");
    }
    assert!(svc.references_in_hierarchy("R").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_application_references() {
    let ctx = setup().await;
    let svc = &ctx.service;
    let app = ctx.application("app1").await;
    let release = ctx.branch(&app, "release").await;
    ctx.project("proj1").await;

    let r = svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();

    let reference = svc.add_reference_to_application("R", "app1", Some("release")).await.unwrap();
    assert_eq!(reference.target_kind, TargetKind::Application);
    assert_eq!(reference.target_root_uuid, None);
    assert_eq!(reference.branch_uuids, BTreeSet::from([release.uuid]));

    ctx.refresh.clear();
    let again = svc.add_reference_to_application("R", "app1", Some("release")).await.unwrap();
    assert_eq!(again.branch_uuids.len(), 1);
    assert!(ctx.refresh.calls().is_empty());

    let err = svc.add_reference_to_application("R", "proj1", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let referencers = svc.get_referencers_by_key("app1").await.unwrap();
    assert_eq!(referencers.len(), 1);
    assert_eq!(referencers[0].uuid, r.uuid);

    assert!(svc.remove_reference_branch("R", "app1", "release").await.unwrap());
    assert!(!svc.remove_reference_branch("R", "app1", "release").await.unwrap());
    assert!(svc.get_referencers_by_key("app1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unscoped_application_reference_uses_main_branch() {
    let ctx = setup().await;
    let svc = &ctx.service;
    let app = ctx.application("app1").await;
    let release = ctx.branch(&app, "release").await;
    let main = components::select_main_branch(ctx.db(), app.uuid)
        .await
        .unwrap()
        .unwrap();

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();

    let scoped = svc.add_reference_to_application("R", "app1", Some("release")).await.unwrap();
    assert_eq!(scoped.branch_uuids, BTreeSet::from([release.uuid]));

    let whole = svc.add_reference_to_application("R", "app1", None).await.unwrap();
    assert_eq!(whole.branch_uuids, BTreeSet::from([main.uuid, release.uuid]));

    ctx.refresh.clear();
    let again = svc.add_reference_to_application("R", "app1", Some("main")).await.unwrap();
    assert_eq!(again.branch_uuids.len(), 2);
    assert!(ctx.refresh.calls().is_empty());

    let in_tree = svc.references_in_hierarchy("R").await.unwrap();
    assert_eq!(in_tree.len(), 1);
    assert_eq!(in_tree[0].branch_uuids, BTreeSet::from([main.uuid, release.uuid]));

    assert!(svc.remove_reference_branch("R", "app1", "main").await.unwrap());
    let left = svc.references_in_hierarchy("R").await.unwrap();
    assert_eq!(left[0].branch_uuids, BTreeSet::from([release.uuid]));
}

#[tokio::test]
async fn test_remove_reference() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();
    svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();
    svc.add_reference_to_portfolio("R1", "R2").await.unwrap();

    assert!(svc.remove_reference("R1", "R2").await.unwrap());
    assert!(!svc.remove_reference("R1", "R2").await.unwrap());

    // The edge is gone, so the opposite direction is now legal.
    svc.add_reference_to_portfolio("R2", "R1").await.unwrap();
}

#[tokio::test]
async fn test_delete_referencers_to() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.application("app1").await;

    let r1 = svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();
    svc.create_child("R1", CreatePortfolio::new("S1", "Sub one")).await.unwrap();
    let r2 = svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();

    svc.add_reference_to_application("S1", "app1", None).await.unwrap();
    svc.add_reference_to_application("R2", "app1", None).await.unwrap();
    ctx.refresh.clear();

    assert_eq!(svc.delete_referencers_to("app1").await.unwrap(), 2);
    assert!(svc.get_referencers_by_key("app1").await.unwrap().is_empty());
    assert_eq!(ctx.refresh.last(), Some(BTreeSet::from([r1.uuid, r2.uuid])));

    let err = svc.delete_referencers_to("nothing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Deletion ──

#[tokio::test]
async fn test_delete_subtree_is_a_closure() {
    let ctx = setup().await;
    let svc = &ctx.service;
    ctx.project("proj1").await;
    ctx.project("proj2").await;

    let r = svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    let s = svc.create_child("R", CreatePortfolio::new("S", "Sub")).await.unwrap();
    let s1 = svc.create_child("S", CreatePortfolio::new("S1", "Sub one")).await.unwrap();
    let s2 = svc.create_child("S", CreatePortfolio::new("S2", "Sub two")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("T", "Sibling")).await.unwrap();
    let x = svc.create_root(CreatePortfolio::new("X", "Elsewhere")).await.unwrap();

    svc.update_selection_mode("T", "MANUAL", None).await.unwrap();
    svc.append_project("T", "proj1").await.unwrap();
    svc.update_selection_mode("S1", "MANUAL", None).await.unwrap();
    svc.append_project("S1", "proj2").await.unwrap();
    svc.add_reference_to_portfolio("X", "S1").await.unwrap();
    ctx.audit.clear();
    ctx.refresh.clear();

    let deleted = svc.delete("S").await.unwrap();
    assert_eq!(deleted, vec![s.uuid, s1.uuid, s2.uuid]);

    let remaining: BTreeSet<String> =
        svc.tree("R").await.unwrap().iter().map(|p| p.key.clone()).collect();
    assert_eq!(remaining, BTreeSet::from(["R".to_string(), "T".to_string()]));
    assert!(svc.get_by_key("X").await.is_ok());

    assert!(svc.references_in_hierarchy("X").await.unwrap().is_empty());
    let selections = svc.projects_in_hierarchy("R").await.unwrap();
    assert_eq!(selections.len(), 1);
    assert_eq!(selections[0].portfolio_key, "T");

    assert_eq!(
        ctx.audit.events(),
        vec![
            AuditEvent::Delete("S".into()),
            AuditEvent::Delete("S1".into()),
            AuditEvent::Delete("S2".into()),
        ]
    );
    assert_eq!(ctx.refresh.last(), Some(BTreeSet::from([r.uuid, x.uuid])));

    // proj2 is free again in this tree.
    svc.append_project("T", "proj2").await.unwrap();
}

#[tokio::test]
async fn test_delete_root_removes_whole_tree() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R", "Root")).await.unwrap();
    svc.create_child("R", CreatePortfolio::new("A", "A")).await.unwrap();
    svc.create_child("A", CreatePortfolio::new("A1", "A1")).await.unwrap();
    svc.create_root(CreatePortfolio::new("Q", "Other")).await.unwrap();
    svc.add_reference_to_portfolio("A1", "Q").await.unwrap();

    assert_eq!(svc.delete("R").await.unwrap().len(), 3);

    for key in ["R", "A", "A1"] {
        let err = svc.get_by_key(key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert!(svc.get_referencers_by_key("Q").await.unwrap().is_empty());
    let roots: Vec<String> = svc.roots().await.unwrap().into_iter().map(|p| p.key).collect();
    assert_eq!(roots, vec!["Q"]);

    let err = svc.delete("R").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Reporting ──

#[tokio::test]
async fn test_count_by_mode() {
    let ctx = setup().await;
    let svc = &ctx.service;

    svc.create_root(CreatePortfolio::new("R1", "One")).await.unwrap();
    svc.create_root(CreatePortfolio::new("R2", "Two")).await.unwrap();
    svc.create_child("R1", CreatePortfolio::new("S1", "Sub")).await.unwrap();
    svc.create_child("R1", CreatePortfolio::new("S2", "Sub")).await.unwrap();
    svc.update_selection_mode("R2", "MANUAL", None).await.unwrap();
    svc.update_selection_mode("S1", "REST", None).await.unwrap();

    let counts = svc.count_by_mode().await.unwrap();
    assert_eq!(counts.portfolios.get("NONE"), Some(&1));
    assert_eq!(counts.portfolios.get("MANUAL"), Some(&1));
    assert_eq!(counts.subportfolios.get("REST"), Some(&1));
    assert_eq!(counts.subportfolios.get("NONE"), Some(&1));
    assert_eq!(counts.subportfolios.get("MANUAL"), None);
}

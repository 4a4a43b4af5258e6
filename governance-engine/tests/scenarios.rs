//! End-to-end governance scenarios over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use governance_engine::{
    Governance, GovernanceError, MemoryStore, MemoryUserDirectory, StaticIdentity, Subject,
};
use governance_org::{
    LeadershipType, MembershipRole, NewMembership, NewOrganization, NewProfile, OrganizationNode,
    ProfileKind, UserSummary,
};
use governance_rbac::{NewPermission, NewRole};
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct World {
    gov: Governance<MemoryStore>,
    alice: UserSummary,
    bob: UserSummary,
    actor: Uuid,
}

fn world() -> World {
    init_tracing();
    let alice = UserSummary::new("Alice", "alice@ministry.go.id");
    let bob = UserSummary::new("Bob", "bob@ministry.go.id");
    let directory = Arc::new(MemoryUserDirectory::with_users(vec![alice.clone(), bob.clone()]));
    World {
        gov: Governance::in_memory(directory),
        alice,
        bob,
        actor: Uuid::now_v7(),
    }
}

#[tokio::test]
async fn test_succession_between_two_officers() {
    let w = world();
    let ministry = w
        .gov
        .organizations
        .create(NewOrganization::named("Ministry"), w.actor)
        .await
        .unwrap();
    let directorate = w
        .gov
        .organizations
        .create(NewOrganization::named("Directorate").with_parent(ministry.id), w.actor)
        .await
        .unwrap();

    let m1 = w
        .gov
        .memberships
        .add_member(NewMembership::new(directorate.id, w.alice.id).with_role(MembershipRole::Officer))
        .await
        .unwrap();
    let first = w
        .gov
        .leadership
        .assign_leader(directorate.id, m1.id, LeadershipType::Definitive, None, w.actor)
        .await
        .unwrap();

    let leader = w.gov.leadership.get_active_leader(directorate.id).await.unwrap().unwrap();
    assert_eq!(leader.name.as_deref(), Some("Alice"));
    assert_eq!(leader.leadership_type, LeadershipType::Definitive);
    assert!(first.replaced_record_id.is_none());

    let m2 = w
        .gov
        .memberships
        .add_member(NewMembership::new(directorate.id, w.bob.id).with_role(MembershipRole::Officer))
        .await
        .unwrap();
    let second = w
        .gov
        .leadership
        .assign_leader(directorate.id, m2.id, LeadershipType::Acting, None, w.actor)
        .await
        .unwrap();

    let leader = w.gov.leadership.get_active_leader(directorate.id).await.unwrap().unwrap();
    assert_eq!(leader.name.as_deref(), Some("Bob"));
    assert_eq!(leader.leadership_type, LeadershipType::Acting);
    assert_eq!(second.replaced_record_id, Some(first.id));

    let alice_record = w.gov.leadership.get_by_id(first.id).await.unwrap();
    assert!(!alice_record.active);
    assert!(alice_record.end_date.is_some());

    let history = w.gov.leadership.get_history(directorate.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].record.id, second.id);
    assert_eq!(history[1].successor_id, Some(second.id));

    // The ministry itself stays vacant.
    assert!(w.gov.leadership.get_active_leader(ministry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_viewer_role_grants_dashboard_read() {
    let w = world();
    let user = w.alice.id;

    let viewer = w.gov.catalog.create_role(NewRole::new("Viewer")).await.unwrap();
    let read = w
        .gov
        .catalog
        .create_permission(NewPermission::new("View Dashboard", "dashboard", "read"))
        .await
        .unwrap();
    w.gov
        .catalog
        .replace_role_permissions(viewer.id, &[read.id])
        .await
        .unwrap();

    let p1 = w
        .gov
        .profiles
        .create_profile(NewProfile::new(user, "P1", ProfileKind::Personal), user)
        .await
        .unwrap();
    w.gov.resolver.assign_role(p1.id, viewer.id, Some(w.actor)).await.unwrap();

    let subject = Subject::Profile(p1.id);
    assert!(w.gov.resolver.has_permission(subject, "dashboard", "read").await.unwrap());
    assert!(!w.gov.resolver.has_permission(subject, "dashboard", "write").await.unwrap());

    // Menus are gated with the string form.
    let perms = w.gov.resolver.get_profile_permissions(p1.id).await.unwrap();
    assert_eq!(perms.to_strings(), vec!["dashboard:read"]);
}

#[tokio::test]
async fn test_role_order_does_not_matter() {
    let w = world();
    let user = w.alice.id;

    let r1 = w.gov.catalog.create_role(NewRole::new("Reader")).await.unwrap();
    let r2 = w.gov.catalog.create_role(NewRole::new("Writer")).await.unwrap();
    let read = w
        .gov
        .catalog
        .create_permission(NewPermission::new("Read", "reports", "read"))
        .await
        .unwrap();
    let write = w
        .gov
        .catalog
        .create_permission(NewPermission::new("Write", "reports", "create"))
        .await
        .unwrap();
    w.gov.catalog.replace_role_permissions(r1.id, &[read.id]).await.unwrap();
    w.gov
        .catalog
        .replace_role_permissions(r2.id, &[read.id, write.id])
        .await
        .unwrap();

    let a = w
        .gov
        .profiles
        .create_profile(NewProfile::new(user, "A", ProfileKind::Personal), user)
        .await
        .unwrap();
    let b = w
        .gov
        .profiles
        .create_profile(NewProfile::new(user, "B", ProfileKind::External), user)
        .await
        .unwrap();

    w.gov.resolver.assign_role(a.id, r1.id, None).await.unwrap();
    w.gov.resolver.assign_role(a.id, r2.id, None).await.unwrap();
    w.gov.resolver.assign_role(b.id, r2.id, None).await.unwrap();
    w.gov.resolver.assign_role(b.id, r1.id, None).await.unwrap();

    let pa = w.gov.resolver.get_profile_permissions(a.id).await.unwrap();
    let pb = w.gov.resolver.get_profile_permissions(b.id).await.unwrap();
    assert_eq!(pa, pb);
    assert_eq!(pa, w.gov.resolver.get_profile_permissions(a.id).await.unwrap());

    w.gov.resolver.replace_roles(a.id, &[], None).await.unwrap();
    assert!(w.gov.resolver.get_profile_permissions(a.id).await.unwrap().is_empty());
}

async fn count_defaults(gov: &Governance<MemoryStore>, user: Uuid) -> usize {
    gov.profiles
        .list_user_profiles(user)
        .await
        .unwrap()
        .iter()
        .filter(|p| p.is_default)
        .count()
}

#[tokio::test]
async fn test_exactly_one_default_profile() {
    let w = world();
    let user = w.bob.id;

    let mut ids = Vec::new();
    for name in ["Personal", "Consultant", "Guest"] {
        let profile = w
            .gov
            .profiles
            .create_profile(NewProfile::new(user, name, ProfileKind::Personal), user)
            .await
            .unwrap();
        ids.push(profile.id);
    }

    assert_eq!(count_defaults(&w.gov, user).await, 1);

    w.gov.profiles.switch_profile(user, ids[2]).await.unwrap();
    assert_eq!(count_defaults(&w.gov, user).await, 1);

    w.gov.profiles.delete_profile(ids[2], user).await.unwrap();
    assert_eq!(count_defaults(&w.gov, user).await, 1);
    w.gov.profiles.delete_profile(ids[0], user).await.unwrap();
    assert_eq!(count_defaults(&w.gov, user).await, 1);

    let err = w.gov.profiles.delete_profile(ids[1], user).await.unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}

#[tokio::test]
async fn test_tree_is_a_forest() {
    let w = world();
    let actor = w.actor;
    let orgs = &w.gov.organizations;

    let ministry = orgs.create(NewOrganization::named("Ministry"), actor).await.unwrap();
    let secretariat = orgs
        .create(NewOrganization::named("Secretariat").with_parent(ministry.id), actor)
        .await
        .unwrap();
    let directorate = orgs
        .create(NewOrganization::named("Directorate").with_parent(ministry.id), actor)
        .await
        .unwrap();
    let division = orgs
        .create(NewOrganization::named("Division").with_parent(directorate.id), actor)
        .await
        .unwrap();
    orgs.create(NewOrganization::named("Agency"), actor).await.unwrap();
    orgs.soft_delete(secretariat.id, actor).await.unwrap();

    w.gov
        .memberships
        .add_member(NewMembership::new(division.id, w.alice.id))
        .await
        .unwrap();

    let tree = orgs.get_tree().await.unwrap();

    fn collect(node: &OrganizationNode, seen: &mut Vec<Uuid>) {
        seen.push(node.id());
        for child in &node.children {
            assert_eq!(child.organization.parent_id, Some(node.id()));
            collect(child, seen);
        }
    }
    let mut seen = Vec::new();
    for root in &tree {
        collect(root, &mut seen);
    }
    let unique: HashSet<Uuid> = seen.iter().copied().collect();
    assert_eq!(seen.len(), unique.len());
    assert_eq!(seen.len(), 4);
    assert!(!unique.contains(&secretariat.id));

    let names: Vec<&str> = tree.iter().map(|n| n.organization.name.as_str()).collect();
    assert_eq!(names, vec!["Agency", "Ministry"]);

    let division_node = tree[1].find(division.id).unwrap();
    assert_eq!(division_node.member_count, 1);

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json[1]["name"], "Ministry");
    assert_eq!(json[1]["children"][0]["name"], "Directorate");

    let path = orgs.get_ancestor_path(division.id).await.unwrap();
    let ids: Vec<Uuid> = path.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![ministry.id, directorate.id, division.id]);
}

#[tokio::test]
async fn test_session_helpers() {
    let w = world();
    let user = w.alice.id;

    let admin = w.gov.catalog.create_role(NewRole::new("Admin").system()).await.unwrap();
    let manage = w
        .gov
        .catalog
        .create_permission(NewPermission::new("Manage Users", "users", "update"))
        .await
        .unwrap();
    w.gov.catalog.replace_role_permissions(admin.id, &[manage.id]).await.unwrap();
    w.gov.catalog.assign_role_to_user(user, admin.id).await.unwrap();

    let identity = StaticIdentity::signed_in(user);
    let session = w.gov.session(&identity);
    assert_eq!(session.require_permission("users", "update").await.unwrap(), user);
    assert_eq!(session.require_role("Admin").await.unwrap(), user);
    assert!(matches!(
        session.require_permission("users", "delete").await,
        Err(GovernanceError::Unauthorized(_))
    ));
    assert_eq!(
        session.current_user_permissions().await.unwrap().to_strings(),
        vec!["users:update"]
    );
    assert!(session.current_profile_grants().await.unwrap().is_none());

    w.gov
        .profiles
        .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
        .await
        .unwrap();
    let context = session.current_profile_grants().await.unwrap().unwrap();
    assert_eq!(context.profile.name, "Personal");
    assert!(context.grants.is_empty());

    let anonymous = StaticIdentity::anonymous();
    let session = w.gov.session(&anonymous);
    assert_eq!(
        session.require_role("Admin").await,
        Err(GovernanceError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_concurrent_assignments_leave_one_leader() {
    let w = world();
    let org = w
        .gov
        .organizations
        .create(NewOrganization::named("Directorate"), w.actor)
        .await
        .unwrap();
    let m1 = w
        .gov
        .memberships
        .add_member(NewMembership::new(org.id, w.alice.id))
        .await
        .unwrap();
    let m2 = w
        .gov
        .memberships
        .add_member(NewMembership::new(org.id, w.bob.id))
        .await
        .unwrap();

    let leadership = &w.gov.leadership;
    let (a, b) = tokio::join!(
        leadership.assign_leader(org.id, m1.id, LeadershipType::Acting, None, w.actor),
        leadership.assign_leader(org.id, m2.id, LeadershipType::ActingDaily, None, w.actor),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let snapshot = w.gov.store().snapshot().await;
    let active: Vec<Uuid> = snapshot
        .leadership_records()
        .iter()
        .filter(|r| r.active)
        .map(|r| r.id)
        .collect();
    assert_eq!(active.len(), 1);
    // Whichever committed second replaced the first.
    let (earlier, later) = if active[0] == a.id { (b, a) } else { (a, b) };
    assert_eq!(later.replaced_record_id, Some(earlier.id));
}

#[tokio::test]
async fn test_deep_chain_stops_at_configured_depth() {
    let w = world();
    let orgs = &w.gov.organizations;

    let mut parent: Option<Uuid> = None;
    let mut created = Vec::new();
    for level in 0..70 {
        let mut input = NewOrganization::named(format!("Level {level}"));
        input.parent_id = parent;
        match orgs.create(input, w.actor).await {
            Ok(org) => {
                parent = Some(org.id);
                created.push(org.id);
            }
            Err(err) => {
                assert!(matches!(err, GovernanceError::Validation(_)));
                break;
            }
        }
    }
    assert_eq!(created.len(), 64);

    let leaf = created[created.len() - 1];
    let path = orgs.get_ancestor_path(leaf).await.unwrap();
    assert_eq!(path.len(), 64);
    assert_eq!(path[0].id, created[0]);

    let tree = orgs.get_tree().await.unwrap();
    assert_eq!(tree.len(), 1);
    assert!(tree[0].find(leaf).is_some());
}

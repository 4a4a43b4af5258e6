//! Property tests: random operation sequences keep the store consistent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use governance_engine::{Governance, MemoryStore, MemoryUserDirectory};
use governance_org::{
    LeadershipType, NewMembership, NewOrganization, NewProfile, OrganizationNode, OrganizationPatch,
    ProfileKind, ProfilePatch, UserSummary,
};
use proptest::prelude::*;
use uuid::Uuid;

const USERS: usize = 3;
const ORGS: usize = 3;

struct Fixture {
    gov: Governance<MemoryStore>,
    users: Vec<Uuid>,
    orgs: Vec<Uuid>,
    actor: Uuid,
}

async fn fixture() -> Fixture {
    let users: Vec<UserSummary> = (0..USERS)
        .map(|i| UserSummary::new(format!("User {i}"), format!("user{i}@example.org")))
        .collect();
    let ids = users.iter().map(|u| u.id).collect();
    let gov = Governance::in_memory(Arc::new(MemoryUserDirectory::with_users(users)));
    let actor = Uuid::now_v7();

    let mut orgs = Vec::new();
    for i in 0..ORGS {
        let org = gov
            .organizations
            .create(NewOrganization::named(format!("Unit {i}")), actor)
            .await
            .unwrap();
        orgs.push(org.id);
    }

    Fixture {
        gov,
        users: ids,
        orgs,
        actor,
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[derive(Debug, Clone)]
enum MembershipOp {
    Add { org: usize, user: usize },
    Remove { pick: usize },
}

fn membership_op() -> impl Strategy<Value = MembershipOp> {
    prop_oneof![
        (0..ORGS, 0..USERS).prop_map(|(org, user)| MembershipOp::Add { org, user }),
        any::<usize>().prop_map(|pick| MembershipOp::Remove { pick }),
    ]
}

#[derive(Debug, Clone)]
enum LeadershipOp {
    Assign { org: usize, user: usize, kind: u8 },
    End { pick: usize },
}

fn leadership_op() -> impl Strategy<Value = LeadershipOp> {
    prop_oneof![
        3 => (0..ORGS, 0..USERS, 0u8..3).prop_map(|(org, user, kind)| LeadershipOp::Assign { org, user, kind }),
        1 => any::<usize>().prop_map(|pick| LeadershipOp::End { pick }),
    ]
}

#[derive(Debug, Clone)]
enum ProfileOp {
    Create { user: usize, make_default: bool },
    Switch { pick: usize },
    Delete { pick: usize },
    Deactivate { pick: usize },
}

fn profile_op() -> impl Strategy<Value = ProfileOp> {
    prop_oneof![
        (0..USERS, any::<bool>()).prop_map(|(user, make_default)| ProfileOp::Create { user, make_default }),
        any::<usize>().prop_map(|pick| ProfileOp::Switch { pick }),
        any::<usize>().prop_map(|pick| ProfileOp::Delete { pick }),
        any::<usize>().prop_map(|pick| ProfileOp::Deactivate { pick }),
    ]
}

fn collect_ids(node: &OrganizationNode, seen: &mut Vec<Uuid>) {
    seen.push(node.id());
    for child in &node.children {
        collect_ids(child, seen);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_one_active_membership_per_pair(ops in prop::collection::vec(membership_op(), 1..40)) {
        block_on(async {
            let f = fixture().await;
            let mut created = Vec::new();

            for op in ops {
                match op {
                    MembershipOp::Add { org, user } => {
                        if let Ok(m) = f
                            .gov
                            .memberships
                            .add_member(NewMembership::new(f.orgs[org], f.users[user]))
                            .await
                        {
                            created.push(m.id);
                        }
                    }
                    MembershipOp::Remove { pick } if !created.is_empty() => {
                        let id = created[pick % created.len()];
                        f.gov.memberships.remove_member(id).await.unwrap();
                    }
                    MembershipOp::Remove { .. } => {}
                }
            }

            let tables = f.gov.store().snapshot().await;
            let mut pairs = HashSet::new();
            for m in tables.memberships().iter().filter(|m| m.active) {
                assert!(pairs.insert((m.organization_id, m.user_id)), "duplicate active membership");
                assert!(m.end_date.is_none());
            }
            for m in tables.memberships().iter().filter(|m| !m.active) {
                assert!(m.end_date.is_some());
            }
        });
    }

    #[test]
    fn prop_one_active_leader_per_org(ops in prop::collection::vec(leadership_op(), 1..30)) {
        block_on(async {
            let f = fixture().await;
            let mut memberships = HashMap::new();
            for &org in &f.orgs {
                for &user in &f.users {
                    let m = f
                        .gov
                        .memberships
                        .add_member(NewMembership::new(org, user))
                        .await
                        .unwrap();
                    memberships.insert((org, user), m.id);
                }
            }
            let mut records = Vec::new();

            for op in ops {
                match op {
                    LeadershipOp::Assign { org, user, kind } => {
                        let leadership_type = match kind {
                            0 => LeadershipType::Definitive,
                            1 => LeadershipType::Acting,
                            _ => LeadershipType::ActingDaily,
                        };
                        let org = f.orgs[org];
                        let membership = memberships[&(org, f.users[user])];
                        let record = f
                            .gov
                            .leadership
                            .assign_leader(org, membership, leadership_type, None, f.actor)
                            .await
                            .unwrap();
                        records.push(record.id);
                    }
                    LeadershipOp::End { pick } if !records.is_empty() => {
                        let id = records[pick % records.len()];
                        f.gov.leadership.end_leadership(id).await.unwrap();
                    }
                    LeadershipOp::End { .. } => {}
                }
            }

            let tables = f.gov.store().snapshot().await;
            for &org in &f.orgs {
                let active = tables
                    .leadership_records()
                    .iter()
                    .filter(|r| r.organization_id == org && r.active)
                    .count();
                assert!(active <= 1);
            }
            // Every replacement link points at a retired record of the same organization.
            for record in tables.leadership_records() {
                if let Some(replaced) = record.replaced_record_id {
                    let old = tables.leadership_record(replaced).unwrap();
                    assert!(!old.active);
                    assert_eq!(old.organization_id, record.organization_id);
                }
            }
        });
    }

    #[test]
    fn prop_exactly_one_default_profile(ops in prop::collection::vec(profile_op(), 1..40)) {
        block_on(async {
            let f = fixture().await;
            let mut profiles: Vec<(Uuid, Uuid)> = Vec::new();

            for (n, op) in ops.into_iter().enumerate() {
                match op {
                    ProfileOp::Create { user, make_default } => {
                        let user = f.users[user];
                        let mut input = NewProfile::new(user, format!("Profile {n}"), ProfileKind::Personal);
                        if make_default {
                            input = input.as_default();
                        }
                        let profile = f.gov.profiles.create_profile(input, user).await.unwrap();
                        profiles.push((user, profile.id));
                    }
                    ProfileOp::Switch { pick } if !profiles.is_empty() => {
                        let (user, id) = profiles[pick % profiles.len()];
                        let _ = f.gov.profiles.switch_profile(user, id).await;
                    }
                    ProfileOp::Delete { pick } if !profiles.is_empty() => {
                        let (user, id) = profiles[pick % profiles.len()];
                        if f.gov.profiles.delete_profile(id, user).await.is_ok() {
                            profiles.retain(|&(_, p)| p != id);
                        }
                    }
                    ProfileOp::Deactivate { pick } if !profiles.is_empty() => {
                        let (user, id) = profiles[pick % profiles.len()];
                        let patch = ProfilePatch {
                            active: Some(false),
                            ..Default::default()
                        };
                        let _ = f.gov.profiles.update_profile(id, patch, user).await;
                    }
                    _ => {}
                }
            }

            let tables = f.gov.store().snapshot().await;
            for &user in &f.users {
                let live: Vec<_> = tables.user_profiles(user).collect();
                let defaults = live.iter().filter(|p| p.is_default).count();
                if live.is_empty() {
                    assert_eq!(defaults, 0);
                } else {
                    assert_eq!(defaults, 1, "user {user} has {defaults} defaults");
                }
            }
        });
    }

    #[test]
    fn prop_tree_covers_each_live_organization_once(
        parents in prop::collection::vec(prop::option::of(0usize..8), 1..8),
        reparent in prop::collection::vec((0usize..8, prop::option::of(0usize..8)), 0..10),
        deletions in prop::collection::vec(0usize..8, 0..3),
    ) {
        block_on(async {
            let f = fixture().await;
            let orgs = &f.gov.organizations;
            let mut ids: Vec<Uuid> = f.orgs.clone();

            for (i, parent) in parents.into_iter().enumerate() {
                let mut input = NewOrganization::named(format!("Node {i}"));
                if let Some(p) = parent {
                    input = input.with_parent(ids[p % ids.len()]);
                }
                if let Ok(org) = orgs.create(input, f.actor).await {
                    ids.push(org.id);
                }
            }
            for (target, parent) in reparent {
                let patch = OrganizationPatch {
                    parent_id: Some(parent.map(|p| ids[p % ids.len()])),
                    ..Default::default()
                };
                // Cycles and tombstoned parents are refused.
                let _ = orgs.update(ids[target % ids.len()], patch, f.actor).await;
            }
            for d in deletions {
                let _ = orgs.soft_delete(ids[d % ids.len()], f.actor).await;
            }

            let tree = orgs.get_tree().await.unwrap();
            let mut seen = Vec::new();
            for root in &tree {
                collect_ids(root, &mut seen);
            }
            let unique: HashSet<Uuid> = seen.iter().copied().collect();
            assert_eq!(seen.len(), unique.len());

            let live = orgs.get_all(None).await.unwrap();
            let live_ids: HashSet<Uuid> = live.iter().map(|o| o.id).collect();
            assert_eq!(unique, live_ids);

            for org in &live {
                let path = orgs.get_ancestor_path(org.id).await.unwrap();
                assert_eq!(path.last().map(|o| o.id), Some(org.id));
                assert!(path.len() <= live.len());
            }
        });
    }
}

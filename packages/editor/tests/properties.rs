//! Property tests over arbitrary operation sequences

use std::collections::HashSet;

use proptest::prelude::*;
use quire_editor::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum OrderOp {
    Create(u8),
    Delete(u8),
    Move(usize, usize),
}

fn order_op() -> impl Strategy<Value = OrderOp> {
    prop_oneof![
        (0u8..8).prop_map(OrderOp::Create),
        (0u8..8).prop_map(OrderOp::Delete),
        (0usize..10, 0usize..10).prop_map(|(from, to)| OrderOp::Move(from, to)),
    ]
}

#[derive(Debug, Clone)]
enum LockOp {
    Enter(u8, LockLocation),
    Leave(u8, LockLocation),
}

fn location() -> impl Strategy<Value = LockLocation> {
    prop_oneof![
        Just(LockLocation::Summary),
        Just(LockLocation::StoryMetadata),
        Just(LockLocation::SectionsOrder),
        (0u8..3).prop_map(|n| LockLocation::section(format!("s{}", n))),
        (0u8..3).prop_map(|n| LockLocation::resource(format!("r{}", n))),
        prop::sample::select(vec!["storyMetadata", "sections", "chat"])
            .prop_map(|name| LockLocation::Other { name: name.to_string() }),
    ]
}

fn lock_op() -> impl Strategy<Value = LockOp> {
    prop_oneof![
        (0u8..4, location()).prop_map(|(user, loc)| LockOp::Enter(user, loc)),
        (0u8..4, location()).prop_map(|(user, loc)| LockOp::Leave(user, loc)),
    ]
}

/// Resources r0..rN, one contextualizer per binding, bindings picked by index
fn bound_story(resources: u8, bindings: &[(u8, bool)]) -> Story {
    let mut story = Story::new_default("S");
    for r in 0..resources {
        let id = format!("r{}", r);
        story = story
            .create_resource(&id, Resource::new(id.as_str(), "bib", json!(null)))
            .unwrap();
    }

    for (n, (resource, share)) in bindings.iter().enumerate() {
        let resource_id = format!("r{}", resource % resources);
        // a shared binding reuses the first contextualizer when it exists
        let contextualizer_id = if *share && story.contextualizer("cz0").is_some() {
            "cz0".to_string()
        } else {
            let id = format!("cz{}", n);
            story = story
                .create_contextualizer(&id, Contextualizer::new(id.as_str(), "bib"))
                .unwrap();
            id
        };
        let id = format!("cx{}", n);
        story = story
            .create_contextualization(
                &id,
                Contextualization::new(id.as_str(), resource_id, contextualizer_id),
            )
            .unwrap();
    }
    story
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn sections_order_stays_a_permutation(ops in prop::collection::vec(order_op(), 1..40)) {
        let mut story = Story::new_default("S");

        for op in ops {
            let result = match op {
                OrderOp::Create(n) => {
                    let id = format!("s{}", n);
                    story.create_section(&id, Section::new(id.as_str(), "t"))
                }
                OrderOp::Delete(n) => story.delete_section(&format!("s{}", n)),
                OrderOp::Move(from, to) => story.move_section(from, to),
            };
            if let Ok(next) = result {
                story = next;
            }

            prop_assert!(check_permutation(story.sections_order.as_slice(), &story.sections).is_ok());
            prop_assert_eq!(story.sections_order.len(), story.sections.len());
        }
    }

    #[test]
    fn lock_holders_are_exclusive(ops in prop::collection::vec(lock_op(), 1..60)) {
        let mut locks = LockMap::new();

        for op in ops {
            match op {
                LockOp::Enter(user, loc) => {
                    locks.enter_block("S", &format!("u{}", user), loc);
                }
                LockOp::Leave(user, loc) => {
                    locks.leave_block("S", &format!("u{}", user), &loc);
                }
            }

            if let Some(story) = locks.story("S") {
                let mut held = HashSet::new();
                for user_locks in story.locks.values() {
                    for location in user_locks.locations() {
                        if !location.is_presence() {
                            prop_assert!(held.insert(location.clone()), "{} held twice", location);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn leave_block_is_idempotent(
        ops in prop::collection::vec(lock_op(), 0..30),
        user in 0u8..4,
        loc in location(),
    ) {
        let mut locks = LockMap::new();
        for op in ops {
            match op {
                LockOp::Enter(u, l) => { locks.enter_block("S", &format!("u{}", u), l); }
                LockOp::Leave(u, l) => { locks.leave_block("S", &format!("u{}", u), &l); }
            }
        }

        let user = format!("u{}", user);
        locks.leave_block("S", &user, &loc);
        let once = locks.story("S").cloned();
        locks.leave_block("S", &user, &loc);
        prop_assert_eq!(locks.story("S").cloned(), once);
    }

    #[test]
    fn resource_cascade_leaves_no_dangling_reference(
        resources in 1u8..4,
        bindings in prop::collection::vec((0u8..4, any::<bool>()), 0..8),
        victim in 0u8..4,
    ) {
        let story = bound_story(resources, &bindings);
        let victim = format!("r{}", victim % resources);
        let next = story.delete_resource(&victim).unwrap();

        prop_assert!(next.resource(&victim).is_none());
        prop_assert!(dangling_references(&next).is_empty());
        prop_assert!(next.contextualizations.values().all(|c| c.resource_id != victim));

        // contextualizers survive exactly when something still uses them
        for (id, contextualization) in story.contextualizations.iter() {
            if contextualization.resource_id != victim {
                prop_assert!(next.contextualization(id).is_some());
                prop_assert!(next.contextualizer(&contextualization.contextualizer_id).is_some());
            }
        }
        for id in story.contextualizers.keys() {
            if next.contextualizer(id).is_none() {
                prop_assert!(story
                    .contextualizations
                    .values()
                    .filter(|c| &c.contextualizer_id == id)
                    .all(|c| c.resource_id == victim));
            }
        }
    }

    #[test]
    fn export_import_round_trip(
        sections in prop::collection::btree_set("[a-z]{1,6}", 0..6),
        title in "[A-Za-z ]{0,20}",
        moves in prop::collection::vec((0usize..6, 0usize..6), 0..4),
    ) {
        let mut story = Story::new_default("S").with_title(title);
        for id in &sections {
            story = story.create_section(id, Section::new(id.as_str(), id.as_str())).unwrap();
        }
        for (from, to) in moves {
            if let Ok(next) = story.move_section(from, to) {
                story = next;
            }
        }

        let imported = import_story(&export_story(&story).unwrap()).unwrap();
        prop_assert_eq!(imported, story);
    }
}

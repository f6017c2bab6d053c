use std::sync::Arc;

use dance_avatar_core::{
    catalog::{MoveCatalog, StyleCatalog},
    pose::{Pose, SkeletonJoint, ROT_Y},
    scoring::{self, Keypoint},
    synth::{self, SilentNoise},
    transport::ChannelViewer,
    PoseSynthesizer, Timeline, TransportController, TransportEvent,
};

#[test]
fn catalogs_list_in_declaration_order() {
    assert_eq!(
        StyleCatalog::list_style_ids(),
        ["afrobeats", "hiphop", "electro", "salsa", "robot"]
    );
    assert_eq!(
        MoveCatalog::list_move_ids(),
        ["moonwalk", "crotchGrab", "spin", "kick", "lean", "armWave"]
    );
}

#[test]
fn synthesizer_routes_styles_and_moves() {
    let mut synth = PoseSynthesizer::with_noise(SilentNoise);

    let Pose::LimbChain(limb) = synth.synthesize("electro", 0.4, 1.0) else {
        panic!("style ids produce limb-chain poses");
    };
    assert_eq!(limb.color, "#EF476F");

    let Pose::Skeleton(skeleton) = synth.synthesize("spin", 0.25, 1.0) else {
        panic!("move ids produce skeleton poses");
    };
    assert_eq!(skeleton.joints.len(), SkeletonJoint::ALL.len());
    assert!((skeleton.joint(SkeletonJoint::Hips)[ROT_Y] - 90.0).abs() < 1e-3);
}

#[test]
fn timeline_matches_direct_synthesis() {
    let timeline = Timeline::build(12.0);
    for index in [0_usize, 17, 95, 200, 359] {
        let frame = &timeline.frames()[index];
        let timestamp = index as f32 / 30.0;
        let kind = MoveCatalog::moves()[(timestamp / 2.0).floor() as usize % 6].0;
        let intensity = MoveCatalog::definition(kind).intensity;
        assert_eq!(*frame, synth::skeleton_pose(kind, timestamp, intensity));
    }
}

#[test]
fn transport_fan_out_survives_a_dropped_viewer() {
    let transport = Arc::new(TransportController::new());
    let registry = transport.viewers();

    let (alive, mut alive_rx) = ChannelViewer::pair(registry.next_id());
    let (gone, gone_rx) = ChannelViewer::pair(registry.next_id());
    registry.register(Arc::new(alive)).unwrap();
    registry.register(Arc::new(gone)).unwrap();
    drop(gone_rx);

    let transition = transport.play("intro").unwrap();
    assert_eq!(transition.broadcast.delivered, 1);
    assert_eq!(transition.broadcast.pruned.len(), 1);

    match alive_rx.try_recv().unwrap() {
        TransportEvent::MusicStart { music_id, timestamp } => {
            assert_eq!(music_id, "intro");
            assert!(timestamp.ends_with('Z'));
        }
        other => panic!("unexpected event {other:?}"),
    }

    transport.advance(2.5).unwrap();
    let timeline = Timeline::build(10.0);
    let now = transport.state().unwrap().current_time();
    assert_eq!(timeline.pose_at(now).move_name, "crotchGrab");
    assert_eq!(transport.status().unwrap().connected_clients, 1);
}

#[test]
fn scorer_grades_keypoint_sets() {
    let reference: Vec<Keypoint> = (0..5)
        .map(|i| Keypoint::new(i as f32 * 0.1, 0.5, 0.95))
        .collect();
    let shifted: Vec<Keypoint> = reference
        .iter()
        .map(|k| Keypoint::new(k.x + 0.05, k.y, k.confidence))
        .collect();

    let accuracy = scoring::similarity(&reference, &shifted);
    assert!((accuracy - 0.9).abs() < 1e-4);

    let report = scoring::coach(accuracy);
    assert_eq!(report.score, 90);
    assert!(report.feedback.starts_with("Excellent"));
}

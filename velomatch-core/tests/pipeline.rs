use geo::{LineString, line_string};
use velomatch_core::model::CandidateOrigin;
use velomatch_core::prelude::*;

fn edge(id: &str, geometry: LineString<f64>, direction: DirectionCode) -> TargetEdge {
    TargetEdge {
        id: id.to_string(),
        district: Some("Friedrichshain-Kreuzberg".to_string()),
        from_node: format!("{id}-from"),
        to_node: format!("{id}-to"),
        direction,
        street_name: Some("Oranienstraße".to_string()),
        feature: LinearFeature::new(geometry, Attributes::new()),
    }
}

fn way(id: &str, kind: SourceKind, geometry: LineString<f64>, surface: &str) -> SourceWay {
    let mut attributes = Attributes::new();
    attributes.insert("surface".to_string(), AttrValue::from(surface));
    SourceWay::new(id, kind, LinearFeature::new(geometry, attributes))
}

fn surface_config(segment_length: f64) -> PipelineConfig {
    PipelineConfig {
        segment_length,
        min_merge_length: 50.0,
        attributes: AttributeSchema::Passthrough {
            keys: vec!["surface".to_string()],
        },
        ..PipelineConfig::default()
    }
}

fn straight_edge() -> TargetEdge {
    edge(
        "e1",
        line_string![(x: 0.0, y: 0.0), (x: 120.0, y: 0.0)],
        DirectionCode::Forward,
    )
}

fn lengths(output: &PipelineOutput) -> Vec<f64> {
    output.aggregated.iter().map(|a| a.length).collect()
}

fn assert_lengths(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn uniform_surface_yields_single_edge() {
    let ways = vec![way(
        "asphalt",
        SourceKind::Bikelane,
        line_string![(x: 0.0, y: 2.0), (x: 120.0, y: 2.0)],
        "asphalt",
    )];
    let output = run_pipeline(
        ways,
        vec![straight_edge()],
        &ManualOverrides::default(),
        &surface_config(40.0),
    )
    .unwrap();

    assert_eq!(output.segments.len(), 3);
    assert_lengths(&lengths(&output), &[120.0]);
    let aggregated = &output.aggregated[0];
    assert_eq!(aggregated.element_nr, "e1.01");
    assert_eq!(aggregated.begin_node, "e1-from");
    assert_eq!(aggregated.end_node, "e1-to");
    assert_eq!(aggregated.sources, vec!["asphalt".to_string()]);
    assert_eq!(
        aggregated.attributes.as_ref().unwrap()["surface"],
        AttrValue::from("asphalt")
    );
    assert!(output.report.unmatched_edges.is_empty());
}

#[test]
fn gravel_in_the_middle_splits_into_three() {
    let ways = vec![
        way(
            "w1",
            SourceKind::Bikelane,
            line_string![(x: 0.0, y: 2.0), (x: 40.0, y: 2.0)],
            "asphalt",
        ),
        way(
            "w2",
            SourceKind::Bikelane,
            line_string![(x: 40.0, y: 2.0), (x: 80.0, y: 2.0)],
            "gravel",
        ),
        way(
            "w3",
            SourceKind::Bikelane,
            line_string![(x: 80.0, y: 2.0), (x: 120.0, y: 2.0)],
            "asphalt",
        ),
    ];
    let output = run_pipeline(
        ways,
        vec![straight_edge()],
        &ManualOverrides::default(),
        &surface_config(40.0),
    )
    .unwrap();

    assert_lengths(&lengths(&output), &[40.0, 40.0, 40.0]);
    let surfaces: Vec<&AttrValue> = output
        .aggregated
        .iter()
        .map(|a| &a.attributes.as_ref().unwrap()["surface"])
        .collect();
    assert_eq!(
        surfaces,
        vec![
            &AttrValue::from("asphalt"),
            &AttrValue::from("gravel"),
            &AttrValue::from("asphalt")
        ]
    );
    assert_eq!(output.aggregated[1].begin_node, "e1#1");
    assert_eq!(output.aggregated[1].end_node, "e1#2");
}

#[test]
fn max_merge_length_splits_long_runs() {
    let ways = vec![way(
        "asphalt",
        SourceKind::Bikelane,
        line_string![(x: 0.0, y: 2.0), (x: 120.0, y: 2.0)],
        "asphalt",
    )];
    let config = PipelineConfig {
        max_merge_length: Some(50.0),
        ..surface_config(10.0)
    };
    let output =
        run_pipeline(ways, vec![straight_edge()], &ManualOverrides::default(), &config).unwrap();

    // 50 + 50 + 20, the short tail folds into its predecessor
    assert_lengths(&lengths(&output), &[50.0, 70.0]);
    assert_eq!(output.aggregated[0].attributes, output.aggregated[1].attributes);
}

#[test]
fn reruns_are_identical() {
    let ways = || {
        vec![
            way(
                "w1",
                SourceKind::Bikelane,
                line_string![(x: 0.0, y: 3.0), (x: 70.0, y: 3.0)],
                "asphalt",
            ),
            way(
                "w2",
                SourceKind::Street,
                line_string![(x: 50.0, y: -3.0), (x: 120.0, y: -3.0)],
                "sett",
            ),
        ]
    };
    let edges = || {
        vec![
            straight_edge(),
            edge(
                "e2",
                line_string![(x: 120.0, y: 0.0), (x: 120.0, y: 90.0)],
                DirectionCode::Both,
            ),
        ]
    };
    let config = surface_config(5.0);

    let first = run_pipeline(ways(), edges(), &ManualOverrides::default(), &config).unwrap();
    let second = run_pipeline(ways(), edges(), &ManualOverrides::default(), &config).unwrap();

    assert_eq!(first.aggregated, second.aggregated);
    assert_eq!(first.summaries, second.summaries);
    assert_eq!(first.report, second.report);
}

#[test]
fn segments_partition_every_edge() {
    let edges = vec![
        edge(
            "bent",
            line_string![(x: 0.0, y: 0.0), (x: 33.3, y: 0.0), (x: 33.3, y: 47.9), (x: 80.0, y: 60.0)],
            DirectionCode::Both,
        ),
        edge(
            "short",
            line_string![(x: 200.0, y: 0.0), (x: 203.0, y: 4.0)],
            DirectionCode::Backward,
        ),
    ];
    let expected: Vec<f64> = edges.iter().map(TargetEdge::length).collect();
    let output = run_pipeline(
        Vec::new(),
        edges,
        &ManualOverrides::default(),
        &PipelineConfig::default(),
    )
    .unwrap();

    for (idx, expected) in expected.iter().enumerate() {
        let segments: Vec<&Segment> = output.segments.iter().filter(|s| s.edge == idx).collect();
        let total: f64 = segments.iter().map(|s| s.length).sum();
        assert!((total - expected).abs() < 1e-9);
        assert!(segments.iter().all(|s| s.length > 0.0 && s.length <= 5.0 + 1e-9));

        let aggregated: f64 = output
            .aggregated
            .iter()
            .filter(|a| a.edge == idx)
            .map(|a| a.length)
            .sum();
        assert!((aggregated - expected).abs() < 1e-9);
    }
    assert_eq!(output.report.unmatched_edges, vec!["bent", "short"]);
    assert_eq!(output.report.attributed_segments, 0);
}

#[test]
fn way_in_both_override_lists_is_excluded() {
    let ways = vec![way(
        "contested",
        SourceKind::Bikelane,
        line_string![(x: 0.0, y: 2.0), (x: 120.0, y: 2.0)],
        "asphalt",
    )];
    let overrides = ManualOverrides::new(["contested"], ["contested"]);
    let output =
        run_pipeline(ways, vec![straight_edge()], &overrides, &surface_config(40.0)).unwrap();

    assert!(output.candidates.iter().all(|c| !c.is_accepted()));
    assert!(output.candidates.iter().all(|c| {
        c.status == CandidateStatus::Rejected(RejectReason::ManualExclude)
    }));
    assert_eq!(output.report.ambiguous_overrides, vec!["contested"]);
    assert_eq!(output.report.attributed_segments, 0);
}

#[test]
fn include_revives_way_below_coverage() {
    let crossing = || {
        vec![way(
            "crossing",
            SourceKind::Bikelane,
            line_string![(x: 100.0, y: 5.0), (x: 100.0, y: 95.0)],
            "asphalt",
        )]
    };

    let plain = run_pipeline(
        crossing(),
        vec![straight_edge()],
        &ManualOverrides::default(),
        &surface_config(40.0),
    )
    .unwrap();
    assert!(plain.candidates.iter().all(|c| {
        c.status == CandidateStatus::Rejected(RejectReason::Coverage)
    }));
    assert_eq!(plain.report.unmatched_edges, vec!["e1"]);

    let overrides = ManualOverrides::new(["crossing", "missing"], Vec::<String>::new());
    let forced = run_pipeline(
        crossing(),
        vec![straight_edge()],
        &overrides,
        &surface_config(40.0),
    )
    .unwrap();
    assert!(forced.candidates.iter().all(|c| {
        c.is_accepted() && c.origin == CandidateOrigin::Manual
    }));
    // only the last segment lies within the snap radius of the way
    assert_eq!(forced.report.attributed_segments, 1);
    assert_eq!(forced.report.unknown_overrides, vec!["missing"]);
}

#[test]
fn orthogonal_filter_boundary() {
    let ways = vec![
        way(
            "diagonal",
            SourceKind::Bikelane,
            line_string![(x: 40.0, y: -5.0), (x: 50.0, y: 5.0)],
            "asphalt",
        ),
        way(
            "perpendicular",
            SourceKind::Bikelane,
            line_string![(x: 60.0, y: -40.0), (x: 60.0, y: 40.0)],
            "asphalt",
        ),
    ];
    let mut config = surface_config(5.0);
    config.angle_diff_threshold = 45.0;
    config.stages.coverage_filter = false;

    let output =
        run_pipeline(ways, vec![straight_edge()], &ManualOverrides::default(), &config).unwrap();

    let status_of = |id: &str| {
        output
            .candidates
            .iter()
            .find(|c| c.way_id == id)
            .map(|c| c.status)
            .unwrap()
    };
    assert_eq!(
        status_of("diagonal"),
        CandidateStatus::Rejected(RejectReason::Orthogonal)
    );
    assert_eq!(status_of("perpendicular"), CandidateStatus::Accepted);
}

#[test]
fn bikelane_supersedes_overlapping_street() {
    let ways = vec![
        way(
            "lane",
            SourceKind::Bikelane,
            line_string![(x: 0.0, y: 2.0), (x: 120.0, y: 2.0)],
            "asphalt",
        ),
        way(
            "street",
            SourceKind::Street,
            line_string![(x: 0.0, y: 4.0), (x: 120.0, y: 4.0)],
            "sett",
        ),
    ];
    let output = run_pipeline(
        ways,
        vec![straight_edge()],
        &ManualOverrides::default(),
        &surface_config(40.0),
    )
    .unwrap();

    let street: Vec<&Candidate> = output
        .candidates
        .iter()
        .filter(|c| c.way_id == "street")
        .collect();
    assert!(!street.is_empty());
    assert!(street.iter().all(|c| {
        c.status == CandidateStatus::Rejected(RejectReason::Superseded)
    }));
    assert_eq!(output.aggregated[0].sources, vec!["lane".to_string()]);
}

#[test]
fn layers_and_summaries_follow_direction() {
    let ways = vec![way(
        "asphalt",
        SourceKind::Bikelane,
        line_string![(x: 0.0, y: 2.0), (x: 120.0, y: 2.0)],
        "asphalt",
    )];
    let edges = vec![
        straight_edge(),
        edge(
            "e2",
            line_string![(x: 0.0, y: 10.0), (x: 120.0, y: 10.0)],
            DirectionCode::Both,
        ),
    ];
    let output =
        run_pipeline(ways, edges, &ManualOverrides::default(), &surface_config(40.0)).unwrap();

    assert_eq!(output.layers.forward.len(), 2);
    assert_eq!(output.layers.backward.len(), 1);
    let back = &output.layers.backward[0];
    assert_eq!(back.edge.edge_id, "e2");
    assert_eq!(back.edge.begin_node, "e2-to");
    assert_eq!(output.summaries.len(), 3);
    assert!(output.summaries.iter().all(|s| s.attributes.contains_key("bezirk")));
}

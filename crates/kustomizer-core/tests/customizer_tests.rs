mod common;

use chrono::{TimeZone, Utc};
use common::*;
use kustomizer_core::error::{ConfigurationError, Feature, KustomizerError, ValidationError};
use kustomizer_core::{
    AssetSource, CustomizationState, GraphicOptions, LayoutSnapshot, NodeKind, Rgb, TextOptions,
    Viewer, ViewerConfig,
};

fn validation(err: KustomizerError) -> ValidationError {
    match err {
        KustomizerError::Validation(v) => v,
        other => panic!("expected validation error, got {other:?}"),
    }
}

fn text(viewer: &TestViewer, s: &str) -> Result<usize, KustomizerError> {
    pollster::block_on(viewer.add_text(s, &TextOptions::default()))
}

fn graphic(viewer: &TestViewer, svg: &str) -> Result<usize, KustomizerError> {
    pollster::block_on(viewer.add_graphic(AssetSource::Bytes(svg.into()), &GraphicOptions::default()))
}

#[test]
fn text_limit_rejects_without_touching_state() {
    let viewer = loaded_viewer(ViewerConfig {
        max_text_length: 10,
        ..test_config()
    });
    assert_eq!(text(&viewer, "hello").expect("fits"), 0);

    let err = validation(text(&viewer, "hello world").unwrap_err());
    assert_eq!(err, ValidationError::TextTooLong { len: 11, max: 10 });
    assert_eq!(viewer.customization_data().text_elements.len(), 1);
    assert_eq!(viewer.node_count(NodeKind::Text), 1);

    // exactly at the limit is fine, one more is not
    assert!(text(&viewer, &"x".repeat(10)).is_ok());
    assert!(text(&viewer, &"x".repeat(11)).is_err());
}

#[test]
fn text_length_counts_characters_not_bytes() {
    let viewer = loaded_viewer(ViewerConfig {
        max_text_length: 3,
        ..test_config()
    });
    assert!(text(&viewer, "äöü").is_ok());
}

#[test]
fn blank_text_is_rejected() {
    let viewer = loaded_viewer(test_config());
    assert_eq!(validation(text(&viewer, "   ").unwrap_err()), ValidationError::EmptyText);
    assert!(viewer.customization_data().is_empty());
}

#[test]
fn unknown_font_is_rejected_and_default_font_is_the_first() {
    let viewer = loaded_viewer(test_config());
    let opts = TextOptions {
        font: Some("Comic".into()),
        ..TextOptions::default()
    };
    let err = validation(pollster::block_on(viewer.add_text("hey", &opts)).unwrap_err());
    assert_eq!(err, ValidationError::UnknownFont("Comic".into()));

    text(&viewer, "hey").expect("default font");
    assert_eq!(viewer.customization_data().text_elements[0].font, "Sans");
}

#[test]
fn out_of_range_options_are_validation_errors() {
    let viewer = loaded_viewer(test_config());
    let opts = TextOptions {
        size: 0.0,
        ..TextOptions::default()
    };
    let err = validation(pollster::block_on(viewer.add_text("a", &opts)).unwrap_err());
    assert!(matches!(err, ValidationError::OutOfRange { field: "size", .. }));

    let opts = GraphicOptions {
        depth: -1.0,
        ..GraphicOptions::default()
    };
    let err = pollster::block_on(viewer.add_graphic(AssetSource::Bytes(SQUARE_SVG.into()), &opts))
        .unwrap_err();
    assert!(matches!(
        validation(err),
        ValidationError::OutOfRange { field: "depth", .. }
    ));
}

#[test]
fn disabled_features_reject_their_operations() {
    let mut config = test_config();
    config.features.text_enabled = false;
    config.features.graphics_enabled = false;
    config.features.texture_upload_enabled = false;
    let viewer = loaded_viewer(config);

    assert_eq!(
        validation(text(&viewer, "hi").unwrap_err()),
        ValidationError::FeatureDisabled(Feature::Text)
    );
    assert_eq!(
        validation(graphic(&viewer, SQUARE_SVG).unwrap_err()),
        ValidationError::FeatureDisabled(Feature::Graphics)
    );
    let err = pollster::block_on(viewer.set_texture(AssetSource::Bytes(png_bytes(1, 1, [0; 4]))))
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::FeatureDisabled(Feature::TextureUpload));
    assert!(viewer.customization_data().is_empty());
}

#[test]
fn add_and_remove_keep_scene_and_state_in_step() {
    let viewer = loaded_viewer(test_config());
    text(&viewer, "one").expect("one");
    text(&viewer, "two").expect("two");
    graphic(&viewer, STAR_SVG).expect("star");
    assert_eq!(viewer.with(|c| c.scene().backend().live_meshes()), 4);

    assert!(viewer.remove_text(0));
    let data = viewer.customization_data();
    assert_eq!(data.text_elements.len(), 1);
    assert_eq!(data.text_elements[0].text, "two");
    assert_eq!(viewer.node_count(NodeKind::Text), 1);

    // out of range is a no-op
    assert!(!viewer.remove_text(5));
    assert!(!viewer.remove_graphic(1));
    assert_eq!(viewer.node_count(NodeKind::Graphic), 1);

    assert!(viewer.remove_graphic(0));
    assert_eq!(viewer.with(|c| c.scene().backend().live_meshes()), 2);
}

#[test]
fn removing_everything_returns_to_the_model_alone() {
    let viewer = loaded_viewer(test_config());
    let baseline = viewer.with(|c| c.scene().backend().live_meshes());

    text(&viewer, "one").expect("one");
    graphic(&viewer, SQUARE_SVG).expect("square");
    text(&viewer, "two").expect("two");
    graphic(&viewer, STAR_SVG).expect("star");
    text(&viewer, "three").expect("three");
    assert_eq!(viewer.with(|c| c.scene().backend().live_meshes()), baseline + 5);

    while viewer.remove_text(0) {}
    while viewer.remove_graphic(0) {}

    let data = viewer.customization_data();
    assert!(data.text_elements.is_empty());
    assert!(data.graphic_elements.is_empty());
    assert_eq!(viewer.node_count(NodeKind::Text), 0);
    assert_eq!(viewer.node_count(NodeKind::Graphic), 0);
    assert_eq!(viewer.with(|c| c.scene().backend().live_meshes()), baseline);
}

#[test]
fn failed_graphic_leaves_no_trace() {
    let viewer = loaded_viewer(test_config());
    let err = graphic(&viewer, "<svg><g/></svg>").unwrap_err();
    assert_eq!(err.kind(), "AssetLoadError");
    let err = pollster::block_on(
        viewer.add_graphic(AssetSource::Bytes(vec![0xff, 0xfe, 0x00]), &GraphicOptions::default()),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "AssetLoadError");
    assert!(viewer.customization_data().graphic_elements.is_empty());
    assert_eq!(viewer.node_count(NodeKind::Graphic), 0);
}

#[test]
fn graphic_with_overflowing_coordinates_is_rejected() {
    let viewer = loaded_viewer(test_config());
    let meshes = viewer.with(|c| c.scene().backend().live_meshes());
    for svg in [
        r#"<svg><polygon points="0,0 1e999,0 0,10"/></svg>"#,
        r#"<svg><g transform="scale(1e300)"><rect width="10" height="10"/></g></svg>"#,
    ] {
        let err = graphic(&viewer, svg).unwrap_err();
        assert_eq!(err.kind(), "AssetLoadError", "{svg}");
    }
    assert!(viewer.customization_data().graphic_elements.is_empty());
    assert_eq!(viewer.node_count(NodeKind::Graphic), 0);
    assert_eq!(viewer.with(|c| c.scene().backend().live_meshes()), meshes);
}

#[test]
fn undecodable_font_file_is_an_asset_error() {
    let config = ViewerConfig {
        fallback_font_source: Some(FONT_URI.into()),
        ..test_config()
    };
    let fetcher = MapFetcher::default()
        .with(MODEL_URI, model_bytes())
        .with(FONT_URI, b"definitely not a font".to_vec());
    let viewer = Viewer::new(config, RecordingBackend::default(), fetcher).expect("config");
    pollster::block_on(viewer.load_base_model(&|_| {})).expect("load");

    let err = text(&viewer, "hi").unwrap_err();
    assert_eq!(err.kind(), "AssetLoadError");
    assert!(viewer.customization_data().text_elements.is_empty());
    assert!(!viewer.with(|c| c.fonts().contains("Sans")));
}

#[test]
fn font_without_source_is_an_asset_error() {
    let fetcher = MapFetcher::default().with(MODEL_URI, model_bytes());
    let viewer = Viewer::new(test_config(), RecordingBackend::default(), fetcher).expect("config");
    let err = text(&viewer, "hi").unwrap_err();
    assert!(matches!(
        err,
        KustomizerError::AssetLoad(kustomizer_core::AssetLoadError::Font(_))
    ));
}

#[test]
fn texture_generations_count_applies_and_last_wins() {
    let viewer = loaded_viewer(test_config());
    let first = png_bytes(1, 1, [255, 0, 0, 255]);
    let second = png_bytes(2, 2, [0, 255, 0, 255]);

    let (a, b) = pollster::block_on(futures::future::join(
        viewer.set_texture(AssetSource::Bytes(first)),
        viewer.set_texture(AssetSource::Bytes(second.clone())),
    ));
    assert_eq!((a.expect("a"), b.expect("b")), (1, 2));
    assert_eq!(viewer.with(|c| c.texture_generation()), 2);

    let uri = viewer.customization_data().texture_data_uri.expect("recorded");
    assert_eq!(kustomizer_core::loaders::decode_data_uri(&uri).expect("decode"), second);

    let textures = viewer.with(|c| c.scene().backend().textures.clone());
    assert_eq!(textures.len(), 1);
    assert!(textures.values().all(|size| *size == (2, 2)));
}

#[test]
fn texture_resolving_last_wins_even_if_requested_first() {
    const STONE_URI: &str = "https://shop.test/textures/stone.png";
    let slow = png_bytes(3, 1, [200, 10, 10, 255]);
    let fast = png_bytes(1, 2, [10, 10, 200, 255]);
    let (fetcher, release) = MapFetcher::default()
        .with(MODEL_URI, model_bytes())
        .with(TEXTURE_URI, slow.clone())
        .with(STONE_URI, fast)
        .gated(TEXTURE_URI);
    let viewer = viewer_with(test_config(), fetcher);
    pollster::block_on(viewer.load_base_model(&|_| {})).expect("load");

    let (slow_generation, fast_generation) = pollster::block_on(futures::future::join(
        viewer.set_texture(AssetSource::uri(TEXTURE_URI)),
        async {
            let generation = viewer.set_texture(AssetSource::uri(STONE_URI)).await;
            let _ = release.send(());
            generation
        },
    ));
    assert_eq!(fast_generation.expect("fast"), 1);
    assert_eq!(slow_generation.expect("slow"), 2);

    let uri = viewer.customization_data().texture_data_uri.expect("recorded");
    assert_eq!(kustomizer_core::loaders::decode_data_uri(&uri).expect("decode"), slow);
    let textures = viewer.with(|c| c.scene().backend().textures.clone());
    assert_eq!(textures.values().copied().collect::<Vec<_>>(), vec![(3, 1)]);
}

#[test]
fn data_uri_textures_are_recorded_verbatim() {
    let viewer = loaded_viewer(test_config());
    let uri = kustomizer_core::loaders::to_data_uri("image/png", &png_bytes(1, 1, [9, 9, 9, 255]));
    pollster::block_on(viewer.set_texture(AssetSource::Uri(uri.clone()))).expect("texture");
    assert_eq!(viewer.customization_data().texture_data_uri, Some(uri));
}

#[test]
fn broken_texture_keeps_the_previous_one() {
    let viewer = loaded_viewer(test_config());
    pollster::block_on(viewer.set_texture(AssetSource::Bytes(png_bytes(1, 1, [1, 1, 1, 255]))))
        .expect("first");
    let before = viewer.customization_data();
    let material = viewer.with(|c| c.scene().base_material());

    let err = pollster::block_on(viewer.set_texture(AssetSource::Bytes(b"nope".to_vec()))).unwrap_err();
    assert_eq!(err.kind(), "AssetLoadError");
    assert_eq!(viewer.customization_data(), before);
    assert_eq!(viewer.with(|c| c.scene().base_material()), material);
}

#[test]
fn reset_clears_decorations_but_keeps_the_model() {
    let viewer = loaded_viewer(test_config());
    pollster::block_on(viewer.set_texture(AssetSource::Bytes(png_bytes(1, 1, [1, 1, 1, 255]))))
        .expect("texture");
    text(&viewer, "hi").expect("text");
    graphic(&viewer, SQUARE_SVG).expect("graphic");

    viewer.reset();
    assert!(viewer.customization_data().is_empty());
    assert!(viewer.is_model_ready());
    viewer.with(|c| {
        assert!(!c.scene().has_user_texture());
        assert_eq!(c.scene().backend().live_meshes(), 1);
    });
}

#[test]
fn layout_captures_the_state_at_call_time() {
    let viewer = loaded_viewer(test_config());
    text(&viewer, "first").expect("text");
    let before = viewer.customization_data();

    let snapshot = viewer.generate_layout().expect("layout");
    assert_eq!(snapshot.source_data, before);
    assert!(snapshot.source_data.layout.is_none());
    let img = image::load_from_memory(&snapshot.raster_image).expect("png");
    assert_eq!((img.width(), img.height()), (4, 3));

    let stored = viewer.customization_data().layout.expect("stored");
    assert_eq!(*stored, snapshot);

    // a later call replaces the stored snapshot and never nests the old one
    graphic(&viewer, SQUARE_SVG).expect("graphic");
    let second = viewer.generate_layout().expect("second");
    assert_eq!(second.source_data.graphic_elements.len(), 1);
    assert!(second.source_data.layout.is_none());
    assert_eq!(*viewer.customization_data().layout.expect("stored"), second);
}

#[test]
fn restore_rebuilds_an_equivalent_session() {
    let source = loaded_viewer(test_config());
    pollster::block_on(source.set_texture(AssetSource::Bytes(png_bytes(2, 1, [5, 6, 7, 255]))))
        .expect("texture");
    let opts = TextOptions {
        font: Some("Serif".into()),
        color: Rgb(255, 0, 0),
        ..TextOptions::default()
    };
    pollster::block_on(source.add_text("Name", &opts)).expect("text");
    graphic(&source, STAR_SVG).expect("graphic");
    source.generate_layout().expect("layout");
    let saved = source.customization_data();

    let json = saved.to_json().expect("json");
    let parsed = CustomizationState::from_json(&json).expect("parse");

    let target = loaded_viewer(test_config());
    text(&target, "stale").expect("stale");
    pollster::block_on(target.restore(&parsed)).expect("restore");

    let restored = target.customization_data();
    assert_eq!(restored.texture_data_uri, saved.texture_data_uri);
    assert_eq!(restored.text_elements, saved.text_elements);
    assert_eq!(restored.graphic_elements, saved.graphic_elements);
    assert_eq!(
        restored.layout.as_ref().map(|l| l.created_at),
        saved.layout.as_ref().map(|l| l.created_at)
    );
    assert_eq!(target.node_count(NodeKind::Text), 1);
    assert_eq!(target.node_count(NodeKind::Graphic), 1);
}

#[test]
fn state_json_uses_host_field_names() {
    let viewer = loaded_viewer(test_config());
    let opts = TextOptions {
        color: Rgb(0x12, 0xab, 0xef),
        ..TextOptions::default()
    };
    pollster::block_on(viewer.add_text("Hi", &opts)).expect("text");
    graphic(&viewer, SQUARE_SVG).expect("graphic");

    let value = serde_json::to_value(viewer.customization_data()).expect("json");
    assert!(value.get("textureDataUri").is_none());
    assert!(value.get("layout").is_none());
    let t = &value["textElements"][0];
    assert_eq!(t["text"], "Hi");
    assert_eq!(t["color"], "#12abef");
    assert_eq!(t["position"], serde_json::json!([0.0, 0.0, 10.0]));
    let g = &value["graphicElements"][0];
    assert_eq!(g["svgMarkup"], SQUARE_SVG);
    assert!(g.get("sourcePaths").is_none());
}

#[test]
fn legacy_state_aliases_are_accepted() {
    let json = r##"{
        "texture": "data:image/png;base64,AAAA",
        "textElements": [{"text":"A","font":"Sans","size":5,"depth":2,"color":"#ff0000",
                          "position":[0,0,1],"rotation":[0,0,0]}],
        "svgElements": []
    }"##;
    let state = CustomizationState::from_json(json).expect("parse");
    assert_eq!(state.texture_data_uri.as_deref(), Some("data:image/png;base64,AAAA"));
    assert_eq!(state.text_elements[0].color, Rgb(255, 0, 0));
    assert!(state.graphic_elements.is_empty());
}

#[test]
fn layout_snapshot_serializes_image_as_data_uri() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let png = png_bytes(1, 1, [0, 0, 0, 255]);
    let snapshot = LayoutSnapshot::capture_at(png.clone(), &CustomizationState::default(), at);

    let value = serde_json::to_value(&snapshot).expect("json");
    let image = value["rasterImage"].as_str().expect("string");
    assert!(image.starts_with("data:image/png;base64,"));
    assert_eq!(value["createdAt"], "2024-05-01T12:30:00Z");
    assert_eq!(snapshot.image_data_uri(), image);

    let back: LayoutSnapshot = serde_json::from_value(value).expect("parse");
    assert_eq!(back, snapshot);
    assert_eq!(back.raster_image, png);
}

#[test]
fn config_accepts_host_option_names() {
    let json = r#"{
        "container": "product-viewer",
        "stlFile": "/models/mug.stl",
        "defaultTexture": "",
        "maxTextLength": 20,
        "availableFonts": ["Roboto"],
        "allowSVGUpload": false,
        "productId": 42,
        "camera": {"dampingFactor": 0.2}
    }"#;
    let config = ViewerConfig::from_json(json).expect("config");
    assert_eq!(config.container, "product-viewer");
    assert_eq!(config.base_model_source, "/models/mug.stl");
    assert_eq!(config.default_texture(), None);
    assert_eq!(config.max_text_length, 20);
    assert!(config.features.text_enabled);
    assert!(!config.features.graphics_enabled);
    assert_eq!(config.camera.damping_factor, 0.2);
    assert!(config.camera.damping_enabled);
}

#[test]
fn config_defaults_match_the_product_defaults() {
    let config = ViewerConfig::from_json("{}").expect("config");
    assert_eq!(config.container, "kustomizer-viewer");
    assert_eq!(config.max_text_length, 100);
    assert_eq!(config.available_fonts, ["Arial", "Helvetica", "Times New Roman"]);
    assert_eq!(config.camera.fov_degrees, 75.0);
}

#[test]
fn invalid_configs_are_rejected() {
    assert!(matches!(
        ViewerConfig::from_json(r#"{"container":"  "}"#),
        Err(ConfigurationError::MissingContainer(_))
    ));
    for bad in [
        r#"{"maxTextLength":0}"#,
        r#"{"availableFonts":[]}"#,
        r#"{"camera":{"dampingFactor":1.0}}"#,
        r#"{"camera":{"fovDegrees":0}}"#,
        "not json",
    ] {
        assert!(
            matches!(ViewerConfig::from_json(bad), Err(ConfigurationError::Invalid(_))),
            "{bad}"
        );
    }
    // no fonts is fine when text is off
    assert!(ViewerConfig::from_json(r#"{"availableFonts":[],"allowText":false}"#).is_ok());
}

#[test]
fn invalid_config_never_builds_a_viewer() {
    let config = ViewerConfig {
        max_text_length: 0,
        ..test_config()
    };
    assert!(Viewer::new(config, RecordingBackend::default(), MapFetcher::default()).is_err());
}

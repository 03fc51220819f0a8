use std::io::Write;

use glam::Vec3;
use lumen_realtime::{
    Engine, FullscreenScene, KeyCode, PostEffect, RenderMode, Settings, SettingsHandle, MAX_LIGHTS,
};
use tempfile::NamedTempFile;

fn scene_with_lights(count: usize) -> NamedTempFile {
    let lights: String = (0..count)
        .map(|i| format!("<light><type>point</type><color>{} 1 1</color></light>", i % 2))
        .collect();
    let xml = format!(
        r#"<scene>
  <camera><position>0 0 10</position><focus>0 0 0</focus></camera>
  <object>
    {lights}
    <primitive><type>cube</type></primitive>
    <primitive><type>cylinder</type></primitive>
    <object>
      <scale>2 2 2</scale>
      <primitive><type>sphere</type></primitive>
    </object>
  </object>
</scene>"#
    );
    let mut file = NamedTempFile::new().expect("temp scene");
    file.write_all(xml.as_bytes()).expect("write scene");
    file
}

fn engine_for(settings: Settings) -> Engine {
    let mut engine = Engine::new(SettingsHandle::new(settings));
    engine.on_viewport_resized(640, 480);
    engine
}

#[test]
fn draw_items_partition_the_vertex_buffer() {
    let scene = scene_with_lights(2);
    let engine = engine_for(Settings {
        scene_path: Some(scene.path().to_path_buf()),
        shape_parameter_1: 6,
        shape_parameter_2: 6,
        ..Settings::default()
    });

    let batch = engine.batch();
    assert_eq!(engine.mode(), RenderMode::GeometryScene);
    assert_eq!(batch.draws.len(), 3);
    let mut next = 0;
    for draw in &batch.draws {
        assert_eq!(draw.first, next);
        assert!(draw.count > 0);
        next += draw.count;
    }
    assert_eq!(next, batch.vertex_count());
}

#[test]
fn light_upload_is_capped() {
    let scene = scene_with_lights(MAX_LIGHTS + 3);
    let engine = engine_for(Settings {
        scene_path: Some(scene.path().to_path_buf()),
        ..Settings::default()
    });
    let summary = engine.summary();
    assert_eq!(summary.lights, MAX_LIGHTS + 3);
    assert_eq!(summary.uploaded_lights, MAX_LIGHTS);
}

#[test]
fn held_key_moves_the_camera_between_ticks() {
    let scene = scene_with_lights(1);
    let mut engine = engine_for(Settings {
        scene_path: Some(scene.path().to_path_buf()),
        ..Settings::default()
    });
    let start = engine.active_camera().position();
    engine.on_key_pressed(KeyCode::FORWARD);
    let outcome = engine.tick(0.5);
    engine.end_frame();

    assert!(outcome.moved);
    let moved = engine.active_camera().position() - start;
    assert!(moved.dot(Vec3::NEG_Z) > 0.0);

    engine.on_focus_lost();
    let before = engine.active_camera().position();
    engine.tick(0.5);
    assert_eq!(engine.active_camera().position(), before);
}

#[test]
fn settings_changes_are_picked_up_on_tick() {
    let handle = SettingsHandle::new(Settings::default());
    let mut engine = Engine::new(handle.clone());
    assert_eq!(engine.frame().post, PostEffect::None);

    handle.update(|settings| settings.fullscreen_scene = FullscreenScene::Planet);
    engine.tick(0.0);
    let frame = engine.frame();
    assert_eq!(frame.mode, RenderMode::PlanetGeometryScene);
    assert_eq!(frame.post, PostEffect::Toon);
    assert!(!frame.batch.is_empty());
}

#[test]
fn depth_debug_overrides_post_effects() {
    let scene = scene_with_lights(1);
    let mut engine = engine_for(Settings {
        scene_path: Some(scene.path().to_path_buf()),
        motion_blur: true,
        ..Settings::default()
    });
    assert_eq!(engine.frame().post, PostEffect::MotionBlur);
    engine.on_key_pressed(KeyCode::DEPTH_DEBUG);
    assert_eq!(engine.frame().post, PostEffect::DepthDebug);
}

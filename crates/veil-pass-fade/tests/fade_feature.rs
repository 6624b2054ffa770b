use glam::Vec4;
use veil_pass_fade::{FadeFeature, FadeSettings, FadeUniform, PROGRAM_NAME};
use veil_render::features::FeatureRegistry;
use veil_render::graph::ResourceHandle;
use veil_render::testing::{RecordingBackend, StaticShaders};
use veil_render::{
    ParameterStack, PostProcessConfig, PostProcessStack, ScheduleMode, SkipReason, ViewDescriptor, ViewKind,
    ViewKinds,
};

fn view() -> ViewDescriptor {
    ViewDescriptor::new(1280, 720, wgpu::TextureFormat::Bgra8UnormSrgb)
}

fn build_stack(mode: ScheduleMode, feature: FadeFeature, shaders: &StaticShaders) -> PostProcessStack {
    let features = FeatureRegistry::builder().with_feature(feature).build().unwrap();
    PostProcessStack::new(PostProcessConfig::default().with_mode(mode), features, shaders).unwrap()
}

#[test]
fn zero_progress_schedules_nothing() {
    let shaders = StaticShaders::new().with_program(PROGRAM_NAME);
    let params = ParameterStack::new().with(FadeSettings::new());
    let mut backend = RecordingBackend::new();
    let mut stack = build_stack(ScheduleMode::Graph, FadeFeature::new(), &shaders);

    let report = stack.render_frame(&params, &view(), &shaders, &mut backend);
    assert_eq!(report.skip_reason("camera_fade"), Some(SkipReason::ZeroProgress));
    assert!(backend.events.is_empty());
}

#[test]
fn active_fade_writes_back_to_camera_color() {
    let shaders = StaticShaders::new().with_program(PROGRAM_NAME);
    let params = ParameterStack::new().with(
        FadeSettings::new()
            .with_color(Vec4::new(1.0, 1.0, 1.0, 1.0))
            .with_progress(0.4),
    );

    for mode in [ScheduleMode::Immediate, ScheduleMode::Graph] {
        let mut backend = RecordingBackend::new();
        let mut stack = build_stack(mode, FadeFeature::new(), &shaders);

        let report = stack.render_frame(&params, &view(), &shaders, &mut backend);
        assert!(report.ran("camera_fade"), "{:?}", mode);
        assert_eq!(report.blits, 2);

        let blits = backend.blits();
        let uniform: FadeUniform = blits[0].uniforms_as().unwrap();
        assert_eq!(uniform.progress, 0.4);
        assert_eq!(uniform.color, [1.0; 4]);
        assert_eq!(blits[1].source, blits[0].target);
        assert_eq!(blits[1].target, ResourceHandle::CAMERA_COLOR);
    }
}

#[test]
fn offscreen_target_follows_the_view() {
    let shaders = StaticShaders::new().with_program(PROGRAM_NAME);
    let params = ParameterStack::new().with(FadeSettings::new().with_progress(1.0));
    let mut backend = RecordingBackend::new();
    let mut stack = build_stack(ScheduleMode::Immediate, FadeFeature::new(), &shaders);

    stack.render_frame(&params, &view(), &shaders, &mut backend);
    stack.render_frame(&params, &view(), &shaders, &mut backend);
    assert_eq!(backend.creations(), 1);

    let resized = ViewDescriptor::new(640, 360, wgpu::TextureFormat::Bgra8UnormSrgb);
    stack.render_frame(&params, &resized, &shaders, &mut backend);
    assert_eq!(backend.creations(), 2);
    assert_eq!(backend.releases(), 1);
    assert_eq!(backend.live_textures(), 1);

    stack.dispose(&mut backend);
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn excluded_views_are_configurable() {
    let shaders = StaticShaders::new().with_program(PROGRAM_NAME);
    let params = ParameterStack::new().with(FadeSettings::new().with_progress(1.0));
    let mut backend = RecordingBackend::new();

    let mut stack = build_stack(ScheduleMode::Graph, FadeFeature::new(), &shaders);
    let report = stack.render_frame(&params, &view().with_kind(ViewKind::Preview), &shaders, &mut backend);
    assert_eq!(
        report.skip_reason("camera_fade"),
        Some(SkipReason::InvalidViewKind(ViewKind::Preview))
    );

    let feature = FadeFeature::new().with_excluded_views(ViewKinds::SCENE_VIEW);
    let mut stack = build_stack(ScheduleMode::Graph, feature, &shaders);
    let report = stack.render_frame(&params, &view().with_kind(ViewKind::Preview), &shaders, &mut backend);
    assert!(report.ran("camera_fade"));
    let report = stack.render_frame(&params, &view().with_kind(ViewKind::SceneView), &shaders, &mut backend);
    assert!(!report.ran("camera_fade"));
}

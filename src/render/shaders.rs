//! WGSL sources. Geometry and shadow programs share the uniform
//! declarations and vertex animation in [`SCENE_COMMON`].

pub(crate) const SCENE_COMMON: &str = r#"
struct Light {
    info: vec4<f32>,
    color: vec4<f32>,
    position: vec4<f32>,
    direction: vec4<f32>,
    attenuation: vec4<f32>,
}

struct FrameUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    prev_view: mat4x4<f32>,
    prev_projection: mat4x4<f32>,
    light_space: mat4x4<f32>,
    camera_position: vec4<f32>,
    globals: vec4<f32>,
    fog: vec4<f32>,
    params: vec4<f32>,
    lights: array<Light, 8>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    prev_model: mat4x4<f32>,
    normal: mat3x4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    texture: vec4<f32>,
    animation_a: vec4<f32>,
    animation_b: vec4<f32>,
    animation_c: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;

@group(1) @binding(0)
var<uniform> object: ObjectUniforms;

const TAU: f32 = 6.28318530718;

fn animation_kind() -> i32 {
    return i32(object.texture.z + 0.5);
}

fn spin(p: vec3<f32>, angle: f32) -> vec3<f32> {
    let c = cos(angle);
    let s = sin(angle);
    return vec3<f32>(c * p.x + s * p.z, p.y, -s * p.x + c * p.z);
}

// Object-space position after any spin applied before the model matrix.
fn animated_local(p: vec3<f32>, t: f32) -> vec3<f32> {
    if (animation_kind() == 1) {
        return spin(p, object.animation_c.x * t);
    }
    return p;
}

// World-space offset applied after the model matrix.
fn animated_offset(t: f32) -> vec3<f32> {
    let kind = animation_kind();
    if (kind == 3) {
        let angle = object.animation_c.y * t;
        let radius = object.animation_c.x;
        return object.animation_a.xyz + vec3<f32>(cos(angle) * radius, 0.0, sin(angle) * radius);
    }
    if (kind == 4) {
        return vec3<f32>(0.0, object.animation_c.x * sin(TAU * object.animation_c.y * t), 0.0);
    }
    return vec3<f32>(0.0);
}

fn world_position(model: mat4x4<f32>, p: vec3<f32>, t: f32) -> vec3<f32> {
    let local = animated_local(p, t);
    return (model * vec4<f32>(local, 1.0)).xyz + animated_offset(t);
}
"#;

pub(crate) const SHADOW: &str = r#"
struct ShadowIn {
    @location(0) position: vec3<f32>,
}

@vertex
fn vs_shadow(input: ShadowIn) -> @builtin(position) vec4<f32> {
    let world = world_position(object.model, input.position, frame.camera_position.w);
    return frame.light_space * vec4<f32>(world, 1.0);
}
"#;

pub(crate) const GEOMETRY: &str = r#"
@group(0) @binding(1)
var shadow_map: texture_depth_2d;

@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(2) @binding(0)
var material_texture: texture_2d<f32>;

@group(2) @binding(1)
var material_sampler: sampler;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tint: vec4<f32>,
}

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tint: vec4<f32>,
    @location(4) current: vec4<f32>,
    @location(5) previous: vec4<f32>,
    @location(6) local: vec3<f32>,
}

struct GBufferOut {
    @location(0) color: vec4<f32>,
    @location(1) velocity: vec2<f32>,
    @location(2) normal: vec4<f32>,
}

@vertex
fn vs_main(input: VertexIn) -> VertexOut {
    let t = frame.camera_position.w;
    let world = world_position(object.model, input.position, t);
    let prev_world = world_position(object.prev_model, input.position, frame.params.z);

    var out: VertexOut;
    out.world = world;
    out.clip = frame.projection * frame.view * vec4<f32>(world, 1.0);
    out.current = out.clip;
    out.previous = frame.prev_projection * frame.prev_view * vec4<f32>(prev_world, 1.0);
    let normal = animated_local(input.normal, t);
    out.normal = normalize((object.normal * normal).xyz);
    out.uv = input.uv;
    out.tint = input.tint;
    out.local = input.position;
    return out;
}

fn shadow_factor(world: vec3<f32>, normal: vec3<f32>, to_light: vec3<f32>) -> f32 {
    let clip = frame.light_space * vec4<f32>(world, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    let bias = max(0.004 * (1.0 - dot(normal, to_light)), 0.0008);
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - bias);
}

fn spot_falloff(light: Light, to_light: vec3<f32>) -> f32 {
    let outer = light.info.y;
    let inner = outer - light.info.z;
    let angle = acos(clamp(dot(-to_light, light.direction.xyz), -1.0, 1.0));
    if (angle <= inner) {
        return 1.0;
    }
    if (angle >= outer) {
        return 0.0;
    }
    let x = (angle - inner) / max(outer - inner, 0.0001);
    return 1.0 - (-2.0 * x * x * x + 3.0 * x * x);
}

fn band_color(local: vec3<f32>) -> vec3<f32> {
    let bands = 0.5 + 0.5 * sin(local.y * 18.0 + sin(local.x * 6.0) * 0.6);
    return mix(object.animation_a.rgb, object.animation_b.rgb, bands);
}

fn sand_grain(world: vec3<f32>) -> f32 {
    let cell = floor(world.xz * 24.0);
    return fract(sin(dot(cell, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

@fragment
fn fs_main(input: VertexOut, @builtin(front_facing) front: bool) -> GBufferOut {
    var normal = normalize(input.normal);
    if (!front) {
        normal = -normal;
    }
    let kind = animation_kind();
    let view_dir = normalize(frame.camera_position.xyz - input.world);

    var diffuse_color = object.diffuse.rgb * input.tint.rgb;
    var ambient_color = object.ambient.rgb * input.tint.rgb;
    if (kind == 1) {
        diffuse_color = band_color(input.local);
        ambient_color = diffuse_color * 0.5;
    } else if (kind == 2) {
        let grain = 0.92 + 0.08 * sand_grain(input.world);
        diffuse_color = diffuse_color * grain;
    }
    if (object.diffuse.w > 0.5) {
        let texel = textureSample(material_texture, material_sampler, input.uv * object.texture.xy).rgb;
        diffuse_color = mix(diffuse_color, texel, object.specular.w);
    }

    let globals = frame.globals;
    var color = globals.x * ambient_color;
    let light_count = u32(frame.params.y);
    let caster = i32(frame.params.w) - 1;
    for (var i = 0u; i < light_count; i = i + 1u) {
        let light = frame.lights[i];
        let light_kind = i32(light.info.x + 0.5);
        var to_light: vec3<f32>;
        var attenuation = 1.0;
        if (light_kind == 0) {
            to_light = -normalize(light.direction.xyz);
        } else {
            let offset = light.position.xyz - input.world;
            let distance = length(offset);
            to_light = offset / max(distance, 0.0001);
            let c = light.attenuation.xyz;
            attenuation = min(1.0, 1.0 / max(c.x + c.y * distance + c.z * distance * distance, 0.0001));
            if (light_kind == 2) {
                attenuation = attenuation * spot_falloff(light, to_light);
            }
        }
        if (i32(i) == caster) {
            attenuation = attenuation * shadow_factor(input.world, normal, to_light);
        }
        let n_dot_l = max(dot(normal, to_light), 0.0);
        let reflected = reflect(-to_light, normal);
        var highlight = 0.0;
        if (n_dot_l > 0.0) {
            highlight = pow(max(dot(reflected, view_dir), 0.0), max(object.ambient.w, 1.0));
        }
        let diffuse = globals.y * diffuse_color * n_dot_l;
        let specular = globals.z * object.specular.rgb * highlight;
        color = color + attenuation * light.color.rgb * (diffuse + specular);
    }

    let view_position = frame.view * vec4<f32>(input.world, 1.0);
    if (frame.params.x > 0.5) {
        let distance = -view_position.z;
        let density = frame.fog.w;
        let transmittance = exp(-(density * distance) * (density * distance));
        color = mix(frame.fog.rgb, color, clamp(transmittance, 0.0, 1.0));
    }

    let current = input.current.xy / input.current.w;
    let previous = input.previous.xy / input.previous.w;
    let velocity = (current - previous) * vec2<f32>(0.5, -0.5);

    let view_normal = normalize((frame.view * vec4<f32>(normal, 0.0)).xyz);

    var out: GBufferOut;
    out.color = vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
    out.velocity = velocity;
    out.normal = vec4<f32>(view_normal, 1.0);
    return out;
}
"#;

/// Full-screen triangle shared by post stages and analytic scenes.
pub(crate) const FULLSCREEN_VERTEX: &str = r#"
struct FullscreenOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOut {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOut;
    out.position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}
"#;

pub(crate) const POST_COMMON: &str = r#"
struct PostUniforms {
    inverse_view_projection: mat4x4<f32>,
    texel: vec4<f32>,
    depth_of_field: vec4<f32>,
    blur: vec4<f32>,
    motion: vec4<f32>,
    time: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> post: PostUniforms;

@group(0) @binding(1)
var color_texture: texture_2d<f32>;

@group(0) @binding(2)
var depth_texture: texture_depth_2d;

@group(0) @binding(3)
var velocity_texture: texture_2d<f32>;

@group(0) @binding(4)
var normal_texture: texture_2d<f32>;

@group(0) @binding(5)
var linear_sampler: sampler;

@group(1) @binding(0)
var sky_texture: texture_2d<f32>;

@group(1) @binding(1)
var sky_sampler: sampler;

fn texel_coord(uv: vec2<f32>) -> vec2<i32> {
    let size = vec2<i32>(post.texel.zw);
    return clamp(vec2<i32>(uv * post.texel.zw), vec2<i32>(0), size - vec2<i32>(1));
}

fn raw_depth(uv: vec2<f32>) -> f32 {
    return textureLoad(depth_texture, texel_coord(uv), 0);
}

// Eye distance for a [0, 1] depth value of a right-handed perspective.
fn linear_depth(depth: f32) -> f32 {
    let near = post.depth_of_field.x;
    let far = post.depth_of_field.y;
    return near * far / max(far - depth * (far - near), 0.0001);
}
"#;

pub(crate) const DEPTH_DEBUG: &str = r#"
@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let distance = linear_depth(raw_depth(input.uv));
    let shade = clamp(distance / post.depth_of_field.y, 0.0, 1.0);
    return vec4<f32>(vec3<f32>(shade), 1.0);
}
"#;

pub(crate) const DEPTH_OF_FIELD: &str = r#"
const GOLDEN_ANGLE: f32 = 2.39996323;
const TAPS: i32 = 12;

@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let sharp = textureSampleLevel(color_texture, linear_sampler, input.uv, 0.0);
    if (post.blur.y < 0.5) {
        return sharp;
    }
    let distance = linear_depth(raw_depth(input.uv));
    let focus = post.depth_of_field.z;
    let range = max(post.depth_of_field.w, 0.0001);
    let coc = clamp((abs(distance - focus) - range) / (range * 4.0), 0.0, 1.0);
    let radius = coc * post.blur.x;
    if (radius < 0.5) {
        return sharp;
    }

    var sum = sharp.rgb;
    var weight = 1.0;
    for (var i = 0; i < TAPS; i = i + 1) {
        let r = radius * sqrt((f32(i) + 0.5) / f32(TAPS));
        let theta = f32(i) * GOLDEN_ANGLE;
        let offset = vec2<f32>(cos(theta), sin(theta)) * r * post.texel.xy;
        sum = sum + textureSampleLevel(color_texture, linear_sampler, input.uv + offset, 0.0).rgb;
        weight = weight + 1.0;
    }
    return vec4<f32>(sum / weight, sharp.a);
}
"#;

pub(crate) const MOTION_BLUR: &str = r#"
@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    var velocity = textureSampleLevel(velocity_texture, linear_sampler, input.uv, 0.0).xy;
    let pixels = velocity * post.texel.zw;
    let length_px = length(pixels);
    let max_px = post.motion.x;
    if (length_px > max_px) {
        velocity = velocity * (max_px / length_px);
    }
    let samples = max(i32(post.motion.y), 1);
    var sum = vec3<f32>(0.0);
    for (var i = 0; i < samples; i = i + 1) {
        let t = f32(i) / f32(max(samples - 1, 1)) - 0.5;
        sum = sum + textureSampleLevel(color_texture, linear_sampler, input.uv - velocity * t, 0.0).rgb;
    }
    return vec4<f32>(sum / f32(samples), 1.0);
}
"#;

pub(crate) const TOON: &str = r#"
const PI: f32 = 3.14159265359;

fn sky(uv: vec2<f32>) -> vec3<f32> {
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let near = post.inverse_view_projection * vec4<f32>(ndc, 0.0, 1.0);
    let far = post.inverse_view_projection * vec4<f32>(ndc, 1.0, 1.0);
    let direction = normalize(far.xyz / far.w - near.xyz / near.w);
    if (post.motion.w > 0.5) {
        let sky_uv = vec2<f32>(
            atan2(direction.x, -direction.z) / (2.0 * PI) + 0.5,
            acos(clamp(direction.y, -1.0, 1.0)) / PI,
        );
        return textureSampleLevel(sky_texture, sky_sampler, sky_uv, 0.0).rgb;
    }
    let height = clamp(direction.y * 0.5 + 0.5, 0.0, 1.0);
    return mix(vec3<f32>(0.98, 0.72, 0.45), vec3<f32>(0.18, 0.32, 0.62), height);
}

fn edge(uv: vec2<f32>) -> f32 {
    let pixel = post.texel.xy;
    let center_depth = linear_depth(raw_depth(uv));
    let center_normal = textureSampleLevel(normal_texture, linear_sampler, uv, 0.0).xyz;
    var depth_edge = 0.0;
    var normal_edge = 0.0;
    var offsets = array<vec2<f32>, 4>(
        vec2<f32>(1.0, 0.0),
        vec2<f32>(-1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );
    for (var i = 0; i < 4; i = i + 1) {
        let sample_uv = uv + offsets[i] * pixel;
        let d = linear_depth(raw_depth(sample_uv));
        depth_edge = max(depth_edge, abs(d - center_depth) / max(center_depth, 0.0001));
        let n = textureSampleLevel(normal_texture, linear_sampler, sample_uv, 0.0).xyz;
        normal_edge = max(normal_edge, 1.0 - dot(n, center_normal));
    }
    return select(0.0, 1.0, depth_edge > 0.08 || normal_edge > 0.35);
}

@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let color = textureSampleLevel(color_texture, linear_sampler, input.uv, 0.0);
    let background = sky(input.uv);
    if (color.a < 0.01) {
        return vec4<f32>(background, 1.0);
    }
    let luminance = dot(color.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let level = floor(luminance * 4.0 + 0.5) / 4.0;
    let scale = level / max(luminance, 0.0001);
    var toon = clamp(color.rgb * scale, vec3<f32>(0.0), vec3<f32>(1.0));
    toon = mix(toon, vec3<f32>(0.05, 0.04, 0.06), edge(input.uv));
    return vec4<f32>(mix(background, toon, color.a), 1.0);
}
"#;

pub(crate) const DIRECTIONAL_BLUR: &str = r#"
@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let strength = clamp(post.motion.z, 0.0, 1.0);
    let samples = max(i32(post.motion.y), 1);
    let direction = (input.uv - vec2<f32>(0.5)) * strength * 0.08;
    var sum = vec3<f32>(0.0);
    for (var i = 0; i < samples; i = i + 1) {
        let t = f32(i) / f32(samples);
        sum = sum + textureSampleLevel(color_texture, linear_sampler, input.uv - direction * t, 0.0).rgb;
    }
    return vec4<f32>(sum / f32(samples), 1.0);
}
"#;

pub(crate) const ANALYTIC_COMMON: &str = r#"
struct AnalyticUniforms {
    resolution: vec4<f32>,
    mouse: vec4<f32>,
    camera_position: vec4<f32>,
    camera_look: vec4<f32>,
    camera_up: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> scene: AnalyticUniforms;

struct Ray {
    origin: vec3<f32>,
    direction: vec3<f32>,
}

fn camera_ray(uv: vec2<f32>) -> Ray {
    let look = normalize(scene.camera_look.xyz);
    let right = normalize(cross(look, scene.camera_up.xyz));
    let up = cross(right, look);
    let half_height = tan(scene.camera_position.w * 0.5);
    let aspect = scene.resolution.x / max(scene.resolution.y, 1.0);
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let direction = normalize(look + right * ndc.x * half_height * aspect + up * ndc.y * half_height);
    return Ray(scene.camera_position.xyz, direction);
}

fn hash2(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);
    let a = hash2(cell);
    let b = hash2(cell + vec2<f32>(1.0, 0.0));
    let c = hash2(cell + vec2<f32>(0.0, 1.0));
    let d = hash2(cell + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

const SUN: vec3<f32> = vec3<f32>(0.48, 0.62, -0.62);
"#;

pub(crate) const FOREST: &str = r#"
const TREE_SPACING: f32 = 6.0;

fn ground_height(p: vec2<f32>) -> f32 {
    return value_noise(p * 0.08) * 2.5 + value_noise(p * 0.3) * 0.4 - 1.5;
}

fn tree_cell(p: vec3<f32>) -> vec3<f32> {
    let cell = floor(p.xz / TREE_SPACING);
    let jitter = vec2<f32>(hash2(cell), hash2(cell + vec2<f32>(17.0, 5.0))) - 0.5;
    let center = (cell + 0.5 + jitter * 0.6) * TREE_SPACING;
    return vec3<f32>(center.x, ground_height(center), center.y);
}

// x: distance, y: material (0 ground, 1 trunk, 2 canopy).
fn map(p: vec3<f32>) -> vec2<f32> {
    var best = vec2<f32>(p.y - ground_height(p.xz), 0.0);
    let base = tree_cell(p);
    let local = p - base;
    let trunk = max(length(local.xz) - 0.25, abs(local.y - 1.5) - 1.5);
    if (trunk < best.x) {
        best = vec2<f32>(trunk, 1.0);
    }
    let canopy = length((local - vec3<f32>(0.0, 3.8, 0.0)) * vec3<f32>(1.0, 0.7, 1.0)) - 1.6;
    if (canopy < best.x) {
        best = vec2<f32>(canopy * 0.7, 2.0);
    }
    return best;
}

fn normal_at(p: vec3<f32>) -> vec3<f32> {
    let e = vec2<f32>(0.01, 0.0);
    return normalize(vec3<f32>(
        map(p + e.xyy).x - map(p - e.xyy).x,
        map(p + e.yxy).x - map(p - e.yxy).x,
        map(p + e.yyx).x - map(p - e.yyx).x,
    ));
}

fn sky_color(direction: vec3<f32>) -> vec3<f32> {
    let height = clamp(direction.y, 0.0, 1.0);
    let sun = pow(max(dot(direction, normalize(SUN)), 0.0), 64.0);
    return mix(vec3<f32>(0.78, 0.86, 0.92), vec3<f32>(0.36, 0.58, 0.86), height) + sun * vec3<f32>(1.0, 0.9, 0.7);
}

@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let ray = camera_ray(input.uv);
    var t = 0.05;
    var material = -1.0;
    for (var i = 0; i < 160; i = i + 1) {
        let hit = map(ray.origin + ray.direction * t);
        if (hit.x < 0.002 * t) {
            material = hit.y;
            break;
        }
        t = t + hit.x * 0.8;
        if (t > 120.0) {
            break;
        }
    }

    let sky = sky_color(ray.direction);
    if (material < 0.0) {
        return vec4<f32>(sky, 1.0);
    }
    let p = ray.origin + ray.direction * t;
    let n = normal_at(p);
    var albedo = vec3<f32>(0.32, 0.45, 0.2) * (0.8 + 0.2 * value_noise(p.xz * 2.0));
    if (material > 1.5) {
        albedo = vec3<f32>(0.12, 0.34, 0.14);
    } else if (material > 0.5) {
        albedo = vec3<f32>(0.32, 0.22, 0.14);
    }
    let diffuse = max(dot(n, normalize(SUN)), 0.0);
    let color = albedo * (0.25 + 0.85 * diffuse);
    let fog = 1.0 - exp(-t * 0.025);
    return vec4<f32>(mix(color, sky, fog), 1.0);
}
"#;

pub(crate) const WATER: &str = r#"
const WATER_LEVEL: f32 = 0.0;

fn sky_color(direction: vec3<f32>) -> vec3<f32> {
    let height = clamp(direction.y, 0.0, 1.0);
    let sun = pow(max(dot(direction, normalize(SUN)), 0.0), 256.0);
    let base = mix(vec3<f32>(0.9, 0.78, 0.66), vec3<f32>(0.22, 0.42, 0.75), pow(height, 0.6));
    return base + sun * vec3<f32>(1.0, 0.92, 0.8) * 4.0;
}

fn wave_normal(p: vec2<f32>, time: f32) -> vec3<f32> {
    let e = 0.05;
    let h = value_noise(p * 0.6 + vec2<f32>(time * 0.3, time * 0.2));
    let hx = value_noise((p + vec2<f32>(e, 0.0)) * 0.6 + vec2<f32>(time * 0.3, time * 0.2));
    let hz = value_noise((p + vec2<f32>(0.0, e)) * 0.6 + vec2<f32>(time * 0.3, time * 0.2));
    return normalize(vec3<f32>((h - hx) * 0.6, e, (h - hz) * 0.6));
}

@fragment
fn fs_main(input: FullscreenOut) -> @location(0) vec4<f32> {
    let ray = camera_ray(input.uv);
    let sky = sky_color(ray.direction);
    if (ray.direction.y > -0.0001) {
        return vec4<f32>(sky, 1.0);
    }
    let t = (WATER_LEVEL - ray.origin.y) / ray.direction.y;
    if (t < 0.0) {
        return vec4<f32>(sky, 1.0);
    }
    let p = ray.origin + ray.direction * t;
    let n = wave_normal(p.xz, scene.resolution.w);
    let reflected = reflect(ray.direction, n);
    let fresnel = 0.02 + 0.98 * pow(1.0 - max(dot(-ray.direction, n), 0.0), 5.0);
    let deep = vec3<f32>(0.02, 0.12, 0.18);
    let color = mix(deep, sky_color(reflected), fresnel);
    let haze = 1.0 - exp(-t * 0.01);
    return vec4<f32>(mix(color, sky_color(vec3<f32>(ray.direction.x, 0.0, ray.direction.z)), haze), 1.0);
}
"#;

pub(crate) const PORTAL: &str = r#"
struct PortalUniforms {
    view_projection: mat4x4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> portal: PortalUniforms;

@group(0) @binding(1)
var portal_texture: texture_2d<f32>;

@group(0) @binding(2)
var portal_sampler: sampler;

struct PortalIn {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct PortalOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_portal(input: PortalIn) -> PortalOut {
    var out: PortalOut;
    out.clip = portal.view_projection * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_portal(input: PortalOut) -> @location(0) vec4<f32> {
    let view = textureSample(portal_texture, portal_sampler, vec2<f32>(input.uv.x, 1.0 - input.uv.y)).rgb;
    let edge = min(min(input.uv.x, 1.0 - input.uv.x), min(input.uv.y, 1.0 - input.uv.y));
    let rim = 1.0 - smoothstep(0.0, 0.06, edge);
    let color = mix(view, vec3<f32>(0.55, 0.8, 1.0), rim * 0.8);
    return vec4<f32>(color, portal.params.x);
}
"#;

/// Complete module source for a scene pass.
pub fn scene_source(body: &str) -> String {
    format!("{SCENE_COMMON}{body}")
}

pub fn post_source(body: &str) -> String {
    format!("{FULLSCREEN_VERTEX}{POST_COMMON}{body}")
}

pub fn analytic_source(body: &str) -> String {
    format!("{FULLSCREEN_VERTEX}{ANALYTIC_COMMON}{body}")
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Filter chain resolution: computes the ordered, enabled sequence of filter
// stages from configuration. Pure — identical inputs always yield the same
// sequence, which reproducible rendering depends on.

use crate::params::{SharedParams, StageSlot, MAX_STAGES};

/// Identifier of one filter operation within the processing chain.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageTag {
    Colorspace = 1,
    Nnedi = 2,
    DenoiseKnn = 3,
    DenoisePmd = 4,
    DenoiseSmooth = 5,
    Resize = 6,
    Unsharp = 7,
    EdgeLevel = 8,
    WarpSharp = 9,
    Tweak = 10,
    Deband = 11,
}

/// Fallback application order for stages absent from the user's preference.
pub const CATALOG_ORDER: [StageTag; 11] = [
    StageTag::Colorspace,
    StageTag::Nnedi,
    StageTag::DenoiseKnn,
    StageTag::DenoisePmd,
    StageTag::DenoiseSmooth,
    StageTag::Resize,
    StageTag::Unsharp,
    StageTag::EdgeLevel,
    StageTag::WarpSharp,
    StageTag::Tweak,
    StageTag::Deband,
];

/// Per-stage settings: one variant per catalog stage with its own parameter
/// payload. A stage missing from the configuration is distinguishable from a
/// stage that is present but disabled.
///
/// `Resize` carries no `enabled` flag — its enablement is computed externally
/// from the input/output geometry and passed to [`resolve_chain`] as
/// `resize_required`.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSettings {
    Colorspace {
        enabled: bool,
        full_range: bool,
    },
    Nnedi {
        enabled: bool,
        field: i32,
        quality: i32,
    },
    DenoiseKnn {
        enabled: bool,
        radius: i32,
        strength: f32,
        lerp: f32,
    },
    DenoisePmd {
        enabled: bool,
        apply_count: i32,
        strength: f32,
        threshold: f32,
    },
    DenoiseSmooth {
        enabled: bool,
        quality: i32,
        qp: f32,
    },
    Resize {
        algo: ResizeAlgo,
    },
    Unsharp {
        enabled: bool,
        radius: i32,
        weight: f32,
        threshold: f32,
    },
    EdgeLevel {
        enabled: bool,
        strength: f32,
        threshold: f32,
        black: f32,
        white: f32,
    },
    WarpSharp {
        enabled: bool,
        threshold: f32,
        depth: f32,
        blur: i32,
    },
    Tweak {
        enabled: bool,
        brightness: f32,
        contrast: f32,
        gamma: f32,
        saturation: f32,
        hue: f32,
    },
    Deband {
        enabled: bool,
        range: i32,
        threshold_y: i32,
        threshold_cb: i32,
        threshold_cr: i32,
    },
}

/// Interpolation used by the resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlgo {
    Bilinear = 0,
    Spline36 = 1,
    Lanczos4 = 2,
}

impl StageSettings {
    /// The catalog tag this settings variant configures.
    pub fn tag(&self) -> StageTag {
        match self {
            Self::Colorspace { .. } => StageTag::Colorspace,
            Self::Nnedi { .. } => StageTag::Nnedi,
            Self::DenoiseKnn { .. } => StageTag::DenoiseKnn,
            Self::DenoisePmd { .. } => StageTag::DenoisePmd,
            Self::DenoiseSmooth { .. } => StageTag::DenoiseSmooth,
            Self::Resize { .. } => StageTag::Resize,
            Self::Unsharp { .. } => StageTag::Unsharp,
            Self::EdgeLevel { .. } => StageTag::EdgeLevel,
            Self::WarpSharp { .. } => StageTag::WarpSharp,
            Self::Tweak { .. } => StageTag::Tweak,
            Self::Deband { .. } => StageTag::Deband,
        }
    }

    /// The stage's own enable flag. `Resize` reports `false` here; its
    /// enablement comes from `resize_required` in [`resolve_chain`].
    pub fn enabled(&self) -> bool {
        match *self {
            Self::Colorspace { enabled, .. }
            | Self::Nnedi { enabled, .. }
            | Self::DenoiseKnn { enabled, .. }
            | Self::DenoisePmd { enabled, .. }
            | Self::DenoiseSmooth { enabled, .. }
            | Self::Unsharp { enabled, .. }
            | Self::EdgeLevel { enabled, .. }
            | Self::WarpSharp { enabled, .. }
            | Self::Tweak { enabled, .. }
            | Self::Deband { enabled, .. } => enabled,
            Self::Resize { .. } => false,
        }
    }

    /// Pack the parameter payload into a worker-side slot array.
    pub fn pack(&self) -> [f32; 8] {
        let mut p = [0.0f32; 8];
        match *self {
            Self::Colorspace { full_range, .. } => {
                p[0] = full_range as u32 as f32;
            }
            Self::Nnedi { field, quality, .. } => {
                p[0] = field as f32;
                p[1] = quality as f32;
            }
            Self::DenoiseKnn {
                radius,
                strength,
                lerp,
                ..
            } => {
                p[0] = radius as f32;
                p[1] = strength;
                p[2] = lerp;
            }
            Self::DenoisePmd {
                apply_count,
                strength,
                threshold,
                ..
            } => {
                p[0] = apply_count as f32;
                p[1] = strength;
                p[2] = threshold;
            }
            Self::DenoiseSmooth { quality, qp, .. } => {
                p[0] = quality as f32;
                p[1] = qp;
            }
            Self::Resize { algo } => {
                p[0] = algo as u32 as f32;
            }
            Self::Unsharp {
                radius,
                weight,
                threshold,
                ..
            } => {
                p[0] = radius as f32;
                p[1] = weight;
                p[2] = threshold;
            }
            Self::EdgeLevel {
                strength,
                threshold,
                black,
                white,
                ..
            } => {
                p[0] = strength;
                p[1] = threshold;
                p[2] = black;
                p[3] = white;
            }
            Self::WarpSharp {
                threshold,
                depth,
                blur,
                ..
            } => {
                p[0] = threshold;
                p[1] = depth;
                p[2] = blur as f32;
            }
            Self::Tweak {
                brightness,
                contrast,
                gamma,
                saturation,
                hue,
                ..
            } => {
                p[0] = brightness;
                p[1] = contrast;
                p[2] = gamma;
                p[3] = saturation;
                p[4] = hue;
            }
            Self::Deband {
                range,
                threshold_y,
                threshold_cb,
                threshold_cr,
                ..
            } => {
                p[0] = range as f32;
                p[1] = threshold_y as f32;
                p[2] = threshold_cb as f32;
                p[3] = threshold_cr as f32;
            }
        }
        p
    }
}

/// The host's filter configuration: settings for whichever stages the user
/// has touched. Stages absent here are treated as disabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    pub stages: Vec<StageSettings>,
}

impl FilterConfig {
    /// Settings for `tag`, if the configuration mentions it at all.
    pub fn find(&self, tag: StageTag) -> Option<&StageSettings> {
        self.stages.iter().find(|s| s.tag() == tag)
    }

    /// Whether `tag`'s own configuration flag is set. Absent means disabled.
    pub fn is_enabled(&self, tag: StageTag) -> bool {
        self.find(tag).map(StageSettings::enabled).unwrap_or(false)
    }
}

/// Compute the ordered, enabled sequence of stage tags.
///
/// The user's preferred order comes first (later duplicates dropped); every
/// catalog tag absent from it is appended in [`CATALOG_ORDER`], so each tag
/// appears exactly once in the augmented list. Stages are then kept iff
/// enabled: `Resize` iff `resize_required`, every other stage iff its own
/// configuration flag is set. Relative order of survivors is preserved.
pub fn resolve_chain(
    config: &FilterConfig,
    user_order: &[StageTag],
    resize_required: bool,
) -> Vec<StageTag> {
    let mut augmented: Vec<StageTag> = Vec::with_capacity(CATALOG_ORDER.len());
    for &tag in user_order {
        if !augmented.contains(&tag) {
            augmented.push(tag);
        }
    }
    for &tag in &CATALOG_ORDER {
        if !augmented.contains(&tag) {
            augmented.push(tag);
        }
    }

    augmented
        .into_iter()
        .filter(|&tag| match tag {
            StageTag::Resize => resize_required,
            _ => config.is_enabled(tag),
        })
        .collect()
}

/// Fill `params.stages` with the resolved chain, in order.
///
/// Stages beyond [`MAX_STAGES`] are dropped; the catalog is smaller than the
/// slot array, so this only triggers on a malformed chain.
pub fn fill_params(params: &mut SharedParams, config: &FilterConfig, chain: &[StageTag]) {
    let mut count = 0usize;
    for &tag in chain.iter().take(MAX_STAGES) {
        let mut slot = StageSlot {
            tag: tag as u32,
            enabled: 1,
            prm: [0.0; 8],
        };
        if let Some(settings) = config.find(tag) {
            slot.prm = settings.pack();
        }
        params.stages[count] = slot;
        count += 1;
    }
    for slot in params.stages[count..].iter_mut() {
        *slot = StageSlot::empty();
    }
    params.stage_count = count as u32;
}

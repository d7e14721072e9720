// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Filter chain resolution tests: ordering, enablement, the geometry-driven
// resize stage, and the packed form handed to the worker.

use filterbridge::{
    fill_params, resolve_chain, FilterConfig, ResizeAlgo, SharedParams, StageSettings, StageTag,
    CATALOG_ORDER, MAX_STAGES,
};

fn config_with(stages: Vec<StageSettings>) -> FilterConfig {
    FilterConfig { stages }
}

fn all_enabled_config() -> FilterConfig {
    config_with(vec![
        StageSettings::Colorspace {
            enabled: true,
            full_range: false,
        },
        StageSettings::DenoiseKnn {
            enabled: true,
            radius: 3,
            strength: 0.08,
            lerp: 0.2,
        },
        StageSettings::Unsharp {
            enabled: true,
            radius: 3,
            weight: 0.5,
            threshold: 10.0,
        },
        StageSettings::Deband {
            enabled: true,
            range: 15,
            threshold_y: 15,
            threshold_cb: 15,
            threshold_cr: 15,
        },
    ])
}

// ========== Enablement ==========

#[test]
fn absent_stages_are_dropped() {
    let config = config_with(vec![StageSettings::Tweak {
        enabled: true,
        brightness: 0.0,
        contrast: 1.0,
        gamma: 1.0,
        saturation: 1.0,
        hue: 0.0,
    }]);
    let chain = resolve_chain(&config, &[], false);
    assert_eq!(chain, vec![StageTag::Tweak]);
}

#[test]
fn disabled_stage_is_dropped_even_when_configured() {
    let config = config_with(vec![
        StageSettings::Tweak {
            enabled: false,
            brightness: 0.0,
            contrast: 1.0,
            gamma: 1.0,
            saturation: 1.0,
            hue: 0.0,
        },
        StageSettings::Deband {
            enabled: true,
            range: 15,
            threshold_y: 15,
            threshold_cb: 15,
            threshold_cr: 15,
        },
    ]);
    let chain = resolve_chain(&config, &[], false);
    assert_eq!(chain, vec![StageTag::Deband]);
}

#[test]
fn empty_config_yields_empty_chain() {
    let chain = resolve_chain(&FilterConfig::default(), &[], false);
    assert!(chain.is_empty());
}

// ========== Resize gating ==========

#[test]
fn resize_follows_geometry_not_configuration() {
    // Configured but geometry says no resize: stays out.
    let config = config_with(vec![StageSettings::Resize {
        algo: ResizeAlgo::Spline36,
    }]);
    assert!(resolve_chain(&config, &[], false).is_empty());

    // Not configured at all but geometry requires it: included anyway.
    let chain = resolve_chain(&FilterConfig::default(), &[], true);
    assert_eq!(chain, vec![StageTag::Resize]);
}

#[test]
fn user_order_cannot_force_resize_in() {
    // Resize listed first in the user's preferred order and configured, but
    // the geometry needs no scaling: it must still be dropped.
    let config = config_with(vec![
        StageSettings::Resize {
            algo: ResizeAlgo::Lanczos4,
        },
        StageSettings::Deband {
            enabled: true,
            range: 15,
            threshold_y: 15,
            threshold_cb: 15,
            threshold_cr: 15,
        },
    ]);
    let chain = resolve_chain(&config, &[StageTag::Resize, StageTag::Deband], false);
    assert!(!chain.contains(&StageTag::Resize));
    assert_eq!(chain, vec![StageTag::Deband]);
}

// ========== Ordering ==========

#[test]
fn user_order_comes_first() {
    let config = all_enabled_config();
    let chain = resolve_chain(&config, &[StageTag::Deband, StageTag::Colorspace], false);
    assert_eq!(
        chain,
        vec![
            StageTag::Deband,
            StageTag::Colorspace,
            StageTag::DenoiseKnn,
            StageTag::Unsharp,
        ]
    );
}

#[test]
fn duplicate_user_entries_keep_first_position() {
    let config = all_enabled_config();
    let chain = resolve_chain(
        &config,
        &[StageTag::Unsharp, StageTag::Deband, StageTag::Unsharp],
        false,
    );
    // Each tag appears exactly once.
    for (i, a) in chain.iter().enumerate() {
        assert!(!chain[i + 1..].contains(a));
    }
    assert_eq!(chain[0], StageTag::Unsharp);
    assert_eq!(chain[1], StageTag::Deband);
}

#[test]
fn absent_tags_append_in_catalog_order() {
    let config = all_enabled_config();
    let chain = resolve_chain(&config, &[StageTag::Deband], true);
    // Deband leads; the rest follow in catalog order.
    assert_eq!(chain[0], StageTag::Deband);
    let rest: Vec<StageTag> = CATALOG_ORDER
        .iter()
        .copied()
        .filter(|&t| t != StageTag::Deband)
        .filter(|&t| t == StageTag::Resize || config.is_enabled(t))
        .collect();
    assert_eq!(&chain[1..], &rest[..]);
}

#[test]
fn resolution_is_deterministic() {
    let config = all_enabled_config();
    let order = [StageTag::Tweak, StageTag::Colorspace];
    let a = resolve_chain(&config, &order, true);
    let b = resolve_chain(&config, &order, true);
    assert_eq!(a, b);
}

// ========== Packed form ==========

#[test]
fn fill_params_mirrors_the_chain() {
    let config = all_enabled_config();
    let chain = resolve_chain(&config, &[], false);
    let mut params = SharedParams::new(1280, 720);
    fill_params(&mut params, &config, &chain);

    assert_eq!(params.stage_count as usize, chain.len());
    for (i, &tag) in chain.iter().enumerate() {
        assert_eq!(params.stages[i].tag, tag as u32);
        assert_eq!(params.stages[i].enabled, 1);
    }
    for slot in &params.stages[chain.len()..MAX_STAGES] {
        assert_eq!(slot.tag, 0);
        assert_eq!(slot.enabled, 0);
    }
}

#[test]
fn fill_params_packs_stage_settings() {
    let config = config_with(vec![StageSettings::DenoiseKnn {
        enabled: true,
        radius: 3,
        strength: 0.08,
        lerp: 0.2,
    }]);
    let chain = resolve_chain(&config, &[], false);
    let mut params = SharedParams::new(640, 480);
    fill_params(&mut params, &config, &chain);

    assert_eq!(params.stage_count, 1);
    let slot = &params.stages[0];
    assert_eq!(slot.tag, StageTag::DenoiseKnn as u32);
    assert_eq!(slot.prm[0], 3.0);
    assert_eq!(slot.prm[1], 0.08);
    assert_eq!(slot.prm[2], 0.2);
}

#[test]
fn fill_params_resets_leftover_slots() {
    let config = all_enabled_config();
    let mut params = SharedParams::new(640, 480);

    let full = resolve_chain(&config, &[], true);
    fill_params(&mut params, &config, &full);
    let shorter = vec![StageTag::Deband];
    fill_params(&mut params, &config, &shorter);

    assert_eq!(params.stage_count, 1);
    assert_eq!(params.stages[0].tag, StageTag::Deband as u32);
    assert_eq!(params.stages[1].tag, 0);
}

//! 配置校验模块
//!
//! 校验规则：
//! - camera 名称非空且唯一
//! - image_extension 受支持
//! - autostart_after_frames > 0
//! - 各类 agent 的 radius > 0，yaw 窗口在 (0, 180] 内
//! - brake_threshold 在 [0, 1] 内

use std::collections::HashSet;

use contracts::{ContractError, KindSettings, RecorderBlueprint};

/// Image extensions the disk store can encode
const SUPPORTED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 校验 RecorderBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    validate_cameras(blueprint)?;
    validate_image_extension(blueprint)?;
    validate_autostart(blueprint)?;
    validate_kind("proximity.traffic_light", &blueprint.proximity.traffic_light)?;
    validate_kind("proximity.speed_limit", &blueprint.proximity.speed_limit)?;
    validate_drive_model(blueprint)?;
    Ok(())
}

/// 校验 camera 名称
fn validate_cameras(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, camera) in blueprint.recording.cameras.iter().enumerate() {
        if camera.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("recording.cameras[{idx}]"),
                "camera name cannot be empty",
            ));
        }
        if camera.contains(['/', '\\']) {
            return Err(ContractError::config_validation(
                format!("recording.cameras[{idx}]"),
                format!("camera name '{camera}' cannot contain path separators"),
            ));
        }
        if !seen.insert(camera) {
            return Err(ContractError::config_validation(
                format!("recording.cameras[{camera}]"),
                "duplicate camera name",
            ));
        }
    }
    Ok(())
}

/// 校验图像扩展名
fn validate_image_extension(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let ext = blueprint.recording.image_extension.to_lowercase();
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ContractError::config_validation(
            "recording.image_extension",
            format!(
                "unsupported image extension '{}', expected one of {:?}",
                blueprint.recording.image_extension, SUPPORTED_IMAGE_EXTENSIONS
            ),
        ));
    }
    Ok(())
}

/// 校验自动录制
fn validate_autostart(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    if blueprint.recording.autostart_after_frames == 0 {
        return Err(ContractError::config_validation(
            "recording.autostart_after_frames",
            "autostart_after_frames must be > 0",
        ));
    }
    Ok(())
}

/// 校验单类 agent 的邻近参数
fn validate_kind(field: &str, settings: &KindSettings) -> Result<(), ContractError> {
    if !(settings.radius.is_finite() && settings.radius > 0.0) {
        return Err(ContractError::config_validation(
            format!("{field}.radius"),
            format!("radius must be > 0, got {}", settings.radius),
        ));
    }
    if !(settings.yaw_window_deg > 0.0 && settings.yaw_window_deg <= 180.0) {
        return Err(ContractError::config_validation(
            format!("{field}.yaw_window_deg"),
            format!(
                "yaw_window_deg must be in (0, 180], got {}",
                settings.yaw_window_deg
            ),
        ));
    }
    if !settings.yaw_offset_deg.is_finite() {
        return Err(ContractError::config_validation(
            format!("{field}.yaw_offset_deg"),
            "yaw_offset_deg must be finite",
        ));
    }
    Ok(())
}

/// 校验驾驶模型参数
fn validate_drive_model(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let threshold = blueprint.drive_model.brake_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ContractError::config_validation(
            "drive_model.brake_threshold",
            format!("brake_threshold must be in [0, 1], got {threshold}"),
        ));
    }
    Ok(())
}

//! 配置校验模块
//!
//! 校验规则：
//! - declared_modes 无重复
//! - 超时时间 > 0
//! - 模拟器频率 > 0，坐标合法，步长/精度非负
//! - 请求选项合法 (min_distance 有限且非负)

use std::collections::HashSet;

use contracts::{ContractError, LocatorBlueprint};

/// 校验 LocatorBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &LocatorBlueprint) -> Result<(), ContractError> {
    validate_locator(blueprint)?;
    validate_simulator(blueprint)?;
    validate_requests(blueprint)?;
    Ok(())
}

/// 校验授权模式与超时
fn validate_locator(blueprint: &LocatorBlueprint) -> Result<(), ContractError> {
    let locator = &blueprint.locator;

    let mut seen = HashSet::new();
    for mode in &locator.declared_modes {
        if !seen.insert(mode) {
            return Err(ContractError::config_validation(
                "locator.declared_modes",
                format!("duplicate mode {mode:?}"),
            ));
        }
    }

    if locator.default_timeout.is_some_and(|t| t.is_zero()) {
        return Err(ContractError::config_validation(
            "locator.default_timeout_ms",
            "default_timeout_ms must be > 0",
        ));
    }

    if locator.ip_lookup_timeout.is_zero() {
        return Err(ContractError::config_validation(
            "locator.ip_lookup_timeout_ms",
            "ip_lookup_timeout_ms must be > 0",
        ));
    }

    Ok(())
}

/// 校验模拟传感器
fn validate_simulator(blueprint: &LocatorBlueprint) -> Result<(), ContractError> {
    let sim = &blueprint.simulator;

    if !sim.frequency_hz.is_finite() || sim.frequency_hz <= 0.0 {
        return Err(ContractError::config_validation(
            "simulator.frequency_hz",
            format!("frequency_hz must be > 0, got {}", sim.frequency_hz),
        ));
    }

    if !sim.start.is_valid() {
        return Err(ContractError::config_validation(
            "simulator.start",
            format!(
                "coordinate out of range: ({}, {})",
                sim.start.latitude, sim.start.longitude
            ),
        ));
    }

    if !sim.step_meters.is_finite() || sim.step_meters < 0.0 {
        return Err(ContractError::config_validation(
            "simulator.step_meters",
            format!("step_meters must be >= 0, got {}", sim.step_meters),
        ));
    }

    if !sim.horizontal_accuracy.is_finite() || sim.horizontal_accuracy < 0.0 {
        return Err(ContractError::config_validation(
            "simulator.horizontal_accuracy",
            format!(
                "horizontal_accuracy must be >= 0, got {}",
                sim.horizontal_accuracy
            ),
        ));
    }

    Ok(())
}

/// 校验请求选项
fn validate_requests(blueprint: &LocatorBlueprint) -> Result<(), ContractError> {
    for (idx, request) in blueprint.requests.iter().enumerate() {
        request.validate().map_err(|e| {
            ContractError::config_validation(format!("requests[{idx}]"), e.to_string())
        })?;
    }
    Ok(())
}

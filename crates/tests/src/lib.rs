//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 脚本传感器驱动的端到端场景
//! - 模拟传感器 + 配置文件的完整运行

#[cfg(test)]
mod contract_tests {
    use contracts::{Accuracy, ConfigVersion, LocatorBlueprint, RequestOptions};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_blueprint_round_trips_through_loader() {
        let mut blueprint = LocatorBlueprint::default();
        blueprint
            .requests
            .push(RequestOptions::new(Accuracy::Block).with_min_distance(25.0));

        let toml =
            config_loader::ConfigLoader::render(&blueprint, config_loader::ConfigFormat::Toml)
                .unwrap();
        let loaded =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(loaded.requests, blueprint.requests);
        assert_eq!(loaded.locator, blueprint.locator);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use contracts::{
        Accuracy, AuthorizationMode, AuthorizationState, Coordinate, LocatorConfig,
        LocatorError, Reading, RequestOptions, SensorConfiguration, ServiceKind,
    };
    use locator::{Locator, RequestState};
    use sensors::ScriptedSensor;

    fn setup(state: AuthorizationState, config: LocatorConfig) -> (Arc<ScriptedSensor>, Locator) {
        let sensor = Arc::new(ScriptedSensor::with_authorization(state));
        let locator = Locator::new(sensor.clone(), config);
        (sensor, locator)
    }

    fn reading(accuracy: f64) -> Reading {
        Reading::new(Coordinate::new(45.4642, 9.19), accuracy, Utc::now())
    }

    /// A(Room) + B(City, 5s) while NotDetermined, then the user denies
    #[tokio::test]
    async fn test_e2e_prompt_then_denial() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined, LocatorConfig::default());

        let a = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        let b = locator
            .submit(RequestOptions::new(Accuracy::City).with_timeout(Duration::from_secs(5)))
            .unwrap();

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(sensor.authorization_requests(), vec![AuthorizationMode::WhenInUse]);
        assert!(snapshot.prompting);
        assert_eq!(snapshot.pending(), 2);
        assert_eq!(snapshot.active(), 0);
        assert_eq!(snapshot.armed_timeouts, 0);
        assert_eq!(sensor.update_count(), 0);

        sensor.respond_to_prompt(AuthorizationState::Denied);

        assert_eq!(a.result().await, Err(LocatorError::AuthorizationDenied));
        assert_eq!(b.result().await, Err(LocatorError::AuthorizationDenied));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert!(!snapshot.prompting);
        assert_eq!(snapshot.metrics.failed, 2);
        assert!(sensor
            .applied_settings()
            .iter()
            .all(|c| !c.requires_activity()));
    }

    /// Same setup, the user grants; one batch resolves both
    #[tokio::test]
    async fn test_e2e_prompt_then_grant() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined, LocatorConfig::default());

        let a = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        let b = locator
            .submit(RequestOptions::new(Accuracy::City).with_timeout(Duration::from_secs(5)))
            .unwrap();
        locator.snapshot().await;

        assert_eq!(sensor.respond_to_prompt(AuthorizationState::RestrictedForeground), 1);

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 2);
        assert_eq!(snapshot.applied.accuracy, Accuracy::Room);
        assert_eq!(snapshot.armed_timeouts, 1);
        assert_eq!(sensor.update_count(), 1);
        assert_eq!(sensor.last_settings().unwrap().accuracy, Accuracy::Room);

        let fix = reading(3.0);
        assert!(sensor.emit_readings(vec![fix.clone()]));

        assert_eq!(a.result().await, Ok(fix.clone()));
        assert_eq!(b.result().await, Ok(fix));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.armed_timeouts, 0);
        assert_eq!(snapshot.metrics.completed, 2);
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }

    /// An opted-out request fails at once while its neighbour keeps waiting
    #[tokio::test]
    async fn test_e2e_opt_out_next_to_prompting_request() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined, LocatorConfig::default());

        let quiet = locator
            .submit(RequestOptions::new(Accuracy::House).avoiding_prompt())
            .unwrap();
        let patient = locator.submit(RequestOptions::new(Accuracy::Block)).unwrap();
        let patient_id = patient.id();

        assert_eq!(quiet.result().await, Err(LocatorError::AuthorizationNeeded));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(sensor.authorization_requests().len(), 1);
        assert_eq!(snapshot.requests.len(), 1);
        assert_eq!(snapshot.requests[0].id, patient_id);
        assert_eq!(snapshot.requests[0].state, RequestState::Queued);

        sensor.respond_to_prompt(AuthorizationState::FullAccess);
        sensor.emit_readings(vec![reading(90.0)]);
        assert!(patient.result().await.is_ok());
    }

    /// Background services need `Always`; foreground consumers keep being served meanwhile
    #[tokio::test]
    async fn test_e2e_background_upgrade() {
        let config = LocatorConfig {
            declared_modes: vec![AuthorizationMode::WhenInUse, AuthorizationMode::Always],
            ..Default::default()
        };
        let (sensor, locator) = setup(AuthorizationState::RestrictedForeground, config);

        let mut foreground = locator
            .submit(RequestOptions::new(Accuracy::House).continuous())
            .unwrap();
        let visits = locator
            .submit(RequestOptions::default().with_service(ServiceKind::Visits))
            .unwrap();

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(sensor.authorization_requests(), vec![AuthorizationMode::Always]);
        assert_eq!(snapshot.active(), 1);
        assert!(!snapshot.applied.services.contains(&ServiceKind::Visits));

        sensor.emit_readings(vec![reading(20.0)]);
        assert!(foreground.recv().await.unwrap().is_ok());

        sensor.respond_to_prompt(AuthorizationState::FullAccess);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 2);
        assert!(snapshot.applied.services.contains(&ServiceKind::Visits));
        assert!(snapshot.applied.services.contains(&ServiceKind::Continuous));

        sensor.emit_readings(vec![reading(20.0)]);
        assert!(visits.result().await.is_ok());
        assert!(foreground.recv().await.unwrap().is_ok());
    }

    /// A background request stuck on a foreground-only grant leaves later
    /// foreground requests free to run
    #[tokio::test(start_paused = true)]
    async fn test_e2e_background_first_then_foreground() {
        let (sensor, locator) =
            setup(AuthorizationState::RestrictedForeground, LocatorConfig::default());

        let visits = locator
            .submit(RequestOptions::default().with_service(ServiceKind::Visits))
            .unwrap();
        locator.snapshot().await;
        assert_eq!(sensor.authorization_requests(), vec![AuthorizationMode::Always]);
        sensor.respond_to_prompt(AuthorizationState::RestrictedForeground);

        let foreground = locator
            .submit(RequestOptions::new(Accuracy::House).with_timeout(Duration::from_secs(1)))
            .unwrap();
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 1);
        assert_eq!(snapshot.armed_timeouts, 1);
        assert_eq!(sensor.last_settings().unwrap().accuracy, Accuracy::House);

        sensor.emit_readings(vec![reading(20.0)]);
        assert!(foreground.result().await.is_ok());

        let timed = locator
            .submit(RequestOptions::new(Accuracy::Room).with_timeout(Duration::from_secs(1)))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timed.result().await, Err(LocatorError::Timeout(Duration::from_secs(1))));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 1);
        assert_eq!(snapshot.requests[0].id, visits.id());
        assert_eq!(snapshot.metrics.completed, 1);
        assert_eq!(snapshot.metrics.timed_out, 1);
        assert_eq!(sensor.authorization_requests().len(), 1);
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }

    /// Revoking access from system settings fails everything that was running
    #[tokio::test]
    async fn test_e2e_unsolicited_revocation() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess, LocatorConfig::default());

        let mut stream = locator
            .submit(RequestOptions::new(Accuracy::Block).continuous())
            .unwrap();
        locator.snapshot().await;
        sensor.emit_readings(vec![reading(50.0)]);
        assert!(stream.recv().await.unwrap().is_ok());

        sensor.set_authorization(AuthorizationState::Denied);

        assert_eq!(stream.recv().await, Some(Err(LocatorError::AuthorizationDenied)));
        assert_eq!(stream.recv().await, None);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.authorization, AuthorizationState::Denied);
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }

    /// Independent deadlines; cancelling one leaves the other armed
    #[tokio::test(start_paused = true)]
    async fn test_e2e_timeout_isolation() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess, LocatorConfig::default());

        let short = locator
            .submit(RequestOptions::new(Accuracy::Room).with_timeout(Duration::from_secs(2)))
            .unwrap();
        let long = locator
            .submit(RequestOptions::new(Accuracy::Room).with_timeout(Duration::from_secs(6)))
            .unwrap();
        let cancelled = locator
            .submit(RequestOptions::new(Accuracy::Room).with_timeout(Duration::from_secs(1)))
            .unwrap();

        locator.snapshot().await;
        cancelled.cancel();
        assert_eq!(locator.snapshot().await.unwrap().armed_timeouts, 2);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(short.result().await, Err(LocatorError::Timeout(Duration::from_secs(2))));
        assert_eq!(locator.snapshot().await.unwrap().pending(), 1);

        sensor.emit_readings(vec![reading(100.0)]);
        sensor.emit_readings(vec![reading(2.0)]);
        assert!(long.result().await.is_ok());

        let metrics = locator.metrics();
        assert_eq!(metrics.timed_out, 1);
        assert_eq!(metrics.cancelled, 1);
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.readings_discarded, 1);
    }

    /// A continuous request stops waiting once its first reading arrives
    #[tokio::test(start_paused = true)]
    async fn test_e2e_continuous_timeout_disarmed_by_reading() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess, LocatorConfig::default());

        let mut stream = locator
            .submit(
                RequestOptions::new(Accuracy::House)
                    .continuous()
                    .with_timeout(Duration::from_secs(1)),
            )
            .unwrap();
        locator.snapshot().await;
        sensor.emit_readings(vec![reading(10.0)]);
        assert!(stream.recv().await.unwrap().is_ok());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 1);
        assert_eq!(snapshot.armed_timeouts, 0);
        assert_eq!(snapshot.metrics.timed_out, 0);
    }

    /// The stricter request drives the configuration; coarser ones ride along
    #[tokio::test]
    async fn test_e2e_reconfiguration_follows_queue() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess, LocatorConfig::default());

        let coarse = locator
            .submit(RequestOptions::new(Accuracy::City).continuous())
            .unwrap();
        let fine = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        locator.snapshot().await;
        assert_eq!(sensor.last_settings().unwrap().accuracy, Accuracy::Room);

        sensor.emit_readings(vec![reading(4.0)]);
        assert!(fine.result().await.is_ok());

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.applied.accuracy, Accuracy::City);
        let accuracies: Vec<Accuracy> = sensor
            .applied_settings()
            .iter()
            .map(|c| c.accuracy)
            .collect();
        assert_eq!(accuracies, vec![Accuracy::City, Accuracy::Room, Accuracy::City]);

        coarse.cancel();
        locator.snapshot().await;
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }
}

#[cfg(test)]
mod simulated_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AuthorizationState, IpLookupOptions, LocatorError, ReadingSource};
    use locator::Locator;
    use sensors::{SimulatedSensor, StaticIpProvider};

    const SCENARIO: &str = r#"
[locator]
declared_modes = ["when_in_use"]
default_timeout_ms = 4000

[simulator]
frequency_hz = 50.0
step_meters = 10.0
horizontal_accuracy = 8.0
initial_authorization = "not_determined"
authorization_response = "restricted_foreground"

[[requests]]
accuracy = "house"

[[requests]]
accuracy = "block"
min_distance = 15.0
mode = "continuous"

[[requests]]
accuracy = "room"
timeout_ms = 300
"#;

    /// Full run: config file -> simulated sensor -> locator
    #[tokio::test]
    async fn test_simulated_scenario_from_config() {
        let blueprint = ConfigLoader::load_from_str(SCENARIO, ConfigFormat::Toml).unwrap();
        let sensor = Arc::new(SimulatedSensor::new(blueprint.simulator.clone()));
        let locator = Locator::new(sensor.clone(), blueprint.locator.clone());

        let mut handles: Vec<_> = blueprint
            .requests
            .iter()
            .map(|options| locator.submit(options.clone()).unwrap())
            .collect();
        let too_fine = handles.pop().unwrap();
        let mut stream = handles.pop().unwrap();
        let one_shot = handles.pop().unwrap();

        let fix = tokio::time::timeout(Duration::from_secs(3), one_shot.result())
            .await
            .expect("one-shot request resolved")
            .unwrap();
        assert_eq!(fix.horizontal_accuracy, 8.0);

        // Readings move 10 m apart, so the 15 m filter keeps every other one.
        let first = stream.recv().await.unwrap().unwrap();
        let second = stream.recv().await.unwrap().unwrap();
        assert!(first.coordinate.distance_to(&second.coordinate) >= 15.0);

        // The simulator reports 8 m, which never satisfies the room tier.
        assert_eq!(
            too_fine.result().await,
            Err(LocatorError::Timeout(Duration::from_millis(300)))
        );

        assert_eq!(locator.current_authorization(), AuthorizationState::RestrictedForeground);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 1);
        assert!(snapshot.metrics.readings_discarded >= 1);
        assert!(sensor.is_running());

        locator.shutdown().await;
        let mut last = None;
        while let Some(result) = stream.recv().await {
            last = Some(result);
        }
        assert_eq!(last, Some(Err(LocatorError::Cancelled)));
        assert!(!sensor.is_running());
    }

    /// IP lookups run without touching the sensor
    #[tokio::test]
    async fn test_ip_lookup_next_to_idle_sensor() {
        let blueprint = ConfigLoader::load_from_str(SCENARIO, ConfigFormat::Toml).unwrap();
        let sensor = Arc::new(SimulatedSensor::new(blueprint.simulator.clone()));
        let locator = Locator::new(sensor.clone(), blueprint.locator);

        let provider = Arc::new(StaticIpProvider::new("fixed", blueprint.simulator.start));
        let handle = locator.lookup_ip(provider, IpLookupOptions::default()).unwrap();
        let reading = handle.result().await.unwrap();

        assert_eq!(reading.source, ReadingSource::Ip);
        assert_eq!(reading.coordinate, blueprint.simulator.start);
        assert!(!sensor.is_running());
        assert_eq!(locator.snapshot().await.unwrap().metrics.settings_applied, 0);
    }
}

#![allow(clippy::unwrap_used)]
// Endpoint cascade and capability discovery over a scripted transport.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use loggamera_api::{CircuitConfig, LoggameraClient, RetryConfig};
use loggamera_core::{
    AttemptOutcome, CapabilityCache, CapabilityStatus, CapabilityStore, CascadeResolver,
    CoreError, DeviceClass, Endpoint, Intent, OrganizationId, RequestContext, SensorNormalizer,
    SensorValue,
};

use common::{FakeTransport, Reply, device, invalid_endpoint, invalid_endpoint_object, values};

fn resolver(transport: FakeTransport) -> (CascadeResolver<FakeTransport>, Arc<CapabilityCache>) {
    let client = LoggameraClient::with_transport(
        transport,
        SecretString::from("test-key"),
        RetryConfig::disabled(),
        CircuitConfig::default(),
    );
    let cache = Arc::new(CapabilityCache::new());
    let store: Arc<dyn CapabilityStore> = cache.clone();
    (
        CascadeResolver::new(client, store, SensorNormalizer::default()),
        cache,
    )
}

fn ctx() -> RequestContext {
    RequestContext::new(Some(OrganizationId(1)), CancellationToken::new())
}

fn outcomes(attempts: &[loggamera_core::EndpointAttempt]) -> Vec<(Endpoint, AttemptOutcome)> {
    attempts
        .iter()
        .map(|a| (a.endpoint, a.outcome.clone()))
        .collect()
}

// ── Fallback order ──────────────────────────────────────────────────

#[tokio::test]
async fn test_unsupported_dedicated_endpoint_is_not_requested_again() {
    let transport = FakeTransport::new()
        .on(Endpoint::WaterMeter, Reply::Json(200, invalid_endpoint()))
        .on(
            Endpoint::RawData,
            Reply::Json(200, values(json!([{ "Name": "ConsumedTotalInm3", "Value": "812.5" }]))),
        );
    let (resolver, cache) = resolver(transport);
    let class = DeviceClass::WaterMeter;

    let first = resolver
        .resolve(&ctx(), &class, device(7), Intent::Readings)
        .await
        .unwrap();
    assert_eq!(first.source, Endpoint::RawData);
    assert_eq!(first.values[0].value, SensorValue::Numeric(812.5));
    assert_eq!(
        cache.lookup(&class, Endpoint::WaterMeter),
        CapabilityStatus::Unavailable
    );
    assert_eq!(cache.lookup(&class, Endpoint::RawData), CapabilityStatus::Available);

    let second = resolver
        .resolve(&ctx(), &class, device(7), Intent::Readings)
        .await
        .unwrap();
    assert_eq!(second.source, Endpoint::RawData);
    assert_eq!(second.attempts[0].outcome, AttemptOutcome::Skipped);

    let transport = resolver.client().transport();
    assert_eq!(transport.calls_to(Endpoint::WaterMeter), 1);
    assert_eq!(transport.calls_to(Endpoint::RawData), 2);
}

#[tokio::test]
async fn test_dedicated_endpoint_with_values_stops_the_cascade() {
    let transport = FakeTransport::new().on(
        Endpoint::PowerMeter,
        Reply::Json(
            200,
            values(json!([
                { "Name": "ConsumedTotalInkWh", "Value": "1520.25" },
                { "Name": "PowerInkW", "ClearTextName": "Effect", "Value": "3.4" }
            ])),
        ),
    );
    let (resolver, _) = resolver(transport);

    let resolved = resolver
        .resolve(&ctx(), &DeviceClass::PowerMeter, device(3), Intent::Readings)
        .await
        .unwrap();
    assert_eq!(resolved.source, Endpoint::PowerMeter);
    assert!(resolved.attempts.is_empty());
    assert_eq!(resolved.values[1].display_name, "Power");

    let transport = resolver.client().transport();
    assert_eq!(transport.calls_to(Endpoint::RawData), 0);
    assert_eq!(transport.calls_to(Endpoint::GenericDevice), 0);
}

#[tokio::test]
async fn test_both_unsupported_shapes_advance_and_exhaustion_reports_trail() {
    let transport = FakeTransport::new()
        .on(Endpoint::RoomSensor, Reply::Json(200, invalid_endpoint()))
        .on(Endpoint::RawData, Reply::Json(200, invalid_endpoint_object()))
        .on(Endpoint::GenericDevice, Reply::Json(200, values(json!([]))));
    let (resolver, cache) = resolver(transport);
    let class = DeviceClass::RoomSensor;

    let err = resolver
        .resolve(&ctx(), &class, device(11), Intent::Readings)
        .await
        .unwrap_err();
    let CoreError::AllEndpointsExhausted { device_id, attempts } = &err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(*device_id, device(11));
    assert_eq!(
        outcomes(attempts),
        vec![
            (
                Endpoint::RoomSensor,
                AttemptOutcome::Unsupported("invalid endpoint".into())
            ),
            (
                Endpoint::RawData,
                AttemptOutcome::Unsupported("Invalid endpoint".into())
            ),
            (Endpoint::GenericDevice, AttemptOutcome::NoData),
        ]
    );
    assert_eq!(cache.lookup(&class, Endpoint::RawData), CapabilityStatus::Unavailable);
    assert_eq!(
        cache.lookup(&class, Endpoint::GenericDevice),
        CapabilityStatus::Unknown
    );

    // Second pass: both unsupported endpoints are skipped.
    let err = resolver
        .resolve(&ctx(), &class, device(11), Intent::Readings)
        .await
        .unwrap_err();
    assert_eq!(
        outcomes(err.attempts()),
        vec![
            (Endpoint::RoomSensor, AttemptOutcome::Skipped),
            (Endpoint::RawData, AttemptOutcome::Skipped),
            (Endpoint::GenericDevice, AttemptOutcome::NoData),
        ]
    );
    let transport = resolver.client().transport();
    assert_eq!(transport.calls_to(Endpoint::RoomSensor), 1);
    assert_eq!(transport.calls_to(Endpoint::GenericDevice), 2);
}

#[tokio::test]
async fn test_other_failures_propagate_without_fallback() {
    let transport = FakeTransport::new()
        .on(Endpoint::PowerMeter, Reply::Json(200, json!({ "Error": "Access denied" })))
        .on(Endpoint::CoolingUnit, Reply::Raw(503, "Service Unavailable"))
        .on(Endpoint::HeatPump, Reply::Json(200, json!({ "Error": "Device offline" })));
    let (resolver, cache) = resolver(transport);

    let err = resolver
        .resolve(&ctx(), &DeviceClass::PowerMeter, device(1), Intent::Readings)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Authentication { .. }), "{err:?}");

    let err = resolver
        .resolve(&ctx(), &DeviceClass::CoolingUnit, device(2), Intent::Readings)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Network { status: Some(503), .. }), "{err:?}");

    let err = resolver
        .resolve(&ctx(), &DeviceClass::HeatPump, device(3), Intent::Readings)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Rejected { .. }), "{err:?}");

    assert_eq!(resolver.client().transport().calls_to(Endpoint::RawData), 0);
    assert!(cache.is_empty());
}

// ── HeatMeter ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_heat_meter_reads_raw_data_and_merges_generic_alarms() {
    let transport = FakeTransport::new()
        .on(
            Endpoint::RawData,
            Reply::Json(200, values(json!([{ "Name": "544352", "Value": "48211" }]))),
        )
        .on(
            Endpoint::GenericDevice,
            Reply::Json(
                200,
                values(json!([
                    { "Name": "544352", "Value": "99999" },
                    { "Name": "alarmActive", "Value": "true" },
                    { "Name": "alarmInClearText", "Value": "Low flow" }
                ])),
            ),
        );
    let (resolver, cache) = resolver(transport);
    let class = DeviceClass::HeatMeter;

    let resolved = resolver
        .resolve(&ctx(), &class, device(502), Intent::Readings)
        .await
        .unwrap();

    assert_eq!(resolved.source, Endpoint::RawData);
    assert_eq!(
        outcomes(&resolved.attempts),
        vec![(Endpoint::HeatMeter, AttemptOutcome::Skipped)]
    );
    let ids: Vec<&str> = resolved.values.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["544352", "alarmActive", "alarmInClearText"]);
    assert_eq!(resolved.values[0].value, SensorValue::Numeric(48211.0));
    assert_eq!(resolved.values[0].source, Endpoint::RawData);
    assert_eq!(resolved.values[1].value, SensorValue::Boolean(true));
    assert_eq!(resolved.values[1].source, Endpoint::GenericDevice);

    assert_eq!(cache.lookup(&class, Endpoint::HeatMeter), CapabilityStatus::Unavailable);
    assert_eq!(cache.lookup(&class, Endpoint::RawData), CapabilityStatus::Available);

    let transport = resolver.client().transport();
    assert_eq!(transport.calls_to(Endpoint::HeatMeter), 0);
    assert_eq!(transport.calls_to(Endpoint::GenericDevice), 1);
}

#[tokio::test]
async fn test_heat_meter_keeps_raw_values_when_supplement_fails() {
    let transport = FakeTransport::new()
        .on(
            Endpoint::RawData,
            Reply::Json(200, values(json!([{ "Name": "544352", "Value": "48211" }]))),
        )
        .on(Endpoint::GenericDevice, Reply::Raw(500, ""));
    let (resolver, _) = resolver(transport);

    let resolved = resolver
        .resolve(&ctx(), &DeviceClass::HeatMeter, device(502), Intent::Readings)
        .await
        .unwrap();
    assert_eq!(resolved.values.len(), 1);
}

// ── Alarm status ────────────────────────────────────────────────────

#[tokio::test]
async fn test_alarm_status_filters_to_alarm_and_status_values() {
    let transport = FakeTransport::new().on(
        Endpoint::GenericDevice,
        Reply::Json(
            200,
            values(json!([
                { "Name": "PowerInkW", "Value": "2.1" },
                { "Name": "alarmActive", "Value": "false" },
                { "Name": "filterAlarmIsActive", "Value": "true" }
            ])),
        ),
    );
    let (resolver, _) = resolver(transport);

    let resolved = resolver
        .resolve(&ctx(), &DeviceClass::CoolingUnit, device(8), Intent::AlarmStatus)
        .await
        .unwrap();
    assert_eq!(resolved.source, Endpoint::GenericDevice);
    let ids: Vec<&str> = resolved.values.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["alarmActive", "filterAlarmIsActive"]);
    assert_eq!(resolver.client().transport().calls_to(Endpoint::CoolingUnit), 0);
}

// ── Capabilities ────────────────────────────────────────────────────

#[tokio::test]
async fn test_capabilities_empty_and_cached_when_unsupported() {
    let transport =
        FakeTransport::new().on(Endpoint::GetCapabilities, Reply::Json(200, invalid_endpoint()));
    let (resolver, cache) = resolver(transport);
    let class = DeviceClass::RoomSensor;

    let caps = resolver.capabilities(&ctx(), &class, device(4)).await.unwrap();
    assert!(caps.is_empty());
    assert_eq!(
        cache.lookup(&class, Endpoint::GetCapabilities),
        CapabilityStatus::Unavailable
    );

    let caps = resolver.capabilities(&ctx(), &class, device(5)).await.unwrap();
    assert!(caps.is_empty());
    assert_eq!(resolver.client().transport().calls_to(Endpoint::GetCapabilities), 1);
}

#[tokio::test]
async fn test_capabilities_lists_names() {
    let transport = FakeTransport::new().on(
        Endpoint::GetCapabilities,
        Reply::Json(
            200,
            json!({
                "Data": {
                    "ReadCapabilities": ["ConsumedTotalInkWh", { "Name": "PowerInkW" }],
                    "WriteCapabilities": null
                },
                "Error": null
            }),
        ),
    );
    let (resolver, cache) = resolver(transport);

    let caps = resolver
        .capabilities(&ctx(), &DeviceClass::PowerMeter, device(4))
        .await
        .unwrap();
    assert_eq!(caps.readable, vec!["ConsumedTotalInkWh", "PowerInkW"]);
    assert!(caps.writable.is_empty());
    assert_eq!(
        cache.lookup(&DeviceClass::PowerMeter, Endpoint::GetCapabilities),
        CapabilityStatus::Available
    );
}

// ── Scope and cancellation ──────────────────────────────────────────

#[tokio::test]
async fn test_requests_carry_current_scope() {
    let transport = FakeTransport::new().on(
        Endpoint::PowerMeter,
        Reply::Json(200, values(json!([{ "Name": "PowerInkW", "Value": "1" }]))),
    );
    let (resolver, _) = resolver(transport);
    let ctx = ctx();

    let r = &resolver;
    ctx.with_scope(OrganizationId(9), |scoped| async move {
        r.resolve(&scoped, &DeviceClass::PowerMeter, device(1), Intent::Readings)
            .await
    })
    .await
    .unwrap();
    resolver
        .resolve(&ctx, &DeviceClass::PowerMeter, device(1), Intent::Readings)
        .await
        .unwrap();

    let bodies = resolver.client().transport().bodies(Endpoint::PowerMeter);
    assert_eq!(bodies[0]["OrganizationId"], json!(9));
    assert_eq!(bodies[0]["DeviceId"], json!(1));
    assert_eq!(bodies[1]["OrganizationId"], json!(1));
}

#[tokio::test]
async fn test_cancelled_context_fails_fast() {
    let transport = FakeTransport::new().on(Endpoint::PowerMeter, Reply::Hang);
    let (resolver, cache) = resolver(transport);
    let ctx = ctx();
    ctx.cancel().cancel();

    let err = resolver
        .resolve(&ctx, &DeviceClass::PowerMeter, device(1), Intent::Readings)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Cancelled));
    assert!(cache.is_empty());
}

//! End-to-end demo: track a schema against a scripted offset service.
//!
//! Runs the full supervised pipeline — declare, stream, decode, publish —
//! with a loopback wire standing in for the external websocket, so it works
//! without a simulator. Run with:
//!
//! ```text
//! cargo run --example track_aircraft
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use airlink::transport::offset::{OffsetTransport, OffsetWire};
use airlink::{
    Airlink, Mutator, PayloadRequest, RawType, Result as LinkResult, SchemaDefinition,
    SupervisorConfig, TransportFactory, Unit,
};

#[derive(Debug, Default)]
struct AircraftState {
    airspeed: i64,
    agl: i64,
    vertical_speed: i64,
    n1: f64,
    on_ground: bool,
    beacon: bool,
    title: String,
}

fn schema() -> Arc<SchemaDefinition<AircraftState>> {
    Arc::new(
        SchemaDefinition::builder("aircraft_state")
            .offset_field(
                "Airspeed", "0x02BC", RawType::Int, 4, Unit::Knots,
                Mutator::Int(|r: &mut AircraftState, v| r.airspeed = v),
            )
            .offset_field(
                "Agl", "0x6020", RawType::Float, 8, Unit::Feet,
                Mutator::Int(|r: &mut AircraftState, v| r.agl = v),
            )
            .offset_field(
                "VerticalSpeed", "0x02C8", RawType::Int, 4, Unit::Ftm,
                Mutator::Int(|r: &mut AircraftState, v| r.vertical_speed = v),
            )
            .offset_field(
                "Engine1TurbN1", "0x0898", RawType::Int, 2, Unit::Percent,
                Mutator::Float(|r: &mut AircraftState, v| r.n1 = v),
            )
            .offset_field(
                "OnGround", "0x0366", RawType::Uint, 2, Unit::Bool,
                Mutator::Bool(|r: &mut AircraftState, v| r.on_ground = v),
            )
            .offset_field(
                "Title", "0x3D00", RawType::String, 256, None,
                Mutator::Text(|r: &mut AircraftState, v| r.title = v),
            )
            .bits_word(airlink::FieldDescriptor::offset(
                "Lights", 0x0D0C, RawType::Bits, 2, None,
            ))
            .bit(
                airlink::FieldDescriptor::offset("Lights", 0x0D0C, RawType::Bits, 2, None),
                1,
                |r: &mut AircraftState, v| r.beacon = v,
            )
            .build()
            .expect("demo schema is valid"),
    )
}

/// Loopback wire: acks the declare, then serves read frames forever at a
/// fixed cadence, with the airspeed slowly climbing.
struct LoopbackWire {
    preamble: VecDeque<String>,
    tick: u64,
}

impl LoopbackWire {
    fn new() -> Self {
        let preamble = vec![
            serde_json::json!({
                "success": true, "command": "offsets.declare", "name": "aircraft_state"
            })
            .to_string(),
            serde_json::json!({
                "success": true, "command": "payload.read", "name": "",
                "data": { "grossWeight": 165000.0, "totalFuelPercent": 62.5 }
            })
            .to_string(),
        ];
        Self { preamble: preamble.into(), tick: 0 }
    }
}

#[async_trait]
impl OffsetWire for LoopbackWire {
    async fn send(&mut self, _frame: String) -> LinkResult<()> {
        Ok(())
    }

    async fn recv(&mut self) -> LinkResult<Option<String>> {
        if let Some(frame) = self.preamble.pop_front() {
            return Ok(Some(frame));
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        self.tick += 1;
        let frame = serde_json::json!({
            "success": true, "command": "offsets.read", "name": "aircraft_state",
            "data": {
                "Airspeed": 128 * (120 + self.tick as i64),
                "Agl": 450.0 + self.tick as f64 * 2.0,
                "VerticalSpeed": 1280,
                "Engine1TurbN1": 14000,
                "OnGround": 0,
                "Title": "Boeing 737-800",
                "Lights": 0b0010
            }
        });
        Ok(Some(frame.to_string()))
    }

    async fn close(&mut self) {}
}

struct LoopbackFactory;

#[async_trait]
impl TransportFactory for LoopbackFactory {
    type Transport = OffsetTransport<LoopbackWire>;

    async fn connect(&mut self) -> LinkResult<Self::Transport> {
        Ok(OffsetTransport::new(LoopbackWire::new()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let schema = schema();
    let request =
        schema.declare_request(Duration::from_millis(250), Some(PayloadRequest::default()));

    let mut link =
        Airlink::track(LoopbackFactory, schema, request, SupervisorConfig::default());

    let payload = link.payloads.recv().await.context("payload snapshot expected")?;
    info!(
        "Payload: gross {} lbs, fuel {}%",
        payload.gross_weight, payload.total_fuel_percent
    );

    for _ in 0..10 {
        let state = link.records.recv().await.context("record expected")?;
        info!(
            "{}: {} kt, {} ft AGL, {} ft/min, N1 {:.1}%, on_ground={}, beacon={}",
            state.title,
            state.airspeed,
            state.agl,
            state.vertical_speed,
            state.n1,
            state.on_ground,
            state.beacon
        );
    }

    link.handle.shutdown().await;
    info!("done");
    Ok(())
}

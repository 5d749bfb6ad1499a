//! Offset-protocol adapter.
//!
//! Speaks the JSON request/response protocol of an external offset-access
//! service over a persistent duplex text link: `offsets.declare` announces
//! the watched addresses, `offsets.read` starts interval delivery, and
//! `payload.read` subscribes to fuel/cargo snapshots. Responses share one
//! envelope correlated by command and logical name with a
//! `success`/`errorCode` pair; `errorCode == "NoFlightSim"` ends the session
//! fatally.
//!
//! The duplex link itself (typically a websocket) is an external
//! collaborator abstracted behind [`OffsetWire`]; this module only does the
//! protocol mapping.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LinkSignal, Transport, TransportEvent};
use crate::error::Result;
use crate::payload::{PayloadRequest, PayloadSnapshot};
use crate::schema::DeclareRequest;
use crate::types::{RawBatch, RawType, RawUpdate, RawValue, WireKey};
use crate::LinkError;

const CMD_DECLARE: &str = "offsets.declare";
const CMD_READ: &str = "offsets.read";
const CMD_PAYLOAD: &str = "payload.read";
const ERR_NO_FLIGHT_SIM: &str = "NoFlightSim";

/// A persistent duplex text link carrying one JSON document per frame.
///
/// The websocket (or any equivalent) implementation lives outside the core;
/// tests script this trait directly.
#[async_trait]
pub trait OffsetWire: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Receive the next text frame; `Ok(None)` when the link closed.
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Best-effort close of the link.
    async fn close(&mut self);
}

#[derive(Debug, Serialize)]
struct DeclareCommand<'a> {
    command: &'static str,
    name: &'a str,
    offsets: Vec<OffsetDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct OffsetDeclaration<'a> {
    name: &'a str,
    address: u32,
    #[serde(rename = "type")]
    kind: &'static str,
    size: usize,
}

#[derive(Debug, Serialize)]
struct ReadCommand<'a> {
    command: &'static str,
    name: &'a str,
    interval: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayloadCommand {
    command: &'static str,
    weight_unit: String,
    volume_unit: String,
    length_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<u64>,
}

/// Response envelope shared by every command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub command: String,
    pub name: String,
    pub error_code: String,
    pub error_message: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self {
            success: false,
            command: String::new(),
            name: String::new(),
            error_code: String::new(),
            error_message: String::new(),
            data: serde_json::Map::new(),
        }
    }
}

/// Transport backend speaking the offset protocol over an [`OffsetWire`].
pub struct OffsetTransport<W> {
    wire: W,
    subscription: Option<String>,
    /// Declared name -> (address, wire type), for re-keying response maps.
    declared: HashMap<String, (u32, RawType)>,
    pending: VecDeque<TransportEvent>,
    sim_confirmed: bool,
}

impl<W: OffsetWire> OffsetTransport<W> {
    pub fn new(wire: W) -> Self {
        Self {
            wire,
            subscription: None,
            declared: HashMap::new(),
            pending: VecDeque::new(),
            sim_confirmed: false,
        }
    }

    async fn send_json<T: Serialize>(&mut self, command: &T) -> Result<()> {
        let frame = serde_json::to_string(command)
            .map_err(|e| LinkError::link("encode command", Some(Box::new(e))))?;
        debug!("CMD: {}", frame);
        self.wire.send(frame).await
    }

    /// Re-key one response map entry back to its declared address.
    fn to_update(&self, name: &str, value: &serde_json::Value) -> Option<RawUpdate> {
        match self.declared.get(name) {
            Some((address, raw_type)) => {
                let value = coerce_typed(value, *raw_type)?;
                Some(RawUpdate::new(WireKey::Offset { address: *address }, value))
            }
            None => {
                // Not declared locally; keep it keyed by name so the decoder
                // can drop it silently
                let value = coerce_untyped(value)?;
                Some(RawUpdate::new(
                    WireKey::Variable { name: name.to_string(), index: 0 },
                    value,
                ))
            }
        }
    }

    fn handle_envelope(&mut self, envelope: ResponseEnvelope) -> Result<()> {
        if !envelope.success {
            if envelope.error_code == ERR_NO_FLIGHT_SIM {
                return Err(LinkError::no_flight_sim(format!(
                    "{} - {}",
                    envelope.error_code, envelope.error_message
                )));
            }
            warn!(
                "Error for {} ({}): {} - {}",
                envelope.name, envelope.command, envelope.error_code, envelope.error_message
            );
            return Ok(());
        }

        match envelope.command.as_str() {
            CMD_DECLARE => {
                debug!("Offsets '{}' have been declared", envelope.name);
                self.pending.push_back(TransportEvent::Signal(LinkSignal::Ready));
            }
            CMD_READ => {
                if self.subscription.as_deref() != Some(envelope.name.as_str()) {
                    debug!("Ignoring read for foreign subscription '{}'", envelope.name);
                    return Ok(());
                }
                // Data flowing at all proves the simulator is up
                if !self.sim_confirmed {
                    self.sim_confirmed = true;
                    self.pending.push_back(TransportEvent::Signal(LinkSignal::SimRunning));
                }
                let updates: Vec<RawUpdate> = envelope
                    .data
                    .iter()
                    .filter_map(|(name, value)| self.to_update(name, value))
                    .collect();
                self.pending.push_back(TransportEvent::Batch(RawBatch::new(updates)));
            }
            CMD_PAYLOAD => {
                let value = serde_json::Value::Object(envelope.data);
                match serde_json::from_value::<PayloadSnapshot>(value) {
                    Ok(snapshot) => {
                        self.pending.push_back(TransportEvent::Payload(snapshot));
                    }
                    Err(error) => {
                        warn!("Discarding malformed payload snapshot: {}", error);
                    }
                }
            }
            other => {
                return Err(LinkError::protocol(
                    other,
                    "response does not correlate with any issued command",
                ));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<W: OffsetWire> Transport for OffsetTransport<W> {
    async fn declare(&mut self, request: &DeclareRequest) -> Result<()> {
        let offsets: Vec<OffsetDeclaration<'_>> = request
            .fields
            .iter()
            .filter_map(|field| {
                let address = field.address?;
                let kind = field.raw_type?;
                Some(OffsetDeclaration {
                    name: field.name.as_str(),
                    address,
                    kind: kind.tag(),
                    size: field.size.unwrap_or(kind_default_size(kind)),
                })
            })
            .collect();

        if offsets.is_empty() {
            return Err(LinkError::declare("schema declares no offset-mode fields"));
        }

        self.declared = request
            .fields
            .iter()
            .filter_map(|field| {
                Some((field.name.clone(), (field.address?, field.raw_type?)))
            })
            .collect();
        self.subscription = Some(request.name.clone());

        let declare = DeclareCommand { command: CMD_DECLARE, name: &request.name, offsets };
        self.send_json(&declare).await?;

        let read = ReadCommand {
            command: CMD_READ,
            name: &request.name,
            interval: request.interval.as_millis() as u64,
        };
        self.send_json(&read).await?;

        if let Some(payload) = &request.payload {
            let command = payload_command(payload);
            self.send_json(&command).await?;
        }

        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let Some(frame) = self.wire.recv().await? else {
                return Ok(None);
            };

            let envelope: ResponseEnvelope = serde_json::from_str(&frame).map_err(|e| {
                LinkError::protocol("response", format!("unparseable envelope: {e}"))
            })?;

            self.handle_envelope(envelope)?;
        }
    }

    async fn close(&mut self) {
        self.wire.close().await;
    }
}

fn payload_command(request: &PayloadRequest) -> PayloadCommand {
    let millis = request.interval.as_millis() as u64;
    PayloadCommand {
        command: CMD_PAYLOAD,
        weight_unit: request.weight_unit.clone(),
        volume_unit: request.volume_unit.clone(),
        length_unit: request.length_unit.clone(),
        interval: (millis > 0).then_some(millis),
    }
}

fn kind_default_size(kind: RawType) -> usize {
    match kind {
        RawType::Int | RawType::Uint | RawType::Float => 4,
        RawType::String => 256,
        RawType::Bits => 4,
    }
}

/// Shape a JSON value by the declared wire type, so float-typed offsets with
/// integral values stay floats.
fn coerce_typed(value: &serde_json::Value, raw_type: RawType) -> Option<RawValue> {
    match raw_type {
        RawType::Float => value.as_f64().map(RawValue::Float),
        RawType::Int | RawType::Uint | RawType::Bits => {
            if let Some(v) = value.as_i64() {
                Some(RawValue::Int(v))
            } else {
                // Wide unsigned words can arrive outside the i64 range;
                // fall back to the float view and truncate
                value.as_f64().map(|v| RawValue::Int(v as i64))
            }
        }
        RawType::String => value.as_str().map(|s| RawValue::Text(s.to_string())),
    }
}

/// Best-effort shaping for values with no local declaration.
fn coerce_untyped(value: &serde_json::Value) -> Option<RawValue> {
    if let Some(v) = value.as_i64() {
        Some(RawValue::Int(v))
    } else if let Some(v) = value.as_f64() {
        Some(RawValue::Float(v))
    } else if let Some(v) = value.as_bool() {
        Some(RawValue::Bool(v))
    } else if let Some(v) = value.as_str() {
        Some(RawValue::Text(v.to_string()))
    } else {
        // Structured values (maps, arrays) have no raw-value shape
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Mutator, SchemaDefinition};
    use crate::units::Unit;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct State {
        airspeed: i64,
        agl: i64,
    }

    /// Scripted wire: canned incoming frames, recorded outgoing frames.
    #[derive(Default)]
    struct ScriptedWire {
        incoming: VecDeque<String>,
        sent: Vec<String>,
    }

    impl ScriptedWire {
        fn with_frames(frames: Vec<serde_json::Value>) -> Self {
            Self {
                incoming: frames.into_iter().map(|f| f.to_string()).collect(),
                sent: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl OffsetWire for ScriptedWire {
        async fn send(&mut self, frame: String) -> Result<()> {
            self.sent.push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>> {
            Ok(self.incoming.pop_front())
        }

        async fn close(&mut self) {}
    }

    fn schema() -> SchemaDefinition<State> {
        SchemaDefinition::builder("aircraft_state")
            .offset_field(
                "Airspeed",
                "0x02BC",
                RawType::Int,
                4,
                Unit::Knots,
                Mutator::Int(|r: &mut State, v| r.airspeed = v),
            )
            .offset_field(
                "Agl",
                "0x6020",
                RawType::Float,
                8,
                Unit::Feet,
                Mutator::Int(|r: &mut State, v| r.agl = v),
            )
            .build()
            .unwrap()
    }

    fn request() -> DeclareRequest {
        schema().declare_request(Duration::from_millis(200), Some(PayloadRequest::default()))
    }

    #[tokio::test]
    async fn declare_serializes_protocol_commands() {
        let mut transport = OffsetTransport::new(ScriptedWire::default());
        transport.declare(&request()).await.expect("declare succeeds");

        let sent: Vec<serde_json::Value> = transport
            .wire
            .sent
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect();
        assert_eq!(sent.len(), 3);

        assert_eq!(sent[0]["command"], "offsets.declare");
        assert_eq!(sent[0]["name"], "aircraft_state");
        let offsets = sent[0]["offsets"].as_array().unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0]["name"], "Airspeed");
        assert_eq!(offsets[0]["address"], 0x02BC);
        assert_eq!(offsets[0]["type"], "int");
        assert_eq!(offsets[0]["size"], 4);

        assert_eq!(sent[1]["command"], "offsets.read");
        assert_eq!(sent[1]["interval"], 200);

        assert_eq!(sent[2]["command"], "payload.read");
        assert_eq!(sent[2]["weightUnit"], "Lbs");
        assert_eq!(sent[2]["volumeUnit"], "gal");
        assert_eq!(sent[2]["lengthUnit"], "ft");
    }

    #[tokio::test]
    async fn declare_without_offset_fields_is_rejected() {
        let schema = SchemaDefinition::<State>::builder("vars_only")
            .field(
                crate::types::FieldDescriptor::variable("APU SWITCH", Unit::Bool),
                Mutator::Int(|r: &mut State, v| r.airspeed = v),
            )
            .build()
            .unwrap();
        let request = schema.declare_request(Duration::from_millis(100), None);

        let mut transport = OffsetTransport::new(ScriptedWire::default());
        let result = transport.declare(&request).await;
        assert!(matches!(result, Err(LinkError::Declare { .. })));
    }

    #[tokio::test]
    async fn read_responses_become_ready_sim_running_and_batches() {
        let wire = ScriptedWire::with_frames(vec![
            serde_json::json!({
                "success": true, "command": "offsets.declare", "name": "aircraft_state"
            }),
            serde_json::json!({
                "success": true, "command": "offsets.read", "name": "aircraft_state",
                "data": { "Airspeed": 256, "Agl": 100.0 }
            }),
        ]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        assert_eq!(
            transport.next_event().await.unwrap(),
            Some(TransportEvent::Signal(LinkSignal::Ready))
        );
        assert_eq!(
            transport.next_event().await.unwrap(),
            Some(TransportEvent::Signal(LinkSignal::SimRunning))
        );

        let Some(TransportEvent::Batch(batch)) = transport.next_event().await.unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(batch.len(), 2);
        // Updates are re-keyed to declared addresses and shaped by wire type
        let airspeed = batch
            .iter()
            .find(|u| u.key == WireKey::Offset { address: 0x02BC })
            .expect("airspeed update");
        assert_eq!(airspeed.value, RawValue::Int(256));
        let agl = batch
            .iter()
            .find(|u| u.key == WireKey::Offset { address: 0x6020 })
            .expect("agl update");
        assert_eq!(agl.value, RawValue::Float(100.0));

        // Link closed
        assert_eq!(transport.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn float_typed_offsets_stay_floats_for_integral_json() {
        let wire = ScriptedWire::with_frames(vec![serde_json::json!({
            "success": true, "command": "offsets.read", "name": "aircraft_state",
            "data": { "Agl": 100 }
        })]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        transport.next_event().await.unwrap(); // SimRunning
        let Some(TransportEvent::Batch(batch)) = transport.next_event().await.unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(batch.updates[0].value, RawValue::Float(100.0));
    }

    #[tokio::test]
    async fn foreign_subscription_reads_are_ignored() {
        let wire = ScriptedWire::with_frames(vec![
            serde_json::json!({
                "success": true, "command": "offsets.read", "name": "someone_else",
                "data": { "Airspeed": 1 }
            }),
        ]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();
        assert_eq!(transport.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn undeclared_names_stay_name_keyed() {
        let wire = ScriptedWire::with_frames(vec![serde_json::json!({
            "success": true, "command": "offsets.read", "name": "aircraft_state",
            "data": { "NewServerField": 7 }
        })]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        transport.next_event().await.unwrap(); // SimRunning
        let Some(TransportEvent::Batch(batch)) = transport.next_event().await.unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(
            batch.updates[0].key,
            WireKey::Variable { name: "NewServerField".into(), index: 0 }
        );
    }

    #[tokio::test]
    async fn payload_responses_arrive_on_their_own_event() {
        let wire = ScriptedWire::with_frames(vec![serde_json::json!({
            "success": true, "command": "payload.read", "name": "",
            "data": { "grossWeight": 165000.0, "totalFuelPercent": 62.5 }
        })]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        let Some(TransportEvent::Payload(snapshot)) = transport.next_event().await.unwrap() else {
            panic!("expected a payload snapshot");
        };
        assert_eq!(snapshot.gross_weight, 165000.0);
        assert_eq!(snapshot.total_fuel_percent, 62.5);
    }

    #[tokio::test]
    async fn no_flight_sim_is_fatal() {
        let wire = ScriptedWire::with_frames(vec![serde_json::json!({
            "success": false, "command": "offsets.read", "name": "aircraft_state",
            "errorCode": "NoFlightSim", "errorMessage": "simulator not running"
        })]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        let error = transport.next_event().await.unwrap_err();
        assert!(matches!(error, LinkError::NoFlightSim { .. }));
        assert!(error.is_fatal());
    }

    #[tokio::test]
    async fn other_request_failures_are_absorbed() {
        let wire = ScriptedWire::with_frames(vec![
            serde_json::json!({
                "success": false, "command": "offsets.read", "name": "aircraft_state",
                "errorCode": "Throttled", "errorMessage": "slow down"
            }),
            serde_json::json!({
                "success": true, "command": "offsets.declare", "name": "aircraft_state"
            }),
        ]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        // The failed read is logged and skipped; the next frame comes through
        assert_eq!(
            transport.next_event().await.unwrap(),
            Some(TransportEvent::Signal(LinkSignal::Ready))
        );
    }

    #[tokio::test]
    async fn unparseable_frames_are_protocol_fatal() {
        let mut wire = ScriptedWire::default();
        wire.incoming.push_back("{not json".to_string());
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        let error = transport.next_event().await.unwrap_err();
        assert!(matches!(error, LinkError::Protocol { .. }));
    }

    #[tokio::test]
    async fn uncorrelatable_commands_are_protocol_fatal() {
        let wire = ScriptedWire::with_frames(vec![serde_json::json!({
            "success": true, "command": "offsets.write", "name": "aircraft_state"
        })]);
        let mut transport = OffsetTransport::new(wire);
        transport.declare(&request()).await.unwrap();

        let error = transport.next_event().await.unwrap_err();
        assert!(matches!(error, LinkError::Protocol { .. }));
    }
}

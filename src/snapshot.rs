//! Binary export and import of one organisation's goal rules.
//!
//! This module provides a stable binary format for persisting a tenant's
//! rules outside the registry. The format consists of a 32-byte fixed header
//! followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"QGAT"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with
//! [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BoundExpr, GoalRule, OrgId, RuleId, RuleKind, Task, TaskCondition};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"QGAT";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing rules to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

/// Errors that can occur when deserializing rules from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a questgate snapshot: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedSnapshot {
    metadata: SnapshotMetadata,
    rules: Vec<SerializedRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMetadata {
    org: u64,
    rule_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    id: u64,
    name: String,
    description: Option<String>,
    kind: SerializedKind,
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedKind {
    AllTasks(SerializedCondition),
    AnyTask(SerializedCondition),
    Points(u64),
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedCondition {
    Set(Vec<SerializedTask>),
    Tree(SerializedExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedTask {
    id: u64,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedExpr {
    Task(SerializedTask),
    And(Vec<SerializedExpr>),
    Or(Vec<SerializedExpr>),
}

// ---------------------------------------------------------------------------
// Task conversion
// ---------------------------------------------------------------------------

fn serialize_task(task: &Task) -> SerializedTask {
    SerializedTask {
        id: task.id.0,
        name: task.name.clone(),
    }
}

fn deserialize_task(task: SerializedTask, org: OrgId) -> Task {
    Task::new(task.id, org, task.name)
}

// ---------------------------------------------------------------------------
// Expression flattening (binary -> n-ary)
// ---------------------------------------------------------------------------

fn flatten_expr(expr: &BoundExpr) -> SerializedExpr {
    match expr {
        BoundExpr::And(_, _) => {
            let mut children = Vec::new();
            collect_and_children(expr, &mut children);
            SerializedExpr::And(children)
        }
        BoundExpr::Or(_, _) => {
            let mut children = Vec::new();
            collect_or_children(expr, &mut children);
            SerializedExpr::Or(children)
        }
        BoundExpr::Task(task) => SerializedExpr::Task(serialize_task(task)),
    }
}

fn collect_and_children(expr: &BoundExpr, out: &mut Vec<SerializedExpr>) {
    match expr {
        BoundExpr::And(left, right) => {
            collect_and_children(left, out);
            collect_and_children(right, out);
        }
        other => out.push(flatten_expr(other)),
    }
}

fn collect_or_children(expr: &BoundExpr, out: &mut Vec<SerializedExpr>) {
    match expr {
        BoundExpr::Or(left, right) => {
            collect_or_children(left, out);
            collect_or_children(right, out);
        }
        other => out.push(flatten_expr(other)),
    }
}

// ---------------------------------------------------------------------------
// Expression unflattening (n-ary -> binary)
// ---------------------------------------------------------------------------

fn unflatten_expr(expr: SerializedExpr, org: OrgId) -> Result<BoundExpr, DeserializeError> {
    match expr {
        SerializedExpr::And(children) => {
            if children.len() == 1 {
                return unflatten_expr(
                    children.into_iter().next().expect("length checked above"),
                    org,
                );
            }
            let mut iter = children.into_iter();
            let first = unflatten_expr(iter.next().expect("validated non-empty"), org)?;
            iter.try_fold(first, |acc, child| {
                Ok(BoundExpr::And(
                    Box::new(acc),
                    Box::new(unflatten_expr(child, org)?),
                ))
            })
        }
        SerializedExpr::Or(children) => {
            if children.len() == 1 {
                return unflatten_expr(
                    children.into_iter().next().expect("length checked above"),
                    org,
                );
            }
            let mut iter = children.into_iter();
            let first = unflatten_expr(iter.next().expect("validated non-empty"), org)?;
            iter.try_fold(first, |acc, child| {
                Ok(BoundExpr::Or(
                    Box::new(acc),
                    Box::new(unflatten_expr(child, org)?),
                ))
            })
        }
        SerializedExpr::Task(task) => Ok(BoundExpr::Task(deserialize_task(task, org))),
    }
}

// ---------------------------------------------------------------------------
// Rules -> SerializedSnapshot
// ---------------------------------------------------------------------------

fn rules_to_serialized(org: OrgId, rules: &[&GoalRule]) -> SerializedSnapshot {
    let serialized: Vec<SerializedRule> = rules
        .iter()
        .map(|rule| SerializedRule {
            id: rule.id().0,
            name: rule.name().to_owned(),
            description: rule.description().map(str::to_owned),
            kind: serialize_kind(rule.kind()),
        })
        .collect();

    SerializedSnapshot {
        metadata: SnapshotMetadata {
            org: org.0,
            rule_count: serialized.len(),
        },
        rules: serialized,
    }
}

fn serialize_kind(kind: &RuleKind) -> SerializedKind {
    match kind {
        RuleKind::AllTasks(cond) => SerializedKind::AllTasks(serialize_condition(cond)),
        RuleKind::AnyTask(cond) => SerializedKind::AnyTask(serialize_condition(cond)),
        RuleKind::Points(points) => SerializedKind::Points(*points),
    }
}

fn serialize_condition(cond: &TaskCondition) -> SerializedCondition {
    match cond {
        TaskCondition::Set(tasks) => {
            SerializedCondition::Set(tasks.iter().map(serialize_task).collect())
        }
        TaskCondition::Tree(tree) => SerializedCondition::Tree(flatten_expr(tree)),
    }
}

// ---------------------------------------------------------------------------
// SerializedSnapshot -> rules
// ---------------------------------------------------------------------------

fn serialized_to_rules(ser: SerializedSnapshot) -> Result<Vec<GoalRule>, DeserializeError> {
    validate(&ser)?;

    let org = OrgId(ser.metadata.org);
    ser.rules
        .into_iter()
        .map(|rule| {
            let kind = deserialize_kind(rule.kind, org)?;
            Ok(GoalRule::new(
                RuleId(rule.id),
                org,
                &rule.name,
                rule.description.as_deref(),
                kind,
            ))
        })
        .collect()
}

fn deserialize_kind(kind: SerializedKind, org: OrgId) -> Result<RuleKind, DeserializeError> {
    match kind {
        SerializedKind::AllTasks(cond) => Ok(RuleKind::AllTasks(deserialize_condition(cond, org)?)),
        SerializedKind::AnyTask(cond) => Ok(RuleKind::AnyTask(deserialize_condition(cond, org)?)),
        SerializedKind::Points(points) => Ok(RuleKind::Points(points)),
    }
}

fn deserialize_condition(
    cond: SerializedCondition,
    org: OrgId,
) -> Result<TaskCondition, DeserializeError> {
    match cond {
        SerializedCondition::Set(tasks) => Ok(TaskCondition::Set(
            tasks
                .into_iter()
                .map(|t| deserialize_task(t, org))
                .collect(),
        )),
        SerializedCondition::Tree(expr) => Ok(TaskCondition::Tree(unflatten_expr(expr, org)?)),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedSnapshot) -> Result<(), DeserializeError> {
    if ser.metadata.org == 0 {
        return Err(DeserializeError::Validation(
            "organisation id must be positive".to_owned(),
        ));
    }
    if ser.metadata.rule_count != ser.rules.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} rules but payload has {}",
            ser.metadata.rule_count,
            ser.rules.len()
        )));
    }

    for rule in &ser.rules {
        if rule.id == 0 {
            return Err(DeserializeError::Validation(format!(
                "rule '{}' has a zero id",
                rule.name
            )));
        }
        validate_kind(&rule.kind, rule.id)?;
    }
    Ok(())
}

fn validate_kind(kind: &SerializedKind, rule_id: u64) -> Result<(), DeserializeError> {
    match kind {
        SerializedKind::Points(0) => Err(DeserializeError::Validation(format!(
            "rule {rule_id} has a zero points threshold"
        ))),
        SerializedKind::Points(_) => Ok(()),
        SerializedKind::AllTasks(cond) | SerializedKind::AnyTask(cond) => match cond {
            SerializedCondition::Set(tasks) => {
                for task in tasks {
                    if task.id == 0 {
                        return Err(DeserializeError::Validation(format!(
                            "rule {rule_id} references a zero task id"
                        )));
                    }
                }
                Ok(())
            }
            SerializedCondition::Tree(expr) => validate_expr(expr, rule_id),
        },
    }
}

fn validate_expr(expr: &SerializedExpr, rule_id: u64) -> Result<(), DeserializeError> {
    match expr {
        SerializedExpr::Task(task) => {
            if task.id == 0 {
                return Err(DeserializeError::Validation(format!(
                    "rule {rule_id} references a zero task id"
                )));
            }
            Ok(())
        }
        SerializedExpr::And(children) | SerializedExpr::Or(children) => {
            if children.is_empty() {
                return Err(DeserializeError::Validation(format!(
                    "rule {rule_id} contains an empty And/Or expression"
                )));
            }
            for child in children {
                validate_expr(child, rule_id)?;
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(org: OrgId, rules: &[&GoalRule]) -> Result<Vec<u8>, SerializeError> {
    let serialized = rules_to_serialized(org, rules);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<GoalRule>, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedSnapshot, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_rules(serialized)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

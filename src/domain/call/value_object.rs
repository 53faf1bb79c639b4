//! Call value objects

use crate::domain::shared::value_objects::PartyId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media kind of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Voice,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Voice => "voice",
            MediaKind::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(MediaKind::Voice),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// Lifecycle state of a call record
///
/// `ringing → active → (held ⇄ active) → {transferred | ended}`, with
/// `ringing → ended` for calls that are never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Receiver is being alerted
    Ringing,
    /// Connected and media flowing
    Active,
    /// Connected but on hold
    Held,
    /// Handed off to another party
    Transferred,
    /// Finished
    Ended,
}

impl LifecycleState {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, next) {
            (Ringing, Active) => true,
            (Ringing, Ended) => true,

            (Active, Held) => true,
            (Active, Transferred) => true,
            (Active, Ended) => true,

            (Held, Active) => true,
            (Held, Transferred) => true,
            (Held, Ended) => true,

            // Transferred and Ended are terminal
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Transferred | LifecycleState::Ended)
    }

    /// Connected states are the ones a transfer may start from
    pub fn is_connected(&self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::Held)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Ringing => "ringing",
            LifecycleState::Active => "active",
            LifecycleState::Held => "held",
            LifecycleState::Transferred => "transferred",
            LifecycleState::Ended => "ended",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ringing" => Ok(LifecycleState::Ringing),
            "active" => Ok(LifecycleState::Active),
            "held" => Ok(LifecycleState::Held),
            "transferred" => Ok(LifecycleState::Transferred),
            "ended" => Ok(LifecycleState::Ended),
            other => Err(format!("unknown lifecycle state: {}", other)),
        }
    }
}

/// How a call was handed off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    Blind,
    Attended,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::Blind => "blind",
            TransferType::Attended => "attended",
        }
    }
}

impl FromStr for TransferType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blind" => Ok(TransferType::Blind),
            "attended" => Ok(TransferType::Attended),
            other => Err(format!("unknown transfer type: {}", other)),
        }
    }
}

/// Written once, when a record's lifecycle ends via transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub transferred_to_identity: PartyId,
    pub transfer_type: TransferType,
}

impl TransferMetadata {
    pub fn new(transferred_to_identity: PartyId, transfer_type: TransferType) -> Self {
        Self {
            transferred_to_identity,
            transfer_type,
        }
    }
}

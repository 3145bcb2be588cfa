//! Permission artifact issuance and verification.
//!
//! An artifact is a signed, time-bounded authorization bound to exactly
//! one flight plan. The Ed25519 signature covers a canonical JSON payload
//! so any holder of the public key can verify authenticity offline; the
//! lifecycle state (Valid, Used, Expired, Revoked) lives alongside but is
//! never part of the signed bytes.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ArtifactError;
use crate::gate::GateDecision;
use crate::models::{ArtifactStatus, Drone, FlightPlan, PermissionArtifact, Pilot};

pub const ARTIFACT_VERSION: &str = "1.0";

/// The signed payload. Field order is fixed by this struct definition and
/// serialization is done exactly once at issuance; the stored
/// `payload_json` string is the canonical byte sequence for verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPayload {
    pub version: String,
    pub artifact_id: Uuid,
    pub flight_plan_id: Uuid,
    pub drone_id: Uuid,
    pub drone_uin: Option<String>,
    pub drone_serial: Option<String>,
    pub pilot_id: Uuid,
    pub pilot_rpc: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Holds the issuing keypair. Construction is infallible from a 32-byte
/// seed; key persistence is the server's concern.
pub struct ArtifactSigner {
    key: SigningKey,
    /// Extra validity granted beyond the planned window, minutes.
    grace_min: i64,
}

impl ArtifactSigner {
    pub fn from_seed(seed: [u8; 32], grace_min: i64) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
            grace_min,
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Issue an artifact for a flight plan that has passed the gate.
    ///
    /// The validity window is the planned window widened by the configured
    /// grace margin on both ends, so a slightly early takeoff or late
    /// landing does not invalidate an otherwise authorized flight.
    pub fn issue(
        &self,
        gate: &GateDecision,
        plan: &FlightPlan,
        drone: &Drone,
        pilot: &Pilot,
        now: DateTime<Utc>,
    ) -> Result<PermissionArtifact, ArtifactError> {
        if !gate.passed {
            return Err(ArtifactError::GateNotPassed {
                failures: gate.failures.clone(),
            });
        }

        let grace = Duration::minutes(self.grace_min);
        let valid_from = plan.planned_start - grace;
        let valid_until = plan.planned_end + grace;

        let payload = ArtifactPayload {
            version: ARTIFACT_VERSION.to_string(),
            artifact_id: Uuid::new_v4(),
            flight_plan_id: plan.id,
            drone_id: drone.id,
            drone_uin: drone.uin.clone(),
            drone_serial: drone.serial_number.clone(),
            pilot_id: pilot.id,
            pilot_rpc: pilot.rpc_number.clone(),
            valid_from,
            valid_until,
        };
        // Serialization of a plain struct cannot fail.
        let payload_json =
            serde_json::to_string(&payload).map_err(|_| ArtifactError::BadSignature)?;
        let signature = self.key.sign(payload_json.as_bytes());

        Ok(PermissionArtifact {
            id: payload.artifact_id,
            flight_plan_id: plan.id,
            payload_json,
            signature: B64.encode(signature.to_bytes()),
            issued_at: now,
            valid_from,
            valid_until,
            status: ArtifactStatus::Valid,
            used_at: None,
            revoked_at: None,
            revocation_reason: None,
        })
    }
}

/// Verify an artifact's signature against the issuer's public key. Works
/// entirely offline; no lifecycle state is consulted.
pub fn verify_signature(
    artifact: &PermissionArtifact,
    key: &VerifyingKey,
) -> Result<ArtifactPayload, ArtifactError> {
    let sig_bytes: [u8; 64] = B64
        .decode(&artifact.signature)
        .map_err(|_| ArtifactError::BadSignature)?
        .try_into()
        .map_err(|_| ArtifactError::BadSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(artifact.payload_json.as_bytes(), &signature)
        .map_err(|_| ArtifactError::BadSignature)?;

    serde_json::from_str(&artifact.payload_json).map_err(|_| ArtifactError::BadSignature)
}

/// Full verification of a presented artifact: signature, validity window,
/// and lifecycle status. The window comes from the decoded payload, so
/// the whole check runs offline against the public key alone.
///
/// A Used artifact inside its window still verifies; a flight in progress
/// presents a consumed artifact. Revoked and Expired do not.
pub fn verify(
    artifact: &PermissionArtifact,
    key: &VerifyingKey,
    now: DateTime<Utc>,
) -> Result<ArtifactPayload, ArtifactError> {
    let payload = verify_signature(artifact, key)?;
    match artifact.status {
        ArtifactStatus::Valid | ArtifactStatus::Used => {}
        status => return Err(ArtifactError::NotValid { status }),
    }
    if now > payload.valid_until {
        return Err(ArtifactError::Expired {
            valid_until: payload.valid_until,
        });
    }
    if now < payload.valid_from {
        return Err(ArtifactError::NotValid {
            status: artifact.status,
        });
    }
    Ok(payload)
}

/// Outcome of consuming an artifact at takeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    /// The artifact sat past its window; its stored status should move to
    /// Expired instead of Used.
    AutoExpired,
}

/// Consume a Valid artifact at takeoff time. Single use: a consumed
/// artifact never returns to Valid. A Valid artifact past its window is
/// reported as expired rather than consumed.
pub fn consume(
    artifact: &PermissionArtifact,
    now: DateTime<Utc>,
) -> Result<ConsumeOutcome, ArtifactError> {
    match artifact.status {
        ArtifactStatus::Valid => {}
        ArtifactStatus::Used => return Err(ArtifactError::AlreadyUsed),
        status => return Err(ArtifactError::NotValid { status }),
    }
    if now > artifact.valid_until {
        return Ok(ConsumeOutcome::AutoExpired);
    }
    if now < artifact.valid_from {
        return Err(ArtifactError::NotValid {
            status: ArtifactStatus::Valid,
        });
    }
    Ok(ConsumeOutcome::Consumed)
}

/// Whether a revocation request changes anything. Revoking an already
/// revoked artifact is a no-op, not an error.
pub fn can_revoke(artifact: &PermissionArtifact) -> bool {
    artifact.status != ArtifactStatus::Revoked
}
